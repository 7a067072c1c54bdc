use std::env;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::process::Command;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{Date, Duration};

use crate::config::{AppConfig, ConfigPaths};
use crate::dates::{Clock, DatePattern, DateUid, SystemClock};
use crate::notes::{
    AlwaysConfirm, Confirm, CreateOutcome, NoteCreator, NoteIndex, Notifier, OpenTarget,
    Workspace,
};
use crate::template::TemplateEngine;
use crate::vault::{FsVault, JsonFoldStore, NoteHandle, TemplateSource, VaultTemplateSource};

const DEFAULT_STREAK_DAYS: u32 = 14;
const MAX_STREAK_DAYS: u32 = 3660;

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Date of the note: YYYY-MM-DD, today, yesterday, tomorrow, or the naming format
    #[arg()]
    pub date: Option<String>,
    /// Open the note in a new split instead of reusing the current pane
    #[arg(long)]
    pub split: bool,
    /// Create without asking for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
    /// Open the note in $VISUAL / $EDITOR
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    /// Date to look up (defaults to today)
    #[arg()]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only notes on or after this date
    #[arg(long)]
    pub from: Option<String>,
    /// Only notes on or before this date
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StreakArgs {
    /// Number of days to show, ending today
    #[arg(
        long,
        default_value_t = DEFAULT_STREAK_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_STREAK_DAYS))
    )]
    pub days: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Reference date for the placeholders (defaults to today)
    #[arg()]
    pub date: Option<String>,
}

/// Everything a command needs: settings, the vault and its side stores.
pub struct Session {
    pub config: AppConfig,
    pub paths: ConfigPaths,
    pub vault: FsVault,
    pub folds: Arc<JsonFoldStore>,
    pub clock: Arc<dyn Clock>,
}

impl Session {
    pub fn open(config: AppConfig, paths: ConfigPaths) -> Result<Self> {
        let vault_dir = config.vault_dir(&paths);
        std::fs::create_dir_all(&vault_dir)
            .with_context(|| format!("creating vault directory {}", vault_dir.display()))?;
        let folds = Arc::new(JsonFoldStore::new(paths.fold_state_file.clone()));
        Ok(Self {
            vault: FsVault::open(vault_dir),
            folds,
            clock: Arc::new(SystemClock),
            config,
            paths,
        })
    }

    fn templates(&self) -> VaultTemplateSource<FsVault> {
        VaultTemplateSource::new(self.vault.clone(), self.folds.clone())
    }

    fn index(&self) -> NoteIndex {
        let index = NoteIndex::new(Arc::clone(&self.clock));
        index.reindex(&self.vault, &self.config.notes, &StderrNotifier);
        index
    }

    fn date_arg(&self, raw: Option<&str>) -> Result<Date> {
        parse_date_arg(raw, &self.config.notes.pattern(), self.clock.today())
    }
}

pub fn new_note(session: &Session, args: NewArgs) -> Result<()> {
    let date = session.date_arg(args.date.as_deref())?;
    let index = session.index();
    let templates = session.templates();
    let workspace = TerminalWorkspace {
        vault: session.vault.clone(),
        edit: args.edit,
    };
    let prompt = PromptConfirm;
    let confirm: &dyn Confirm = if args.yes { &AlwaysConfirm } else { &prompt };
    let creator = NoteCreator::new(
        &session.vault,
        &templates,
        &*session.folds,
        confirm,
        &StderrNotifier,
        &workspace,
        &session.config.notes,
        Arc::clone(&session.clock),
    );

    let split = args.split || session.config.open_in_split;
    match creator.open_or_create(&index, date.midnight(), split) {
        CreateOutcome::Created(note) => {
            println!("{}", session.vault.absolute(note.path()).display());
            Ok(())
        }
        CreateOutcome::Cancelled => {
            println!("Cancelled.");
            Ok(())
        }
        CreateOutcome::Failed => bail!("could not create the note for {date}"),
    }
}

pub fn find_note(session: &Session, args: FindArgs) -> Result<()> {
    let date = session.date_arg(args.date.as_deref())?;
    let index = session.index();
    match index.lookup(date) {
        Some(note) => println!("{}", session.vault.absolute(note.path()).display()),
        None => println!("No note for {date}."),
    }
    Ok(())
}

pub fn list_notes(session: &Session, args: ListArgs) -> Result<()> {
    let from = args
        .from
        .as_deref()
        .map(|raw| session.date_arg(Some(raw)))
        .transpose()?;
    let to = args
        .to
        .as_deref()
        .map(|raw| session.date_arg(Some(raw)))
        .transpose()?;
    let index = session.index();
    print!("{}", format_listing(&index.entries(), from, to));
    Ok(())
}

pub fn show_streak(session: &Session, args: StreakArgs) -> Result<()> {
    if !(1..=MAX_STREAK_DAYS).contains(&args.days) {
        bail!("--days must be between 1 and {MAX_STREAK_DAYS}");
    }
    let index = session.index();
    let today = session.clock.today();
    print!(
        "{}",
        format_streak(today, args.days, |day| index.has_note(day))
    );
    Ok(())
}

pub fn render_template(session: &Session, args: RenderArgs) -> Result<()> {
    let date = session.date_arg(args.date.as_deref())?;
    let info = session
        .templates()
        .load_template(&session.config.notes.template)
        .with_context(|| format!("loading template '{}'", session.config.notes.template))?;
    let engine = TemplateEngine::new(session.config.notes.pattern(), Arc::clone(&session.clock));
    print!("{}", engine.render(&info.body, date.midnight()));
    Ok(())
}

/// Accepts `today`, `yesterday`, `tomorrow`, ISO dates and anything the
/// naming format parses.
fn parse_date_arg(raw: Option<&str>, pattern: &DatePattern, today: Date) -> Result<Date> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(today);
    };
    let relative = match raw.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => today.checked_sub(Duration::days(1)),
        "tomorrow" => today.checked_add(Duration::days(1)),
        _ => None,
    };
    if let Some(date) = relative {
        return Ok(date);
    }
    DatePattern::default()
        .parse(raw, today)
        .or_else(|| pattern.parse(raw, today))
        .with_context(|| {
            format!(
                "'{raw}' is not a date (expected YYYY-MM-DD or {})",
                pattern.as_str()
            )
        })
}

fn format_listing(
    entries: &[(DateUid, NoteHandle)],
    from: Option<Date>,
    to: Option<Date>,
) -> String {
    let from = from.map(DateUid::for_date);
    let to = to.map(DateUid::for_date);
    let mut out = String::new();
    let mut count = 0;
    for (uid, note) in entries {
        if from.as_ref().is_some_and(|from| uid < from) || to.as_ref().is_some_and(|to| uid > to) {
            continue;
        }
        let _ = writeln!(&mut out, "{}  {}", uid.as_str().trim_start_matches("day-"), note.path());
        count += 1;
    }
    if count == 0 {
        out.push_str("No notes found.\n");
    }
    out
}

/// One line per day, oldest first, then the streak of consecutive days with
/// a note ending today (or yesterday, while today's note is still unwritten).
fn format_streak(today: Date, days: u32, has_note: impl Fn(Date) -> bool) -> String {
    let mut out = String::new();
    for back in (0..i64::from(days)).rev() {
        let Some(day) = today.checked_sub(Duration::days(back)) else {
            continue;
        };
        let mark = if has_note(day) { "x" } else { " " };
        let _ = writeln!(&mut out, "[{mark}] {day} {}", day.weekday());
    }

    let mut cursor = if has_note(today) {
        Some(today)
    } else {
        today.previous_day()
    };
    let mut streak = 0u32;
    while let Some(day) = cursor.filter(|day| has_note(*day)) {
        streak += 1;
        cursor = day.previous_day();
    }
    let _ = writeln!(
        &mut out,
        "Current streak: {streak} day{}",
        if streak == 1 { "" } else { "s" }
    );
    out
}

struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        tracing::debug!(notice = message);
        eprintln!("{message}");
    }
}

struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, title: &str, text: &str) -> Result<bool> {
        if !atty::is(atty::Stream::Stdin) {
            bail!("cannot ask for confirmation without a terminal; pass --yes");
        }
        let mut stdout = io::stdout();
        write!(stdout, "{title}: {text} [y/N] ")?;
        stdout.flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

struct TerminalWorkspace {
    vault: FsVault,
    edit: bool,
}

impl Workspace for TerminalWorkspace {
    fn open(&self, note: &NoteHandle, target: OpenTarget) -> Result<()> {
        tracing::debug!(path = note.path(), ?target, "opening note");
        if !self.edit {
            return Ok(());
        }
        let editor = env::var("VISUAL")
            .or_else(|_| env::var("EDITOR"))
            .context("neither VISUAL nor EDITOR is set")?;
        let status = Command::new(&editor)
            .arg(self.vault.absolute(note.path()))
            .status()
            .with_context(|| format!("launching editor {editor}"))?;
        if !status.success() {
            bail!("editor {editor} exited with {status}");
        }
        Ok(())
    }
}
