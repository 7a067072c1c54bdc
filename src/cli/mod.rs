use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, VAULT_ENV};

pub mod commands;

use self::commands::{FindArgs, ListArgs, NewArgs, RenderArgs, Session, StreakArgs};

#[derive(Parser, Debug)]
#[command(
    name = "dailynote",
    version,
    about = "Create, find and template dated notes in a markdown vault"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over DAILYNOTE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the vault directory (takes precedence over DAILYNOTE_VAULT)
    #[arg(long)]
    pub vault: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the note for a date, creating it from the template if needed (default)
    New(NewArgs),
    /// Print the path of the note for a date
    Find(FindArgs),
    /// List every dated note in the vault
    List(ListArgs),
    /// Show which recent days have a note and the current streak
    Streak(StreakArgs),
    /// Print the template as it would render for a date
    Render(RenderArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.vault {
        env::set_var(VAULT_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let paths = loader.paths().clone();
    let config = loader.load_or_init()?;
    let session = Session::open(config, paths)?;

    let command = cli.command.unwrap_or(Commands::New(NewArgs::default()));
    match command {
        Commands::New(args) => commands::new_note(&session, args),
        Commands::Find(args) => commands::find_note(&session, args),
        Commands::List(args) => commands::list_notes(&session, args),
        Commands::Streak(args) => commands::show_streak(&session, args),
        Commands::Render(args) => commands::render_template(&session, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
