use std::sync::Arc;

use time::PrimitiveDateTime;

use super::{Confirm, NoteIndex, Notifier, OpenTarget, Workspace};
use crate::config::NoteSettings;
use crate::dates::Clock;
use crate::error::NoteError;
use crate::paths::{resolve_path, AgeBucket};
use crate::template::TemplateEngine;
use crate::vault::{FileStore, FoldStore, NoteHandle, TemplateInfo, TemplateSource};

const CREATE_FAILED_NOTICE: &str = "Unable to create new file.";
const TEMPLATE_FAILED_NOTICE: &str = "Failed to read the daily note template";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(NoteHandle),
    /// The user declined the confirmation prompt. Nothing was written.
    Cancelled,
    /// Creation failed; the error has been logged and a notice raised.
    Failed,
}

impl CreateOutcome {
    pub fn note(&self) -> Option<&NoteHandle> {
        match self {
            CreateOutcome::Created(note) => Some(note),
            _ => None,
        }
    }
}

/// Materializes dated notes: path resolution, template rendering, file
/// creation, then fold state and opening the new note.
pub struct NoteCreator<'a> {
    store: &'a dyn FileStore,
    templates: &'a dyn TemplateSource,
    folds: &'a dyn FoldStore,
    confirm: &'a dyn Confirm,
    notifier: &'a dyn Notifier,
    workspace: &'a dyn Workspace,
    settings: &'a NoteSettings,
    clock: Arc<dyn Clock>,
}

impl<'a> NoteCreator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn FileStore,
        templates: &'a dyn TemplateSource,
        folds: &'a dyn FoldStore,
        confirm: &'a dyn Confirm,
        notifier: &'a dyn Notifier,
        workspace: &'a dyn Workspace,
        settings: &'a NoteSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            templates,
            folds,
            confirm,
            notifier,
            workspace,
            settings,
            clock,
        }
    }

    pub fn filename(&self, date: PrimitiveDateTime) -> String {
        self.settings.pattern().format(date)
    }

    pub fn create_note(
        &self,
        date: PrimitiveDateTime,
        open_in_split: bool,
        confirm_before_create: bool,
    ) -> CreateOutcome {
        let filename = self.filename(date);

        if confirm_before_create {
            let text = format!("File {filename} does not exist. Would you like to create it?");
            match self.confirm.confirm("New Daily Note", &text) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(%filename, "note creation declined");
                    return CreateOutcome::Cancelled;
                }
                Err(err) => {
                    tracing::warn!(?err, %filename, "confirmation unavailable, not creating note");
                    return CreateOutcome::Cancelled;
                }
            }
        }

        let bucket = AgeBucket::from_birthday(&self.settings.birthday, self.clock.now());
        let path = match resolve_path(self.store, &self.settings.folder, &filename, bucket.as_ref())
        {
            Ok(path) => path,
            Err(err) => return self.fail(&filename, err),
        };

        let template = self.load_template();
        let engine = TemplateEngine::new(self.settings.pattern(), Arc::clone(&self.clock));
        let content = engine.render(&template.body, date);

        let note = match self.store.create(path.as_str(), &content) {
            Ok(note) => note,
            Err(err) => return self.fail(path.as_str(), err),
        };
        tracing::info!(path = note.path(), "created daily note");

        if let Some(folds) = &template.folds {
            if let Err(err) = self.folds.save(note.path(), folds) {
                tracing::warn!(?err, path = note.path(), "failed to save fold state");
            }
        }

        self.open(&note, OpenTarget::for_split(open_in_split));
        CreateOutcome::Created(note)
    }

    /// Opens the note already indexed for `date`, or creates it using the
    /// configured confirmation setting.
    pub fn open_or_create(
        &self,
        index: &NoteIndex,
        date: PrimitiveDateTime,
        open_in_split: bool,
    ) -> CreateOutcome {
        if let Some(existing) = index.lookup(date.date()) {
            if self.store.exists(existing.path()) {
                self.open(&existing, OpenTarget::for_split(open_in_split));
                return CreateOutcome::Created(existing);
            }
            tracing::debug!(path = existing.path(), "indexed note vanished, recreating");
        }
        self.create_note(date, open_in_split, self.settings.confirm_before_create)
    }

    fn load_template(&self) -> TemplateInfo {
        match self.templates.load_template(&self.settings.template) {
            Ok(info) => info,
            Err(err) => {
                tracing::error!(error = %err, template = %self.settings.template, "failed to read the daily note template");
                self.notifier.notify(TEMPLATE_FAILED_NOTICE);
                TemplateInfo::default()
            }
        }
    }

    fn open(&self, note: &NoteHandle, target: OpenTarget) {
        if let Err(err) = self.workspace.open(note, target) {
            tracing::warn!(?err, path = note.path(), "failed to open note");
        }
    }

    fn fail(&self, path: &str, err: NoteError) -> CreateOutcome {
        tracing::error!(error = %err, path, "failed to create file");
        self.notifier.notify(CREATE_FAILED_NOTICE);
        CreateOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::dates::{DateUid, FixedClock};
    use crate::vault::{Fold, FoldInfo, FsVault, JsonFoldStore, VaultTemplateSource};
    use assert_matches::assert_matches;
    use tempfile::TempDir;
    use time::macros::datetime;

    #[derive(Default)]
    struct Recorder {
        answer: Option<bool>,
        prompts: RefCell<Vec<String>>,
        notices: RefCell<Vec<String>>,
        opened: RefCell<Vec<(String, OpenTarget)>>,
    }

    impl Confirm for Recorder {
        fn confirm(&self, _title: &str, text: &str) -> anyhow::Result<bool> {
            self.prompts.borrow_mut().push(text.to_string());
            self.answer.ok_or_else(|| anyhow::anyhow!("no terminal"))
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, message: &str) {
            self.notices.borrow_mut().push(message.to_string());
        }
    }

    impl Workspace for Recorder {
        fn open(&self, note: &NoteHandle, target: OpenTarget) -> anyhow::Result<()> {
            self.opened
                .borrow_mut()
                .push((note.path().to_string(), target));
            Ok(())
        }
    }

    struct Fixture {
        _temp: TempDir,
        vault: FsVault,
        folds: Arc<JsonFoldStore>,
        templates: VaultTemplateSource<FsVault>,
        settings: NoteSettings,
        clock: Arc<dyn Clock>,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let temp = TempDir::new()?;
            let vault = FsVault::open(temp.path().join("vault"));
            std::fs::create_dir_all(vault.root())?;
            let folds = Arc::new(JsonFoldStore::new(temp.path().join("folds.json")));
            let templates = VaultTemplateSource::new(vault.clone(), folds.clone());
            let settings = NoteSettings {
                folder: "journal".into(),
                template: "templates/daily".into(),
                ..NoteSettings::default()
            };
            Ok(Self {
                _temp: temp,
                vault,
                folds,
                templates,
                settings,
                clock: Arc::new(FixedClock(datetime!(2024-10-01 09:15:00))),
            })
        }

        fn creator<'a>(&'a self, recorder: &'a Recorder) -> NoteCreator<'a> {
            NoteCreator::new(
                &self.vault,
                &self.templates,
                &*self.folds,
                recorder,
                recorder,
                recorder,
                &self.settings,
                Arc::clone(&self.clock),
            )
        }
    }

    #[test]
    fn creates_rendered_note_and_opens_it() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.vault.make_directory("templates")?;
        fixture
            .vault
            .create("templates/daily.md", "# {{title}}\n<< [[{{yesterday}}]] at {{time}}")?;
        let recorder = Recorder::default();

        let outcome = fixture
            .creator(&recorder)
            .create_note(datetime!(2024-03-10 00:00:00), true, false);

        let note = assert_matches!(outcome, CreateOutcome::Created(note) => note);
        assert_eq!(note.path(), "journal/2024-03-10.md");
        assert_eq!(
            fixture.vault.read(note.path())?,
            "# 2024-03-10\n<< [[2024-03-09]] at 09:15"
        );
        assert_eq!(
            recorder.opened.borrow().as_slice(),
            &[("journal/2024-03-10.md".to_string(), OpenTarget::NewSplit)]
        );
        assert!(recorder.notices.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn declined_confirmation_has_no_side_effects() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let recorder = Recorder {
            answer: Some(false),
            ..Recorder::default()
        };

        let outcome = fixture
            .creator(&recorder)
            .create_note(datetime!(2024-03-10 00:00:00), false, true);

        assert_eq!(outcome, CreateOutcome::Cancelled);
        assert_eq!(
            recorder.prompts.borrow().as_slice(),
            &["File 2024-03-10 does not exist. Would you like to create it?".to_string()]
        );
        assert!(!fixture.vault.exists("journal"));
        assert!(recorder.opened.borrow().is_empty());
        assert!(recorder.notices.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn unanswerable_prompt_counts_as_declined() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let recorder = Recorder::default();
        let outcome = fixture
            .creator(&recorder)
            .create_note(datetime!(2024-03-10 00:00:00), false, true);
        assert_eq!(outcome, CreateOutcome::Cancelled);
        assert!(!fixture.vault.exists("journal"));
        Ok(())
    }

    #[test]
    fn collision_fails_with_a_single_notice() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let recorder = Recorder {
            answer: Some(true),
            ..Recorder::default()
        };
        let creator = fixture.creator(&recorder);
        let date = datetime!(2024-03-10 00:00:00);

        assert_matches!(creator.create_note(date, false, true), CreateOutcome::Created(_));
        assert_eq!(creator.create_note(date, false, true), CreateOutcome::Failed);

        let notices = recorder.notices.borrow();
        assert_eq!(
            notices.as_slice(),
            &[
                TEMPLATE_FAILED_NOTICE.to_string(),
                TEMPLATE_FAILED_NOTICE.to_string(),
                CREATE_FAILED_NOTICE.to_string()
            ]
        );
        assert_eq!(recorder.opened.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_template_yields_empty_note() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let recorder = Recorder::default();
        let outcome = fixture
            .creator(&recorder)
            .create_note(datetime!(2024-03-10 00:00:00), false, false);
        let note = assert_matches!(outcome, CreateOutcome::Created(note) => note);
        assert_eq!(fixture.vault.read(note.path())?, "");
        assert_eq!(
            recorder.notices.borrow().as_slice(),
            &[TEMPLATE_FAILED_NOTICE.to_string()]
        );
        Ok(())
    }

    #[test]
    fn birthday_routes_into_age_bucket_and_copies_folds() -> anyhow::Result<()> {
        let mut fixture = Fixture::new()?;
        fixture.settings.birthday = "1990-05-15".into();
        fixture.vault.make_directory("templates")?;
        fixture.vault.create("templates/daily.md", "## Log\n- \n## Ideas\n- ")?;
        let folds = FoldInfo {
            folds: vec![Fold { from: 0, to: 1 }],
            lines: 4,
        };
        fixture.folds.save("templates/daily.md", &folds)?;
        let recorder = Recorder::default();

        let outcome = fixture
            .creator(&recorder)
            .create_note(datetime!(2024-10-01 00:00:00), false, false);

        let note = assert_matches!(outcome, CreateOutcome::Created(note) => note);
        assert_eq!(note.path(), "journal/34/2024-10-01.md");
        assert_eq!(fixture.folds.load(note.path()), Some(folds));
        assert_eq!(
            recorder.opened.borrow()[0].1,
            OpenTarget::ReuseUnpinned
        );
        Ok(())
    }

    #[test]
    fn open_or_create_reuses_indexed_note() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.vault.make_directory("journal")?;
        fixture.vault.create("journal/2024-03-10.md", "existing")?;
        let recorder = Recorder::default();
        let index = NoteIndex::new(Arc::clone(&fixture.clock));
        index.reindex(&fixture.vault, &fixture.settings, &recorder);
        assert!(index.lookup_uid(&DateUid::from(datetime!(2024-03-10 00:00:00))).is_some());

        let outcome = fixture
            .creator(&recorder)
            .open_or_create(&index, datetime!(2024-03-10 18:00:00), false);

        assert_eq!(
            outcome,
            CreateOutcome::Created(NoteHandle::new("journal/2024-03-10.md"))
        );
        assert_eq!(fixture.vault.read("journal/2024-03-10.md")?, "existing");
        assert!(recorder.prompts.borrow().is_empty());
        Ok(())
    }
}
