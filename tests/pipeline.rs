use std::cell::RefCell;
use std::sync::Arc;

use assert_matches::assert_matches;
use dailynote::dates::{Clock, FixedClock};
use dailynote::notes::{
    AlwaysConfirm, CreateOutcome, NoteCreator, NoteIndex, Notifier, OpenTarget, Workspace,
};
use dailynote::vault::{FileStore, FsVault, JsonFoldStore, NoteHandle, VaultTemplateSource};
use dailynote::NoteSettings;
use tempfile::TempDir;
use time::macros::{date, datetime};

#[derive(Default)]
struct Session {
    notices: RefCell<Vec<String>>,
    opened: RefCell<Vec<String>>,
}

impl Notifier for Session {
    fn notify(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }
}

impl Workspace for Session {
    fn open(&self, note: &NoteHandle, _target: OpenTarget) -> anyhow::Result<()> {
        self.opened.borrow_mut().push(note.path().to_string());
        Ok(())
    }
}

struct Vault {
    _temp: TempDir,
    store: FsVault,
    folds: Arc<JsonFoldStore>,
    templates: VaultTemplateSource<FsVault>,
    clock: Arc<dyn Clock>,
}

impl Vault {
    fn new() -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let store = FsVault::open(temp.path().join("vault"));
        std::fs::create_dir_all(store.root())?;
        let folds = Arc::new(JsonFoldStore::new(temp.path().join("folds.json")));
        let templates = VaultTemplateSource::new(store.clone(), folds.clone());
        Ok(Self {
            _temp: temp,
            store,
            folds,
            templates,
            clock: Arc::new(FixedClock(datetime!(2024-10-01 09:00:00))),
        })
    }

    fn creator<'a>(&'a self, settings: &'a NoteSettings, session: &'a Session) -> NoteCreator<'a> {
        NoteCreator::new(
            &self.store,
            &self.templates,
            &*self.folds,
            &AlwaysConfirm,
            session,
            session,
            settings,
            Arc::clone(&self.clock),
        )
    }

    fn index(&self, settings: &NoteSettings, session: &Session) -> NoteIndex {
        let index = NoteIndex::new(Arc::clone(&self.clock));
        index.reindex(&self.store, settings, session);
        index
    }
}

fn settings(format: &str, birthday: &str) -> NoteSettings {
    NoteSettings {
        format: format.into(),
        folder: "journal".into(),
        birthday: birthday.into(),
        confirm_before_create: false,
        ..NoteSettings::default()
    }
}

#[test]
fn created_notes_are_found_by_the_next_reindex() -> anyhow::Result<()> {
    let vault = Vault::new()?;
    let settings = settings("YYYY-MM-DD", "");
    let session = Session::default();

    let outcome = vault
        .creator(&settings, &session)
        .create_note(datetime!(2024-03-10 00:00:00), false, false);
    let note = assert_matches!(outcome, CreateOutcome::Created(note) => note);

    let index = vault.index(&settings, &session);
    assert_eq!(index.lookup(date!(2024 - 03 - 10)), Some(note));
    assert_eq!(index.len(), 1);
    assert!(session.notices.borrow().is_empty());
    Ok(())
}

#[test]
fn yearless_format_round_trips_through_the_index() -> anyhow::Result<()> {
    let vault = Vault::new()?;
    let settings = settings("MMMM Do", "");
    let session = Session::default();
    let creator = vault.creator(&settings, &session);

    let outcome = creator.create_note(datetime!(2024-03-10 00:00:00), false, false);
    assert_eq!(
        outcome,
        CreateOutcome::Created(NoteHandle::new("journal/March 10th.md"))
    );

    let index = vault.index(&settings, &session);
    assert!(index.has_note(date!(2024 - 03 - 10)));

    let again = creator.open_or_create(&index, datetime!(2024-03-10 00:00:00), false);
    assert_eq!(
        again,
        CreateOutcome::Created(NoteHandle::new("journal/March 10th.md"))
    );
    assert!(session.notices.borrow().is_empty());
    assert_eq!(session.opened.borrow().len(), 2);
    Ok(())
}

#[test]
fn bucketed_notes_are_indexed_from_the_parent_folder() -> anyhow::Result<()> {
    let vault = Vault::new()?;
    let settings = settings("YYYY-MM-DD", "1990-05-15");
    let session = Session::default();

    // an older bucket from before the last birthday
    vault.store.make_directory("journal")?;
    vault.store.make_directory("journal/33")?;
    vault.store.create("journal/33/2024-03-10.md", "")?;

    let outcome = vault
        .creator(&settings, &session)
        .create_note(datetime!(2024-10-01 00:00:00), false, false);
    let note = assert_matches!(outcome, CreateOutcome::Created(note) => note);
    assert_eq!(note.path(), "journal/34/2024-10-01.md");

    let bucketed = NoteSettings {
        folder: "journal/34".into(),
        ..settings.clone()
    };
    for settings in [&settings, &bucketed] {
        let index = vault.index(settings, &session);
        assert_eq!(index.lookup(date!(2024 - 10 - 01)), Some(note.clone()));
        assert!(index.has_note(date!(2024 - 03 - 10)));
    }
    assert!(session.notices.borrow().is_empty());
    Ok(())
}
