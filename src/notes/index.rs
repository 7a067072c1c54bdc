use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use time::Date;

use super::Notifier;
use crate::config::NoteSettings;
use crate::dates::{Clock, DateUid};
use crate::error::NoteResult;
use crate::paths::{normalize_path, strip_bucket, AgeBucket};
use crate::vault::{Entry, FileStore, NoteHandle, NOTE_EXTENSION};

/// Snapshot of the dated notes in the vault, keyed by day.
///
/// The snapshot is only ever replaced wholesale by [`NoteIndex::reindex`];
/// lookups never rebuild it, so callers reindex when freshness matters.
pub struct NoteIndex {
    notes: RwLock<BTreeMap<DateUid, NoteHandle>>,
    error_shown: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl NoteIndex {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            notes: RwLock::new(BTreeMap::new()),
            error_shown: AtomicBool::new(false),
            clock,
        }
    }

    /// Rescans the notes folder. A failure empties the index and is reported
    /// through `notifier` once per run of consecutive failures.
    pub fn reindex(&self, store: &dyn FileStore, settings: &NoteSettings, notifier: &dyn Notifier) {
        match self.scan(store, settings) {
            Ok(notes) => {
                tracing::debug!(count = notes.len(), "reindexed daily notes");
                *self.notes.write() = notes;
                self.error_shown.store(false, Ordering::SeqCst);
            }
            Err(err) => {
                self.notes.write().clear();
                if self.error_shown.swap(true, Ordering::SeqCst) {
                    tracing::debug!(error = %err, "daily notes folder still unavailable");
                } else {
                    if err.is_configuration() {
                        tracing::warn!(error = %err, "failed to find daily notes folder");
                    } else {
                        tracing::error!(error = ?err, "failed to scan daily notes folder");
                    }
                    notifier.notify(&format!("Failed to find daily notes folder: {err}"));
                }
            }
        }
    }

    pub fn lookup(&self, date: Date) -> Option<NoteHandle> {
        self.lookup_uid(&DateUid::for_date(date))
    }

    pub fn lookup_uid(&self, uid: &DateUid) -> Option<NoteHandle> {
        self.notes.read().get(uid).cloned()
    }

    pub fn has_note(&self, date: Date) -> bool {
        self.notes.read().contains_key(&DateUid::for_date(date))
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }

    /// Indexed notes in date order.
    pub fn entries(&self) -> Vec<(DateUid, NoteHandle)> {
        self.notes
            .read()
            .iter()
            .map(|(uid, note)| (uid.clone(), note.clone()))
            .collect()
    }

    /// Whether the last reindex failed and its error has been surfaced.
    pub fn is_failing(&self) -> bool {
        self.error_shown.load(Ordering::SeqCst)
    }

    fn scan(
        &self,
        store: &dyn FileStore,
        settings: &NoteSettings,
    ) -> NoteResult<BTreeMap<DateUid, NoteHandle>> {
        let bucketed = AgeBucket::from_birthday(&settings.birthday, self.clock.now()).is_some();
        let files = if bucketed {
            let parent = strip_bucket(&settings.folder);
            let mut files = Vec::new();
            for entry in store.list_children(&parent)? {
                if let Entry::Folder(folder) = entry {
                    files.extend(store.recurse_files(&folder)?);
                }
            }
            files
        } else {
            store.recurse_files(&normalize_path(&settings.folder))?
        };

        let pattern = settings.pattern().basename();
        let today = self.clock.today();
        let mut notes = BTreeMap::new();
        for file in files {
            if file.extension() != Some(NOTE_EXTENSION) {
                continue;
            }
            let Some(date) = pattern.parse(file.basename(), today) else {
                continue;
            };
            if let Some(previous) = notes.insert(DateUid::for_date(date), file) {
                tracing::debug!(path = previous.path(), "note shadowed by a later file for the same day");
            }
        }
        Ok(notes)
    }
}
