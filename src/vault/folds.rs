use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const FOLDS_TMP_EXTENSION: &str = "json.tmp";
const FOLDS_BACKUP_EXTENSION: &str = "json.bak";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub from: u32,
    pub to: u32,
}

/// Collapsed sections of a file, carried from a template onto the notes made from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldInfo {
    pub folds: Vec<Fold>,
    pub lines: u32,
}

/// Per-file UI state. Saving is best effort: note content never depends on it.
pub trait FoldStore {
    fn load(&self, path: &str) -> Option<FoldInfo>;
    fn save(&self, path: &str, info: &FoldInfo) -> Result<()>;
}

/// Fold state for the whole vault in a single JSON document.
#[derive(Debug)]
pub struct JsonFoldStore {
    file: PathBuf,
    lock: Mutex<()>,
}

impl JsonFoldStore {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            lock: Mutex::new(()),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    fn read_all(&self) -> Result<BTreeMap<String, FoldInfo>> {
        let raw = match fs::read(&self.file) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading fold state {}", self.file.display()))
            }
        };
        serde_json::from_slice(&raw)
            .with_context(|| format!("parsing fold state {}", self.file.display()))
    }
}

impl FoldStore for JsonFoldStore {
    fn load(&self, path: &str) -> Option<FoldInfo> {
        let _guard = self.lock.lock();
        match self.read_all() {
            Ok(mut all) => all.remove(path),
            Err(err) => {
                tracing::warn!(?err, "ignoring unreadable fold state");
                None
            }
        }
    }

    fn save(&self, path: &str, info: &FoldInfo) -> Result<()> {
        let _guard = self.lock.lock();
        let mut all = match self.read_all() {
            Ok(all) => all,
            Err(err) => {
                let backup = self.file.with_extension(FOLDS_BACKUP_EXTENSION);
                tracing::warn!(?err, backup = %backup.display(), "fold state unreadable, moving it aside");
                fs::rename(&self.file, &backup).with_context(|| {
                    format!("moving unreadable fold state to {}", backup.display())
                })?;
                BTreeMap::new()
            }
        };
        all.insert(path.to_string(), info.clone());
        let json = serde_json::to_vec_pretty(&all).context("serialising fold state")?;
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("ensuring fold state dir {}", parent.display()))?;
        }
        let tmp_path = self.file.with_extension(FOLDS_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary fold state {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.file)
            .with_context(|| format!("persisting fold state {}", self.file.display()))?;
        Ok(())
    }
}
