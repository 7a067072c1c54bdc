use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::{NoteError, NoteResult};

mod folds;
mod templates;

pub use folds::{Fold, FoldInfo, FoldStore, JsonFoldStore};
pub use templates::{TemplateInfo, TemplateSource, VaultTemplateSource};

pub const NOTE_EXTENSION: &str = "md";

/// A note file inside the vault, addressed by its vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteHandle {
    path: String,
}

impl NoteHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its last extension.
    pub fn basename(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        match self.name().rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Folder(String),
    File(NoteHandle),
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::Folder(path) => path,
            Entry::File(handle) => handle.path(),
        }
    }
}

/// Hierarchical store the notes live in. Paths are vault-relative,
/// slash-separated, and the empty string names the vault root.
pub trait FileStore {
    /// Creates a new file; fails with [`NoteError::AlreadyExists`] if one is there.
    fn create(&self, path: &str, content: &str) -> NoteResult<NoteHandle>;

    fn exists(&self, path: &str) -> bool;

    /// Creates a single folder. An existing folder is not an error.
    fn make_directory(&self, path: &str) -> NoteResult<()>;

    /// Direct children of a folder.
    fn list_children(&self, path: &str) -> NoteResult<Vec<Entry>>;

    fn get_by_path(&self, path: &str) -> Option<Entry>;

    fn read(&self, path: &str) -> NoteResult<String>;

    /// Every file below `path`, depth first.
    fn recurse_files(&self, path: &str) -> NoteResult<Vec<NoteHandle>> {
        let mut files = Vec::new();
        for entry in self.list_children(path)? {
            match entry {
                Entry::File(handle) => files.push(handle),
                Entry::Folder(folder) => files.extend(self.recurse_files(&folder)?),
            }
        }
        Ok(files)
    }
}

/// Vault backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: Arc<PathBuf>,
}

impl FsVault {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn absolute(&self, path: &str) -> PathBuf {
        let mut full = self.root.to_path_buf();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        full
    }

    fn relative(&self, full: &Path) -> Option<String> {
        let rel = full.strip_prefix(self.root.as_path()).ok()?;
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    fn folder_for_listing(&self, path: &str) -> NoteResult<PathBuf> {
        let full = self.absolute(path);
        match fs::metadata(&full) {
            Ok(meta) if meta.is_dir() => Ok(full),
            Ok(_) => Err(NoteError::NotAFolder(path.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(NoteError::FolderMissing(path.to_string()))
            }
            Err(source) => Err(NoteError::io(path, source)),
        }
    }
}

impl FileStore for FsVault {
    fn create(&self, path: &str, content: &str) -> NoteResult<NoteHandle> {
        let full = self.absolute(path);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(NoteError::AlreadyExists(path.to_string()))
            }
            Err(source) => return Err(NoteError::io(path, source)),
        };
        write_or_discard(&full, &mut file, content).map_err(|source| NoteError::io(path, source))?;
        tracing::debug!(path, bytes = content.len(), "created note file");
        Ok(NoteHandle::new(path))
    }

    fn exists(&self, path: &str) -> bool {
        self.absolute(path).exists()
    }

    fn make_directory(&self, path: &str) -> NoteResult<()> {
        let full = self.absolute(path);
        match fs::create_dir(&full) {
            Ok(()) => {
                tracing::debug!(path, "created folder");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && full.is_dir() => Ok(()),
            Err(source) => Err(NoteError::io(path, source)),
        }
    }

    fn list_children(&self, path: &str) -> NoteResult<Vec<Entry>> {
        let full = self.folder_for_listing(path)?;
        let dir = fs::read_dir(&full).map_err(|source| NoteError::io(path, source))?;
        let mut entries = Vec::new();
        for entry in dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(?err, folder = path, "skipping unreadable entry");
                    continue;
                }
            };
            let Some(rel) = self.relative(&entry.path()) else {
                continue;
            };
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => entries.push(Entry::Folder(rel)),
                Ok(kind) if kind.is_file() => entries.push(Entry::File(NoteHandle::new(rel))),
                _ => {}
            }
        }
        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn get_by_path(&self, path: &str) -> Option<Entry> {
        let meta = fs::metadata(self.absolute(path)).ok()?;
        if meta.is_dir() {
            Some(Entry::Folder(path.to_string()))
        } else {
            Some(Entry::File(NoteHandle::new(path)))
        }
    }

    fn read(&self, path: &str) -> NoteResult<String> {
        fs::read_to_string(self.absolute(path)).map_err(|source| NoteError::io(path, source))
    }

    fn recurse_files(&self, path: &str) -> NoteResult<Vec<NoteHandle>> {
        let full = self.folder_for_listing(path)?;
        let mut files = Vec::new();
        for entry in WalkDir::new(&full)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = self.relative(entry.path()) {
                files.push(NoteHandle::new(rel));
            }
        }
        Ok(files)
    }
}

/// Writes a freshly created file, removing it again if the write fails so the
/// path stays free for the next attempt.
fn write_or_discard(full: &Path, file: &mut impl Write, content: &str) -> io::Result<()> {
    let result = file.write_all(content.as_bytes()).and_then(|()| file.flush());
    if let Err(err) = &result {
        tracing::warn!(?err, path = %full.display(), "write failed, removing partial file");
        if let Err(remove_err) = fs::remove_file(full) {
            tracing::warn!(?remove_err, path = %full.display(), "could not remove partial file");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn handle_name_parts() {
        let handle = NoteHandle::new("journal/34/2024-03-10.md");
        assert_eq!(handle.name(), "2024-03-10.md");
        assert_eq!(handle.basename(), "2024-03-10");
        assert_eq!(handle.extension(), Some("md"));
        assert_eq!(NoteHandle::new(".hidden").extension(), None);
    }

    #[test]
    fn create_refuses_to_overwrite() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let vault = FsVault::open(temp.path());
        vault.create("note.md", "first")?;
        assert_matches!(
            vault.create("note.md", "second"),
            Err(NoteError::AlreadyExists(path)) if path == "note.md"
        );
        assert_eq!(vault.read("note.md")?, "first");
        Ok(())
    }

    #[test]
    fn failed_write_leaves_no_partial_file() -> anyhow::Result<()> {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let temp = TempDir::new()?;
        let vault = FsVault::open(temp.path());
        let full = vault.absolute("note.md");
        fs::write(&full, "partial")?;

        assert!(write_or_discard(&full, &mut Broken, "content").is_err());
        assert!(!vault.exists("note.md"));
        vault.create("note.md", "content")?;
        assert_eq!(vault.read("note.md")?, "content");
        Ok(())
    }

    #[test]
    fn make_directory_tolerates_existing_folder() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let vault = FsVault::open(temp.path());
        vault.make_directory("journal")?;
        vault.make_directory("journal")?;
        assert_matches!(vault.get_by_path("journal"), Some(Entry::Folder(_)));
        Ok(())
    }

    #[test]
    fn listing_reports_missing_and_non_folders() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let vault = FsVault::open(temp.path());
        vault.create("file.md", "")?;
        assert_matches!(vault.list_children("nope"), Err(NoteError::FolderMissing(_)));
        assert_matches!(vault.list_children("file.md"), Err(NoteError::NotAFolder(_)));
        Ok(())
    }

    #[test]
    fn walk_matches_trait_recursion() -> anyhow::Result<()> {
        struct Listed<'a>(&'a FsVault);
        impl FileStore for Listed<'_> {
            fn create(&self, path: &str, content: &str) -> NoteResult<NoteHandle> {
                self.0.create(path, content)
            }
            fn exists(&self, path: &str) -> bool {
                self.0.exists(path)
            }
            fn make_directory(&self, path: &str) -> NoteResult<()> {
                self.0.make_directory(path)
            }
            fn list_children(&self, path: &str) -> NoteResult<Vec<Entry>> {
                self.0.list_children(path)
            }
            fn get_by_path(&self, path: &str) -> Option<Entry> {
                self.0.get_by_path(path)
            }
            fn read(&self, path: &str) -> NoteResult<String> {
                self.0.read(path)
            }
        }

        let temp = TempDir::new()?;
        let vault = FsVault::open(temp.path());
        vault.make_directory("a")?;
        vault.make_directory("a/b")?;
        vault.create("a/one.md", "")?;
        vault.create("a/b/two.md", "")?;
        vault.create("top.md", "")?;

        let mut walked = vault.recurse_files("")?;
        let mut listed = Listed(&vault).recurse_files("")?;
        walked.sort();
        listed.sort();
        assert_eq!(walked, listed);
        assert_eq!(
            walked.iter().map(NoteHandle::path).collect::<Vec<_>>(),
            vec!["a/b/two.md", "a/one.md", "top.md"]
        );
        Ok(())
    }
}
