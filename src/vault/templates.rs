use std::sync::Arc;

use super::{Entry, FileStore, FoldInfo, FoldStore, NOTE_EXTENSION};
use crate::error::{NoteError, NoteResult};
use crate::paths::normalize_path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateInfo {
    pub body: String,
    pub folds: Option<FoldInfo>,
}

pub trait TemplateSource {
    /// Loads a template by id. An empty id means "no template" and yields an
    /// empty body.
    fn load_template(&self, template: &str) -> NoteResult<TemplateInfo>;
}

/// Templates are ordinary notes in the vault, referenced by path with or
/// without the `.md` suffix.
pub struct VaultTemplateSource<S> {
    store: S,
    folds: Arc<dyn FoldStore>,
}

impl<S: FileStore> VaultTemplateSource<S> {
    pub fn new(store: S, folds: Arc<dyn FoldStore>) -> Self {
        Self { store, folds }
    }

    fn locate(&self, template: &str) -> Option<String> {
        let path = normalize_path(template);
        let suffixed = format!("{path}.{NOTE_EXTENSION}");
        [path, suffixed]
            .into_iter()
            .find(|candidate| matches!(self.store.get_by_path(candidate), Some(Entry::File(_))))
    }
}

impl<S: FileStore> TemplateSource for VaultTemplateSource<S> {
    fn load_template(&self, template: &str) -> NoteResult<TemplateInfo> {
        if template.trim().is_empty() {
            return Ok(TemplateInfo::default());
        }
        let path = self
            .locate(template)
            .ok_or_else(|| NoteError::TemplateMissing(template.to_string()))?;
        let body = self.store.read(&path)?;
        Ok(TemplateInfo {
            body,
            folds: self.folds.load(&path),
        })
    }
}
