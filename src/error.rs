use std::io;

use thiserror::Error;

pub type NoteResult<T> = Result<T, NoteError>;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("daily notes folder '{0}' does not exist")]
    FolderMissing(String),
    #[error("'{0}' is not a folder")]
    NotAFolder(String),
    #[error("file '{0}' already exists")]
    AlreadyExists(String),
    #[error("i/o error on '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("template '{0}' could not be found")]
    TemplateMissing(String),
}

impl NoteError {
    pub fn io(path: &str, source: io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Configuration problems a later reindex can recover from once the user
    /// fixes the folder setting.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::FolderMissing(_) | Self::NotAFolder(_))
    }
}
