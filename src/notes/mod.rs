use anyhow::Result;

use crate::vault::NoteHandle;

mod creator;
mod index;

pub use creator::{CreateOutcome, NoteCreator};
pub use index::NoteIndex;

/// Blocking yes/no question put to the user before a note is created.
pub trait Confirm {
    fn confirm(&self, title: &str, text: &str) -> Result<bool>;
}

/// Non-blocking, user-visible message.
pub trait Notifier {
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget {
    NewSplit,
    ReuseUnpinned,
}

impl OpenTarget {
    pub fn for_split(split: bool) -> Self {
        if split {
            Self::NewSplit
        } else {
            Self::ReuseUnpinned
        }
    }
}

/// Where created or found notes get opened. Opened notes become active.
pub trait Workspace {
    fn open(&self, note: &NoteHandle, target: OpenTarget) -> Result<()>;
}

/// Accepts every prompt; used when confirmation was waived up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _title: &str, _text: &str) -> Result<bool> {
        Ok(true)
    }
}
