pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod notes;
pub mod paths;
pub mod template;
pub mod vault;

pub use config::{AppConfig, ConfigLoader, ConfigPaths, NoteSettings};
pub use error::{NoteError, NoteResult};
