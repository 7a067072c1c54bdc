//! Note path resolution: folder + filename → normalized vault path, with the
//! optional age bucket folder derived from the birthday setting.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::error::NoteResult;
use crate::vault::{FileStore, NOTE_EXTENSION};

const MILLIS_PER_JULIAN_YEAR: f64 = 365.25 * 86_400.0 * 1000.0;
const MAX_BUCKET_AGE: u32 = 999;

static BUCKET_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)\d{1,3}/*$").expect("valid bucket regex"));

/// Normalized, vault-relative path of a note file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotePath(String);

impl NotePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn folder(&self) -> &str {
        self.0.rsplit_once('/').map(|(folder, _)| folder).unwrap_or("")
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routes notes into a subfolder named after the owner's age in years.
///
/// Age uses a fixed 365.25-day year, so the bucket can flip up to a day
/// early or late around a birthday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBucket {
    age: u32,
}

impl AgeBucket {
    /// `None` for an empty, malformed or future birthday, or one more than 999
    /// years back. Any of these disables bucketing.
    pub fn from_birthday(birthday: &str, now: PrimitiveDateTime) -> Option<Self> {
        let birthday = parse_birthday(birthday)?;
        let elapsed = (now - birthday.midnight()).whole_milliseconds();
        if elapsed < 0 {
            return None;
        }
        let age = (elapsed as f64 / MILLIS_PER_JULIAN_YEAR).floor() as u32;
        // a wider folder name would no longer be recognized as a bucket
        if age > MAX_BUCKET_AGE {
            tracing::warn!(age, "birthday gives an age too large for a bucket folder");
            return None;
        }
        Some(Self { age })
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Replaces any existing bucket segment on `folder` with this one.
    pub fn apply(&self, folder: &str) -> String {
        let parent = strip_bucket(folder);
        let age = self.age.to_string();
        join(&[parent.as_str(), age.as_str()])
    }
}

pub fn parse_birthday(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

/// Removes a trailing 1-3 digit folder segment (`journal/34` → `journal`).
pub fn strip_bucket(folder: &str) -> String {
    let normalized = normalize_path(folder);
    BUCKET_SEGMENT.replace(&normalized, "").into_owned()
}

/// Joins path pieces, dropping empty and `.` segments. A leading slash on
/// the first piece survives.
pub fn join(parts: &[&str]) -> String {
    let rooted = parts.first().is_some_and(|first| first.starts_with('/'));
    let segments: Vec<&str> = parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Vault-relative form of a path: forward slashes, no empty, `.` or `..`
/// segments, no leading or trailing slash, non-breaking spaces turned into
/// plain spaces.
pub fn normalize_path(path: &str) -> String {
    let cleaned = path
        .replace('\\', "/")
        .replace(['\u{00A0}', '\u{202F}'], " ");
    cleaned
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Computes the path for `filename` under `base_folder` and makes sure its
/// folders exist.
pub fn resolve_path<S: FileStore + ?Sized>(
    store: &S,
    base_folder: &str,
    filename: &str,
    bucket: Option<&AgeBucket>,
) -> NoteResult<NotePath> {
    let folder = match bucket {
        Some(bucket) => bucket.apply(base_folder),
        None => base_folder.to_string(),
    };
    let mut name = filename.to_string();
    if !name.ends_with(&format!(".{NOTE_EXTENSION}")) {
        name.push('.');
        name.push_str(NOTE_EXTENSION);
    }
    let path = NotePath(normalize_path(&join(&[folder.as_str(), name.as_str()])));
    ensure_folders(store, path.folder())?;
    tracing::debug!(path = %path, "resolved note path");
    Ok(path)
}

fn ensure_folders<S: FileStore + ?Sized>(store: &S, folder: &str) -> NoteResult<()> {
    let mut current = String::new();
    for segment in folder.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        if store.get_by_path(&current).is_none() {
            store.make_directory(&current)?;
        }
    }
    Ok(())
}
