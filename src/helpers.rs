//! Path classification/normalization and timestamp helpers.

use chrono::{Local, TimeZone, Utc};

use crate::errors::{CoreError, Result};
use crate::models::Millis;

/// Deletion date format used by listings.
pub const DELETION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered in place of a timestamp that cannot be represented locally.
pub const UNKNOWN_DELETION_DATE: &str = "????-??-?? ??:??:??";

/// How a path string is anchored.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PathKind {
    /// Starts at the filesystem root (`/...`).
    Absolute,
    /// Starts at a drive root (`C:/...`).
    DriveAbsolute,
    Relative,
}

impl PathKind {
    pub fn is_absolute(self) -> bool {
        !matches!(self, Self::Relative)
    }
}

/// Classifies `path` as rooted, drive-rooted or relative.
///
/// Either separator style is accepted, so `C:\data` and `C:/data` both count
/// as drive-rooted. A bare `C:` is relative.
pub fn classify_path(path: &str) -> PathKind {
    let is_sep = |b: u8| b == b'/' || b == b'\\';
    match path.as_bytes() {
        [first, ..] if is_sep(*first) => PathKind::Absolute,
        [drive, b':', sep, ..] if drive.is_ascii_alphabetic() && is_sep(*sep) => PathKind::DriveAbsolute,
        _ => PathKind::Relative,
    }
}

/// Replaces every backslash with a forward slash.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolves `target` against the absolute directory `cwd`.
///
/// The result is absolute, uses `/` only, and has no empty or `.` segments
/// and no trailing slash. An empty target resolves to `cwd` itself. `..`
/// segments are rejected.
pub fn resolve_path(cwd: &str, target: &str) -> Result<String> {
    let target = normalize_separators(target);
    let joined = if classify_path(&target).is_absolute() {
        target
    } else {
        let cwd = normalize_separators(cwd);
        if !classify_path(&cwd).is_absolute() {
            return Err(CoreError::invalid_argument(format!(
                "working directory must be absolute: {cwd}"
            )));
        }
        if target.is_empty() {
            cwd
        } else {
            format!("{cwd}/{target}")
        }
    };
    clean_absolute(&joined)
}

/// True when `path` is `ancestor` or lies below it, comparing whole segments.
///
/// Both arguments are expected in the form produced by [`resolve_path`].
pub fn is_within(ancestor: &str, path: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || ancestor.ends_with('/'),
        None => false,
    }
}

fn clean_absolute(path: &str) -> Result<String> {
    let (root, rest) = match classify_path(path) {
        PathKind::Absolute => path.split_at(1),
        PathKind::DriveAbsolute => path.split_at(3),
        PathKind::Relative => {
            return Err(CoreError::invalid_argument(format!("path is not absolute: {path}")));
        }
    };

    let mut segments = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(CoreError::invalid_argument(format!(
                    "parent directory segments are not supported: {path}"
                )));
            }
            other => segments.push(other),
        }
    }
    Ok(format!("{root}{}", segments.join("/")))
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

/// Renders an epoch-millisecond timestamp in local time.
pub fn format_deletion_time(millis: Millis) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(date) => date.format(DELETION_DATE_FORMAT).to_string(),
        None => UNKNOWN_DELETION_DATE.to_string(),
    }
}
