use std::fmt;

use uuid::Uuid;

use crate::helpers::format_deletion_time;

/// Catalog-assigned entry identifier.
pub type EntryId = i64;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Command family exposed by the `recycle` binary.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Store,
    Recover,
    List,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Recover => "recover",
            Self::List => "list",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque name of a stored file inside the storage area.
///
/// Rendered as 32 lowercase hex characters (a v4 UUID without dashes).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Draws a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StorageKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recorded deletion.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub storage_key: StorageKey,
    /// Absolute, `/`-separated path the file had when it was stored.
    pub original_path: String,
    pub deletion_time: Millis,
}

/// Result of a `list` query: the resolved target and its entries in id order.
#[derive(Debug, Clone)]
pub struct Listing {
    pub target: String,
    pub entries: Vec<Entry>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "No entries for {}", self.target);
        }
        for entry in &self.entries {
            writeln!(
                f,
                "{}. {} ({})",
                entry.id,
                entry.original_path,
                format_deletion_time(entry.deletion_time)
            )?;
        }
        Ok(())
    }
}

/// Exit codes reported by the `recycle` binary.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitStatusLike {
    Ok,
    Error,
    InvalidInput,
    NotFound,
    Conflict,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::InvalidInput => 2,
            Self::NotFound => 3,
            Self::Conflict => 4,
        }
    }
}
