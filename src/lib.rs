//! Catalog-backed recycle bin.
//!
//! Deleting a file moves it into a managed storage area and records where it
//! came from in a SQLite catalog, so it can later be moved back. The catalog
//! row and the physical move are ordered so that a file is never moved
//! without a committed record surviving it.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod fs;
pub mod helpers;
pub mod models;
pub mod mover;
pub mod recycler;

pub use catalog::{Catalog, CatalogTransaction};
pub use config::{RecycleConfig, ROOT_ENV};
pub use errors::{CoreError, Result};
pub use fs::{FileSystem, RealFileSystem};
pub use helpers::{
    classify_path,
    format_deletion_time,
    normalize_separators,
    resolve_path,
    PathKind,
};
pub use models::{
    CommandKind,
    Entry,
    EntryId,
    ExitStatusLike,
    Listing,
    Millis,
    StorageKey,
};
pub use mover::MoveEngine;
pub use recycler::Recycler;

/// Re-export a small stable API surface for the command crate.
pub mod prelude {
    pub use crate::{
        catalog::*,
        config::*,
        errors::{CoreError, Result},
        fs::{FileSystem, RealFileSystem},
        helpers::*,
        models::*,
        mover::MoveEngine,
        recycler::Recycler,
    };
}
