//! Store, recover and list, keeping the catalog and the storage area in step.
//!
//! Both mutating operations write the catalog first, move bytes second and
//! commit last. If a move fails, the transaction is dropped and rolled back,
//! so no committed row ever points at a file that was not captured.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::config::RecycleConfig;
use crate::errors::{CoreError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::helpers::{is_within, now_millis, resolve_path};
use crate::models::{Entry, EntryId, Listing, StorageKey};
use crate::mover::MoveEngine;

struct PendingMove {
    from: PathBuf,
    to: PathBuf,
}

/// Recycle bin bound to one catalog, one storage area and one working
/// directory.
pub struct Recycler<F: FileSystem = RealFileSystem> {
    catalog: Catalog,
    mover: MoveEngine<F>,
    storage_dir: PathBuf,
    /// Recycle root as given and with symlinks resolved. Nothing that
    /// overlaps it may be stored.
    protected_roots: Vec<String>,
    cwd: String,
}

impl Recycler<RealFileSystem> {
    /// Opens the catalog and storage area described by `config`.
    pub fn open(config: &RecycleConfig, cwd: &Path) -> Result<Self> {
        Self::open_with(config, cwd, RealFileSystem)
    }
}

impl<F: FileSystem> Recycler<F> {
    /// Like [`Recycler::open`], moving files through `fs`.
    pub fn open_with(config: &RecycleConfig, cwd: &Path, fs: F) -> Result<Self> {
        let cwd = resolve_path(utf8_path(cwd, "working directory")?, "")?;

        let storage_dir = config.storage_dir();
        fs.create_dir_all(&storage_dir)?;
        let catalog = Catalog::open(&config.catalog_path())?;

        let mut protected_roots = vec![resolve_path(&cwd, utf8_path(config.root(), "recycle root")?)?];
        let real_root = fs.canonicalize(config.root())?;
        let real_root = resolve_path(&cwd, utf8_path(&real_root, "recycle root")?)?;
        if !protected_roots.contains(&real_root) {
            protected_roots.push(real_root);
        }

        Ok(Self {
            catalog,
            mover: MoveEngine::new(fs),
            storage_dir,
            protected_roots,
            cwd,
        })
    }

    /// Where the bytes of `key` live while recycled.
    pub fn storage_path(&self, key: &StorageKey) -> PathBuf {
        self.storage_dir.join(key.as_str())
    }

    /// Moves every target into storage and records it.
    ///
    /// Either all entries are committed or none are. Files moved before a
    /// failing target stay in storage without a catalog row; they are not
    /// moved back.
    #[instrument(level = "info", name = "recycler::store", skip_all, fields(targets = targets.len()))]
    pub fn store<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<Vec<Entry>> {
        if targets.is_empty() {
            return Err(CoreError::invalid_argument("`store` requires at least one path"));
        }
        let originals = targets
            .iter()
            .map(|target| resolve_path(&self.cwd, target.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for original_path in &originals {
            self.ensure_outside_root(original_path)?;
        }

        let mut tx = self.catalog.begin()?;
        let mut entries = Vec::with_capacity(originals.len());
        let mut pending = Vec::with_capacity(originals.len());
        for original_path in originals {
            let storage_key = StorageKey::generate();
            let deletion_time = now_millis();
            let id = tx.insert(&storage_key, &original_path, deletion_time)?;
            pending.push(PendingMove {
                from: PathBuf::from(&original_path),
                to: self.storage_dir.join(storage_key.as_str()),
            });
            entries.push(Entry {
                id,
                storage_key,
                original_path,
                deletion_time,
            });
        }

        for (moved, step) in pending.iter().enumerate() {
            if let Err(err) = self.mover.move_path(&step.from, &step.to) {
                if moved > 0 {
                    warn!(
                        stranded = moved,
                        storage = %self.storage_dir.display(),
                        "store aborted; files already moved stay in storage without entries"
                    );
                }
                return Err(err);
            }
        }
        tx.commit()?;

        for entry in &entries {
            info!(id = entry.id, path = %entry.original_path, "stored");
        }
        Ok(entries)
    }

    /// Restores entry `id` to its original path.
    ///
    /// Only entries at or below the working directory are eligible; a sibling
    /// that merely shares a name prefix (`proj2` for `proj`) is not.
    #[instrument(level = "info", name = "recycler::recover", skip(self))]
    pub fn recover(&mut self, id: EntryId) -> Result<Entry> {
        let entry = self
            .list("")?
            .entries
            .into_iter()
            .find(|entry| entry.id == id && is_within(&self.cwd, &entry.original_path))
            .ok_or_else(|| {
                CoreError::not_found(format!("entry with id {id} in directory {}", self.cwd))
            })?;

        let original = PathBuf::from(&entry.original_path);
        if self.mover.exists(&original) {
            return Err(CoreError::AlreadyExists(original));
        }

        let mut tx = self.catalog.begin()?;
        tx.delete(id)?;
        self.mover
            .move_path(&self.storage_dir.join(entry.storage_key.as_str()), &original)?;
        tx.commit()?;

        info!(id, path = %entry.original_path, "recovered");
        Ok(entry)
    }

    /// Entries recorded at or below `target`. An empty target means the
    /// working directory.
    pub fn list(&self, target: &str) -> Result<Listing> {
        let target = resolve_path(&self.cwd, target)?;
        let entries = self.catalog.find_by_prefix(&target)?;
        Ok(Listing { target, entries })
    }

    fn ensure_outside_root(&self, original_path: &str) -> Result<()> {
        let overlapping = self
            .protected_roots
            .iter()
            .find(|root| is_within(root, original_path) || is_within(original_path, root));
        match overlapping {
            Some(root) => Err(CoreError::invalid_argument(format!(
                "refusing to recycle {original_path}: it overlaps the recycle root {root}"
            ))),
            None => Ok(()),
        }
    }

    /// Closes the catalog.
    pub fn close(self) -> Result<()> {
        self.catalog.close()
    }
}

fn utf8_path<'p>(path: &'p Path, what: &str) -> Result<&'p str> {
    path.to_str()
        .ok_or_else(|| CoreError::invalid_argument(format!("{what} is not UTF-8: {}", path.display())))
}
