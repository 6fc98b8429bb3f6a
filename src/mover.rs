//! Physical relocation of files between their original location and storage.

use std::io;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::errors::{CoreError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// Moves files and directory trees, falling back to copy-then-delete when a
/// rename would cross a device boundary.
#[derive(Debug, Default, Clone)]
pub struct MoveEngine<F: FileSystem = RealFileSystem> {
    fs: F,
}

impl<F: FileSystem> MoveEngine<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Symlink-aware existence check; dangling links count.
    pub fn exists(&self, path: &Path) -> bool {
        self.fs.exists(path)
    }

    /// Relocates `from` to `to`. Never overwrites an existing `to`.
    ///
    /// On the copy path the source is removed only after every byte has been
    /// copied; a failed copy leaves the source untouched and removes whatever
    /// part of the destination was written.
    #[instrument(level = "debug", skip_all, fields(from = %from.display(), to = %to.display()))]
    pub fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        if self.fs.exists(to) {
            return Err(CoreError::AlreadyExists(to.to_path_buf()));
        }
        match self.fs.rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.io_kind() == Some(io::ErrorKind::CrossesDevices) => {
                debug!("rename crosses a device boundary, copying instead");
                self.copy_then_remove(from, to)
            }
            Err(err) => Err(err),
        }
    }

    fn copy_then_remove(&self, from: &Path, to: &Path) -> Result<()> {
        let expected = self.tree_size(from)?;
        let copied = match self.copy_tree(from, to) {
            Ok(copied) => copied,
            Err(err) => {
                self.discard_partial(to);
                return Err(err);
            }
        };
        if copied != expected {
            self.discard_partial(to);
            return Err(CoreError::io(
                to,
                io::Error::other(format!("copied {copied} of {expected} bytes")),
            ));
        }

        if self.fs.symlink_metadata(from)?.is_dir() {
            self.fs.remove_dir_all(from)
        } else {
            self.fs.remove_file(from)
        }
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<u64> {
        let file_type = self.fs.symlink_metadata(from)?.file_type();
        if file_type.is_symlink() {
            let target = self.fs.read_link(from)?;
            self.fs.symlink(&target, to)?;
            Ok(0)
        } else if file_type.is_dir() {
            self.fs.create_dir(to)?;
            let mut total = 0;
            for child in self.fs.list_dir(from)? {
                let name = child.file_name().ok_or_else(|| {
                    CoreError::invalid_argument(format!("unnamed directory child: {}", child.display()))
                })?;
                total += self.copy_tree(&child, &to.join(name))?;
            }
            Ok(total)
        } else {
            self.fs.copy_file(from, to)
        }
    }

    fn tree_size(&self, path: &Path) -> Result<u64> {
        let metadata = self.fs.symlink_metadata(path)?;
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            Ok(0)
        } else if file_type.is_dir() {
            let mut total = 0;
            for child in self.fs.list_dir(path)? {
                total += self.tree_size(&child)?;
            }
            Ok(total)
        } else {
            Ok(metadata.len())
        }
    }

    fn discard_partial(&self, to: &Path) {
        if !self.fs.exists(to) {
            return;
        }
        let removed = match self.fs.symlink_metadata(to) {
            Ok(metadata) if metadata.is_dir() => self.fs.remove_dir_all(to),
            _ => self.fs.remove_file(to),
        };
        if let Err(err) = removed {
            warn!(path = %to.display(), error = %err, "failed to clean up partial copy");
        }
    }
}
