use crate::errors::CoreError;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem abstraction boundary for the move engine.
///
/// Keeping this trait narrow makes it easy to write deterministic tests, e.g.
/// a backend whose `rename` always reports a device boundary.
pub trait FileSystem: Send + Sync {
    /// Returns true when path exists (symlink-aware: dangling links count).
    fn exists(&self, path: &Path) -> bool;

    /// Reads symlink metadata.
    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Creates a directory.
    fn create_dir(&self, path: &Path) -> crate::Result<()>;

    /// Copies a regular file, returning the number of bytes written.
    fn copy_file(&self, from: &Path, to: &Path) -> crate::Result<u64>;

    /// Resolves symlinks and returns the absolute path.
    fn canonicalize(&self, path: &Path) -> crate::Result<PathBuf>;

    /// Renames/moves a path.
    ///
    /// A failure is reported against `to` when `from` is still present.
    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Lists directory children as concrete paths.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;

    /// Removes a file or symlink.
    fn remove_file(&self, path: &Path) -> crate::Result<()>;

    /// Removes a directory and everything below it.
    fn remove_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Reads the target of a symlink.
    fn read_link(&self, path: &Path) -> crate::Result<PathBuf>;

    /// Creates a symlink at `link` pointing to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> crate::Result<()>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir(path).map_err(|err| CoreError::io(path, err))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> crate::Result<u64> {
        fs::copy(from, to).map_err(|err| CoreError::io(from, err))
    }

    fn canonicalize(&self, path: &Path) -> crate::Result<PathBuf> {
        fs::canonicalize(path).map_err(|err| CoreError::io(path, err))
    }

    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()> {
        fs::rename(from, to).map_err(|err| {
            let culprit = if self.exists(from) { to } else { from };
            CoreError::io(culprit, err)
        })
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(|err| CoreError::io(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| CoreError::io(path, err))
    }

    fn remove_file(&self, path: &Path) -> crate::Result<()> {
        fs::remove_file(path).map_err(|err| CoreError::io(path, err))
    }

    fn remove_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::remove_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn read_link(&self, path: &Path) -> crate::Result<PathBuf> {
        fs::read_link(path).map_err(|err| CoreError::io(path, err))
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> crate::Result<()> {
        std::os::unix::fs::symlink(target, link).map_err(|err| CoreError::io(link, err))
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, link: &Path) -> crate::Result<()> {
        Err(CoreError::UnsupportedPlatform(format!(
            "cannot recreate symlink {}",
            link.display()
        )))
    }
}
