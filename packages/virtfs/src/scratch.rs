//! Private staging area for atomic saves.
//!
//! A writable leaf never writes its target in place. It writes a temp file
//! under a directory that mirrors the target's parent below the scratch root,
//! then renames it over the target. Staging directories are removed after
//! each save; the root is created once and kept.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::DirBuilderExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The staging directory for `target`, without touching the filesystem.
    pub fn dir_for(&self, target: &Path) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some(parent) = target.parent() {
            for component in parent.components() {
                if let Component::Normal(segment) = component {
                    dir.push(segment);
                }
            }
        }
        dir
    }

    /// Create the staging directory for `target`, owner-only, and return it.
    ///
    /// The root must be a directory owned by the current user with no group
    /// or other permission bits. A root that fails the check is refused with
    /// [`io::ErrorKind::PermissionDenied`] and left alone.
    pub fn prepare(&self, target: &Path) -> io::Result<PathBuf> {
        create_private(&self.root)?;
        ensure_private(&self.root)?;
        let dir = self.dir_for(target);
        create_private(&dir)?;
        Ok(dir)
    }

    /// Remove empty staging directories from `dir` up to, but not including,
    /// the root.
    ///
    /// Stops quietly at the first directory that cannot be removed.
    pub fn cleanup(&self, dir: &Path) {
        if !dir.starts_with(&self.root) {
            return;
        }
        for ancestor in dir.ancestors() {
            if ancestor == self.root {
                break;
            }
            if let Err(err) = fs::remove_dir(ancestor) {
                tracing::trace!("keeping scratch dir {}: {}", ancestor.display(), err);
                break;
            }
        }
    }
}

fn create_private(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(dir)
}

#[cfg(unix)]
fn ensure_private(root: &Path) -> io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    let metadata = fs::symlink_metadata(root)?;
    if !metadata.is_dir() {
        return Err(refuse(root, "is not a directory"));
    }
    let uid = rustix::process::geteuid().as_raw();
    if metadata.uid() != uid {
        return Err(refuse(root, &format!("is owned by uid {}", metadata.uid())));
    }
    if metadata.mode() & 0o077 != 0 {
        return Err(refuse(
            root,
            &format!("is open to other users (mode {:o})", metadata.mode() & 0o777),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(_root: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn refuse(root: &Path, reason: &str) -> io::Error {
    tracing::warn!("refusing scratch root {}: {}", root.display(), reason);
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("scratch root {} {}", root.display(), reason),
    )
}
