//! Writable file nodes and the atomic save protocol.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::DriverContext;
use crate::error::{Error, Result};
use crate::leaf::Leaf;
use crate::node::Node;
use crate::scratch::ScratchSpace;
use tempfile::NamedTempFile;

/// A leaf whose value can be staged and written back.
///
/// Saving writes a temp file in the driver's scratch space and renames it
/// over the target, so the target holds either the old bytes or the new
/// ones and never anything in between.
#[derive(Debug)]
pub struct WritableLeaf {
    leaf: Leaf,
    pending: Option<String>,
}

impl WritableLeaf {
    pub fn new(path: PathBuf, context: Arc<DriverContext>) -> Self {
        Self {
            leaf: Leaf::new(path, context),
            pending: None,
        }
    }

    /// [`LeafConstructor`](crate::LeafConstructor) for writable files.
    pub fn construct(path: PathBuf, context: Arc<DriverContext>) -> Node {
        Node::Writable(Self::new(path, context))
    }

    pub fn path(&self) -> &Path {
        self.leaf.path()
    }

    pub fn is_loaded(&self) -> bool {
        self.leaf.is_loaded()
    }

    /// True while a staged value has not been saved.
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// The staged value if any, otherwise the memoized file content.
    pub fn contents(&mut self) -> Result<&str> {
        self.leaf.contents()
    }

    pub fn with_contents<R>(&mut self, f: impl FnOnce(&str) -> R) -> Result<R> {
        self.leaf.with_contents(f)
    }

    /// Stage `value`, and save it right away when `auto_save` is set.
    ///
    /// Reads reflect `value` immediately, saved or not.
    pub fn set(&mut self, value: impl Into<String>, auto_save: bool) -> Result<&mut Self> {
        let value = value.into();
        self.leaf.replace(value.clone());
        self.pending = Some(value);
        if auto_save {
            self.save()?;
        }
        Ok(self)
    }

    /// Write the staged value to disk atomically.
    ///
    /// With nothing staged the current content is written back. The target
    /// must still exist: a leaf whose file has since been removed gets
    /// [`Error::NotFound`] rather than recreating it. On failure the target is
    /// untouched and the value stays staged.
    pub fn save(&mut self) -> Result<&mut Self> {
        let value = match &self.pending {
            Some(value) => value.clone(),
            None => self.leaf.contents()?.to_owned(),
        };

        let target = self.leaf.path().to_path_buf();
        match fs::symlink_metadata(&target) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound { path: target });
            }
            _ => {}
        }

        tracing::debug!("saving {} ({} bytes)", target.display(), value.len());
        self.write_atomically(&target, &value)
            .map_err(|source| Error::Write {
                path: target.clone(),
                source,
            })?;

        self.pending = None;
        Ok(self)
    }

    fn write_atomically(&self, target: &Path, value: &str) -> io::Result<()> {
        let scratch = self.leaf.context().scratch();
        let (dir, staged) = stage(scratch, target)?;
        let result = write_and_rename(staged, target, value);
        scratch.cleanup(&dir);
        result
    }
}

/// Extra attempts when a concurrent cleanup removes the staging directory
/// between creating it and opening the temp file.
const STAGE_RETRIES: usize = 2;

/// Open a temp file in the staging directory for `target`.
fn stage(scratch: &ScratchSpace, target: &Path) -> io::Result<(PathBuf, NamedTempFile)> {
    let mut retries = 0;
    loop {
        let dir = scratch.prepare(target)?;
        match tempfile::Builder::new().prefix(".virtfs-").tempfile_in(&dir) {
            Ok(staged) => return Ok((dir, staged)),
            Err(err) if err.kind() == io::ErrorKind::NotFound && retries < STAGE_RETRIES => {
                tracing::debug!("staging dir {} vanished, retrying", dir.display());
                retries += 1;
            }
            Err(err) => {
                scratch.cleanup(&dir);
                return Err(err);
            }
        }
    }
}

/// Fill `staged` with `value`, then rename it onto `target`.
///
/// On any failure the temp file is dropped, which deletes it.
fn write_and_rename(mut staged: NamedTempFile, target: &Path, value: &str) -> io::Result<()> {
    staged.write_all(value.as_bytes())?;
    staged.as_file().sync_all()?;

    // Keep the target's mode rather than the temp file's 0600.
    if let Ok(metadata) = fs::metadata(target) {
        staged.as_file().set_permissions(metadata.permissions())?;
    }

    staged.persist(target).map_err(|err| err.error)?;
    Ok(())
}

impl fmt::Display for WritableLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.leaf, f)
    }
}
