//! Directory nodes: lazy child materialization and the child cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::DriverContext;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::writable::WritableLeaf;

/// A directory in a virtual filesystem.
///
/// Children are materialized the first time they are asked for and cached
/// for the life of the directory. The cache is never invalidated, so a child
/// found once stays reachable even if it later disappears from disk.
/// [`list_children`](Self::list_children) on the other hand always reads the
/// live directory.
#[derive(Debug)]
pub struct Directory {
    path: PathBuf,
    context: Arc<DriverContext>,
    children: HashMap<String, Node>,
}

impl Directory {
    pub fn new(path: PathBuf, context: Arc<DriverContext>) -> Self {
        Self {
            path,
            context,
            children: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    /// The child called `name`, materializing and caching it on first use.
    ///
    /// A missing child is reported as [`Error::NotFound`] with the attempted
    /// path and is not cached, so a later call may succeed.
    pub fn child(&mut self, name: &str) -> Result<&mut Node> {
        validate_name(name)?;
        match self.children.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let node = materialize(self.path.join(name), &self.context)?;
                Ok(entry.insert(node))
            }
        }
    }

    /// Names currently on disk, sorted. Ignores the cache.
    pub fn list_children(&self) -> Result<Vec<String>> {
        let list_error = |source| Error::List {
            path: self.path.clone(),
            source,
        };

        let mut names = fs::read_dir(&self.path)
            .map_err(list_error)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()
            .map_err(list_error)?;
        names.sort();
        Ok(names)
    }

    /// Names materialized so far, sorted.
    pub fn cached_children(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.children.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Write `value` to the writable child `name` and save it.
    pub fn set_child(&mut self, name: &str, value: impl Into<String>) -> Result<&mut WritableLeaf> {
        self.child(name)?.as_writable_mut()?.set(value, true)
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} mounted at {}>",
            self.context.label(),
            self.path.display()
        )
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(Error::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Probe `path` and build the matching node.
fn materialize(path: PathBuf, context: &Arc<DriverContext>) -> Result<Node> {
    let metadata = match fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound { path });
        }
        Err(source) => return Err(Error::Stat { path, source }),
    };

    if metadata.is_dir() {
        tracing::trace!("materializing directory {}", path.display());
        Ok(Node::Directory(Directory::new(path, Arc::clone(context))))
    } else if metadata.is_file() {
        tracing::trace!("materializing {} leaf {}", context.name(), path.display());
        let construct = context.registry().lookup(context.name())?;
        Ok(construct(path, Arc::clone(context)))
    } else {
        Err(Error::UnsupportedFileType { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LeafRegistry;
    use crate::scratch::ScratchSpace;
    use tempfile::TempDir;

    fn directory(tmp: &TempDir, driver: &str, registry: LeafRegistry) -> Directory {
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("block/sda")).unwrap();
        fs::write(root.join("block/sda/dev"), "8:0\n").unwrap();
        fs::write(root.join("block/sda/capability"), "50\n").unwrap();

        let context = Arc::new(DriverContext::new(
            driver,
            "SysFS",
            registry,
            ScratchSpace::new(tmp.path().join("scratch")),
        ));
        Directory::new(root, context)
    }

    #[test]
    fn child_path_is_joined_path() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        let expected = dir.path().join("block");

        let block = dir.child("block").unwrap();
        assert!(block.is_dir());
        assert_eq!(block.path(), expected);
    }

    #[test]
    fn missing_child_is_not_found_with_attempted_path() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        let expected = dir.path().join("foo");

        match dir.child("foo") {
            Err(Error::NotFound { path }) => assert_eq!(path, expected),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(dir.cached_children().is_empty());
    }

    #[test]
    fn failed_lookup_is_retried() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());

        assert!(dir.child("power").is_err());
        fs::create_dir(dir.path().join("power")).unwrap();
        assert!(dir.child("power").unwrap().is_dir());
    }

    #[test]
    fn cached_child_outlives_removal_from_disk() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());

        dir.child("block").unwrap();
        fs::remove_dir_all(dir.path().join("block")).unwrap();

        assert!(dir.child("block").unwrap().is_dir());
        assert_eq!(dir.cached_children(), vec!["block"]);
    }

    #[test]
    fn listing_is_live() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());

        dir.child("block").unwrap();
        assert_eq!(dir.list_children().unwrap(), vec!["block"]);

        fs::create_dir(dir.path().join("bus")).unwrap();
        fs::remove_dir_all(dir.path().join("block")).unwrap();
        assert_eq!(dir.list_children().unwrap(), vec!["bus"]);
    }

    #[test]
    fn listing_is_sorted() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        let sda = dir.child("block").unwrap().walk("sda").unwrap();
        assert_eq!(sda.list_children().unwrap(), vec!["capability", "dev"]);
    }

    #[test]
    fn files_use_the_registered_leaf_type() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        assert!(dir.child("block").unwrap().walk("sda/dev").unwrap().is_writable());

        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "procfs", LeafRegistry::builtin());
        assert!(matches!(
            dir.child("block").unwrap().walk("sda/dev").unwrap(),
            Node::Leaf(_)
        ));
    }

    #[test]
    fn unregistered_driver_cannot_materialize_files() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::new());

        assert!(dir.child("block").unwrap().walk("sda").is_ok());
        assert!(matches!(
            dir.child("block").unwrap().walk("sda/dev"),
            Err(Error::UnregisteredLeaf { .. })
        ));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());

        for name in ["", ".", "..", "block/sda"] {
            assert!(
                matches!(dir.child(name), Err(Error::InvalidName { .. })),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn set_child_writes_through() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        let sda = dir.child("block").unwrap().walk("sda").unwrap().as_directory_mut().unwrap();

        let dev = sda.set_child("capability", "51\n").unwrap();
        assert_eq!(dev.contents().unwrap(), "51\n");
        assert_eq!(
            fs::read_to_string(sda.path().join("capability")).unwrap(),
            "51\n"
        );
    }

    #[test]
    fn set_child_requires_writable_leaf() {
        let tmp = TempDir::new().unwrap();
        let mut dir = directory(&tmp, "procfs", LeafRegistry::builtin());
        let sda = dir.child("block").unwrap().walk("sda").unwrap().as_directory_mut().unwrap();

        assert!(matches!(
            sda.set_child("dev", "9:0\n"),
            Err(Error::NotWritable { .. })
        ));
        assert!(matches!(
            sda.set_child("missing", "1"),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(
            fs::read_to_string(sda.path().join("dev")).unwrap(),
            "8:0\n"
        );
    }

    #[test]
    fn display_names_label_and_path() {
        let tmp = TempDir::new().unwrap();
        let dir = directory(&tmp, "sysfs", LeafRegistry::builtin());
        assert_eq!(
            dir.to_string(),
            format!("<SysFS mounted at {}>", dir.path().display())
        );
    }
}
