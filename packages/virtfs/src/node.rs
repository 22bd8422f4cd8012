//! The tree node variant.

use std::fmt;
use std::path::Path;

use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::leaf::Leaf;
use crate::writable::WritableLeaf;

/// Anything reachable by name from a driver root.
#[derive(Debug)]
pub enum Node {
    Directory(Directory),
    Leaf(Leaf),
    Writable(WritableLeaf),
}

impl Node {
    pub fn path(&self) -> &Path {
        match self {
            Node::Directory(dir) => dir.path(),
            Node::Leaf(leaf) => leaf.path(),
            Node::Writable(leaf) => leaf.path(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Node::Writable(_))
    }

    /// Named child of a directory node. See [`Directory::child`].
    pub fn child(&mut self, name: &str) -> Result<&mut Node> {
        match self {
            Node::Directory(dir) => dir.child(name),
            other => Err(Error::NotADirectory {
                path: other.path().to_path_buf(),
            }),
        }
    }

    /// Follow a `/`-separated sequence of names. An empty path is this node.
    pub fn walk(&mut self, path: &str) -> Result<&mut Node> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment)?;
        }
        Ok(node)
    }

    /// Live listing of a directory node.
    pub fn list_children(&self) -> Result<Vec<String>> {
        match self {
            Node::Directory(dir) => dir.list_children(),
            other => Err(Error::NotADirectory {
                path: other.path().to_path_buf(),
            }),
        }
    }

    /// Children of a directory node materialized so far.
    pub fn cached_children(&self) -> Result<Vec<&str>> {
        match self {
            Node::Directory(dir) => Ok(dir.cached_children()),
            other => Err(Error::NotADirectory {
                path: other.path().to_path_buf(),
            }),
        }
    }

    /// See [`Directory::set_child`].
    pub fn set_child(&mut self, name: &str, value: impl Into<String>) -> Result<&mut WritableLeaf> {
        self.as_directory_mut()?.set_child(name, value)
    }

    /// Content of a leaf node, read on first access.
    pub fn contents(&mut self) -> Result<&str> {
        match self {
            Node::Leaf(leaf) => leaf.contents(),
            Node::Writable(leaf) => leaf.contents(),
            Node::Directory(dir) => Err(Error::IsADirectory {
                path: dir.path().to_path_buf(),
            }),
        }
    }

    pub fn with_contents<R>(&mut self, f: impl FnOnce(&str) -> R) -> Result<R> {
        Ok(f(self.contents()?))
    }

    pub fn as_directory_mut(&mut self) -> Result<&mut Directory> {
        match self {
            Node::Directory(dir) => Ok(dir),
            other => Err(Error::NotADirectory {
                path: other.path().to_path_buf(),
            }),
        }
    }

    pub fn as_writable_mut(&mut self) -> Result<&mut WritableLeaf> {
        match self {
            Node::Writable(leaf) => Ok(leaf),
            other => Err(Error::NotWritable {
                path: other.path().to_path_buf(),
            }),
        }
    }

    /// Stage and save `value` on a writable leaf.
    pub fn set(&mut self, value: impl Into<String>) -> Result<&mut WritableLeaf> {
        self.as_writable_mut()?.set(value, true)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Directory(dir) => fmt::Display::fmt(dir, f),
            Node::Leaf(leaf) => fmt::Display::fmt(leaf, f),
            Node::Writable(leaf) => fmt::Display::fmt(leaf, f),
        }
    }
}
