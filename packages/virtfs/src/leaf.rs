//! Read-only file nodes.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::DriverContext;
use crate::error::{Error, Result};
use crate::node::Node;

/// A single pseudo-file whose content is read once, on first access.
///
/// Later reads return the memoized text even if the kernel value has moved
/// on. There is no invalidation. Bytes that are not valid UTF-8 (binary
/// attributes such as DMI tables) are replaced with U+FFFD.
#[derive(Debug)]
pub struct Leaf {
    path: PathBuf,
    context: Arc<DriverContext>,
    content: Option<String>,
}

impl Leaf {
    pub fn new(path: PathBuf, context: Arc<DriverContext>) -> Self {
        Self {
            path,
            context,
            content: None,
        }
    }

    /// [`LeafConstructor`](crate::LeafConstructor) for read-only files.
    pub fn construct(path: PathBuf, context: Arc<DriverContext>) -> Node {
        Node::Leaf(Self::new(path, context))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn contents(&mut self) -> Result<&str> {
        let content = match self.content.take() {
            Some(content) => content,
            None => {
                tracing::trace!("loading {}", self.path.display());
                let bytes = fs::read(&self.path).map_err(|source| Error::Read {
                    path: self.path.clone(),
                    source,
                })?;
                decode(&self.path, bytes)
            }
        };
        Ok(self.content.insert(content).as_str())
    }

    /// Borrow the content for the duration of `f`.
    pub fn with_contents<R>(&mut self, f: impl FnOnce(&str) -> R) -> Result<R> {
        Ok(f(self.contents()?))
    }

    pub(crate) fn replace(&mut self, value: String) {
        self.content = Some(value);
    }
}

fn decode(path: &Path, bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| {
        tracing::debug!("{} is not valid UTF-8, decoding lossily", path.display());
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} at {}>", self.context.label(), self.path.display())?;
        match self.content.as_deref() {
            Some(content) if !content.is_empty() => write!(f, "\n{}", content),
            _ => Ok(()),
        }
    }
}
