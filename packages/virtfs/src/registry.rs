//! Leaf type registry.
//!
//! Files are materialized through the constructor registered under the
//! owning driver's name. This is how sysfs files become writable while procfs
//! and configfs files stay read-only.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::driver::DriverContext;
use crate::error::{Error, Result};
use crate::leaf::Leaf;
use crate::node::Node;
use crate::writable::WritableLeaf;

/// Builds the node for a regular file under a driver.
pub type LeafConstructor = fn(PathBuf, Arc<DriverContext>) -> Node;

lazy_static! {
    static ref BUILTIN: LeafRegistry = {
        let mut registry = LeafRegistry::new();
        registry.register("sysfs", WritableLeaf::construct);
        registry.register("procfs", Leaf::construct);
        registry.register("configfs", Leaf::construct);
        registry
    };
}

#[derive(Debug, Clone, Default)]
pub struct LeafRegistry {
    constructors: HashMap<String, LeafConstructor>,
}

impl LeafRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registrations for the three kernel filesystems.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Register `constructor` for `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, constructor: LeafConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn lookup(&self, name: &str) -> Result<LeafConstructor> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnregisteredLeaf {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}
