//! Drivers: a root directory bound to a mount point.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::directory::Directory;
use crate::mounts;
use crate::node::Node;
use crate::registry::LeafRegistry;
use crate::scratch::ScratchSpace;

/// State shared by every node of one driver's tree.
#[derive(Debug)]
pub struct DriverContext {
    name: String,
    label: String,
    registry: LeafRegistry,
    scratch: ScratchSpace,
}

impl DriverContext {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        registry: LeafRegistry,
        scratch: ScratchSpace,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            registry,
            scratch,
        }
    }

    /// Name used for mount table and leaf registry lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown in node string forms.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn registry(&self) -> &LeafRegistry {
        &self.registry
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }
}

/// The kernel virtual filesystems with built-in support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    SysFs,
    ProcFs,
    ConfigFs,
}

impl DriverKind {
    pub const ALL: [DriverKind; 3] = [DriverKind::SysFs, DriverKind::ProcFs, DriverKind::ConfigFs];

    pub fn name(self) -> &'static str {
        match self {
            DriverKind::SysFs => "sysfs",
            DriverKind::ProcFs => "procfs",
            DriverKind::ConfigFs => "configfs",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DriverKind::SysFs => "SysFS",
            DriverKind::ProcFs => "ProcFS",
            DriverKind::ConfigFs => "ConfigFS",
        }
    }

    /// Where the filesystem conventionally lives.
    pub fn default_root(self) -> &'static Path {
        Path::new(match self {
            DriverKind::SysFs => "/sys",
            DriverKind::ProcFs => "/proc",
            DriverKind::ConfigFs => "/sys/kernel/config",
        })
    }

    /// Mount point according to the configured mount table.
    pub fn resolve(self, config: &Config) -> Option<PathBuf> {
        mounts::resolve(self.name(), &config.mounts_path, config.mount_match)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A root directory bound to a mount point.
///
/// Dereferences to the root [`Node`], so navigation starts with
/// `driver.child(..)` or `driver.walk(..)`, and `driver.walk("")` is the root.
#[derive(Debug)]
pub struct Driver {
    context: Arc<DriverContext>,
    root: Node,
}

impl Driver {
    /// A driver for any filesystem, given its leaf lookup name and root.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        root: impl Into<PathBuf>,
        registry: LeafRegistry,
        scratch: ScratchSpace,
    ) -> Self {
        let context = Arc::new(DriverContext::new(name, label, registry, scratch));
        let root = Node::Directory(Directory::new(root.into(), Arc::clone(&context)));
        Self { context, root }
    }

    /// A built-in driver rooted at `root`, with the built-in leaf registry.
    pub fn from_kind(kind: DriverKind, root: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(
            kind.name(),
            kind.label(),
            root,
            LeafRegistry::builtin(),
            ScratchSpace::new(&config.scratch_root),
        )
    }

    /// A built-in driver at its resolved mount point, if it is mounted.
    pub fn mount(kind: DriverKind, config: &Config) -> Option<Self> {
        let root = kind.resolve(config)?;
        tracing::debug!("{} mounted at {}", kind, root.display());
        Some(Self::from_kind(kind, root, config))
    }

    /// Like [`mount`](Self::mount), but sysfs and procfs fall back to their
    /// conventional roots. configfs is only bound when mounted.
    pub fn discover(kind: DriverKind, config: &Config) -> Option<Self> {
        match kind {
            DriverKind::ConfigFs => Self::mount(kind, config),
            DriverKind::SysFs | DriverKind::ProcFs => Some(Self::mount_or_default(kind, config)),
        }
    }

    fn mount_or_default(kind: DriverKind, config: &Config) -> Self {
        Self::mount(kind, config).unwrap_or_else(|| {
            tracing::debug!(
                "{} not in mount table, using {}",
                kind,
                kind.default_root().display()
            );
            Self::from_kind(kind, kind.default_root(), config)
        })
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    /// The root node, always a directory.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }
}

impl Deref for Driver {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.root
    }
}

impl DerefMut for Driver {
    fn deref_mut(&mut self) -> &mut Node {
        &mut self.root
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

/// The three kernel filesystems, discovered together.
#[derive(Debug)]
pub struct VirtFs {
    pub sysfs: Driver,
    pub procfs: Driver,
    /// Absent when configfs is not mounted.
    pub configfs: Option<Driver>,
}

impl VirtFs {
    /// See [`Driver::discover`] for the fallback rules.
    pub fn discover(config: &Config) -> Self {
        Self {
            sysfs: Driver::mount_or_default(DriverKind::SysFs, config),
            procfs: Driver::mount_or_default(DriverKind::ProcFs, config),
            configfs: Driver::mount(DriverKind::ConfigFs, config),
        }
    }

    pub fn get_mut(&mut self, kind: DriverKind) -> Option<&mut Driver> {
        match kind {
            DriverKind::SysFs => Some(&mut self.sysfs),
            DriverKind::ProcFs => Some(&mut self.procfs),
            DriverKind::ConfigFs => self.configfs.as_mut(),
        }
    }
}
