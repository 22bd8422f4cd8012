//! # virtfs
//!
//! Lazy, cached access to the Linux virtual filesystems: procfs, sysfs and
//! configfs.
//!
//! A [`Driver`] is a root directory [`Node`] bound to the mount point found in
//! the mount table. Children are materialized by name the first time they are
//! asked for and cached from then on. Files become [`Leaf`] nodes whose text
//! is read once, or [`WritableLeaf`] nodes (sysfs) that can be written back
//! atomically.
//!
//! ## Staleness
//!
//! Nothing here watches the filesystem. Cached children and loaded leaf
//! content keep whatever was on disk when they were first touched.
//! [`Directory::list_children`] is the exception: it always lists the live
//! directory.
//!
//! ## Example
//!
//! ```rust,no_run
//! use virtfs::{Config, Driver, DriverKind};
//!
//! let config = Config::from_env();
//! let mut sysfs = Driver::mount(DriverKind::SysFs, &config).expect("sysfs mounted");
//!
//! let dev = sysfs.walk("block/sda/dev")?.contents()?.to_string();
//! println!("sda is {}", dev.trim());
//!
//! let queue = sysfs.walk("block/sda/queue")?.as_directory_mut()?;
//! queue.set_child("scheduler", "none")?;
//! # Ok::<(), virtfs::Error>(())
//! ```

pub mod config;
pub mod mounts;

mod directory;
mod driver;
mod error;
mod leaf;
mod node;
mod registry;
mod scratch;
mod writable;

pub use config::{Config, MountMatch};
pub use directory::Directory;
pub use driver::{Driver, DriverContext, DriverKind, VirtFs};
pub use error::{Error, Result};
pub use leaf::Leaf;
pub use node::Node;
pub use registry::{LeafConstructor, LeafRegistry};
pub use scratch::ScratchSpace;
pub use writable::WritableLeaf;
