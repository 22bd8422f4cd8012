//! Error types for virtfs.

use std::io;
use std::path::PathBuf;

/// Errors raised while navigating, reading or writing a virtual filesystem.
///
/// Every driver surfaces the same variants; nothing here depends on which
/// pseudo-filesystem is being walked.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A requested path segment does not exist.
    #[error("{}: No such file or directory", .path.display())]
    NotFound { path: PathBuf },

    /// The atomic save sequence failed. The target file is unchanged.
    #[error("failed to save {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to inspect {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No leaf constructor is registered for the driver name.
    #[error("no leaf type registered for driver {name:?}")]
    UnregisteredLeaf { name: String },

    #[error("{} is not writable", .path.display())]
    NotWritable { path: PathBuf },

    #[error("{} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("{} is a directory", .path.display())]
    IsADirectory { path: PathBuf },

    /// A child name was empty, `.`, `..` or contained a separator.
    #[error("invalid child name {name:?}")]
    InvalidName { name: String },

    #[error("{} is neither a regular file nor a directory", .path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
