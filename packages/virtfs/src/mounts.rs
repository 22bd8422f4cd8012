//! Mount point resolution.
//!
//! The mount table is a line-oriented text file (conventionally
//! `/proc/mounts`): field 0 is the device or fs-type token, field 1 the mount
//! point, field 2 the filesystem type. It is parsed on every call and never
//! kept around.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MountMatch;

/// Conventional identifiers differ from mount table names for procfs.
fn table_identifier(identifier: &str) -> &str {
    match identifier {
        "procfs" => "proc",
        other => other,
    }
}

/// Find where `identifier` is mounted according to the table at `mounts`.
///
/// An unreadable or missing table means "no mount information available",
/// so this returns `None` rather than an error.
pub fn resolve(identifier: &str, mounts: &Path, mode: MountMatch) -> Option<PathBuf> {
    match fs::read_to_string(mounts) {
        Ok(text) => resolve_in(identifier, &text, mode),
        Err(err) => {
            tracing::debug!(
                "mount table {} unreadable, {} is unknown: {}",
                mounts.display(),
                identifier,
                err
            );
            None
        }
    }
}

/// Resolve against mount table text already in memory.
///
/// Only the first matching line counts, even if it lacks a mount point field.
pub fn resolve_in(identifier: &str, table: &str, mode: MountMatch) -> Option<PathBuf> {
    let needle = table_identifier(identifier);

    let line = table.lines().find(|line| match mode {
        MountMatch::Substring => line.contains(needle),
        MountMatch::FsType => line.split_whitespace().nth(2) == Some(needle),
    })?;

    match line.split_whitespace().nth(1) {
        Some(mount_point) => {
            tracing::trace!("{} mounted at {}", identifier, mount_point);
            Some(PathBuf::from(mount_point))
        }
        None => {
            tracing::warn!("mount table line {:?} has no mount point", line);
            None
        }
    }
}
