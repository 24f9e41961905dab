//! Path resolution and manipulation utilities.

use alloc::vec::Vec;

use log::trace;

use crate::directory::dir_lookup;
use crate::driver::Driver;
use crate::inode::ensure_loaded;
use crate::structs::FileType;
use crate::superblock::SuperBlock;
use crate::tree::{DentryId, Tree};
use crate::{BlockDevice, Error, Result};

/// Outcome of a path walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Every component matched; the entry of the last one.
    Found(DentryId),
    /// A component was missing; the deepest directory reached.
    Missing(DentryId),
}

impl Lookup {
    pub fn dentry(&self) -> DentryId {
        match *self {
            Lookup::Found(id) | Lookup::Missing(id) => id,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// The entry of a fully resolved path, or NotFound.
    pub fn found(self) -> Result<DentryId> {
        match self {
            Lookup::Found(id) => Ok(id),
            Lookup::Missing(_) => Err(Error::NotFound),
        }
    }
}

/// Splits an absolute path into its non-empty components.
pub fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::InvalidArgument);
    }
    Ok(path.split('/').filter(|s| !s.is_empty()).collect())
}

/// Depth of a path: "/" is 0, "/a/b" is 2.
pub fn level(path: &str) -> Result<usize> {
    Ok(components(path)?.len())
}

/// Splits a path into its parent path and its last component.
/// e.g. "/a/b/c" -> ("/a/b", "c"), "/a" -> ("/", "a")
pub fn split(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    if !path.starts_with('/') || trimmed.is_empty() {
        return Err(Error::InvalidArgument);
    }
    let (parent, name) = trimmed.rsplit_once('/').ok_or(Error::InvalidArgument)?;
    let parent = if parent.is_empty() { "/" } else { parent };
    Ok((parent, name))
}

/// Walks `path` from the root, loading inodes on first touch.
/// A non-terminal component naming anything but a directory fails with NotDirectory.
pub fn resolve<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    tree: &mut Tree,
    path: &str,
) -> Result<Lookup> {
    let names = components(path)?;
    let total = names.len();
    let mut cursor = tree.root();
    ensure_loaded(driver, superblock, tree, cursor)?;

    for (i, name) in names.iter().enumerate() {
        ensure_loaded(driver, superblock, tree, cursor)?;
        if tree.get(cursor)?.ftype != FileType::Directory {
            return Err(Error::NotDirectory);
        }

        let Some(child) = dir_lookup(tree, cursor, name.as_bytes()) else {
            trace!("resolve {}: {} not found at level {}", path, name, i + 1);
            return Ok(Lookup::Missing(cursor));
        };
        cursor = child;
        trace!("resolve {}: matched {} at level {}", path, name, i + 1);
        if i + 1 == total {
            ensure_loaded(driver, superblock, tree, cursor)?;
        }
    }

    Ok(Lookup::Found(cursor))
}
