use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use log::debug;

use crate::config::*;
use crate::structs::{DirEntryDisk, FileType};
use crate::tree::{Dentry, DentryId, Tree};
use crate::{Error, Result};

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

/// Compares two names over their full lengths, ignoring trailing NUL padding.
/// A stored name is never equal to a shorter or longer query that it prefixes.
fn name_cmp(n1: &[u8], n2: &[u8]) -> bool {
    trim_zero(n1) == trim_zero(n2)
}

/// Packs a name into the fixed-size buffer.
pub fn encode_name(name: &str) -> Result<[u8; MAX_NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.contains(&b'/') || bytes.contains(&0) {
        return Err(Error::InvalidArgument);
    }
    if bytes.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong);
    }
    let mut buf = [0u8; MAX_NAME_LEN];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

impl Dentry {
    pub fn new(name: &str, ftype: FileType) -> Result<Self> {
        Ok(Self::from_raw(encode_name(name)?, ftype, 0))
    }

    pub(crate) fn root() -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        name[..ROOT_NAME.len()].copy_from_slice(ROOT_NAME.as_bytes());
        Self::from_raw(name, FileType::Directory, ROOT_INO)
    }

    pub(crate) fn from_raw(name: [u8; MAX_NAME_LEN], ftype: FileType, ino: u32) -> Self {
        Self {
            name,
            ino,
            ftype,
            parent: None,
            sibling: None,
            inode: None,
        }
    }

    pub fn name_bytes(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn name_eq(&self, name: &[u8]) -> bool {
        name_cmp(&self.name, name)
    }

    pub fn to_disk(&self) -> DirEntryDisk {
        DirEntryDisk {
            name: self.name,
            ftype: self.ftype,
            ino: self.ino,
        }
    }
}

/// Finds a child by name in a loaded directory. First match in chain order wins.
pub fn dir_lookup(tree: &Tree, dir: DentryId, name: &[u8]) -> Option<DentryId> {
    tree.children(dir)
        .find(|&child| tree.get(child).is_ok_and(|d| d.name_eq(name)))
}

/// Prepends a new child to a loaded directory and accounts for it in the directory inode.
/// Returns the handle of the inserted entry.
pub fn dir_add_entry(tree: &mut Tree, dir: DentryId, mut child: Dentry) -> Result<DentryId> {
    let head = {
        let parent = tree.get(dir)?;
        if !parent.is_dir() {
            return Err(Error::NotDirectory);
        }
        tree.inode(dir)?.children
    };
    child.parent = Some(dir);
    child.sibling = head;
    let id = tree.insert(child);

    let inode = tree.inode_mut(dir)?;
    inode.children = Some(id);
    inode.dir_cnt += 1;
    inode.size = inode.dir_cnt * DIRENT_SIZE as u32;
    debug!("linked entry {} under {}, {} children", id.index(), dir.index(), inode.dir_cnt);
    Ok(id)
}

/// Installs children read from disk, keeping their on-disk order.
/// The directory's counters are expected to already describe them.
pub(crate) fn dir_attach_loaded(tree: &mut Tree, dir: DentryId, entries: Vec<Dentry>) -> Result<()> {
    let mut next = None;
    for mut child in entries.into_iter().rev() {
        child.parent = Some(dir);
        child.sibling = next;
        next = Some(tree.insert(child));
    }
    tree.inode_mut(dir)?.children = next;
    Ok(())
}

/// Unlinks a child from its directory's chain and releases its arena slot.
/// Does not touch any bitmap, which is the caller's responsibility.
pub fn dir_rm_entry(tree: &mut Tree, dir: DentryId, child: DentryId) -> Result<()> {
    let after = tree.get(child)?.sibling;
    let head = tree.inode(dir)?.children;

    if head == Some(child) {
        tree.inode_mut(dir)?.children = after;
    } else {
        let prev = tree
            .children(dir)
            .find(|&c| tree.get(c).is_ok_and(|d| d.sibling == Some(child)))
            .ok_or(Error::NotFound)?;
        tree.get_mut(prev)?.sibling = after;
    }

    let inode = tree.inode_mut(dir)?;
    inode.dir_cnt -= 1;
    inode.size = inode.dir_cnt * DIRENT_SIZE as u32;
    tree.release(child);
    Ok(())
}
