//! The in-memory tree: an arena of directory entries, each optionally owning its loaded inode.
//! Parent and sibling links are arena handles. A directory's children form a singly linked
//! chain starting at `Inode::children`, newest first.
//! Slots of removed entries are tombstoned and never reused, so a stale handle cannot
//! alias a newer entry.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::*;
use crate::structs::FileType;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DentryId(usize);

impl DentryId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A loaded inode. Owned by exactly one `Dentry`, which is also its back reference.
#[derive(Debug, Clone)]
pub struct Inode {
    pub ino: u32,
    pub size: u32,
    pub link: u32,
    pub dir_cnt: u32,
    pub blocks: [u32; DATA_PER_FILE],
    pub(crate) children: Option<DentryId>,
    pub(crate) data: Vec<u8>, // Regular files only: DATA_PER_FILE blocks of content
}

impl Inode {
    /// A freshly allocated inode. Regular files get zeroed content buffers.
    pub fn new(ino: u32, ftype: FileType, blocks: [u32; DATA_PER_FILE], blk_size: usize) -> Self {
        let data = match ftype {
            FileType::Regular => vec![0u8; DATA_PER_FILE * blk_size],
            _ => Vec::new(),
        };
        Self {
            ino,
            size: 0,
            link: 1,
            dir_cnt: 0,
            blocks,
            children: None,
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..(self.size as usize).min(self.data.len())]
    }
}

#[derive(Debug, Clone)]
pub struct Dentry {
    pub(crate) name: [u8; MAX_NAME_LEN],
    pub ino: u32,
    pub ftype: FileType,
    pub(crate) parent: Option<DentryId>,
    pub(crate) sibling: Option<DentryId>,
    pub(crate) inode: Option<Inode>,
}

impl Dentry {
    pub fn parent(&self) -> Option<DentryId> {
        self.parent
    }

    pub fn sibling(&self) -> Option<DentryId> {
        self.sibling
    }

    pub fn inode(&self) -> Option<&Inode> {
        self.inode.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.inode.is_some()
    }

    pub fn is_dir(&self) -> bool {
        self.ftype == FileType::Directory
    }
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Dentry>>,
    root: DentryId,
}

impl Tree {
    pub fn new(root: Dentry) -> Self {
        Self {
            nodes: vec![Some(root)],
            root: DentryId(0),
        }
    }

    pub fn root(&self) -> DentryId {
        self.root
    }

    pub fn get(&self, id: DentryId) -> Result<&Dentry> {
        self.nodes
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, id: DentryId) -> Result<&mut Dentry> {
        self.nodes
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(Error::InvalidHandle)
    }

    /// The loaded inode of an entry, or NotFound if it has not been read yet.
    pub fn inode(&self, id: DentryId) -> Result<&Inode> {
        self.get(id)?.inode.as_ref().ok_or(Error::NotFound)
    }

    pub fn inode_mut(&mut self, id: DentryId) -> Result<&mut Inode> {
        self.get_mut(id)?.inode.as_mut().ok_or(Error::NotFound)
    }

    pub(crate) fn insert(&mut self, dentry: Dentry) -> DentryId {
        self.nodes.push(Some(dentry));
        DentryId(self.nodes.len() - 1)
    }

    /// Tombstones an entry and, recursively, every visited entry below it.
    pub(crate) fn release(&mut self, id: DentryId) {
        let Some(dentry) = self.nodes.get_mut(id.0).and_then(|slot| slot.take()) else {
            return;
        };
        let mut child = dentry.inode.and_then(|inode| inode.children);
        while let Some(c) = child {
            child = self.get(c).ok().and_then(|d| d.sibling);
            self.release(c);
        }
    }

    /// Children of a loaded directory in chain order.
    pub fn children(&self, dir: DentryId) -> Children<'_> {
        let next = self
            .get(dir)
            .ok()
            .and_then(|d| d.inode.as_ref())
            .and_then(|inode| inode.children);
        Children { tree: self, next }
    }

    /// Number of live entries in the arena.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<DentryId>,
}

impl Iterator for Children<'_> {
    type Item = DentryId;

    fn next(&mut self) -> Option<DentryId> {
        let current = self.next?;
        self.next = self.tree.get(current).ok().and_then(|d| d.sibling);
        Some(current)
    }
}
