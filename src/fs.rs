//! The mounted filesystem session: mount and format, flushing, and the
//! path-level operations built on the tree cache.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use log::{debug, info, warn};

use crate::bitmap::{alloc_inode, free_inode};
use crate::config::*;
use crate::directory::{dir_add_entry, dir_lookup, dir_rm_entry};
use crate::disk::FileDisk;
use crate::driver::Driver;
use crate::file::{fread, fwrite};
use crate::inode::{ensure_loaded, read_inode, sync_inode};
use crate::path::{resolve, split, Lookup};
use crate::structs::{FileType, SuperBlockDisk};
use crate::superblock::{read_superblock, SuperBlock};
use crate::tree::{Dentry, DentryId, Inode, Tree};
use crate::{BlockDevice, Error, Geometry, MountOptions, Result};

/// Everything that exists only while mounted.
struct Mounted<D: BlockDevice> {
    driver: Driver<D>,
    superblock: SuperBlock,
    tree: Tree,
}

/// One mounted filesystem instance. All state lives here; nothing is process-global.
/// Not synchronized: callers sharing an instance across threads must wrap it in a lock.
pub struct FileSystem<D: BlockDevice> {
    state: Option<Mounted<D>>,
}

impl FileSystem<FileDisk> {
    /// Opens the image named by the options and mounts it.
    pub fn mount_path(options: &MountOptions) -> Result<Self> {
        let disk = FileDisk::open(&options.device)?;
        Self::mount(disk, options.geometry)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Mounts a device, initializing it first if it carries no valid superblock.
    pub fn mount(device: D, geometry: Geometry) -> Result<Self> {
        let driver = Driver::new(device)?;
        info!(
            "mounting: device {} bytes, io unit {}, block {}",
            driver.device_size(),
            driver.io_size(),
            driver.block_size()
        );

        let mut record = read_superblock(&driver)?;
        let is_init = record.magic != MAGIC;
        if is_init {
            warn!("magic {:#x} does not match, initializing device", record.magic);
            record = SuperBlock::format(&driver, &geometry)?;
        }

        let mut superblock = SuperBlock::load(&driver, &record, &geometry)?;
        if !is_init && !superblock.map_inode.is_set(ROOT_INO as usize) {
            warn!("superblock present but root inode {} is not allocated", ROOT_INO);
            return Err(Error::Corrupted);
        }
        let mut tree = Tree::new(Dentry::root());
        let root = tree.root();

        if is_init {
            let (ino, blocks) = alloc_inode(&mut superblock)?;
            if ino != ROOT_INO {
                return Err(Error::Corrupted);
            }
            tree.get_mut(root)?.inode = Some(Inode::new(
                ino,
                FileType::Directory,
                blocks,
                superblock.blk_size,
            ));
            sync_inode(&driver, &superblock, &tree, root)?;
            // Writes the magic last. The root is reloaded below like on an existing filesystem.
            superblock.sync(&driver)?;
            tree.get_mut(root)?.inode = None;
        }

        read_inode(&driver, &superblock, &mut tree, root)?;
        info!(
            "mounted: {} inodes, {} data blocks, usage {}",
            superblock.max_ino, superblock.max_data, superblock.usage
        );
        Ok(Self {
            state: Some(Mounted {
                driver,
                superblock,
                tree,
            }),
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&Mounted<D>> {
        self.state.as_ref().ok_or(Error::NotMounted)
    }

    fn state_mut(&mut self) -> Result<&mut Mounted<D>> {
        self.state.as_mut().ok_or(Error::NotMounted)
    }

    /// Flushes the whole tree, then the superblock and both bitmaps. Stays mounted.
    pub fn sync(&mut self) -> Result<()> {
        let Mounted { driver, superblock, tree } = self.state()?;
        sync_inode(driver, superblock, tree, tree.root())?;
        superblock.sync(driver)?;
        driver.flush()?;
        debug!("synced filesystem");
        Ok(())
    }

    /// Flushes everything and releases the device. A no-op when not mounted.
    /// On failure the instance stays mounted, though some writes may have reached the device.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.is_mounted() {
            return Ok(());
        }
        self.sync()?;
        drop(self.state.take());
        info!("unmounted");
        Ok(())
    }

    /// Unmounts and hands the device back.
    pub fn into_device(mut self) -> Result<D> {
        self.sync()?;
        let state = self.state.take().ok_or(Error::NotMounted)?;
        Ok(state.driver.into_inner())
    }

    pub fn root(&self) -> Result<DentryId> {
        Ok(self.state()?.tree.root())
    }

    pub fn superblock(&self) -> Result<&SuperBlock> {
        Ok(&self.state()?.superblock)
    }

    pub fn superblock_record(&self) -> Result<SuperBlockDisk> {
        Ok(self.state()?.superblock.to_disk())
    }

    pub fn usage(&self) -> Result<u32> {
        Ok(self.state()?.superblock.usage)
    }

    pub fn free_inodes(&self) -> Result<usize> {
        Ok(self.state()?.superblock.map_inode.count_free())
    }

    pub fn free_data_blocks(&self) -> Result<usize> {
        Ok(self.state()?.superblock.map_data.count_free())
    }

    pub fn dentry(&self, id: DentryId) -> Result<&Dentry> {
        self.state()?.tree.get(id)
    }

    /// The inode of an entry, loading it on first touch.
    pub fn inode(&mut self, id: DentryId) -> Result<&Inode> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        ensure_loaded(driver, superblock, tree, id)?;
        tree.inode(id)
    }

    /// Resolves an absolute path against the tree.
    pub fn lookup(&mut self, path: &str) -> Result<Lookup> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        resolve(driver, superblock, tree, path)
    }

    /// Children of a directory in chain order (newest first).
    pub fn readdir(&mut self, dir: DentryId) -> Result<Vec<DentryId>> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        ensure_loaded(driver, superblock, tree, dir)?;
        if !tree.get(dir)?.is_dir() {
            return Err(Error::NotDirectory);
        }
        Ok(tree.children(dir).collect())
    }

    /// Creates an entry named `name` in the directory `parent`, with a fresh inode
    /// and a full set of data blocks. Bitmaps are untouched if any check fails.
    pub fn create(&mut self, parent: DentryId, name: &str, ftype: FileType) -> Result<DentryId> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        if ftype == FileType::Symlink {
            return Err(Error::InvalidArgument);
        }
        let mut dentry = Dentry::new(name, ftype)?;

        ensure_loaded(driver, superblock, tree, parent)?;
        if !tree.get(parent)?.is_dir() {
            return Err(Error::NotDirectory);
        }
        if dir_lookup(tree, parent, name.as_bytes()).is_some() {
            return Err(Error::AlreadyExists);
        }
        if tree.inode(parent)?.dir_cnt as usize >= superblock.max_dir_entries() {
            return Err(Error::NoSpace);
        }

        let (ino, blocks) = alloc_inode(superblock)?;
        dentry.ino = ino;
        dentry.inode = Some(Inode::new(ino, ftype, blocks, superblock.blk_size));
        let id = dir_add_entry(tree, parent, dentry)?;
        debug!("created {} as inode {} ({:?})", name, ino, ftype);
        Ok(id)
    }

    /// Creates the last component of `path` inside its (existing) parent directory.
    pub fn mknod(&mut self, path: &str, ftype: FileType) -> Result<DentryId> {
        let (parent_path, name) = split(path)?;
        let parent = self.lookup(parent_path)?.found()?;
        self.create(parent, name, ftype)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<DentryId> {
        self.mknod(path, FileType::Directory)
    }

    /// Removes a regular file or an empty directory and releases its bitmap bits.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let id = self.lookup(path)?.found()?;
        let Mounted { superblock, tree, .. } = self.state_mut()?;
        if id == tree.root() {
            return Err(Error::InvalidArgument);
        }

        let dentry = tree.get(id)?;
        let parent = dentry.parent().ok_or(Error::Corrupted)?;
        let inode = tree.inode(id)?;
        if dentry.is_dir() && inode.dir_cnt > 0 {
            return Err(Error::NotEmpty);
        }
        let (ino, blocks) = (inode.ino, inode.blocks);
        let freed = if dentry.is_dir() { 0 } else { inode.size };

        free_inode(superblock, ino, &blocks)?;
        dir_rm_entry(tree, parent, id)?;
        superblock.usage = superblock.usage.saturating_sub(freed);
        debug!("removed {} (inode {})", path, ino);
        Ok(())
    }

    /// Reads file content at `offset`. Returns the number of bytes copied.
    pub fn read(&mut self, id: DentryId, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        ensure_loaded(driver, superblock, tree, id)?;
        if tree.get(id)?.is_dir() {
            return Err(Error::IsDirectory);
        }
        fread(tree.inode(id)?, offset, buf)
    }

    /// Writes file content at `offset`; the data reaches the device on the next flush.
    pub fn write(&mut self, id: DentryId, offset: usize, data: &[u8]) -> Result<usize> {
        let Mounted { driver, superblock, tree } = self.state_mut()?;
        ensure_loaded(driver, superblock, tree, id)?;
        if tree.get(id)?.is_dir() {
            return Err(Error::IsDirectory);
        }
        let inode = tree.inode_mut(id)?;
        let before = inode.size;
        let written = fwrite(inode, offset, data)?;
        superblock.usage += inode.size - before;
        Ok(written)
    }

    /// Renders the visited part of the tree, one entry per line.
    pub fn dump(&self) -> Result<String> {
        let Mounted { superblock, tree, .. } = self.state()?;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "usage {} | free inodes {}/{} | free data blocks {}/{}",
            superblock.usage,
            superblock.map_inode.count_free(),
            superblock.max_ino,
            superblock.map_data.count_free(),
            superblock.max_data,
        );
        let mut stack = alloc::vec![(tree.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let dentry = tree.get(id)?;
            let _ = match dentry.inode() {
                Some(inode) => writeln!(
                    out,
                    "{:indent$}{} [ino {} {:?} size {}]",
                    "",
                    dentry.name(),
                    dentry.ino,
                    dentry.ftype,
                    inode.size,
                    indent = depth * 2
                ),
                None => writeln!(out, "{:indent$}{} [ino {} unloaded]", "", dentry.name(), dentry.ino, indent = depth * 2),
            };
            let children: Vec<_> = tree.children(id).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(out)
    }
}
