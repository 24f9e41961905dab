//! Loading inodes into the tree and flushing them back.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::config::*;
use crate::directory::dir_attach_loaded;
use crate::driver::Driver;
use crate::structs::{DirEntryDisk, FileType, InodeDisk};
use crate::superblock::SuperBlock;
use crate::tree::{Dentry, DentryId, Inode, Tree};
use crate::{BlockDevice, Error, Result};

/// Byte offset of the `slot`-th directory entry of a directory.
fn dirent_offset(superblock: &SuperBlock, inode: &Inode, slot: usize) -> usize {
    let per_block = superblock.dirents_per_block();
    superblock.data_block_offset(inode.blocks[slot / per_block]) + (slot % per_block) * DIRENT_SIZE
}

pub fn get_inode<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    ino: u32,
) -> Result<InodeDisk> {
    if ino as usize >= superblock.max_ino {
        return Err(Error::Corrupted);
    }
    let buf = driver.read(superblock.ino_offset(ino), INODE_SIZE)?;
    InodeDisk::decode(&buf)
}

pub fn write_inode<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    inode: &InodeDisk,
) -> Result<()> {
    if inode.ino as usize >= superblock.max_ino {
        return Err(Error::Corrupted);
    }
    driver.write(superblock.ino_offset(inode.ino), &inode.encode())
}

/// Reads the inode named by a dentry and attaches it.
/// A directory also gets its children materialized, without their inodes.
/// A regular file gets its data blocks read into memory.
/// Nothing in the tree changes unless every read succeeds.
pub fn read_inode<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    tree: &mut Tree,
    id: DentryId,
) -> Result<()> {
    let (ino, ftype) = {
        let dentry = tree.get(id)?;
        (dentry.ino, dentry.ftype)
    };
    let record = get_inode(driver, superblock, ino)?;
    if record.ftype != ftype {
        warn!("inode {} is {:?} on disk but its entry says {:?}", ino, record.ftype, ftype);
        return Err(Error::Corrupted);
    }
    if record.blocks.iter().any(|&b| b as usize >= superblock.max_data) {
        warn!("inode {} points outside the data region: {:?}", ino, record.blocks);
        return Err(Error::Corrupted);
    }

    let mut inode = Inode {
        ino: record.ino,
        size: record.size,
        link: record.link,
        dir_cnt: 0,
        blocks: record.blocks,
        children: None,
        data: Vec::new(),
    };

    let mut entries = Vec::new();
    match ftype {
        FileType::Directory => {
            let dir_cnt = record.dir_cnt as usize;
            if dir_cnt > superblock.max_dir_entries() {
                warn!("inode {} claims {} entries, capacity is {}", ino, dir_cnt, superblock.max_dir_entries());
                return Err(Error::Corrupted);
            }
            for slot in 0..dir_cnt {
                let buf = driver.read(dirent_offset(superblock, &inode, slot), DIRENT_SIZE)?;
                let entry = DirEntryDisk::decode(&buf)?;
                entries.push(Dentry::from_raw(entry.name, entry.ftype, entry.ino));
            }
            inode.dir_cnt = record.dir_cnt;
        }
        FileType::Regular => {
            let blk_size = superblock.blk_size;
            let mut data = vec![0u8; DATA_PER_FILE * blk_size];
            for (chunk, &block) in data.chunks_mut(blk_size).zip(inode.blocks.iter()) {
                driver.read_into(superblock.data_block_offset(block), chunk)?;
            }
            inode.data = data;
        }
        FileType::Symlink => {}
    }

    let loaded = entries.len();
    tree.get_mut(id)?.inode = Some(inode);
    if loaded > 0 {
        dir_attach_loaded(tree, id, entries)?;
    }
    debug!("loaded inode {} ({:?}), {} children", ino, ftype, loaded);
    Ok(())
}

/// Loads the inode of `id` if it has not been visited yet.
pub fn ensure_loaded<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    tree: &mut Tree,
    id: DentryId,
) -> Result<()> {
    if !tree.get(id)?.is_loaded() {
        read_inode(driver, superblock, tree, id)?;
    }
    Ok(())
}

/// Writes an inode and everything loaded below it, parent before children.
/// Children whose inodes were never loaded are unchanged on disk and skipped.
pub fn sync_inode<D: BlockDevice>(
    driver: &Driver<D>,
    superblock: &SuperBlock,
    tree: &Tree,
    id: DentryId,
) -> Result<()> {
    let dentry = tree.get(id)?;
    let inode = tree.inode(id)?;
    write_inode(
        driver,
        superblock,
        &InodeDisk {
            ino: inode.ino,
            size: inode.size,
            link: inode.link,
            ftype: dentry.ftype,
            dir_cnt: inode.dir_cnt,
            blocks: inode.blocks,
        },
    )?;
    trace!("synced inode {} ({})", inode.ino, dentry.name());

    match dentry.ftype {
        FileType::Directory => {
            for (slot, child) in tree.children(id).enumerate() {
                if slot >= superblock.max_dir_entries() {
                    return Err(Error::NoSpace);
                }
                let child_dentry = tree.get(child)?;
                driver.write(
                    dirent_offset(superblock, inode, slot),
                    &child_dentry.to_disk().encode(),
                )?;
                if child_dentry.is_loaded() {
                    sync_inode(driver, superblock, tree, child)?;
                }
            }
        }
        FileType::Regular => {
            for (chunk, &block) in inode.data.chunks(superblock.blk_size).zip(inode.blocks.iter()) {
                driver.write(superblock.data_block_offset(block), chunk)?;
            }
        }
        FileType::Symlink => {}
    }
    Ok(())
}
