//! In-memory superblock: layout offsets, limits and the two owned bitmaps.

use alloc::vec;

use log::{debug, info};

use crate::bitmap::Bitmap;
use crate::config::*;
use crate::driver::{round_up, Driver};
use crate::structs::SuperBlockDisk;
use crate::{BlockDevice, Error, Geometry, Result};

#[derive(Debug, Clone)]
pub struct SuperBlock {
    pub magic: u32,
    pub usage: u32,

    pub io_size: usize,
    pub disk_size: usize,
    pub blk_size: usize, // Always 2 x io_size

    pub max_ino: usize,
    pub max_data: usize,

    pub map_inode: Bitmap,
    pub map_inode_blks: usize,
    pub map_inode_offset: usize,

    pub map_data: Bitmap,
    pub map_data_blks: usize,
    pub map_data_offset: usize,

    pub inode_offset: usize,
    pub data_offset: usize,
}

/// Computes the layout of a fresh filesystem:
/// super | inode bitmap | data bitmap | inode table | data region.
pub fn compute_layout(
    blk_size: usize,
    disk_size: usize,
    geometry: &Geometry,
) -> Result<SuperBlockDisk> {
    let max_ino = geometry.max_inodes.min(MAP_INODE_BLKS * blk_size * 8);
    if max_ino == 0 || geometry.max_data_blocks < DATA_PER_FILE {
        return Err(Error::InvalidArgument);
    }

    let map_inode_offset = SUPER_OFFSET + SUPER_BLKS * blk_size;
    let map_data_offset = map_inode_offset + MAP_INODE_BLKS * blk_size;
    let inode_offset = map_data_offset + MAP_DATA_BLKS * blk_size;
    let inode_table_blks = round_up(max_ino * INODE_SIZE, blk_size) / blk_size;
    let data_offset = inode_offset + inode_table_blks * blk_size;

    // The root directory alone needs a full set of data blocks.
    if data_offset + DATA_PER_FILE * blk_size > disk_size {
        return Err(Error::NoSpace);
    }

    let field = |v: usize| u32::try_from(v).map_err(|_| Error::InvalidArgument);
    Ok(SuperBlockDisk {
        magic: MAGIC,
        usage: 0,
        map_inode_blks: field(MAP_INODE_BLKS)?,
        map_inode_offset: field(map_inode_offset)?,
        map_data_blks: field(MAP_DATA_BLKS)?,
        map_data_offset: field(map_data_offset)?,
        inode_offset: field(inode_offset)?,
        data_offset: field(data_offset)?,
    })
}

/// Checks that the regions are block-aligned, ordered and inside the device.
fn validate(d: &SuperBlockDisk, blk_size: usize, disk_size: usize) -> Result<()> {
    let offsets = [
        SUPER_OFFSET,
        d.map_inode_offset as usize,
        d.map_data_offset as usize,
        d.inode_offset as usize,
        d.data_offset as usize,
    ];
    let aligned = offsets.iter().all(|o| o % blk_size == 0);
    let ordered = offsets.windows(2).all(|w| w[0] < w[1]);
    let maps_fit = d.map_inode_offset as usize + d.map_inode_blks as usize * blk_size
        <= d.map_data_offset as usize
        && d.map_data_offset as usize + d.map_data_blks as usize * blk_size
            <= d.inode_offset as usize;
    if !aligned || !ordered || !maps_fit || d.data_offset as usize >= disk_size {
        return Err(Error::Corrupted);
    }
    Ok(())
}

pub fn read_superblock<D: BlockDevice>(driver: &Driver<D>) -> Result<SuperBlockDisk> {
    let buf = driver.read(SUPER_OFFSET, SUPERBLOCK_SIZE)?;
    SuperBlockDisk::decode(&buf)
}

pub fn write_superblock<D: BlockDevice>(driver: &Driver<D>, record: &SuperBlockDisk) -> Result<()> {
    driver.write(SUPER_OFFSET, &record.encode())
}

impl SuperBlock {
    /// Builds the in-memory superblock from an on-disk record, reading both bitmaps.
    pub fn load<D: BlockDevice>(
        driver: &Driver<D>,
        record: &SuperBlockDisk,
        geometry: &Geometry,
    ) -> Result<Self> {
        let blk_size = driver.block_size();
        let disk_size = driver.device_size();
        validate(record, blk_size, disk_size)?;

        let map_inode_blks = record.map_inode_blks as usize;
        let map_data_blks = record.map_data_blks as usize;
        let inode_offset = record.inode_offset as usize;
        let data_offset = record.data_offset as usize;

        let max_ino = geometry
            .max_inodes
            .min((data_offset - inode_offset) / INODE_SIZE);
        let max_data = geometry
            .max_data_blocks
            .min((disk_size - data_offset) / blk_size);

        let map_inode = Bitmap::new(
            driver.read(record.map_inode_offset as usize, map_inode_blks * blk_size)?,
            max_ino,
        );
        let map_data = Bitmap::new(
            driver.read(record.map_data_offset as usize, map_data_blks * blk_size)?,
            max_data,
        );

        let superblock = Self {
            magic: record.magic,
            usage: record.usage,
            io_size: driver.io_size(),
            disk_size,
            blk_size,
            max_ino: map_inode.max(),
            max_data: map_data.max(),
            map_inode,
            map_inode_blks,
            map_inode_offset: record.map_inode_offset as usize,
            map_data,
            map_data_blks,
            map_data_offset: record.map_data_offset as usize,
            inode_offset,
            data_offset,
        };
        debug!(
            "superblock loaded: blk {} inodes {} data blocks {} inode table {:#x} data {:#x}",
            blk_size, superblock.max_ino, superblock.max_data, inode_offset, data_offset
        );
        Ok(superblock)
    }

    /// Zeroes both bitmaps of a fresh layout and returns its record.
    /// The record itself is not written; the first `sync` stores it last,
    /// so the magic only reaches the device once the root is in place.
    pub fn format<D: BlockDevice>(driver: &Driver<D>, geometry: &Geometry) -> Result<SuperBlockDisk> {
        let blk_size = driver.block_size();
        let record = compute_layout(blk_size, driver.device_size(), geometry)?;
        driver.write(
            record.map_inode_offset as usize,
            &vec![0u8; record.map_inode_blks as usize * blk_size],
        )?;
        driver.write(
            record.map_data_offset as usize,
            &vec![0u8; record.map_data_blks as usize * blk_size],
        )?;
        info!(
            "initialized layout: inode table {:#x}, data region {:#x}",
            record.inode_offset, record.data_offset
        );
        Ok(record)
    }

    pub fn to_disk(&self) -> SuperBlockDisk {
        SuperBlockDisk {
            magic: MAGIC,
            usage: self.usage,
            map_inode_blks: self.map_inode_blks as u32,
            map_inode_offset: self.map_inode_offset as u32,
            map_data_blks: self.map_data_blks as u32,
            map_data_offset: self.map_data_offset as u32,
            inode_offset: self.inode_offset as u32,
            data_offset: self.data_offset as u32,
        }
    }

    /// Persists both bitmaps, then the super record.
    pub fn sync<D: BlockDevice>(&self, driver: &Driver<D>) -> Result<()> {
        driver.write(self.map_inode_offset, self.map_inode.as_bytes())?;
        driver.write(self.map_data_offset, self.map_data.as_bytes())?;
        write_superblock(driver, &self.to_disk())
    }

    /// Byte offset of an inode's slot in the inode table.
    pub fn ino_offset(&self, ino: u32) -> usize {
        self.inode_offset + ino as usize * INODE_SIZE
    }

    /// Byte offset of a block in the data region.
    pub fn data_block_offset(&self, block: u32) -> usize {
        self.data_offset + block as usize * self.blk_size
    }

    /// Directory entries that fit in one data block.
    pub fn dirents_per_block(&self) -> usize {
        self.blk_size / DIRENT_SIZE
    }

    /// Maximum number of children of one directory.
    pub fn max_dir_entries(&self) -> usize {
        self.dirents_per_block() * DATA_PER_FILE
    }

    /// Maximum byte size of a regular file.
    pub fn max_file_size(&self) -> usize {
        self.blk_size * DATA_PER_FILE
    }
}
