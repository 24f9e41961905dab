use std::path::PathBuf;

pub const MAGIC: u32 = 0x52415453; // "STAR" in little-endian ASCII

pub const SUPER_OFFSET: usize = 0; // Byte offset of the superblock record
pub const ROOT_INO: u32 = 0; // Inode ID for the root directory
pub const ROOT_NAME: &str = "/";

pub const SUPER_BLKS: usize = 1; // Blocks reserved for the superblock
pub const MAP_INODE_BLKS: usize = 1; // Blocks reserved for the inode bitmap
pub const MAP_DATA_BLKS: usize = 1; // Blocks reserved for the data bitmap

pub const MAX_INODES: usize = 256; // Default inode limit for a fresh filesystem
pub const MAX_DATA_BLOCKS: usize = 2048; // Default data block limit for a fresh filesystem

pub const DATA_PER_FILE: usize = 4; // Direct block pointers per inode
pub const MAX_NAME_LEN: usize = 128; // Fixed name buffer of a directory entry

pub const SUPERBLOCK_SIZE: usize = 8 * 4; // 8 x u32
pub const INODE_SIZE: usize = (5 + DATA_PER_FILE) * 4; // 5 x u32 + block pointers
pub const DIRENT_SIZE: usize = MAX_NAME_LEN + 2 * 4; // name + ftype + ino

pub const IO_UNITS_PER_BLOCK: usize = 2; // Block size is two device I/O units

pub const DEFAULT_DISK_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_IO_SIZE: usize = 512;

/// Format-time limits of a filesystem.
/// Only consulted when a device is initialized; an existing filesystem derives
/// its limits from the on-disk layout, clamped by these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub max_inodes: usize,
    pub max_data_blocks: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            max_inodes: MAX_INODES,
            max_data_blocks: MAX_DATA_BLOCKS,
        }
    }
}

impl Geometry {
    pub fn new(max_inodes: usize, max_data_blocks: usize) -> Self {
        Self { max_inodes, max_data_blocks }
    }
}

/// Everything needed to mount a filesystem from a backing image.
#[derive(Debug, Clone)]
pub struct MountOptions {
    pub device: PathBuf,
    pub geometry: Geometry,
}

impl MountOptions {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            geometry: Geometry::default(),
        }
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }
}
