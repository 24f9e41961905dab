//! Byte-exact on-disk records. Every integer is a little-endian u32 in declaration order.

use static_assertions::{const_assert, const_assert_eq};

use crate::config::*;
use crate::{Error, Result};

const_assert_eq!(SUPERBLOCK_SIZE, 32);
const_assert_eq!(INODE_SIZE, 36);
const_assert_eq!(DIRENT_SIZE, 136);
const_assert!(SUPERBLOCK_SIZE <= DEFAULT_IO_SIZE * IO_UNITS_PER_BLOCK);
const_assert!(DIRENT_SIZE <= DEFAULT_IO_SIZE * IO_UNITS_PER_BLOCK);

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular = 0,
    Directory = 1,
    Symlink = 2, // Reserved, never created
}

impl TryFrom<u32> for FileType {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(FileType::Regular),
            1 => Ok(FileType::Directory),
            2 => Ok(FileType::Symlink),
            _ => Err(Error::Corrupted),
        }
    }
}

fn get_u32(buf: &[u8], field: usize) -> u32 {
    let at = field * 4;
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn put_u32(buf: &mut [u8], field: usize, value: u32) {
    let at = field * 4;
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn check_len(buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        return Err(Error::Corrupted);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuperBlockDisk {
    pub magic: u32,
    pub usage: u32,
    pub map_inode_blks: u32,
    pub map_inode_offset: u32,
    pub map_data_blks: u32,
    pub map_data_offset: u32,
    pub inode_offset: u32,
    pub data_offset: u32,
}

impl SuperBlockDisk {
    pub fn encode(&self) -> [u8; SUPERBLOCK_SIZE] {
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        let fields = [
            self.magic,
            self.usage,
            self.map_inode_blks,
            self.map_inode_offset,
            self.map_data_blks,
            self.map_data_offset,
            self.inode_offset,
            self.data_offset,
        ];
        for (i, v) in fields.into_iter().enumerate() {
            put_u32(&mut buf, i, v);
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, SUPERBLOCK_SIZE)?;
        Ok(Self {
            magic: get_u32(buf, 0),
            usage: get_u32(buf, 1),
            map_inode_blks: get_u32(buf, 2),
            map_inode_offset: get_u32(buf, 3),
            map_data_blks: get_u32(buf, 4),
            map_data_offset: get_u32(buf, 5),
            inode_offset: get_u32(buf, 6),
            data_offset: get_u32(buf, 7),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeDisk {
    pub ino: u32,
    pub size: u32,
    pub link: u32,
    pub ftype: FileType,
    pub dir_cnt: u32,
    pub blocks: [u32; DATA_PER_FILE],
}

impl InodeDisk {
    pub fn encode(&self) -> [u8; INODE_SIZE] {
        let mut buf = [0u8; INODE_SIZE];
        put_u32(&mut buf, 0, self.ino);
        put_u32(&mut buf, 1, self.size);
        put_u32(&mut buf, 2, self.link);
        put_u32(&mut buf, 3, self.ftype as u32);
        put_u32(&mut buf, 4, self.dir_cnt);
        for (i, &b) in self.blocks.iter().enumerate() {
            put_u32(&mut buf, 5 + i, b);
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, INODE_SIZE)?;
        let mut blocks = [0u32; DATA_PER_FILE];
        for (i, b) in blocks.iter_mut().enumerate() {
            *b = get_u32(buf, 5 + i);
        }
        Ok(Self {
            ino: get_u32(buf, 0),
            size: get_u32(buf, 1),
            link: get_u32(buf, 2),
            ftype: FileType::try_from(get_u32(buf, 3))?,
            dir_cnt: get_u32(buf, 4),
            blocks,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntryDisk {
    pub name: [u8; MAX_NAME_LEN],
    pub ftype: FileType,
    pub ino: u32,
}

impl DirEntryDisk {
    pub fn encode(&self) -> [u8; DIRENT_SIZE] {
        let mut buf = [0u8; DIRENT_SIZE];
        buf[..MAX_NAME_LEN].copy_from_slice(&self.name);
        let tail = &mut buf[MAX_NAME_LEN..];
        put_u32(tail, 0, self.ftype as u32);
        put_u32(tail, 1, self.ino);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, DIRENT_SIZE)?;
        let mut name = [0u8; MAX_NAME_LEN];
        name.copy_from_slice(&buf[..MAX_NAME_LEN]);
        let tail = &buf[MAX_NAME_LEN..];
        Ok(Self {
            name,
            ftype: FileType::try_from(get_u32(tail, 0))?,
            ino: get_u32(tail, 1),
        })
    }
}
