//! Management of the inode bitmap and the data bitmap.
//! Both live in memory for the lifetime of a mount and are written back on unmount.
//! Bits are addressed byte-then-bit, bit 0 being the least significant one.

use alloc::vec::Vec;

use log::debug;

use crate::config::DATA_PER_FILE;
use crate::superblock::SuperBlock;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Bitmap {
    bits: Vec<u8>,
    max: usize, // Items at or beyond this index are never handed out
}

impl Bitmap {
    pub fn new(bits: Vec<u8>, max: usize) -> Self {
        let max = max.min(bits.len() * 8);
        Self { bits, max }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn is_set(&self, item: usize) -> bool {
        item < self.bits.len() * 8 && self.bits[item / 8] & (1 << (item % 8)) != 0
    }

    /// Scans for the first `n` clear bits without touching the map.
    /// Returns None if fewer than `n` clear bits exist below the maximum.
    pub fn find_clear(&self, n: usize) -> Option<Vec<usize>> {
        let mut found = Vec::with_capacity(n);
        if n == 0 {
            return Some(found);
        }
        for (byte_cursor, byte) in self.bits.iter().enumerate() {
            for bit_cursor in 0..8 {
                let item = byte_cursor * 8 + bit_cursor;
                if item >= self.max {
                    return None;
                }
                if byte & (1 << bit_cursor) == 0 {
                    found.push(item);
                    if found.len() == n {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn set(&mut self, item: usize) {
        self.bits[item / 8] |= 1 << (item % 8);
    }

    /// Sets the first clear bit and returns its index.
    pub fn alloc(&mut self) -> Result<usize> {
        let item = self.find_clear(1).ok_or(Error::NoSpace)?[0];
        self.set(item);
        Ok(item)
    }

    /// Sets the first `n` clear bits, or none of them if there are fewer than `n`.
    pub fn alloc_n(&mut self, n: usize) -> Result<Vec<usize>> {
        let items = self.find_clear(n).ok_or(Error::NoSpace)?;
        for &item in items.iter() {
            self.set(item);
        }
        Ok(items)
    }

    /// Clears a bit. Returns the previous value.
    pub fn clear(&mut self, item: usize) -> Result<bool> {
        if item >= self.max {
            return Err(Error::InvalidArgument);
        }
        let was_set = self.is_set(item);
        self.bits[item / 8] &= !(1 << (item % 8));
        Ok(was_set)
    }

    pub fn count_set(&self) -> usize {
        (0..self.max).filter(|&i| self.is_set(i)).count()
    }

    pub fn count_free(&self) -> usize {
        self.max - self.count_set()
    }
}

// Public API for managing inode bitmap and data bitmap.

/// Allocates a new inode ID, setting its bit in the inode bitmap.
pub fn alloc_inode_id(superblock: &mut SuperBlock) -> Result<u32> {
    let ino = superblock.map_inode.alloc()?;
    Ok(ino as u32)
}

/// Allocates `n` data blocks at once, setting their bits in the data bitmap.
/// Returned IDs are relative to the start of the data region.
pub fn alloc_data_blocks(superblock: &mut SuperBlock, n: usize) -> Result<Vec<u32>> {
    let blocks = superblock.map_data.alloc_n(n)?;
    Ok(blocks.into_iter().map(|b| b as u32).collect())
}

/// Allocates an inode together with its full set of direct data blocks.
/// Either every bit is set or, on NoSpace, both bitmaps are left untouched.
pub fn alloc_inode(superblock: &mut SuperBlock) -> Result<(u32, [u32; DATA_PER_FILE])> {
    if superblock.map_inode.find_clear(1).is_none()
        || superblock.map_data.find_clear(DATA_PER_FILE).is_none()
    {
        return Err(Error::NoSpace);
    }

    let ino = alloc_inode_id(superblock)?;
    let allocated = alloc_data_blocks(superblock, DATA_PER_FILE)?;

    let mut blocks = [0u32; DATA_PER_FILE];
    blocks.copy_from_slice(&allocated);
    debug!("allocated inode {} with data blocks {:?}", ino, blocks);
    Ok((ino, blocks))
}

/// Frees an inode ID, clearing its bit in the inode bitmap.
pub fn free_inode_id(superblock: &mut SuperBlock, ino: u32) -> Result<()> {
    superblock.map_inode.clear(ino as usize)?;
    Ok(())
}

/// Frees a data block, clearing its bit in the data bitmap.
pub fn free_data_block(superblock: &mut SuperBlock, block: u32) -> Result<()> {
    superblock.map_data.clear(block as usize)?;
    Ok(())
}

/// Releases an inode and every data block it owns.
pub fn free_inode(superblock: &mut SuperBlock, ino: u32, blocks: &[u32]) -> Result<()> {
    for &block in blocks {
        free_data_block(superblock, block)?;
    }
    free_inode_id(superblock, ino)?;
    debug!("freed inode {} and data blocks {:?}", ino, blocks);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_first_fit_order() {
        let mut map = Bitmap::new(vec![0b0000_1011, 0], 16);
        assert_eq!(map.alloc().unwrap(), 2);
        assert_eq!(map.alloc().unwrap(), 4);
        assert_eq!(map.as_bytes()[0], 0b0001_1111);
    }

    #[test]
    fn test_max_bounds_allocation() {
        let mut map = Bitmap::new(vec![0; 2], 3);
        for expected in 0..3 {
            assert_eq!(map.alloc().unwrap(), expected);
        }
        assert_eq!(map.alloc(), Err(Error::NoSpace));
        assert!(!map.is_set(3));
    }

    #[test]
    fn test_alloc_n_is_all_or_nothing() {
        let mut map = Bitmap::new(vec![0b1111_0101], 8);
        assert_eq!(map.alloc_n(3), Err(Error::NoSpace));
        assert_eq!(map.as_bytes()[0], 0b1111_0101);
        assert_eq!(map.alloc_n(2).unwrap(), vec![1, 3]);
        assert_eq!(map.count_free(), 0);
    }

    #[test]
    fn test_clear() {
        let mut map = Bitmap::new(vec![0xff], 8);
        assert_eq!(map.clear(5), Ok(true));
        assert_eq!(map.clear(5), Ok(false));
        assert_eq!(map.clear(8), Err(Error::InvalidArgument));
        assert_eq!(map.alloc().unwrap(), 5);
    }

    #[test]
    fn test_max_clamped_to_storage() {
        let map = Bitmap::new(vec![0; 1], 100);
        assert_eq!(map.max(), 8);
    }
}
