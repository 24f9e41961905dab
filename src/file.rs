//! Byte-range access to the cached content of a regular file.

use crate::tree::Inode;
use crate::{Error, Result};

/// Reads data from a file into the provided buffer.
/// Returns the number of bytes read, which is short at end of file.
pub fn fread(inode: &Inode, offset: usize, buffer: &mut [u8]) -> Result<usize> {
    let size = inode.size as usize;
    if offset >= size {
        return Ok(0);
    }
    let end = size.min(offset + buffer.len());
    let n = end - offset;
    buffer[..n].copy_from_slice(&inode.data[offset..end]);
    Ok(n)
}

/// Writes data to a file at the specified offset, growing its size as needed.
/// Fails with FileTooLarge if the write would run past the last direct block.
pub fn fwrite(inode: &mut Inode, offset: usize, buffer: &[u8]) -> Result<usize> {
    let end = offset.checked_add(buffer.len()).ok_or(Error::FileTooLarge)?;
    if end > inode.data.len() {
        return Err(Error::FileTooLarge);
    }
    inode.data[offset..end].copy_from_slice(buffer);
    if end > inode.size as usize {
        inode.size = end as u32;
    }
    Ok(buffer.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structs::FileType;

    #[test]
    fn test_read_write() {
        let mut inode = Inode::new(1, FileType::Regular, [4, 5, 6, 7], 64);
        assert_eq!(fwrite(&mut inode, 10, b"hello").unwrap(), 5);
        assert_eq!(inode.size, 15);

        let mut buf = [0u8; 32];
        assert_eq!(fread(&inode, 8, &mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"\0\0hello");
        assert_eq!(fread(&inode, 15, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_bounds() {
        let mut inode = Inode::new(1, FileType::Regular, [4, 5, 6, 7], 64);
        assert_eq!(fwrite(&mut inode, 250, &[1; 6]).unwrap(), 6);
        assert_eq!(fwrite(&mut inode, 250, &[1; 7]), Err(Error::FileTooLarge));
        assert_eq!(inode.size, 256);
    }
}
