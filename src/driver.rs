//! Byte-addressed access on top of a unit-addressed block device.
//! Requests may start and end anywhere; the driver widens them to whole I/O units,
//! and writes go through a read-modify-write of the covering window.

use alloc::vec;
use alloc::vec::Vec;

use log::trace;

use crate::config::IO_UNITS_PER_BLOCK;
use crate::{BlockDevice, Error, Result};

pub fn round_down(value: usize, round: usize) -> usize {
    value / round * round
}

pub fn round_up(value: usize, round: usize) -> usize {
    value.div_ceil(round) * round
}

pub struct Driver<D: BlockDevice> {
    device: D,
    io_size: usize,
    device_size: usize,
}

impl<D: BlockDevice> Driver<D> {
    pub fn new(device: D) -> Result<Self> {
        let io_size = device.io_size();
        let device_size = device.device_size();
        if io_size == 0 || device_size < io_size {
            return Err(Error::IoError);
        }
        Ok(Self { device, io_size, device_size })
    }

    pub fn io_size(&self) -> usize {
        self.io_size
    }

    pub fn device_size(&self) -> usize {
        self.device_size
    }

    pub fn block_size(&self) -> usize {
        self.io_size * IO_UNITS_PER_BLOCK
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }

    /// Returns (aligned start, bias into the window, aligned window length).
    fn window(&self, offset: usize, size: usize) -> Result<(usize, usize, usize)> {
        let start = round_down(offset, self.io_size);
        let bias = offset - start;
        let len = round_up(size + bias, self.io_size);
        if start + len > self.device_size {
            return Err(Error::IoError);
        }
        Ok((start, bias, len))
    }

    fn read_window(&self, start: usize, buf: &mut [u8]) -> Result<()> {
        let first = start / self.io_size;
        for (i, chunk) in buf.chunks_mut(self.io_size).enumerate() {
            self.device.read_unit(first + i, chunk)?;
        }
        Ok(())
    }

    /// Reads `out.len()` bytes starting at byte `offset`.
    pub fn read_into(&self, offset: usize, out: &mut [u8]) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        let (start, bias, len) = self.window(offset, out.len())?;
        let mut scratch = vec![0u8; len];
        self.read_window(start, &mut scratch)?;
        out.copy_from_slice(&scratch[bias..bias + out.len()]);
        trace!("driver read {} bytes at {:#x}", out.len(), offset);
        Ok(())
    }

    pub fn read(&self, offset: usize, size: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; size];
        self.read_into(offset, &mut out)?;
        Ok(out)
    }

    /// Writes `data` at byte `offset`, preserving the surrounding bytes of the touched units.
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let (start, bias, len) = self.window(offset, data.len())?;
        let mut scratch = vec![0u8; len];
        self.read_window(start, &mut scratch)?;
        scratch[bias..bias + data.len()].copy_from_slice(data);

        let first = start / self.io_size;
        for (i, chunk) in scratch.chunks(self.io_size).enumerate() {
            self.device.write_unit(first + i, chunk)?;
        }
        trace!("driver wrote {} bytes at {:#x}", data.len(), offset);
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.device.flush()
    }
}

#[cfg(test)]
mod test {
    use core::cell::{Cell, RefCell};

    use super::*;

    struct MemDisk {
        data: RefCell<Vec<u8>>,
        writes: Cell<usize>,
    }

    impl MemDisk {
        fn new(size: usize) -> Self {
            Self { data: RefCell::new(vec![0; size]), writes: Cell::new(0) }
        }
    }

    impl BlockDevice for MemDisk {
        fn device_size(&self) -> usize {
            self.data.borrow().len()
        }

        fn io_size(&self) -> usize {
            16
        }

        fn read_unit(&self, unit: usize, buf: &mut [u8]) -> Result<()> {
            buf.copy_from_slice(&self.data.borrow()[unit * 16..unit * 16 + 16]);
            Ok(())
        }

        fn write_unit(&self, unit: usize, buf: &[u8]) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.data.borrow_mut()[unit * 16..unit * 16 + 16].copy_from_slice(buf);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_down(17, 16), 16);
        assert_eq!(round_down(32, 16), 32);
        assert_eq!(round_up(17, 16), 32);
        assert_eq!(round_up(32, 16), 32);
        assert_eq!(round_up(0, 16), 0);
    }

    #[test]
    fn test_unaligned_write_keeps_neighbours() {
        let driver = Driver::new(MemDisk::new(64)).unwrap();
        driver.write(0, &[0xAA; 64]).unwrap();
        driver.write(14, &[1, 2, 3, 4]).unwrap();

        let all = driver.read(0, 64).unwrap();
        assert_eq!(&all[12..14], &[0xAA, 0xAA]);
        assert_eq!(&all[14..18], &[1, 2, 3, 4]);
        assert_eq!(&all[18..20], &[0xAA, 0xAA]);
        assert_eq!(driver.block_size(), 32);
    }

    #[test]
    fn test_write_touches_only_covering_units() {
        let driver = Driver::new(MemDisk::new(64)).unwrap();
        driver.write(20, &[7; 8]).unwrap();
        assert_eq!(driver.device().writes.get(), 1);
        driver.write(30, &[7; 4]).unwrap();
        assert_eq!(driver.device().writes.get(), 3);
    }

    #[test]
    fn test_out_of_range() {
        let driver = Driver::new(MemDisk::new(64)).unwrap();
        assert_eq!(driver.read(60, 8), Err(Error::IoError));
        assert_eq!(driver.write(64, &[1]), Err(Error::IoError));
        assert!(driver.read(60, 4).is_ok());
    }
}
