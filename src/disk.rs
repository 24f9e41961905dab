//! A block device backed by a regular file, standing in for the simulated disk driver.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use log::{debug, trace};

use crate::config::{DEFAULT_DISK_SIZE, DEFAULT_IO_SIZE};
use crate::{BlockDevice, Error, Result};

pub struct FileDisk {
    inner: Mutex<File>,
    device_size: usize,
    io_size: usize,
}

impl FileDisk {
    /// Opens an existing image read-write. The device size is the file length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options().read(true).write(true).open(path.as_ref())?;
        let device_size = file.metadata()?.len() as usize;
        debug!("opened disk image {} ({} bytes)", path.as_ref().display(), device_size);
        Ok(Self {
            inner: Mutex::new(file),
            device_size,
            io_size: DEFAULT_IO_SIZE,
        })
    }

    /// Creates (or truncates) a zero-filled image of `size` bytes.
    pub fn create(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        if size == 0 || size % DEFAULT_IO_SIZE != 0 {
            return Err(Error::InvalidArgument);
        }
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(size as u64)?;
        debug!("created disk image {} ({} bytes)", path.as_ref().display(), size);
        Ok(Self {
            inner: Mutex::new(file),
            device_size: size,
            io_size: DEFAULT_IO_SIZE,
        })
    }

    /// Creates an image with the size of the simulated driver's disk.
    pub fn create_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(path, DEFAULT_DISK_SIZE)
    }

    fn check(&self, unit: usize, len: usize) -> Result<u64> {
        if len != self.io_size || (unit + 1) * self.io_size > self.device_size {
            return Err(Error::IoError);
        }
        Ok((unit * self.io_size) as u64)
    }
}

impl BlockDevice for FileDisk {
    fn device_size(&self) -> usize {
        self.device_size
    }

    fn io_size(&self) -> usize {
        self.io_size
    }

    fn read_unit(&self, unit: usize, buf: &mut [u8]) -> Result<()> {
        let pos = self.check(unit, buf.len())?;
        let mut inner = self.inner.lock().map_err(|_| Error::IoError)?;
        inner.seek(SeekFrom::Start(pos))?;
        inner.read_exact(buf)?;
        trace!("read unit {}", unit);
        Ok(())
    }

    fn write_unit(&self, unit: usize, buf: &[u8]) -> Result<()> {
        let pos = self.check(unit, buf.len())?;
        let mut inner = self.inner.lock().map_err(|_| Error::IoError)?;
        inner.seek(SeekFrom::Start(pos))?;
        inner.write_all(buf)?;
        trace!("wrote unit {}", unit);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Error::IoError)?;
        inner.flush()?;
        inner.sync_data()?;
        Ok(())
    }
}
