//! Common utilities for tests
#![allow(unused)]

use std::sync::{Arc, Mutex};

use newfs::{BlockDevice, Error, DEFAULT_DISK_SIZE, DEFAULT_IO_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// A RAM-backed device. Clones share storage, so a clone mounted after
/// unmounting the original sees everything the first mount wrote.
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    io_size: usize,
}

impl RamDisk {
    pub fn new(size: usize) -> Self {
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; size])),
            io_size: DEFAULT_IO_SIZE,
        }
    }

    /// The 4 MiB, 512-byte-unit disk of the simulated driver.
    pub fn default_disk() -> Self {
        Self::new(DEFAULT_DISK_SIZE)
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.inner.lock().unwrap()[offset..offset + len].to_vec()
    }

    /// Overwrites raw bytes behind the filesystem's back.
    pub fn patch(&self, offset: usize, bytes: &[u8]) {
        self.inner.lock().unwrap()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockDevice for RamDisk {
    fn device_size(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    fn io_size(&self) -> usize {
        self.io_size
    }

    fn read_unit(&self, unit: usize, buf: &mut [u8]) -> Result<(), Error> {
        let data = self.inner.lock().unwrap();
        let start = unit * self.io_size;
        if buf.len() != self.io_size || start + self.io_size > data.len() {
            return Err(Error::IoError);
        }
        buf.copy_from_slice(&data[start..start + self.io_size]);
        Ok(())
    }

    fn write_unit(&self, unit: usize, buf: &[u8]) -> Result<(), Error> {
        let mut data = self.inner.lock().unwrap();
        let start = unit * self.io_size;
        if buf.len() != self.io_size || start + self.io_size > data.len() {
            return Err(Error::IoError);
        }
        data[start..start + self.io_size].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// A RamDisk that starts failing writes once its write budget is spent.
#[derive(Clone)]
pub struct FailingDisk {
    pub disk: RamDisk,
    budget: Arc<Mutex<Option<usize>>>,
}

impl FailingDisk {
    pub fn new(disk: RamDisk) -> Self {
        FailingDisk {
            disk,
            budget: Arc::new(Mutex::new(None)),
        }
    }

    /// Allows `writes` more unit writes, then fails every following one.
    pub fn fail_after(&self, writes: usize) {
        *self.budget.lock().unwrap() = Some(writes);
    }

    pub fn heal(&self) {
        *self.budget.lock().unwrap() = None;
    }
}

impl BlockDevice for FailingDisk {
    fn device_size(&self) -> usize {
        self.disk.device_size()
    }

    fn io_size(&self) -> usize {
        self.disk.io_size()
    }

    fn read_unit(&self, unit: usize, buf: &mut [u8]) -> Result<(), Error> {
        self.disk.read_unit(unit, buf)
    }

    fn write_unit(&self, unit: usize, buf: &[u8]) -> Result<(), Error> {
        let mut budget = self.budget.lock().unwrap();
        match budget.as_mut() {
            Some(0) => return Err(Error::IoError),
            Some(n) => *n -= 1,
            None => {}
        }
        self.disk.write_unit(unit, buf)
    }

    fn flush(&self) -> Result<(), Error> {
        self.disk.flush()
    }
}
