use crate::error::FsError;

/// The device contract the filesystem is built on.
/// All transfers are exactly one I/O unit; seeking is implied by the unit index.
/// Opening happens when the implementor is constructed and closing when it is dropped.
pub trait BlockDevice {
    /// Returns the total size of the device in bytes.
    fn device_size(&self) -> usize;

    /// Returns the native transfer granularity in bytes.
    fn io_size(&self) -> usize;

    /// Reads one I/O unit.
    /// buf.len() must be equal to io_size().
    fn read_unit(&self, unit: usize, buf: &mut [u8]) -> Result<(), FsError>;

    /// Writes one I/O unit.
    /// buf.len() must be equal to io_size().
    fn write_unit(&self, unit: usize, buf: &[u8]) -> Result<(), FsError>;

    /// Flushes any cached data to the backing storage.
    fn flush(&self) -> Result<(), FsError>;

    /// Returns the number of I/O units on the device.
    fn num_units(&self) -> usize {
        self.device_size() / self.io_size()
    }
}
