//! NewFS is a minimal on-disk file system core.
//! It keeps no permissions, timestamps, journal, or indirect blocks: every inode owns a
//! fixed set of direct data blocks.
//!
//! Linear layout on the device:
//! - Superblock
//! - Inode Bitmap
//! - Data Bitmap
//! - Inode Table
//! - Data Blocks
//!
//! Layers (from bottom to top):
//! 1. Block Device: unit-sized I/O against the backing storage.       | User implemented (or `FileDisk`)
//! 2. Driver: byte-addressed reads and read-modify-write writes.       | Fs implemented
//! 3. Bitmaps / Superblock: layout, allocation and their persistence.  | Fs implemented
//! 4. Tree: lazily loaded dentries and inodes, flushed on unmount.     | Fs implemented
//! 5. Path: level-by-level resolution over the tree.                   | Fs implemented
//! 6. FileSystem: the mounted session handed to operation handlers.    | Fs implemented
//!
//! Nothing reaches the device between mount and unmount (or an explicit `sync`) except
//! what mounting itself writes.

extern crate alloc;

mod config;
mod error;
mod block_dev;
mod disk;
mod driver;
mod structs;
mod bitmap;
mod superblock;
mod tree;
mod directory;
mod inode;
mod path;
mod file;
mod fs;

pub use block_dev::BlockDevice;
pub use config::*;
pub use disk::FileDisk;
pub use driver::Driver;
pub use structs::*;
pub use bitmap::Bitmap;
pub use superblock::{compute_layout, SuperBlock};
pub use tree::{Children, Dentry, DentryId, Inode, Tree};
pub use path::{components, level, split, Lookup};
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
