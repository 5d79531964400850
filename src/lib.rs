//! SSFS: a single-volume, flat-namespace file system over a
//! block-addressable device, with bounded shadow-root snapshotting.
//!
//! The entry point is [`FileSystem`], mounted over anything implementing
//! [`BlockDevice`]. [`MemDisk`] backs the test suite; [`FileDisk`] backs a
//! real file on disk.

pub mod alloc;
pub mod bitmap;
pub mod blockio;
pub mod chain;
pub mod directory;
pub mod disk;
pub mod error;
pub mod fd;
pub mod fs;
pub mod inode;
pub mod layout;
pub mod shadow;
pub mod superblock;

pub use disk::{BlockDevice, FaultyDisk, FileDisk, MemDisk};
pub use error::FsError;
pub use fs::FileSystem;
