//! The block device boundary.
//!
//! SSFS treats the storage medium as an external collaborator: the crate
//! only needs `read`/`write` on fixed-size blocks. [`BlockDevice`] is that
//! boundary, modeled as a trait so the test suite can substitute an
//! in-memory implementation. [`MemDisk`] is that in-memory implementation;
//! [`FileDisk`] is a real, positionally-addressed file backing for anyone
//! embedding this crate outside of tests.

use crate::layout::{BLOCK_SIZE, NUM_BLOCKS};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A fixed-size array of fixed-size blocks.
///
/// `read`/`write` are byte-exact and block-indexed: `count * BLOCK_SIZE`
/// bytes are copied between `buf` and the device starting at block
/// `start`. Implementations should treat any failure as unrecoverable;
/// SSFS does not retry.
pub trait BlockDevice {
    /// Reads `count` blocks starting at `start` into `buf`.
    ///
    /// `buf` must be at least `count * BLOCK_SIZE` bytes.
    fn read(&mut self, start: i32, count: usize, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `count` blocks starting at `start` from `buf`.
    ///
    /// `buf` must be at least `count * BLOCK_SIZE` bytes.
    fn write(&mut self, start: i32, count: usize, buf: &[u8]) -> io::Result<()>;
}

/// An in-memory block device, backed by a `Vec<u8>`.
///
/// This is what the test suite uses in place of a real disk: it never fails
/// on its own (there is no I/O to fail), which is what most tests need.
/// Fault injection for the one path that does need a failing device is
/// [`FaultyDisk`].
pub struct MemDisk {
    blocks: Vec<u8>,
}

impl MemDisk {
    /// Creates a zero-filled volume of `NUM_BLOCKS` blocks.
    pub fn new() -> Self {
        Self {
            blocks: vec![0; NUM_BLOCKS * BLOCK_SIZE],
        }
    }
}

impl Default for MemDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for MemDisk {
    fn read(&mut self, start: i32, count: usize, buf: &mut [u8]) -> io::Result<()> {
        let (off, len) = bounds(start, count)?;
        buf[..len].copy_from_slice(&self.blocks[off..off + len]);
        Ok(())
    }

    fn write(&mut self, start: i32, count: usize, buf: &[u8]) -> io::Result<()> {
        let (off, len) = bounds(start, count)?;
        self.blocks[off..off + len].copy_from_slice(&buf[..len]);
        Ok(())
    }
}

fn bounds(start: i32, count: usize) -> io::Result<(usize, usize)> {
    if start < 0 || start as usize + count > NUM_BLOCKS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "block range out of bounds",
        ));
    }
    let off = start as usize * BLOCK_SIZE;
    let len = count * BLOCK_SIZE;
    Ok((off, len))
}

/// A block device backed by a real file, addressed positionally.
///
/// Mirrors `mkfs`'s own device access (`std::fs::File` + `Seek`): there is
/// no raw-device ioctl plumbing here because SSFS's "disk" is always a
/// plain file of `NUM_BLOCKS * BLOCK_SIZE` bytes, never a raw partition.
pub struct FileDisk {
    file: File,
}

impl FileDisk {
    /// Creates a fresh, zero-filled backing file at `path` and opens it.
    pub fn init_fresh(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((NUM_BLOCKS * BLOCK_SIZE) as u64)?;
        Ok(Self { file })
    }

    /// Opens an existing backing file at `path`.
    pub fn init_existing(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl BlockDevice for FileDisk {
    fn read(&mut self, start: i32, count: usize, buf: &mut [u8]) -> io::Result<()> {
        let (off, len) = bounds(start, count)?;
        self.file.seek(SeekFrom::Start(off as u64))?;
        self.file.read_exact(&mut buf[..len])
    }

    fn write(&mut self, start: i32, count: usize, buf: &[u8]) -> io::Result<()> {
        let (off, len) = bounds(start, count)?;
        self.file.seek(SeekFrom::Start(off as u64))?;
        self.file.write_all(&buf[..len])
    }
}

/// Wraps another [`BlockDevice`] and fails every call once armed.
///
/// Used by tests that exercise the fatal-I/O-abort path without needing a
/// real disk to misbehave.
pub struct FaultyDisk<D> {
    inner: D,
    fail: bool,
}

impl<D: BlockDevice> FaultyDisk<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            fail: false,
        }
    }

    /// Makes every subsequent `read`/`write` fail.
    pub fn arm(&mut self) {
        self.fail = true;
    }
}

impl<D: BlockDevice> BlockDevice for FaultyDisk<D> {
    fn read(&mut self, start: i32, count: usize, buf: &mut [u8]) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("injected fault"));
        }
        self.inner.read(start, count, buf)
    }

    fn write(&mut self, start: i32, count: usize, buf: &[u8]) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("injected fault"));
        }
        self.inner.write(start, count, buf)
    }
}
