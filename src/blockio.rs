//! Byte-granularity access within a single block.

use crate::disk::BlockDevice;
use crate::error::{FsError, Result};
use crate::layout::BLOCK_SIZE;

fn check_range(offset: usize, length: usize) -> Result<()> {
    if offset > BLOCK_SIZE || length > BLOCK_SIZE || offset + length > BLOCK_SIZE {
        return Err(FsError::Argument("byte range exceeds block size"));
    }
    Ok(())
}

/// Reads `length` bytes starting at `offset` within `block` into `dst`.
pub fn read_sub(disk: &mut impl BlockDevice, block: i32, offset: usize, dst: &mut [u8]) -> Result<()> {
    check_range(offset, dst.len())?;
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(block, 1, &mut buf)?;
    dst.copy_from_slice(&buf[offset..offset + dst.len()]);
    Ok(())
}

/// Read-modify-writes `src` into `block` at byte `offset`, leaving the
/// rest of the block untouched.
pub fn write_sub(disk: &mut impl BlockDevice, block: i32, offset: usize, src: &[u8]) -> Result<()> {
    check_range(offset, src.len())?;
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(block, 1, &mut buf)?;
    buf[offset..offset + src.len()].copy_from_slice(src);
    disk.write(block, 1, &buf)?;
    Ok(())
}
