//! Free and write-mark bitmaps.

use crate::disk::BlockDevice;
use crate::layout::{BLOCK_SIZE, DATA_START, FBM_BLOCK, NUM_BLOCKS, WM_BLOCK};
use std::io;

const FREE: u8 = b'1';
const USED: u8 = b'0';

/// A byte-per-block bitmap, one byte per block index, stored in a single
/// block. Shared shape for both the FBM (`'0'` used / `'1'` free) and the
/// WM (`'0'` read-only / `'1'` writable).
#[derive(Clone)]
pub struct Bitmap {
    bytes: [u8; NUM_BLOCKS],
    disk_block: i32,
}

impl Bitmap {
    fn new(disk_block: i32, fill: u8) -> Self {
        Self {
            bytes: [fill; NUM_BLOCKS],
            disk_block,
        }
    }

    /// A fresh FBM: blocks `0..DATA_START` used, the rest free.
    pub fn fresh_fbm() -> Self {
        let mut bm = Self::new(FBM_BLOCK, FREE);
        for i in 0..DATA_START as usize {
            bm.bytes[i] = USED;
        }
        bm
    }

    /// A fresh WM: blocks `0..=2` writable, the rest read-only.
    pub fn fresh_wm() -> Self {
        let mut bm = Self::new(WM_BLOCK, USED);
        for i in 0..3 {
            bm.bytes[i] = FREE;
        }
        bm
    }

    pub fn is_set(&self, ix: i32) -> bool {
        self.bytes[ix as usize] == FREE
    }

    pub fn set(&mut self, ix: i32, value: bool) {
        self.bytes[ix as usize] = if value { FREE } else { USED };
    }

    /// Marks `ix` used/read-only (FBM: allocated; WM: read-only).
    pub fn clear(&mut self, ix: i32) {
        self.set(ix, false);
    }

    pub fn load(disk: &mut impl BlockDevice, disk_block: i32) -> io::Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        disk.read(disk_block, 1, &mut block)?;
        let mut bytes = [0u8; NUM_BLOCKS];
        bytes.copy_from_slice(&block[..NUM_BLOCKS]);
        Ok(Self { bytes, disk_block })
    }

    pub fn commit(&self, disk: &mut impl BlockDevice) -> io::Result<()> {
        let mut block = [0u8; BLOCK_SIZE];
        block[..NUM_BLOCKS].copy_from_slice(&self.bytes);
        disk.write(self.disk_block, 1, &block)
    }

    /// First free (FBM) / writable (WM) block index at or past
    /// `DATA_START`, or `None` if exhausted.
    pub fn first_free_data_block(&self) -> Option<i32> {
        (DATA_START as usize..NUM_BLOCKS)
            .find(|&i| self.bytes[i] == FREE)
            .map(|i| i as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_fbm_reserves_metadata_blocks() {
        let fbm = Bitmap::fresh_fbm();
        for i in 0..DATA_START {
            assert!(!fbm.is_set(i), "block {i} should be used");
        }
        assert!(fbm.is_set(DATA_START));
        assert_eq!(fbm.first_free_data_block(), Some(DATA_START));
    }

    #[test]
    fn fresh_wm_matches_spec() {
        let wm = Bitmap::fresh_wm();
        for i in 0..3 {
            assert!(wm.is_set(i), "block {i} should start writable");
        }
        assert!(!wm.is_set(3));
    }
}
