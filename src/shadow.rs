//! Shadow-root snapshotting and eviction.
//!
//! Every `create`, and every later mutation that finds the live metadata
//! blocks clamped read-only by a prior checkpoint, relocates the
//! inode-file and directory blocks to fresh locations instead of
//! overwriting them in place. That is what lets an older shadow's `root`
//! inode still dereference valid blocks. Once a snapshot ages out of the
//! bounded ring it becomes the last reference to those old blocks, and
//! this module is what returns them to the free pool.

use crate::bitmap::Bitmap;
use crate::disk::BlockDevice;
use crate::error::Result;
use crate::inode::{Inode, InodeTable};
use crate::layout::{INODE_FILE_BLOCKS, ROOT_DIR_BLOCKS};
use crate::superblock::Superblock;

/// Snapshots the current root and pushes it onto the shadow ring,
/// reclaiming whatever blocks fall out the other end.
pub fn record(superblock: &mut Superblock, disk: &mut impl BlockDevice, fbm: &mut Bitmap) -> Result<()> {
    let snapshot = superblock.root;
    if let Some(evicted) = superblock.push_shadow(snapshot) {
        reclaim(&evicted, disk, fbm)?;
    }
    Ok(())
}

/// Frees the inode-file blocks an evicted snapshot pointed at, plus the
/// directory blocks its own inode-file inode 0 pointed at in turn.
///
/// This is the one place the crate reads a foreign, non-live inode-file
/// image: `evicted` names 13 blocks that held *some* past inode table,
/// and that table's inode 0 is the root directory's inode at that point
/// in history, which is the only way to learn which directory blocks rode
/// along with it.
fn reclaim(evicted: &Inode, disk: &mut impl BlockDevice, fbm: &mut Bitmap) -> Result<()> {
    let mut inode_file_blocks = [-1i32; INODE_FILE_BLOCKS];
    inode_file_blocks.copy_from_slice(&evicted.pointers[..INODE_FILE_BLOCKS]);

    let root_dir_inode = InodeTable::peek_root_inode(disk, &inode_file_blocks)?;

    // Blocks 0..DATA_START are permanently reserved even across
    // relocation; only a block that was actually carved out of the data
    // pool during relocation is reclaimable here.
    for i in 0..ROOT_DIR_BLOCKS {
        let b = root_dir_inode.pointers[i];
        if b >= crate::layout::DATA_START {
            fbm.set(b, true);
        }
    }
    for &b in inode_file_blocks.iter() {
        if b >= crate::layout::DATA_START {
            fbm.set(b, true);
        }
    }
    Ok(())
}

/// Restores `root` to be the live root named by shadow slot `slot`
/// (0 = oldest). Does not touch the shadow ring itself: this makes a past
/// state live again, it doesn't forget the history.
pub fn restore(superblock: &Superblock, slot: usize) -> Option<Inode> {
    superblock.shadow_slot(slot).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;
    use crate::layout::{DATA_START, SHADOW_SLOTS};

    fn inode_file_at(blocks: [i32; INODE_FILE_BLOCKS]) -> Inode {
        let mut i = Inode::FREE;
        i.size = 0;
        i.pointers[..INODE_FILE_BLOCKS].copy_from_slice(&blocks);
        i
    }

    #[test]
    fn eviction_frees_both_inode_file_and_directory_blocks() {
        let mut disk = MemDisk::new();
        let mut fbm = Bitmap::fresh_fbm();

        let old_inode_file: [i32; INODE_FILE_BLOCKS] =
            std::array::from_fn(|i| DATA_START + i as i32);
        for &b in &old_inode_file {
            fbm.clear(b);
        }
        let old_dir_blocks: [i32; ROOT_DIR_BLOCKS] =
            std::array::from_fn(|i| DATA_START + INODE_FILE_BLOCKS as i32 + i as i32);
        for &b in &old_dir_blocks {
            fbm.clear(b);
        }

        let mut table = InodeTable::empty();
        let mut root_dir_inode = Inode::FREE;
        root_dir_inode.size = 0;
        root_dir_inode.pointers[..ROOT_DIR_BLOCKS].copy_from_slice(&old_dir_blocks);
        *table.get_mut(0) = root_dir_inode;
        table.commit(&mut disk, &old_inode_file).unwrap();

        let old_root = inode_file_at(old_inode_file);
        let mut superblock = Superblock::fresh(old_root);
        for _ in 0..SHADOW_SLOTS {
            record(&mut superblock, &mut disk, &mut fbm).unwrap();
        }
        // One more push evicts `old_root`, which should free its 13 + 4 blocks.
        record(&mut superblock, &mut disk, &mut fbm).unwrap();

        for &b in old_inode_file.iter().chain(old_dir_blocks.iter()) {
            assert!(fbm.is_set(b), "block {b} should have been freed");
        }
    }

    #[test]
    fn restore_reads_without_mutating_ring() {
        let mut superblock = Superblock::fresh(Inode::FREE);
        let mut snap = Inode::FREE;
        snap.size = 7;
        superblock.push_shadow(snap);
        assert_eq!(restore(&superblock, 0).unwrap().size, 7);
        assert_eq!(superblock.shadow_count(), 1);
    }
}
