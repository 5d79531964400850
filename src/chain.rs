//! Chain walking: turning a byte offset into a concrete data block,
//! threading through indirect inodes as needed.
//!
//! An inode holds `DIRECT_PTRS` direct block pointers plus one indirect
//! pointer to *another inode* that continues the chain, not to an
//! indirect block the way ext2-style filesystems do. Walking past block
//! `DIRECT_PTRS - 1` in the Nth inode moves to its indirect inode and
//! resets the direct-pointer slot arithmetic.

use crate::alloc::unused_inode;
use crate::bitmap::Bitmap;
use crate::error::{FsError, Resource, Result};
use crate::inode::InodeTable;
use crate::layout::DIRECT_PTRS;

/// Which inode and which of its direct-pointer slots holds block number
/// `block_in_file` (0-based, counting from the start of the file).
struct Slot {
    inode_ix: usize,
    pointer_slot: usize,
}

/// Walks the chain starting at `inode_ix` to the inode actually holding
/// block `block_in_file`. When `allocate` is set, a missing indirect link
/// is extended by allocating a fresh inode; otherwise a missing link means
/// the file doesn't reach that far and is reported as end-of-file.
fn locate(table: &mut InodeTable, inode_ix: usize, block_in_file: usize, allocate: bool) -> Result<Slot> {
    let mut cur = inode_ix;
    let mut remaining = block_in_file;
    while remaining >= DIRECT_PTRS {
        remaining -= DIRECT_PTRS;
        match table.get(cur).indirect() {
            Some(next) => cur = next,
            None if allocate => {
                let next = unused_inode(table)?;
                table.get_mut(next).size = 0;
                table.get_mut(cur).pointers[crate::layout::INDIRECT_SLOT] = next as i32;
                cur = next;
            }
            None => return Err(FsError::State("seek or write past end of file chain")),
        }
    }
    Ok(Slot {
        inode_ix: cur,
        pointer_slot: remaining,
    })
}

/// Returns the block that should receive the next write at file-relative
/// block `block_in_file`, allocating both the block and, if the chain is
/// exhausted, a continuation inode. The returned block is already marked
/// used in `fbm`.
pub fn next_block_to_write(
    table: &mut InodeTable,
    fbm: &mut Bitmap,
    inode_ix: usize,
    block_in_file: usize,
) -> Result<i32> {
    let slot = locate(table, inode_ix, block_in_file, true)?;
    let existing = table.get(slot.inode_ix).pointers[slot.pointer_slot];
    if existing != -1 {
        return Ok(existing);
    }
    let block = fbm
        .first_free_data_block()
        .ok_or(FsError::Capacity(Resource::Block))?;
    fbm.clear(block);
    table.get_mut(slot.inode_ix).pointers[slot.pointer_slot] = block;
    Ok(block)
}

/// Returns the block holding file-relative block `block_in_file`, for
/// reading. Never allocates; a hole or a chain that doesn't reach this far
/// is an end-of-file condition, which the caller turns into "stop, return
/// however many bytes were read so far."
pub fn next_block_to_read(table: &mut InodeTable, inode_ix: usize, block_in_file: usize) -> Result<i32> {
    let slot = locate(table, inode_ix, block_in_file, false)?;
    let block = table.get(slot.inode_ix).pointers[slot.pointer_slot];
    if block == -1 {
        return Err(FsError::State("read past end of file"));
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NUM_BLOCKS;

    #[test]
    fn direct_blocks_allocate_in_place() {
        let mut table = InodeTable::empty();
        table.get_mut(0).size = 0;
        let mut fbm = Bitmap::fresh_fbm();
        let b0 = next_block_to_write(&mut table, &mut fbm, 0, 0).unwrap();
        let b1 = next_block_to_write(&mut table, &mut fbm, 0, 1).unwrap();
        assert_ne!(b0, b1);
        assert_eq!(next_block_to_read(&mut table, 0, 0).unwrap(), b0);
        assert_eq!(next_block_to_read(&mut table, 0, 1).unwrap(), b1);
    }

    #[test]
    fn crossing_direct_boundary_allocates_indirect_inode() {
        let mut table = InodeTable::empty();
        table.get_mut(0).size = 0;
        let mut fbm = Bitmap::fresh_fbm();
        for i in 0..DIRECT_PTRS + 1 {
            next_block_to_write(&mut table, &mut fbm, 0, i).unwrap();
        }
        assert!(table.get(0).indirect().is_some());
        let next_inode = table.get(0).indirect().unwrap();
        assert_eq!(table.get(next_inode).pointers[0] != -1, true);
    }

    #[test]
    fn reading_past_end_of_chain_is_an_error() {
        let mut table = InodeTable::empty();
        table.get_mut(0).size = 0;
        assert!(next_block_to_read(&mut table, 0, 0).is_err());
    }

    #[test]
    fn exhausting_blocks_is_a_capacity_error() {
        let mut table = InodeTable::empty();
        table.get_mut(0).size = 0;
        let mut fbm = Bitmap::fresh_fbm();
        for i in crate::layout::DATA_START..NUM_BLOCKS as i32 {
            fbm.clear(i);
        }
        assert!(matches!(
            next_block_to_write(&mut table, &mut fbm, 0, 0),
            Err(FsError::Capacity(Resource::Block))
        ));
    }
}
