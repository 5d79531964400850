//! Inodes and the inode file cache.

use crate::disk::BlockDevice;
use crate::layout::{
    BLOCK_SIZE, INDIRECT_SLOT, INODE_FILE_BLOCKS, INODE_RECORD_SIZE, MAX_FILES,
    POINTERS_PER_INODE,
};
use std::io;

/// One inode record: a file's size and its chain of block/inode pointers.
///
/// `size == -1` means the slot is free. All unused pointer slots are `-1`.
/// Slots `0..=13` are direct data-block pointers; slot 14 (`INDIRECT_SLOT`)
/// is the index of the inode that continues this file's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub size: i32,
    pub pointers: [i32; POINTERS_PER_INODE],
}

impl Inode {
    /// A free inode: `size = -1`, every pointer `-1`.
    pub const FREE: Inode = Inode {
        size: -1,
        pointers: [-1; POINTERS_PER_INODE],
    };

    pub fn is_free(&self) -> bool {
        self.size == -1
    }

    /// The indirect inode index this inode chains to, if any.
    pub fn indirect(&self) -> Option<usize> {
        let p = self.pointers[INDIRECT_SLOT];
        (p != -1).then_some(p as usize)
    }

    fn encode(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), INODE_RECORD_SIZE);
        out[0..4].copy_from_slice(&self.size.to_le_bytes());
        for (i, p) in self.pointers.iter().enumerate() {
            let off = 4 + i * 4;
            out[off..off + 4].copy_from_slice(&p.to_le_bytes());
        }
    }

    fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), INODE_RECORD_SIZE);
        let size = i32::from_le_bytes(buf[0..4].try_into().unwrap());
        let mut pointers = [-1i32; POINTERS_PER_INODE];
        for (i, p) in pointers.iter_mut().enumerate() {
            let off = 4 + i * 4;
            *p = i32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        }
        Inode { size, pointers }
    }
}

/// The cached inode table: `MAX_FILES` inodes, `INODE_FILE_BLOCKS` blocks.
///
/// This is committed and loaded through whichever blocks the live root
/// (or, for a foreign snapshot, a shadow slot) currently names, never
/// through a hard-coded block range, which is what makes the shadow
/// mechanism possible.
pub struct InodeTable {
    inodes: [Inode; MAX_FILES],
}

impl InodeTable {
    pub fn empty() -> Self {
        Self {
            inodes: [Inode::FREE; MAX_FILES],
        }
    }

    pub fn get(&self, ix: usize) -> &Inode {
        &self.inodes[ix]
    }

    pub fn get_mut(&mut self, ix: usize) -> &mut Inode {
        &mut self.inodes[ix]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Inode)> {
        self.inodes.iter().enumerate()
    }

    /// Loads the inode table from the blocks named by `blocks`.
    pub fn load(disk: &mut impl BlockDevice, blocks: &[i32; INODE_FILE_BLOCKS]) -> io::Result<Self> {
        let mut raw = vec![0u8; INODE_FILE_BLOCKS * BLOCK_SIZE];
        for (i, &b) in blocks.iter().enumerate() {
            disk.read(b, 1, &mut raw[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE])?;
        }
        let mut inodes = [Inode::FREE; MAX_FILES];
        for (i, inode) in inodes.iter_mut().enumerate() {
            let off = i * INODE_RECORD_SIZE;
            *inode = Inode::decode(&raw[off..off + INODE_RECORD_SIZE]);
        }
        Ok(Self { inodes })
    }

    /// Commits the inode table to the blocks named by `blocks`.
    pub fn commit(&self, disk: &mut impl BlockDevice, blocks: &[i32; INODE_FILE_BLOCKS]) -> io::Result<()> {
        let mut raw = vec![0u8; INODE_FILE_BLOCKS * BLOCK_SIZE];
        for (i, inode) in self.inodes.iter().enumerate() {
            let off = i * INODE_RECORD_SIZE;
            inode.encode(&mut raw[off..off + INODE_RECORD_SIZE]);
        }
        for (i, &b) in blocks.iter().enumerate() {
            disk.write(b, 1, &raw[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE])?;
        }
        Ok(())
    }

    /// Reads just inode 0 (the root directory's inode) out of a foreign
    /// inode-file image living at `blocks`, without disturbing the live
    /// cache. Used by shadow eviction to find which directory blocks an
    /// evicted snapshot still references.
    pub fn peek_root_inode(disk: &mut impl BlockDevice, blocks: &[i32; INODE_FILE_BLOCKS]) -> io::Result<Inode> {
        let mut block0 = [0u8; BLOCK_SIZE];
        disk.read(blocks[0], 1, &mut block0)?;
        Ok(Inode::decode(&block0[0..INODE_RECORD_SIZE]))
    }
}
