//! The superblock: volume metadata plus the shadow-root ring.

use crate::disk::BlockDevice;
use crate::inode::Inode;
use crate::layout::{BLOCK_SIZE, INODE_RECORD_SIZE, MAGIC, NUM_BLOCKS, SHADOW_SLOTS, SUPERBLOCK_BLOCK};
use std::io;

const MAGIC_OFF: usize = 0;
const BLOCK_SIZE_OFF: usize = 4;
const NUM_BLOCKS_OFF: usize = 8;
const INODE_COUNT_OFF: usize = 12;
const ROOT_OFF: usize = 16;
const SHADOW_OFF: usize = ROOT_OFF + INODE_RECORD_SIZE;

/// The on-disk superblock: volume geometry, the live root inode, and a
/// bounded ring of past root snapshots.
///
/// `root` and each `shadow` slot reuse [`Inode`]'s 64-byte shape directly,
/// because a shadow entry *is* a snapshot of the root inode at the moment
/// it was taken. There is no separate occupancy counter on disk: unused
/// shadow slots are marked the same way a free inode is, `size == -1`,
/// and slots are always packed into the low indices.
pub struct Superblock {
    pub magic: u32,
    pub block_size: u32,
    pub num_blocks: u32,
    pub inode_count: u32,
    pub root: Inode,
    /// Oldest-first ring of previous roots. The first `size == -1` entry
    /// marks the end of the live history; entries past it are unused.
    pub shadow: [Inode; SHADOW_SLOTS],
}

impl Superblock {
    /// A fresh superblock for `mkfs`: magic and geometry set, root inode is
    /// the caller's freshly-initialized root, no shadow history yet.
    pub fn fresh(root: Inode) -> Self {
        Self {
            magic: MAGIC,
            block_size: BLOCK_SIZE as u32,
            num_blocks: NUM_BLOCKS as u32,
            inode_count: crate::layout::MAX_FILES as u32,
            root,
            shadow: [Inode::FREE; SHADOW_SLOTS],
        }
    }

    /// Number of live snapshots currently in the ring.
    pub fn shadow_count(&self) -> usize {
        self.shadow.iter().take_while(|s| !s.is_free()).count()
    }

    /// Pushes `snapshot` onto the ring as the newest entry.
    ///
    /// Returns the evicted oldest snapshot if the ring was already full at
    /// `SHADOW_SLOTS` entries. The caller is responsible for reclaiming
    /// whatever blocks the evicted snapshot alone referenced.
    pub fn push_shadow(&mut self, snapshot: Inode) -> Option<Inode> {
        let count = self.shadow_count();
        if count < SHADOW_SLOTS {
            self.shadow[count] = snapshot;
            None
        } else {
            let evicted = self.shadow[0];
            for i in 0..SHADOW_SLOTS - 1 {
                self.shadow[i] = self.shadow[i + 1];
            }
            self.shadow[SHADOW_SLOTS - 1] = snapshot;
            Some(evicted)
        }
    }

    /// Slot `0` is the oldest, `shadow_count() - 1` the newest.
    pub fn shadow_slot(&self, slot: usize) -> Option<&Inode> {
        self.shadow.get(slot).filter(|s| !s.is_free())
    }

    fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[MAGIC_OFF..MAGIC_OFF + 4].copy_from_slice(&self.magic.to_le_bytes());
        buf[BLOCK_SIZE_OFF..BLOCK_SIZE_OFF + 4].copy_from_slice(&self.block_size.to_le_bytes());
        buf[NUM_BLOCKS_OFF..NUM_BLOCKS_OFF + 4].copy_from_slice(&self.num_blocks.to_le_bytes());
        buf[INODE_COUNT_OFF..INODE_COUNT_OFF + 4].copy_from_slice(&self.inode_count.to_le_bytes());
        encode_inode(&self.root, &mut buf[ROOT_OFF..ROOT_OFF + INODE_RECORD_SIZE]);
        for (i, s) in self.shadow.iter().enumerate() {
            let off = SHADOW_OFF + i * INODE_RECORD_SIZE;
            encode_inode(s, &mut buf[off..off + INODE_RECORD_SIZE]);
        }
        buf
    }

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Self {
        let magic = u32::from_le_bytes(buf[MAGIC_OFF..MAGIC_OFF + 4].try_into().unwrap());
        let block_size = u32::from_le_bytes(buf[BLOCK_SIZE_OFF..BLOCK_SIZE_OFF + 4].try_into().unwrap());
        let num_blocks = u32::from_le_bytes(buf[NUM_BLOCKS_OFF..NUM_BLOCKS_OFF + 4].try_into().unwrap());
        let inode_count = u32::from_le_bytes(buf[INODE_COUNT_OFF..INODE_COUNT_OFF + 4].try_into().unwrap());
        let root = decode_inode(&buf[ROOT_OFF..ROOT_OFF + INODE_RECORD_SIZE]);
        let mut shadow = [Inode::FREE; SHADOW_SLOTS];
        for (i, s) in shadow.iter_mut().enumerate() {
            let off = SHADOW_OFF + i * INODE_RECORD_SIZE;
            *s = decode_inode(&buf[off..off + INODE_RECORD_SIZE]);
        }
        Self {
            magic,
            block_size,
            num_blocks,
            inode_count,
            root,
            shadow,
        }
    }

    pub fn load(disk: &mut impl BlockDevice) -> io::Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        disk.read(SUPERBLOCK_BLOCK, 1, &mut buf)?;
        Ok(Self::decode(&buf))
    }

    pub fn commit(&self, disk: &mut impl BlockDevice) -> io::Result<()> {
        disk.write(SUPERBLOCK_BLOCK, 1, &self.encode())
    }
}

fn encode_inode(inode: &Inode, out: &mut [u8]) {
    out[0..4].copy_from_slice(&inode.size.to_le_bytes());
    for (i, p) in inode.pointers.iter().enumerate() {
        let off = 4 + i * 4;
        out[off..off + 4].copy_from_slice(&p.to_le_bytes());
    }
}

fn decode_inode(buf: &[u8]) -> Inode {
    use crate::layout::POINTERS_PER_INODE;
    let size = i32::from_le_bytes(buf[0..4].try_into().unwrap());
    let mut pointers = [-1i32; POINTERS_PER_INODE];
    for (i, p) in pointers.iter_mut().enumerate() {
        let off = 4 + i * 4;
        *p = i32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
    }
    Inode { size, pointers }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_root() -> Inode {
        let mut i = Inode::FREE;
        i.size = 0;
        i
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut sb = Superblock::fresh(sample_root());
        sb.push_shadow(sample_root());
        let buf = sb.encode();
        let back = Superblock::decode(&buf);
        assert_eq!(back.magic, MAGIC);
        assert_eq!(back.num_blocks, NUM_BLOCKS as u32);
        assert_eq!(back.shadow_count(), 1);
    }

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let mut sb = Superblock::fresh(sample_root());
        for i in 0..SHADOW_SLOTS {
            let mut s = sample_root();
            s.size = i as i32;
            assert!(sb.push_shadow(s).is_none());
        }
        let mut newest = sample_root();
        newest.size = 99;
        let evicted = sb.push_shadow(newest).expect("ring was full");
        assert_eq!(evicted.size, 0);
        assert_eq!(sb.shadow_slot(SHADOW_SLOTS - 1).unwrap().size, 99);
    }
}
