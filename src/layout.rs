//! On-disk layout constants.
//!
//! All sizes are fixed at build time: SSFS has no notion of a "large" or
//! "small" volume, only the one shape described here.

/// Size of a disk block, in bytes.
pub const BLOCK_SIZE: usize = 1024;
/// Total number of blocks on the volume.
pub const NUM_BLOCKS: usize = 1027;
/// Maximum number of live files, directory entries, and file descriptors.
pub const MAX_FILES: usize = 200;
/// Maximum file name length, not counting the terminator.
pub const NAME_MAX: usize = 10;
/// On-disk width of a directory entry's name field (`NAME_MAX` + terminator
/// + one byte of padding, matching the 16-byte packed directory entry).
pub const NAME_FIELD_LEN: usize = NAME_MAX + 2;
/// Number of shadow snapshot slots kept in the superblock.
pub const SHADOW_SLOTS: usize = 4;
/// Number of direct block pointers per inode (slots `0..=13`).
pub const DIRECT_PTRS: usize = 14;
/// Index of the indirect inode pointer within an inode's pointer array.
pub const INDIRECT_SLOT: usize = 14;
/// Total pointer slots per inode: `DIRECT_PTRS` direct + 1 indirect.
pub const POINTERS_PER_INODE: usize = DIRECT_PTRS + 1;

/// Superblock magic number.
pub const MAGIC: u32 = 0xACBD_0005;

/// Block holding the superblock.
pub const SUPERBLOCK_BLOCK: i32 = 0;
/// Block holding the free bitmap (FBM).
pub const FBM_BLOCK: i32 = 1;
/// Block holding the write-mark bitmap (WM).
pub const WM_BLOCK: i32 = 2;
/// First block of the inode file at `mkfs` time (before any relocation).
pub const INODE_FILE_START: i32 = 3;
/// Number of blocks occupied by the inode file.
pub const INODE_FILE_BLOCKS: usize = 13;
/// First block of the root directory file at `mkfs` time.
pub const ROOT_DIR_START: i32 = 16;
/// Number of blocks occupied by the root directory file.
pub const ROOT_DIR_BLOCKS: usize = 4;
/// First block available for user data.
pub const DATA_START: i32 = 20;
/// Number of blocks available for user data.
pub const DATA_BLOCKS: usize = NUM_BLOCKS - DATA_START as usize;

/// Inode index reserved for the root directory.
pub const ROOT_INODE: i32 = 0;

/// Encoded size of one on-disk inode record: `size(4) + pointer[15](60)`.
pub const INODE_RECORD_SIZE: usize = 64;
/// Encoded size of one on-disk directory entry: `name(12) + inode_index(4)`.
pub const DIR_ENTRY_SIZE: usize = NAME_FIELD_LEN + 4;
/// Directory entries packed per block.
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// Compile-time sanity checks on the constants above.
const _: () = {
    assert!(INODE_FILE_BLOCKS * (BLOCK_SIZE / INODE_RECORD_SIZE) >= MAX_FILES);
    assert!(ROOT_DIR_BLOCKS * DIR_ENTRIES_PER_BLOCK >= MAX_FILES);
    assert!(DATA_START as usize + DATA_BLOCKS == NUM_BLOCKS);
    assert!(DIRECT_PTRS + 1 == POINTERS_PER_INODE);
};
