//! Resource allocators.
//!
//! Each allocator is a linear scan over its backing cache; there is no
//! free list to maintain. They return the typed [`FsError::Capacity`]
//! that collapses to the public API's `-1` sentinel at the boundary.

use crate::bitmap::Bitmap;
use crate::directory::Directory;
use crate::error::{FsError, Resource, Result};
use crate::fd::FdTable;
use crate::inode::InodeTable;

pub fn unused_block(fbm: &Bitmap) -> Result<i32> {
    fbm.first_free_data_block()
        .ok_or(FsError::Capacity(Resource::Block))
}

pub fn unused_inode(table: &InodeTable) -> Result<usize> {
    table
        .iter()
        .find(|(_, inode)| inode.is_free())
        .map(|(ix, _)| ix)
        .ok_or(FsError::Capacity(Resource::Inode))
}

pub fn unused_fd(table: &FdTable) -> Result<i32> {
    table
        .first_unused()
        .ok_or(FsError::Capacity(Resource::FileDescriptor))
}

pub fn unused_dir_entry(dir: &Directory) -> Result<usize> {
    dir.unused_slot()
}
