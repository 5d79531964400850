//! Error taxonomy.
//!
//! Internal operations return [`FsError`] rather than the sentinel integers
//! the public [`crate::FileSystem`] methods return; the sentinel collapse
//! happens only at that outer boundary, with no hidden control flow in
//! between.

use std::fmt;

/// A kind of failure an SSFS operation can hit.
///
/// `Io` is the one variant that is fatal: a real block-device failure
/// during load or commit. Everything else is recoverable and collapses to
/// `-1` at the public API boundary.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The underlying block device failed. This is fatal: it can only
    /// happen during a cache `load`/`commit`, at which point the
    /// in-memory caches and the on-disk image may disagree. This crate
    /// does not call `process::abort` on this variant itself (that would
    /// make it unusable as a library); see DESIGN.md for the Open
    /// Question this resolves.
    #[error("block device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An allocator ran out of the resource it was asked for (data block,
    /// inode, file descriptor, or directory entry).
    #[error("no free {0} available")]
    Capacity(Resource),

    /// The operation is not valid in the current state: double-open,
    /// close of an already-closed descriptor, operating on an unknown
    /// name, a seek past end-of-file, or a write past chain exhaustion.
    #[error("{0}")]
    State(&'static str),

    /// The caller passed an argument that is invalid independent of any
    /// file system state: a negative length, an out-of-range descriptor,
    /// or a name that is too long.
    #[error("invalid argument: {0}")]
    Argument(&'static str),
}

/// A resource an allocator can run out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Block,
    Inode,
    FileDescriptor,
    DirectoryEntry,
    ShadowSlot,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resource::Block => "data block",
            Resource::Inode => "inode",
            Resource::FileDescriptor => "file descriptor",
            Resource::DirectoryEntry => "directory entry",
            Resource::ShadowSlot => "shadow slot",
        };
        f.write_str(s)
    }
}

/// Result type used throughout the internal implementation.
pub type Result<T> = std::result::Result<T, FsError>;

/// Collapses an internal [`Result`] to the sentinel convention the public
/// API exposes: `Ok(v)` becomes `v`, and any recoverable error becomes
/// `-1`. An [`FsError::Io`] is *not* recoverable and never reaches the
/// caller as `-1`, it goes to [`fatal`] instead.
pub(crate) fn sentinel(r: Result<i32>) -> i32 {
    match r {
        Ok(v) => v,
        Err(FsError::Io(e)) => fatal(FsError::Io(e)),
        Err(_) => -1,
    }
}

/// Handles the one genuinely fatal error class: I/O failures abort the
/// process.
///
/// A library cannot unilaterally call `process::exit` on behalf of its
/// embedder the way `mkfs`/`fdisk`'s `utils::error` helper does for a
/// standalone binary, so this logs at `error` level and panics, which is
/// this crate's equivalent of "abort" while still being something a
/// embedder-supplied panic hook can observe before the process goes down.
pub(crate) fn fatal(e: FsError) -> ! {
    log::error!("ssfs: fatal I/O error, aborting: {e}");
    panic!("ssfs: fatal I/O error: {e}");
}
