//! The orchestrating file system.
//!
//! `FileSystem` owns every cache and exposes the public POSIX-like API.
//! Its methods return a plain `i32` sentinel on the outer boundary;
//! everything underneath returns [`crate::error::Result`] and is
//! collapsed by [`crate::error::sentinel`] right before return.

use crate::alloc::{unused_dir_entry, unused_fd, unused_inode};
use crate::bitmap::Bitmap;
use crate::blockio::{read_sub, write_sub};
use crate::chain::{next_block_to_read, next_block_to_write};
use crate::directory::Directory;
use crate::disk::BlockDevice;
use crate::error::{fatal, sentinel, FsError, Resource, Result};
use crate::fd::FdTable;
use crate::inode::{Inode, InodeTable};
use crate::layout::{
    BLOCK_SIZE, DATA_BLOCKS, DATA_START, FBM_BLOCK, INODE_FILE_BLOCKS, INODE_FILE_START, NAME_MAX,
    ROOT_DIR_BLOCKS, ROOT_DIR_START, WM_BLOCK,
};
use crate::shadow;
use crate::superblock::Superblock;

/// The live, in-memory image of an SSFS volume, plus the device backing
/// it.
pub struct FileSystem<D: BlockDevice> {
    disk: D,
    superblock: Superblock,
    fbm: Bitmap,
    wm: Bitmap,
    inode_table: InodeTable,
    inode_file_blocks: [i32; INODE_FILE_BLOCKS],
    directory: Directory,
    dir_blocks: [i32; ROOT_DIR_BLOCKS],
    fd_table: FdTable,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Formats (if `fresh`) or loads an existing volume on `disk`.
    ///
    /// A non-fresh mount replays the on-disk superblock, inode file and
    /// directory rather than
    /// reinitializing them.
    pub fn mount(mut disk: D, fresh: bool) -> Result<Self> {
        if fresh {
            let inode_file_blocks: [i32; INODE_FILE_BLOCKS] =
                std::array::from_fn(|i| INODE_FILE_START + i as i32);
            let dir_blocks: [i32; ROOT_DIR_BLOCKS] =
                std::array::from_fn(|i| ROOT_DIR_START + i as i32);

            let mut inode_table = InodeTable::empty();
            let mut root_dir_inode = Inode::FREE;
            root_dir_inode.size = (ROOT_DIR_BLOCKS * BLOCK_SIZE) as i32;
            root_dir_inode.pointers[..ROOT_DIR_BLOCKS].copy_from_slice(&dir_blocks);
            *inode_table.get_mut(crate::layout::ROOT_INODE as usize) = root_dir_inode;

            let directory = Directory::empty();
            let fbm = Bitmap::fresh_fbm();
            let wm = Bitmap::fresh_wm();

            let mut root = Inode::FREE;
            root.size = 0;
            root.pointers[..INODE_FILE_BLOCKS].copy_from_slice(&inode_file_blocks);
            let superblock = Superblock::fresh(root);

            let zero = vec![0u8; DATA_BLOCKS * BLOCK_SIZE];
            disk.write(DATA_START, DATA_BLOCKS, &zero)?;

            inode_table.commit(&mut disk, &inode_file_blocks)?;
            directory.commit(&mut disk, &dir_blocks)?;
            fbm.commit(&mut disk)?;
            wm.commit(&mut disk)?;
            superblock.commit(&mut disk)?;

            Ok(Self {
                disk,
                superblock,
                fbm,
                wm,
                inode_table,
                inode_file_blocks,
                directory,
                dir_blocks,
                fd_table: FdTable::empty(),
            })
        } else {
            let superblock = Superblock::load(&mut disk)?;
            let mut inode_file_blocks = [-1i32; INODE_FILE_BLOCKS];
            inode_file_blocks.copy_from_slice(&superblock.root.pointers[..INODE_FILE_BLOCKS]);
            let inode_table = InodeTable::load(&mut disk, &inode_file_blocks)?;

            let mut dir_blocks = [-1i32; ROOT_DIR_BLOCKS];
            dir_blocks.copy_from_slice(&inode_table.get(crate::layout::ROOT_INODE as usize).pointers[..ROOT_DIR_BLOCKS]);
            let directory = Directory::load(&mut disk, &dir_blocks)?;

            let fbm = Bitmap::load(&mut disk, FBM_BLOCK)?;
            let wm = Bitmap::load(&mut disk, WM_BLOCK)?;

            Ok(Self {
                disk,
                superblock,
                fbm,
                wm,
                inode_table,
                inode_file_blocks,
                directory,
                dir_blocks,
                fd_table: FdTable::empty(),
            })
        }
    }

    fn commit_inode_table(&mut self) -> Result<()> {
        self.inode_table.commit(&mut self.disk, &self.inode_file_blocks)?;
        Ok(())
    }

    fn commit_directory(&mut self) -> Result<()> {
        self.directory.commit(&mut self.disk, &self.dir_blocks)?;
        Ok(())
    }

    /// Creates a new, empty file named `name`, relocating the inode file
    /// and directory to fresh blocks and snapshotting the pre-mutation
    /// root. Returns the new inode index.
    fn create(&mut self, name: &str) -> Result<usize> {
        let inode_ix = unused_inode(&self.inode_table)?;
        let dir_slot = unused_dir_entry(&self.directory)?;

        let mut new_inode_table = clone_inode_table(&self.inode_table);
        new_inode_table.get_mut(inode_ix).size = 0;

        let mut new_directory = clone_directory(&self.directory);
        new_directory.insert(dir_slot, name, inode_ix as i32)?;

        self.relocate_and_commit(new_inode_table, new_directory)?;
        Ok(inode_ix)
    }

    /// Relocates the inode file and directory to freshly allocated blocks,
    /// commits `inode_table`/`directory` there, and makes the result the
    /// live root.
    ///
    /// Snapshots the pre-relocation root onto the shadow ring and clamps
    /// its inode-file and directory blocks read-only in WM: they are now
    /// shadow history rather than live state, and the only thing still
    /// naming them is that snapshot.
    fn relocate_and_commit(&mut self, mut inode_table: InodeTable, directory: Directory) -> Result<()> {
        let new_inode_file_blocks = alloc_n::<INODE_FILE_BLOCKS>(&mut self.fbm)?;
        let new_dir_blocks = alloc_n::<ROOT_DIR_BLOCKS>(&mut self.fbm)?;

        inode_table
            .get_mut(crate::layout::ROOT_INODE as usize)
            .pointers[..ROOT_DIR_BLOCKS]
            .copy_from_slice(&new_dir_blocks);

        inode_table.commit(&mut self.disk, &new_inode_file_blocks)?;
        directory.commit(&mut self.disk, &new_dir_blocks)?;

        for &b in new_inode_file_blocks.iter().chain(new_dir_blocks.iter()) {
            self.wm.set(b, true);
        }

        shadow::record(&mut self.superblock, &mut self.disk, &mut self.fbm)?;
        for &b in self.inode_file_blocks.iter().chain(self.dir_blocks.iter()) {
            self.wm.clear(b);
        }

        let mut new_root = Inode::FREE;
        new_root.size = 0;
        new_root.pointers[..INODE_FILE_BLOCKS].copy_from_slice(&new_inode_file_blocks);
        self.superblock.root = new_root;

        self.inode_table = inode_table;
        self.inode_file_blocks = new_inode_file_blocks;
        self.directory = directory;
        self.dir_blocks = new_dir_blocks;

        self.superblock.commit(&mut self.disk)?;
        self.fbm.commit(&mut self.disk)?;
        self.wm.commit(&mut self.disk)?;
        Ok(())
    }

    /// Relocates the inode file and directory to fresh blocks if either is
    /// currently clamped read-only in WM, so a later in-place metadata
    /// commit never overwrites a block a prior [`FileSystem::commit`]
    /// checkpointed.
    fn ensure_writable_metadata(&mut self) -> Result<()> {
        let locked = self
            .inode_file_blocks
            .iter()
            .chain(self.dir_blocks.iter())
            .any(|&b| !self.wm.is_set(b));
        if locked {
            let inode_table = clone_inode_table(&self.inode_table);
            let directory = clone_directory(&self.directory);
            self.relocate_and_commit(inode_table, directory)?;
        }
        Ok(())
    }

    /// Opens `name`, creating it if it doesn't exist yet. Returns a file
    /// descriptor, or `-1`.
    pub fn open(&mut self, name: &str) -> i32 {
        sentinel(self.open_inner(name))
    }

    fn open_inner(&mut self, name: &str) -> Result<i32> {
        if name.is_empty() || name.len() > NAME_MAX {
            return Err(FsError::Argument("name length out of range"));
        }
        let inode_ix = match self.directory.find(name) {
            Some(slot) => self.directory.get(slot).inode_index,
            None => self.create(name)? as i32,
        };
        if let Some(fd) = self.fd_table.find_open(inode_ix) {
            return Ok(fd);
        }
        let fd = unused_fd(&self.fd_table)?;
        let size = self.inode_table.get(inode_ix as usize).size;
        self.fd_table.open(fd, inode_ix);
        if let Some(d) = self.fd_table.get_mut(fd) {
            d.write_cursor.offset = size;
        }
        Ok(fd)
    }

    /// Closes `fd`.
    pub fn close(&mut self, fd: i32) -> i32 {
        sentinel(self.close_inner(fd).map(|()| 0))
    }

    fn close_inner(&mut self, fd: i32) -> Result<()> {
        let open = self
            .fd_table
            .get(fd)
            .filter(|d| d.is_open())
            .ok_or(FsError::Argument("descriptor is not open"))?;
        let _ = open;
        self.fd_table.close(fd);
        Ok(())
    }

    /// Moves `fd`'s read cursor to `loc`.
    pub fn seek_read(&mut self, fd: i32, loc: i32) -> i32 {
        sentinel(self.seek_inner(fd, loc, true).map(|()| 0))
    }

    /// Moves `fd`'s write cursor to `loc`.
    pub fn seek_write(&mut self, fd: i32, loc: i32) -> i32 {
        sentinel(self.seek_inner(fd, loc, false).map(|()| 0))
    }

    fn seek_inner(&mut self, fd: i32, loc: i32, is_read: bool) -> Result<()> {
        if loc < 0 {
            return Err(FsError::Argument("seek to a negative offset"));
        }
        let inode_ix = self
            .fd_table
            .get(fd)
            .filter(|d| d.is_open())
            .map(|d| d.inode_index)
            .ok_or(FsError::Argument("descriptor is not open"))?;
        let size = self.inode_table.get(inode_ix as usize).size;
        if loc > size {
            return Err(FsError::State("seek past end of file"));
        }
        let d = self.fd_table.get_mut(fd).unwrap();
        if is_read {
            d.read_cursor.offset = loc;
        } else {
            d.write_cursor.offset = loc;
        }
        Ok(())
    }

    /// Reads up to `n` bytes from `fd`'s current read cursor into `buf`,
    /// stopping at end-of-file. Returns the number of bytes actually read,
    /// or `-1`.
    pub fn read(&mut self, fd: i32, buf: &mut [u8], n: usize) -> i32 {
        sentinel(self.read_inner(fd, buf, n))
    }

    fn read_inner(&mut self, fd: i32, buf: &mut [u8], n: usize) -> Result<i32> {
        let inode_ix = self
            .fd_table
            .get(fd)
            .filter(|d| d.is_open())
            .map(|d| d.inode_index)
            .ok_or(FsError::Argument("descriptor is not open"))? as usize;

        let mut offset = self.fd_table.get(fd).unwrap().read_cursor.offset;
        let size = self.inode_table.get(inode_ix).size;
        let want = n.min(buf.len());
        let mut done = 0usize;

        while done < want && offset < size {
            let block_in_file = (offset / BLOCK_SIZE as i32) as usize;
            let within = (offset % BLOCK_SIZE as i32) as usize;
            let chunk = (BLOCK_SIZE - within)
                .min(want - done)
                .min((size - offset) as usize);

            let block = match next_block_to_read(&mut self.inode_table, inode_ix, block_in_file) {
                Ok(b) => b,
                Err(FsError::State(_)) => break,
                Err(e) => return Err(e),
            };
            read_sub(&mut self.disk, block, within, &mut buf[done..done + chunk])?;

            done += chunk;
            offset += chunk as i32;
        }

        self.fd_table.get_mut(fd).unwrap().read_cursor.offset = offset;
        Ok(done as i32)
    }

    /// Writes up to `n` bytes from `buf` at `fd`'s current write cursor,
    /// extending the file and allocating blocks as needed. Returns the
    /// number of bytes actually written, or `-1`.
    pub fn write(&mut self, fd: i32, buf: &[u8], n: usize) -> i32 {
        sentinel(self.write_inner(fd, buf, n))
    }

    fn write_inner(&mut self, fd: i32, buf: &[u8], n: usize) -> Result<i32> {
        let inode_ix = self
            .fd_table
            .get(fd)
            .filter(|d| d.is_open())
            .map(|d| d.inode_index)
            .ok_or(FsError::Argument("descriptor is not open"))? as usize;

        self.ensure_writable_metadata()?;

        let mut offset = self.fd_table.get(fd).unwrap().write_cursor.offset;
        let want = n.min(buf.len());
        let mut done = 0usize;

        while done < want {
            let block_in_file = (offset / BLOCK_SIZE as i32) as usize;
            let within = (offset % BLOCK_SIZE as i32) as usize;
            let chunk = (BLOCK_SIZE - within).min(want - done);

            let block = next_block_to_write(&mut self.inode_table, &mut self.fbm, inode_ix, block_in_file)?;
            write_sub(&mut self.disk, block, within, &buf[done..done + chunk])?;

            done += chunk;
            offset += chunk as i32;
            if offset > self.inode_table.get(inode_ix).size {
                self.propagate_size(inode_ix, offset);
            }
        }

        self.fd_table.get_mut(fd).unwrap().write_cursor.offset = offset;
        self.commit_inode_table()?;
        self.fbm.commit(&mut self.disk)?;
        Ok(done as i32)
    }

    /// Sets `size` on every inode in the chain starting at `inode_ix`, so
    /// every chain member agrees on the file's size.
    fn propagate_size(&mut self, inode_ix: usize, size: i32) {
        let mut cur = Some(inode_ix);
        while let Some(ix) = cur {
            let inode = self.inode_table.get_mut(ix);
            inode.size = size;
            cur = inode.indirect();
        }
    }

    /// Removes `name`, freeing every block and chained inode in its
    /// chain. Returns `0`, or `-1`.
    pub fn remove(&mut self, name: &str) -> i32 {
        sentinel(self.remove_inner(name).map(|()| 0))
    }

    fn remove_inner(&mut self, name: &str) -> Result<()> {
        let slot = self
            .directory
            .find(name)
            .ok_or(FsError::Argument("no such file"))?;
        let inode_ix = self.directory.get(slot).inode_index as usize;

        self.ensure_writable_metadata()?;

        let zero = [0u8; BLOCK_SIZE];
        let mut cur = Some(inode_ix);
        while let Some(ix) = cur {
            let next = self.inode_table.get(ix).indirect();
            let pointers = self.inode_table.get(ix).pointers;
            for &p in &pointers[..crate::layout::DIRECT_PTRS] {
                if p != -1 {
                    self.disk.write(p, 1, &zero)?;
                    self.fbm.set(p, true);
                }
            }
            self.fd_table.close_all_for_inode(ix as i32);
            *self.inode_table.get_mut(ix) = Inode::FREE;
            cur = next;
        }

        self.directory.remove(slot);
        self.commit_directory()?;
        self.commit_inode_table()?;
        self.fbm.commit(&mut self.disk)?;
        Ok(())
    }

    /// Reports whether `block` is currently free in the FBM. Mostly
    /// useful for observing that shadow eviction actually reclaims blocks.
    pub fn is_block_free(&self, block: i32) -> bool {
        self.fbm.is_set(block)
    }

    /// Returns a copy of the inode backing `fd`'s open file: its size and
    /// chain pointers. Lets a caller observe chain shape directly.
    pub fn inspect_inode(&self, fd: i32) -> Option<Inode> {
        let ix = self.fd_table.get(fd).filter(|d| d.is_open())?.inode_index;
        Some(*self.inode_table.get(ix as usize))
    }

    /// Returns a copy of the inode at a chain index reached via
    /// [`Inode::indirect`], for following a chain past its head.
    pub fn inspect_inode_at(&self, inode_index: usize) -> Inode {
        *self.inode_table.get(inode_index)
    }

    /// Clamps the live inode-file and directory blocks read-only in WM.
    ///
    /// This does not itself push a shadow snapshot: it only marks the
    /// current metadata blocks as not to be overwritten in place. The next
    /// mutation that would otherwise commit in place instead relocates to
    /// fresh blocks first, which is what actually pushes this generation
    /// onto the shadow ring. Returns `0`.
    pub fn commit(&mut self) -> i32 {
        sentinel(self.commit_checkpoint().map(|()| 0))
    }

    fn commit_checkpoint(&mut self) -> Result<()> {
        for &b in self.inode_file_blocks.iter().chain(self.dir_blocks.iter()) {
            self.wm.clear(b);
        }
        self.wm.commit(&mut self.disk)?;
        Ok(())
    }

    /// Makes shadow slot `slot` (`0` = oldest) the live root again,
    /// reloading every cache from it and invalidating open descriptors.
    /// Returns `0`, or `-1` if `slot` names no snapshot.
    pub fn restore(&mut self, slot: usize) -> i32 {
        sentinel(self.restore_inner(slot).map(|()| 0))
    }

    fn restore_inner(&mut self, slot: usize) -> Result<()> {
        let root = shadow::restore(&self.superblock, slot)
            .ok_or(FsError::Capacity(Resource::ShadowSlot))?;

        let mut inode_file_blocks = [-1i32; INODE_FILE_BLOCKS];
        inode_file_blocks.copy_from_slice(&root.pointers[..INODE_FILE_BLOCKS]);
        let inode_table = InodeTable::load(&mut self.disk, &inode_file_blocks)?;

        let mut dir_blocks = [-1i32; ROOT_DIR_BLOCKS];
        dir_blocks.copy_from_slice(&inode_table.get(crate::layout::ROOT_INODE as usize).pointers[..ROOT_DIR_BLOCKS]);
        let directory = Directory::load(&mut self.disk, &dir_blocks)?;

        self.superblock.root = root;
        self.inode_table = inode_table;
        self.inode_file_blocks = inode_file_blocks;
        self.directory = directory;
        self.dir_blocks = dir_blocks;
        self.fd_table = FdTable::empty();

        self.superblock.commit(&mut self.disk)?;
        Ok(())
    }
}

fn alloc_n<const N: usize>(fbm: &mut Bitmap) -> Result<[i32; N]> {
    let mut out = [-1i32; N];
    for slot in out.iter_mut() {
        let b = fbm
            .first_free_data_block()
            .ok_or(FsError::Capacity(Resource::Block))?;
        fbm.clear(b);
        *slot = b;
    }
    Ok(out)
}

fn clone_inode_table(table: &InodeTable) -> InodeTable {
    let mut copy = InodeTable::empty();
    for (ix, inode) in table.iter() {
        *copy.get_mut(ix) = *inode;
    }
    copy
}

fn clone_directory(dir: &Directory) -> Directory {
    let mut copy = Directory::empty();
    for ix in 0..crate::layout::MAX_FILES {
        let e = dir.get(ix);
        if e.inode_index != -1 {
            let _ = copy.insert(ix, e.name_str(), e.inode_index);
        } else if ix != 0 {
            copy.remove(ix);
        }
    }
    copy
}

/// Handles an otherwise-unrecoverable I/O failure by logging and aborting.
/// Exposed for embedders who load or mount outside of
/// [`FileSystem::mount`] and want the same policy.
pub fn abort_on_io_error(e: FsError) -> ! {
    fatal(e)
}
