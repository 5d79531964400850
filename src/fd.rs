//! Open file descriptors and read/write cursors.

use crate::layout::MAX_FILES;

/// A position within a file's byte stream, as a plain byte offset from
/// the start of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Byte offset from the start of the file.
    pub offset: i32,
}

impl Cursor {
    pub const ZERO: Cursor = Cursor { offset: 0 };
}

/// One open file descriptor: which inode it names, and independent read
/// and write cursors that advance separately from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    pub inode_index: i32,
    pub read_cursor: Cursor,
    pub write_cursor: Cursor,
}

impl FileDescriptor {
    pub const CLOSED: FileDescriptor = FileDescriptor {
        inode_index: -1,
        read_cursor: Cursor::ZERO,
        write_cursor: Cursor::ZERO,
    };

    pub fn is_open(&self) -> bool {
        self.inode_index != -1
    }
}

/// The table of open descriptors, indexed by descriptor number.
///
/// Never persisted: process-lifetime state only, reset to all-closed on
/// every mount.
pub struct FdTable {
    descriptors: [FileDescriptor; MAX_FILES],
}

impl FdTable {
    pub fn empty() -> Self {
        Self {
            descriptors: [FileDescriptor::CLOSED; MAX_FILES],
        }
    }

    pub fn get(&self, fd: i32) -> Option<&FileDescriptor> {
        self.valid_index(fd).map(|ix| &self.descriptors[ix])
    }

    pub fn get_mut(&mut self, fd: i32) -> Option<&mut FileDescriptor> {
        self.valid_index(fd).map(move |ix| &mut self.descriptors[ix])
    }

    fn valid_index(&self, fd: i32) -> Option<usize> {
        if fd < 0 || fd as usize >= MAX_FILES {
            return None;
        }
        Some(fd as usize)
    }

    /// Finds an open descriptor already bound to `inode_index`, if any, so
    /// opening an already-open file reuses its descriptor instead of
    /// handing out a second one.
    pub fn find_open(&self, inode_index: i32) -> Option<i32> {
        self.descriptors
            .iter()
            .position(|d| d.inode_index == inode_index)
            .map(|ix| ix as i32)
    }

    pub fn first_unused(&self) -> Option<i32> {
        self.descriptors
            .iter()
            .position(|d| !d.is_open())
            .map(|ix| ix as i32)
    }

    pub fn open(&mut self, fd: i32, inode_index: i32) {
        self.descriptors[fd as usize] = FileDescriptor {
            inode_index,
            read_cursor: Cursor::ZERO,
            write_cursor: Cursor::ZERO,
        };
    }

    pub fn close(&mut self, fd: i32) {
        self.descriptors[fd as usize] = FileDescriptor::CLOSED;
    }

    /// Closes every descriptor currently bound to `inode_index`.
    pub fn close_all_for_inode(&mut self, inode_index: i32) {
        for d in self.descriptors.iter_mut() {
            if d.inode_index == inode_index {
                *d = FileDescriptor::CLOSED;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_find_reuses_descriptor() {
        let mut table = FdTable::empty();
        let fd = table.first_unused().unwrap();
        table.open(fd, 3);
        assert_eq!(table.find_open(3), Some(fd));
    }

    #[test]
    fn close_frees_the_slot() {
        let mut table = FdTable::empty();
        let fd = table.first_unused().unwrap();
        table.open(fd, 3);
        table.close(fd);
        assert!(!table.get(fd).unwrap().is_open());
        assert_eq!(table.find_open(3), None);
    }

    #[test]
    fn close_all_for_inode_closes_every_matching_descriptor() {
        let mut table = FdTable::empty();
        let fd1 = table.first_unused().unwrap();
        table.open(fd1, 3);
        let fd2 = table.first_unused().unwrap();
        table.open(fd2, 3);
        let fd3 = table.first_unused().unwrap();
        table.open(fd3, 9);

        table.close_all_for_inode(3);

        assert!(!table.get(fd1).unwrap().is_open());
        assert!(!table.get(fd2).unwrap().is_open());
        assert!(table.get(fd3).unwrap().is_open());
    }
}
