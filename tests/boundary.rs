//! Boundary behaviors and cross-module invariants that the six literal
//! scenarios don't already exercise.

mod common;

use common::fresh_fs;

/// B1: a write that exactly fills the first block allocates no more than
/// that one block and leaves the cursor sitting right at the block
/// boundary, not past it.
#[test]
fn exact_block_write_does_not_over_allocate() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    let buf = vec![b'z'; 1024];
    assert_eq!(fs.write(fd, &buf, 1024), 1024);

    let inode = fs.inspect_inode(fd).unwrap();
    assert_eq!(inode.size, 1024);
    assert!(inode.pointers[0] != -1);
    assert_eq!(inode.pointers[1], -1);
}

/// B3: reading more than the remaining bytes returns only what's left.
#[test]
fn read_near_eof_is_clamped_to_remaining_bytes() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert_eq!(fs.write(fd, b"hello world", 11), 11);

    // Seek to 3 bytes from the end and ask for more than that.
    assert_eq!(fs.seek_read(fd, 8), 0);
    let mut out = [0u8; 32];
    let got = fs.read(fd, &mut out, 32);
    assert_eq!(got, 3);
    assert_eq!(&out[..3], b"rld");
}

/// B4: the directory holds at most `MAX_FILES` entries, one of which (slot
/// 0) is permanently the root itself, so at most `MAX_FILES - 1` other
/// files can ever exist at once.
#[test]
fn directory_is_full_once_every_other_slot_is_taken() {
    let mut fs = fresh_fs();
    for i in 0..199 {
        let name = format!("f{i}");
        assert!(fs.open(&name) >= 0, "create {i} should have succeeded");
    }
    assert_eq!(fs.open("overflow"), -1);
}

/// P2: a block is marked used in the FBM for exactly as long as some live
/// inode chain references it.
#[test]
fn fbm_bit_tracks_block_ownership() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert_eq!(fs.write(fd, b"payload", 7), 7);
    let block = fs.inspect_inode(fd).unwrap().pointers[0];
    assert!(block != -1);
    assert!(!fs.is_block_free(block), "block backing live data must be used");

    assert_eq!(fs.close(fd), 0);
    assert_eq!(fs.remove("a"), 0);
    assert!(fs.is_block_free(block), "block must return to the free pool on remove");
}

/// P4: opening an already-open file returns the same descriptor rather
/// than a second one pointing at the same inode.
#[test]
fn reopening_an_open_file_reuses_its_descriptor() {
    let mut fs = fresh_fs();
    let fd1 = fs.open("a");
    let fd2 = fs.open("a");
    assert_eq!(fd1, fd2);
}
