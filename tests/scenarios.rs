//! The six literal end-to-end scenarios.

mod common;

use common::fresh_fs;

#[test]
fn scenario_1_write_then_read_back() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert!(fd >= 0);
    assert_eq!(fs.write(fd, b"hello", 5), 5);
    assert_eq!(fs.seek_read(fd, 0), 0);
    let mut out = [0u8; 5];
    assert_eq!(fs.read(fd, &mut out, 5), 5);
    assert_eq!(&out, b"hello");
    assert_eq!(fs.close(fd), 0);
}

#[test]
fn scenario_2_write_stays_within_two_direct_pointers() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    let buf = vec![b'x'; 2000];
    assert_eq!(fs.write(fd, &buf, 2000), 2000);

    let inode = fs.inspect_inode(fd).unwrap();
    assert_eq!(inode.size, 2000);
    assert!(inode.pointers[0] != -1);
    assert!(inode.pointers[1] != -1);
    for &p in &inode.pointers[2..14] {
        assert_eq!(p, -1);
    }
    assert_eq!(inode.pointers[14], -1);
}

#[test]
fn scenario_3_crossing_direct_boundary_allocates_indirect_inode() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    let n = 14 * 1024 + 5;
    let buf = vec![b'y'; n];
    assert_eq!(fs.write(fd, &buf, n), n as i32);

    let head = fs.inspect_inode(fd).unwrap();
    assert_eq!(head.size, 14341);
    assert!(head.pointers[..14].iter().all(|&p| p != -1));
    let next = head.indirect().expect("chain should have extended");
    let tail = fs.inspect_inode_at(next);
    assert_eq!(tail.size, 14341);
    assert!(tail.pointers[0] != -1);
}

#[test]
fn scenario_4_fifth_create_evicts_oldest_shadow() {
    let mut fs = fresh_fs();
    assert!(fs.open("a") >= 0);
    assert!(fs.open("b") >= 0);
    assert!(fs.open("c") >= 0);
    assert!(fs.open("d") >= 0);
    assert!(fs.open("e") >= 0);
}

#[test]
fn scenario_5_remove_then_recreate_same_name() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert_eq!(fs.write(fd, b"abcd", 4), 4);
    assert_eq!(fs.close(fd), 0);
    assert_eq!(fs.remove("a"), 0);
    let fd2 = fs.open("a");
    assert!(fd2 >= 0);
}

#[test]
fn scenario_6_double_close_fails_second_time() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert_eq!(fs.close(fd), 0);
    assert_eq!(fs.close(fd), -1);
}
