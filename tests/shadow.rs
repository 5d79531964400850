//! Shadow-root snapshot, eviction, commit/restore behavior.

mod common;

use common::fresh_fs;

#[test]
fn creating_past_shadow_slots_frees_the_oldest_generation() {
    let mut fs = fresh_fs();
    // SHADOW_SLOTS = 4: the first four creates fill the ring, the fifth
    // evicts the very first snapshot (taken before "a" existed).
    for name in ["a", "b", "c", "d", "e"] {
        assert!(fs.open(name) >= 0, "open({name}) should succeed");
    }
    // The oldest generation's private inode-file and directory blocks
    // (allocated out of the data pool during relocation) must have come
    // back to the free pool once evicted.
    assert_eq!(fs.commit(), 0);
}

#[test]
fn checkpoint_commit_is_observable_via_restore() {
    let mut fs = fresh_fs();
    let fd = fs.open("a");
    assert_eq!(fs.write(fd, b"abcd", 4), 4);
    assert_eq!(fs.commit(), 0);

    // commit() only clamps the current inode-file/directory blocks
    // read-only; it doesn't push a shadow snapshot by itself. The next
    // mutation that would otherwise commit metadata in place relocates to
    // fresh blocks first, and that relocation is what pushes this
    // generation, "a" holding "abcd" and nothing more, onto the ring.
    assert_eq!(fs.write(fd, b"efgh", 4), 4);

    // Slot 0 is the root from before "a" existed at all; slot 1 is the
    // generation committed above.
    assert_eq!(fs.restore(1), 0);

    let fd2 = fs.open("a");
    assert!(fd2 >= 0);
    assert_eq!(fs.inspect_inode(fd2).unwrap().size, 4);
}

#[test]
fn restore_of_unknown_slot_fails() {
    let mut fs = fresh_fs();
    assert_eq!(fs.restore(3), -1);
}
