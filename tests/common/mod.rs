use ssfs::{FileSystem, MemDisk};

/// Shared setup for integration tests: initializes the `log` facade's
/// subscriber once and mounts a fresh in-memory volume.
pub fn fresh_fs() -> FileSystem<MemDisk> {
    let _ = env_logger::builder().is_test(true).try_init();
    FileSystem::mount(MemDisk::new(), true).expect("mkfs on a fresh MemDisk cannot fail")
}
