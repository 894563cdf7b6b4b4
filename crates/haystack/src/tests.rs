//! Integration tests against the public facade API.

use super::*;

#[test]
fn end_to_end_write_read_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path()).unwrap();
    let volume = store.create_volume(VolumeId::new(7)).unwrap();

    volume
        .write_needle(Key::new(42), Cookie::new(1), b"hello")
        .unwrap();
    assert_eq!(volume.read_needle(Key::new(42)).unwrap().data, b"hello");

    volume.delete_needle(Key::new(42), Cookie::new(1)).unwrap();
    assert!(volume.read_needle(Key::new(42)).is_err());

    store.close().unwrap();
}

#[test]
fn opening_a_corrupt_superblock_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("7.dat"), [0u8; 8]).unwrap();
    let err = Store::open(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::BadSuperBlock { .. }));
}
