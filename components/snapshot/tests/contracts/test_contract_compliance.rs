//! Contract tests for the snapshot public API.

use std::sync::Arc;

use class_model::ClassTable;
use core_types::VmConfig;
use interpreter::Engine;
use snapshot::{capture, load, save, CompanionRegistry, SnapshotError, SnapshotImage, FORMAT_VERSION, MAGIC};

fn engine() -> Engine {
    Engine::new(Arc::new(ClassTable::new()), VmConfig::default()).unwrap()
}

#[test]
fn test_image_starts_with_magic_and_version() {
    let bytes = save(&engine(), &CompanionRegistry::new()).unwrap();
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
}

#[test]
fn test_empty_engine_round_trips() {
    let source = engine();
    let image = capture(&source, &CompanionRegistry::new()).unwrap();
    assert!(image.threads.is_empty());

    let mut target = engine();
    load(&mut target, &image.to_bytes().unwrap(), &CompanionRegistry::new()).unwrap();
    assert_eq!(target.heap().len(), source.heap().len());
    assert_eq!(target.out_of_memory_error(), source.out_of_memory_error());
}

#[test]
fn test_foreign_bytes_rejected() {
    assert!(matches!(SnapshotImage::from_bytes(b"not an image at all"), Err(SnapshotError::BadMagic)));
    assert!(matches!(SnapshotImage::from_bytes(b"HV"), Err(SnapshotError::Truncated) | Err(SnapshotError::BadMagic)));
}

#[test]
fn test_capture_leaves_engine_untouched() {
    let source = engine();
    let objects = source.heap().len();
    capture(&source, &CompanionRegistry::new()).unwrap();
    assert_eq!(source.heap().len(), objects);
    assert_eq!(source.scheduler().threads().count(), 0);
}
