//! Restoring images into fresh engines.

use class_model::AccessFlags;
use core_types::Value;
use interpreter::RunOutcome;
use scheduler::ThreadState;
use snapshot::{capture, load, restore, save, CompanionRegistry, SnapshotError, SnapshotImage};

use crate::support::{app_class, engine_at, result, APP};

/// An image of one thread asleep with 60 ms left.
fn sleeping_image() -> SnapshotImage {
    let (mut engine, clock) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    engine.spawn(APP, "sleeper", "()V", Vec::new()).unwrap();
    engine.step().unwrap();
    clock.advance(40);
    capture(&engine, &CompanionRegistry::new()).unwrap()
}

#[test]
fn test_sleeping_thread_resumes_with_time_left() {
    let bytes = sleeping_image().to_bytes().unwrap();
    let (mut engine, _) = engine_at(1_000);
    engine.load(app_class().build()).unwrap();
    load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap();

    let thread = engine.scheduler().threads().next().map(|t| t.id).unwrap();
    assert_eq!(engine.thread_state(thread), Some(ThreadState::DetachedUntil(1_060)));
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(result(&mut engine), Some(Value::Int(1_060)));
}

#[test]
fn test_waiting_thread_is_notified_after_restore() {
    let (mut source, _) = engine_at(0);
    source.load(app_class().build()).unwrap();
    let waiter = source.spawn(APP, "waiter", "()V", Vec::new()).unwrap();
    source.step().unwrap();
    assert_eq!(source.thread_state(waiter), Some(ThreadState::Detached));
    let bytes = save(&source, &CompanionRegistry::new()).unwrap();

    let (mut engine, _) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap();
    assert_eq!(engine.thread_state(waiter), Some(ThreadState::Detached));

    let notifier = engine.spawn(APP, "notifier", "()V", Vec::new()).unwrap();
    assert_ne!(notifier, waiter);
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(result(&mut engine), Some(Value::Int(11)));
}

#[test]
fn test_restored_statics_skip_initializer() {
    let (mut source, _) = engine_at(0);
    source.load(app_class().build()).unwrap();
    source.invoke(APP, "greet", "()V", Vec::new()).unwrap();
    let bytes = save(&source, &CompanionRegistry::new()).unwrap();

    let (mut engine, _) = engine_at(0);
    let id = engine.load(app_class().build()).unwrap();
    load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap();
    assert!(!engine.classes().get(id).unwrap().is_init_pending());
    let hello = engine.heap().interned("hello").unwrap();
    assert_eq!(engine.string_text(hello).as_deref(), Some("hello"));
}

#[test]
fn test_changed_class_rejects_image() {
    let bytes = sleeping_image().to_bytes().unwrap();
    let (mut engine, _) = engine_at(0);
    let mut changed = app_class();
    changed.field("extra", "I", AccessFlags::STATIC);
    engine.load(changed.build()).unwrap();
    let objects = engine.heap().len();

    let err = load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::ClassHashMismatch { ref class, .. } if class == APP));
    assert_eq!(engine.scheduler().threads().count(), 0);
    assert_eq!(engine.heap().len(), objects);
}

#[test]
fn test_changed_method_rejects_image() {
    let mut image = sleeping_image();
    image.threads[0].frames[0].method_hash = "0".repeat(64);
    let (mut engine, _) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    let err = restore(&mut engine, &image, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::MethodHashMismatch { ref method, .. } if method == "app/App.sleeper()V"));
    assert_eq!(engine.scheduler().threads().count(), 0);
}

#[test]
fn test_missing_class_rejects_image() {
    let image = sleeping_image();
    let (mut engine, _) = engine_at(0);
    let err = restore(&mut engine, &image, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::MissingClass(ref name) if name == APP));
}

#[test]
fn test_engine_with_threads_refuses_restore() {
    let image = sleeping_image();
    let (mut engine, _) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    engine.spawn(APP, "greet", "()V", Vec::new()).unwrap();
    let err = restore(&mut engine, &image, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::Busy(_)));
}

#[test]
fn test_corrupt_bytes_rejected_before_restore() {
    let mut bytes = sleeping_image().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    let (mut engine, _) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    let err = load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::ChecksumMismatch));
}

#[test]
fn test_frame_pc_at_code_end_rejects_image() {
    let mut image = sleeping_image();
    let (mut engine, _) = engine_at(0);
    engine.load(app_class().build()).unwrap();
    let sleeper = engine.find_method(APP, "sleeper", "()V").unwrap();
    let length = engine.linker().link_method(sleeper).unwrap().len();
    image.threads[0].frames[0].pc = length as u32;

    let err = restore(&mut engine, &image, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::Corrupt(_)));
    assert_eq!(engine.scheduler().threads().count(), 0);
}
