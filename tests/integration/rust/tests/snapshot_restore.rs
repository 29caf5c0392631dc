//! Snapshot and engine integration
//!
//! Images taken mid-run and resumed in a second engine.

use bytecode_system::op;
use class_model::{names, AccessFlags, ClassBuilder};
use core_types::{Value, VmConfig};
use integration_tests::{engine_with, static_method, APP};
use interpreter::{Engine, RunOutcome};
use scheduler::Clock;
use snapshot::{load, save, CompanionRegistry, SnapshotError};

/// `app/App.tick()V` adds 1 to `ticks` then sleeps 10 ms, three times.
fn ticking_class() -> ClassBuilder {
    let mut b = ClassBuilder::new(APP);
    b.field("ticks", "I", AccessFlags::STATIC);
    let ticks = b.field_ref(APP, "ticks", "I");
    let delay = b.long(10);
    let sleep = b.method_ref(names::THREAD, "sleep", "(J)V");
    static_method(&mut b, "tick", "()V", AccessFlags::empty(), (2, 1), |asm| {
        let (head, done) = (asm.label(), asm.label());
        asm.emit(op::ICONST_0).emit(op::ISTORE_0);
        asm.bind(head);
        asm.emit(op::ILOAD_0).emit(op::ICONST_3).branch(op::IF_ICMPGE, done);
        asm.emit_u16(op::GETSTATIC, ticks).emit(op::ICONST_1).emit(op::IADD).emit_u16(op::PUTSTATIC, ticks);
        asm.emit_u16(op::LDC2_W, delay).emit_u16(op::INVOKESTATIC, sleep);
        asm.iinc(0, 1).branch(op::GOTO, head);
        asm.bind(done);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "ticks", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, ticks).emit(op::IRETURN);
    });
    b
}

fn ticks(engine: &mut Engine) -> Option<Value> {
    engine.invoke(APP, "ticks", "()I", Vec::new()).unwrap()
}

/// Two tickers, each one tick in and asleep.
fn mid_run_image() -> Vec<u8> {
    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(ticking_class().build()).unwrap();
    engine.spawn(APP, "tick", "()V", Vec::new()).unwrap();
    engine.spawn(APP, "tick", "()V", Vec::new()).unwrap();
    engine.step().unwrap();
    engine.step().unwrap();
    assert_eq!(ticks(&mut engine), Some(Value::Int(2)));
    save(&engine, &CompanionRegistry::new()).unwrap()
}

#[test]
fn test_threads_resume_in_second_engine() {
    let bytes = mid_run_image();
    let (mut engine, clock) = engine_with(VmConfig::default());
    engine.load(ticking_class().build()).unwrap();
    load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap();
    assert_eq!(engine.scheduler().live_count(), 2);
    assert_eq!(ticks(&mut engine), Some(Value::Int(2)));

    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(ticks(&mut engine), Some(Value::Int(6)));
    assert!(clock.now_millis() >= 30);
}

/// Example: a changed class hash fails the restore before any thread runs.
#[test]
fn test_changed_class_fails_before_any_thread_resumes() {
    let bytes = mid_run_image();
    let (mut engine, _) = engine_with(VmConfig::default());
    let mut changed = ticking_class();
    static_method(&mut changed, "extra", "()V", AccessFlags::empty(), (0, 0), |asm| {
        asm.emit(op::RETURN);
    });
    engine.load(changed.build()).unwrap();

    let err = load(&mut engine, &bytes, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::ClassHashMismatch { ref class, .. } if class == APP), "{}", err);
    assert_eq!(engine.scheduler().threads().count(), 0);
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(ticks(&mut engine), Some(Value::Int(0)));
}
