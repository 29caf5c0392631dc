//! Scheduler and interpreter integration
//!
//! Threads running bytecode under the cooperative rotation, with monitors
//! and uncaught exceptions.

use bytecode_system::op;
use class_model::{names, AccessFlags, ClassBuilder};
use core_types::{Value, VmConfig};
use integration_tests::{engine_with, static_method, APP};
use interpreter::{Engine, RunOutcome};
use scheduler::ThreadState;

const INSPECTOR: &str = "app/Inspector";

/// Registers `app/Inspector.count(Object)I`: the monitor count of the object
/// if the calling thread owns it, else -1.
fn install_inspector(engine: &mut Engine) {
    let mut inspector = ClassBuilder::new(INSPECTOR);
    inspector.native_method("count", "(Ljava/lang/Object;)I", AccessFlags::STATIC);
    engine.load(inspector.build()).unwrap();
    engine.register_native(INSPECTOR, "count", "(Ljava/lang/Object;)I", |ctx, args| {
        let object = args[0].as_reference().unwrap_or_default();
        let thread = ctx.thread();
        let count = match ctx.heap().get(object) {
            Some(o) if o.monitor.owner() == Some(thread) => o.monitor.count() as i32,
            _ => -1,
        };
        Ok(Some(Value::Int(count)))
    });
}

fn get_static(engine: &mut Engine, getter: &str) -> Option<Value> {
    engine.invoke(APP, getter, "()I", Vec::new()).unwrap()
}

/// Example: A waits on O holding it twice, B notifies; A resumes owning O
/// with count 2 and B keeps O until it returns.
#[test]
fn test_wait_restores_reentrancy() {
    let mut b = ClassBuilder::new(APP);
    b.field("resumed", "I", AccessFlags::STATIC)
        .field("notified", "I", AccessFlags::STATIC);
    let app = b.class_ref(APP);
    let resumed = b.field_ref(APP, "resumed", "I");
    let notified = b.field_ref(APP, "notified", "I");
    let wait = b.method_ref(names::OBJECT, "wait", "()V");
    let notify = b.method_ref(names::OBJECT, "notify", "()V");
    let count = b.method_ref(INSPECTOR, "count", "(Ljava/lang/Object;)I");
    static_method(&mut b, "waiter", "()V", AccessFlags::SYNCHRONIZED, (1, 0), |asm| {
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITORENTER);
        asm.emit_u8(op::LDC, app as u8).emit_u16(op::INVOKEVIRTUAL, wait);
        asm.emit_u8(op::LDC, app as u8).emit_u16(op::INVOKESTATIC, count).emit_u16(op::PUTSTATIC, resumed);
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITOREXIT);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "notifier", "()V", AccessFlags::SYNCHRONIZED, (1, 0), |asm| {
        asm.emit_u8(op::LDC, app as u8).emit_u16(op::INVOKEVIRTUAL, notify);
        asm.emit_u8(op::LDC, app as u8).emit_u16(op::INVOKESTATIC, count).emit_u16(op::PUTSTATIC, notified);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "resumed", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, resumed).emit(op::IRETURN);
    });
    static_method(&mut b, "notified", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, notified).emit(op::IRETURN);
    });

    let (mut engine, _) = engine_with(VmConfig::default());
    install_inspector(&mut engine);
    engine.load(b.build()).unwrap();

    let waiter = engine.spawn(APP, "waiter", "()V", Vec::new()).unwrap();
    engine.step().unwrap();
    assert_eq!(engine.thread_state(waiter), Some(ThreadState::Detached));
    let mirror = engine.heap().mirror(engine.classes().lookup(APP).unwrap()).unwrap();
    assert_eq!(engine.heap().get(mirror).unwrap().monitor.owner(), None);

    engine.spawn(APP, "notifier", "()V", Vec::new()).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(get_static(&mut engine, "notified"), Some(Value::Int(1)));
    assert_eq!(get_static(&mut engine, "resumed"), Some(Value::Int(2)));
    assert!(engine.heap().get(mirror).unwrap().monitor.is_idle());
}

/// Example: an uncaught exception ends only its own thread.
#[test]
fn test_uncaught_exception_ends_one_thread() {
    let mut b = ClassBuilder::new(APP);
    b.field("total", "I", AccessFlags::STATIC);
    let total = b.field_ref(APP, "total", "I");
    let yield_now = b.method_ref(names::THREAD, "yield", "()V");
    static_method(&mut b, "crash", "()V", AccessFlags::empty(), (2, 0), |asm| {
        asm.emit(op::ICONST_1).emit(op::ICONST_0).emit(op::IDIV).emit(op::POP).emit(op::RETURN);
    });
    static_method(&mut b, "count", "()V", AccessFlags::empty(), (2, 1), |asm| {
        let (head, done) = (asm.label(), asm.label());
        asm.emit(op::ICONST_0).emit(op::ISTORE_0);
        asm.bind(head);
        asm.emit(op::ILOAD_0).emit_u8(op::BIPUSH, 5).branch(op::IF_ICMPGE, done);
        asm.emit_u16(op::GETSTATIC, total).emit(op::ICONST_1).emit(op::IADD).emit_u16(op::PUTSTATIC, total);
        asm.emit_u16(op::INVOKESTATIC, yield_now);
        asm.iinc(0, 1).branch(op::GOTO, head);
        asm.bind(done);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "total", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, total).emit(op::IRETURN);
    });

    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(b.build()).unwrap();
    let counter = engine.spawn(APP, "count", "()V", Vec::new()).unwrap();
    let crasher = engine.spawn(APP, "crash", "()V", Vec::new()).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);

    let uncaught = engine.uncaught_exceptions();
    assert_eq!(uncaught.len(), 1);
    assert_eq!(uncaught[0].thread, crasher);
    assert_eq!(uncaught[0].class, names::ARITHMETIC);
    assert_ne!(uncaught[0].thread, counter);
    assert_eq!(get_static(&mut engine, "total"), Some(Value::Int(5)));
}

/// Ready threads are visited in a stable rotation.
#[test]
fn test_rotation_is_stable() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "spin", "()V", AccessFlags::empty(), (0, 0), |asm| {
        let head = asm.label();
        asm.bind(head);
        asm.branch(op::GOTO, head);
    });
    let (mut engine, _) = engine_with(VmConfig {
        slice_cycles: 7,
        ..VmConfig::default()
    });
    engine.load(b.build()).unwrap();
    let threads: Vec<_> = (0..3).map(|_| engine.spawn(APP, "spin", "()V", Vec::new()).unwrap()).collect();
    let visits: Vec<_> = (0..9).map(|_| engine.step().unwrap().unwrap()).collect();
    assert_eq!(visits, [threads.clone(), threads.clone(), threads].concat());
}

/// Nested monitor entries need as many exits before another thread gets in.
#[test]
fn test_reentrant_monitor_blocks_until_fully_released() {
    let mut b = ClassBuilder::new(APP);
    b.field("order", "I", AccessFlags::STATIC);
    let app = b.class_ref(APP);
    let order = b.field_ref(APP, "order", "I");
    let yield_now = b.method_ref(names::THREAD, "yield", "()V");
    static_method(&mut b, "holder", "()V", AccessFlags::empty(), (2, 0), |asm| {
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITORENTER);
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITORENTER);
        asm.emit_u16(op::INVOKESTATIC, yield_now);
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITOREXIT);
        asm.emit_u16(op::INVOKESTATIC, yield_now);
        asm.emit_u16(op::GETSTATIC, order).emit_u8(op::BIPUSH, 10).emit(op::IMUL).emit_u16(op::PUTSTATIC, order);
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITOREXIT);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "contender", "()V", AccessFlags::empty(), (2, 0), |asm| {
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITORENTER);
        asm.emit_u16(op::GETSTATIC, order).emit(op::ICONST_1).emit(op::IADD).emit_u16(op::PUTSTATIC, order);
        asm.emit_u8(op::LDC, app as u8).emit(op::MONITOREXIT);
        asm.emit(op::RETURN);
    });
    static_method(&mut b, "order", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, order).emit(op::IRETURN);
    });

    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(b.build()).unwrap();
    engine.spawn(APP, "holder", "()V", Vec::new()).unwrap();
    let contender = engine.spawn(APP, "contender", "()V", Vec::new()).unwrap();
    engine.step().unwrap();
    engine.step().unwrap();
    assert_eq!(engine.thread_state(contender), Some(ThreadState::Detached));
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    // The holder multiplied before the contender could add.
    assert_eq!(get_static(&mut engine, "order"), Some(Value::Int(1)));
}
