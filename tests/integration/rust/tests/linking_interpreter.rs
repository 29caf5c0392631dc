//! Linker and interpreter integration
//!
//! Methods link on first call; a body that fails to link never runs.

use bytecode_system::{op, LinkError};
use class_model::{AccessFlags, ClassBuilder};
use core_types::{FatalError, Value, VmConfig};
use integration_tests::{engine_with, static_method, APP};
use interpreter::EngineError;

/// `app/App.broken()V` stores 1 in `flag`, then jumps into the middle of
/// its own `goto`.
fn broken_class() -> ClassBuilder {
    let mut b = ClassBuilder::new(APP);
    b.field("flag", "I", AccessFlags::STATIC);
    let flag = b.field_ref(APP, "flag", "I");
    static_method(&mut b, "broken", "()V", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit(op::ICONST_1).emit_u16(op::PUTSTATIC, flag);
        asm.emit_i16(op::GOTO, 1).emit(op::RETURN);
    });
    static_method(&mut b, "flag", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, flag).emit(op::IRETURN);
    });
    b
}

/// Example: a branch to a non-instruction offset fails linking and the
/// method never executes.
#[test]
fn test_branch_into_operand_fails_linking() {
    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(broken_class().build()).unwrap();

    match engine.invoke(APP, "broken", "()V", Vec::new()) {
        Err(EngineError::Fatal(FatalError::Link { method, reason })) => {
            assert_eq!(method, "app/App.broken()V");
            assert!(reason.contains("broken flow"), "{}", reason);
        }
        other => panic!("expected a link failure, got {:?}", other),
    }
    assert_eq!(engine.invoke(APP, "flag", "()I", Vec::new()).unwrap(), Some(Value::Int(0)));
}

#[test]
fn test_linker_reports_broken_flow() {
    let (mut engine, _) = engine_with(VmConfig::default());
    let id = engine.load(broken_class().build()).unwrap();
    let info = engine.linker().prepare(id).unwrap();
    let method = info.method("broken", "()V").unwrap();
    assert!(matches!(engine.linker().link(&info, method), Err(LinkError::BrokenFlow { .. })));
}

#[test]
fn test_spawning_broken_method_fails() {
    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(broken_class().build()).unwrap();
    assert!(engine.spawn(APP, "broken", "()V", Vec::new()).is_err());
    assert_eq!(engine.scheduler().live_count(), 0);
}

/// Linking the same body twice yields identical code.
#[test]
fn test_linking_is_idempotent() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "sum", "(II)I", AccessFlags::empty(), (2, 2), |asm| {
        asm.emit(op::ILOAD_0).emit(op::ILOAD_1).emit(op::IADD).emit(op::IRETURN);
    });
    let (mut engine, _) = engine_with(VmConfig::default());
    let id = engine.load(b.build()).unwrap();
    let info = engine.linker().prepare(id).unwrap();
    let method = info.method("sum", "(II)I").unwrap();

    let first = engine.linker().link(&info, method).unwrap();
    let second = engine.linker().link(&info, method).unwrap();
    assert_eq!(*first, *second);

    let args = vec![Value::Int(40), Value::Int(2)];
    assert_eq!(engine.invoke(APP, "sum", "(II)I", args.clone()).unwrap(), Some(Value::Int(42)));
    assert_eq!(engine.invoke(APP, "sum", "(II)I", args).unwrap(), Some(Value::Int(42)));
    let third = engine.linker().link(&info, method).unwrap();
    assert_eq!(*first, *third);
}

/// A missing class only matters once an instruction actually needs it.
#[test]
fn test_missing_class_surfaces_on_use() {
    let mut b = ClassBuilder::new(APP);
    let gone = b.class_ref("app/Gone");
    static_method(&mut b, "safe", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit(op::ICONST_1).emit(op::IRETURN);
    });
    static_method(&mut b, "unsafe", "()Ljava/lang/Object;", AccessFlags::empty(), (2, 0), |asm| {
        asm.emit_u16(op::NEW, gone).emit(op::ARETURN);
    });
    let (mut engine, _) = engine_with(VmConfig::default());
    engine.load(b.build()).unwrap();
    assert_eq!(engine.invoke(APP, "safe", "()I", Vec::new()).unwrap(), Some(Value::Int(1)));
    match engine.invoke(APP, "unsafe", "()Ljava/lang/Object;", Vec::new()) {
        Err(EngineError::Uncaught { class, .. }) => assert_eq!(class, "java/lang/NoClassDefFoundError"),
        other => panic!("expected NoClassDefFoundError, got {:?}", other),
    }
}
