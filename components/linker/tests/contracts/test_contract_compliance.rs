//! Contract compliance tests for linker
//! Verifies the guarantees the interpreter depends on

use std::sync::Arc;

use bytecode_system::{op, Instruction, RawCode};
use class_model::{install_core_classes, names, AccessFlags, ClassBuilder, ClassTable};
use core_types::{FieldAccessMode, MethodId};
use linker::{Linker, NativeResolver, NoHostNatives, SignatureTable};

fn linker() -> Linker {
    let classes = Arc::new(ClassTable::new());
    install_core_classes(&classes).unwrap();
    Linker::new(classes, FieldAccessMode::Generic, Arc::new(NoHostNatives))
}

/// The linker is shared by every thread of an engine.
#[test]
fn test_contract_linker_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Linker>();
    assert_send_sync::<SignatureTable>();
    assert_send_sync::<Arc<dyn NativeResolver>>();
}

/// Every prepared class has a size and a virtual table.
#[test]
fn test_contract_prepared_classes_are_complete() {
    let linker = linker();
    for class in linker.classes().all() {
        let prepared = linker.prepare(class.id).unwrap();
        assert!(prepared.size().is_some(), "{} has no size", prepared.name);
        assert!(prepared.vtable().is_some(), "{} has no vtable", prepared.name);
    }
}

/// Linked branch targets are always valid instruction indices.
#[test]
fn test_contract_branch_targets_in_range() {
    let linker = linker();
    let object = linker.classes().lookup(names::OBJECT).unwrap();
    assert_eq!(linker.link_all(object), 0);
    let thread = linker.classes().lookup(names::THREAD).unwrap();
    assert_eq!(linker.link_all(thread), 0);

    for id in [object, thread] {
        let class = linker.classes().get(id).unwrap();
        for method in &class.methods {
            if let Some(code) = method.linked() {
                for instruction in &code.instructions {
                    for target in instruction.branch_targets() {
                        assert!((target as usize) < code.len());
                    }
                }
            }
        }
    }
}

/// Core classes link without load errors.
#[test]
fn test_contract_core_classes_link_cleanly() {
    let linker = linker();
    let failures: usize = linker
        .classes()
        .all()
        .iter()
        .map(|class| linker.link_all(class.id))
        .sum();
    assert_eq!(failures, 0);
}

/// `()V` virtual calls always use the fast form.
#[test]
fn test_contract_void_no_args_fast_form() {
    let linker = linker();
    let mut builder = ClassBuilder::new("app/Caller");
    let run = builder.method_ref(names::THREAD, "run", "()V");
    builder.method(
        "go",
        "(Ljava/lang/Thread;)V",
        AccessFlags::STATIC,
        RawCode::new(1, 1, vec![op::ALOAD_0, op::INVOKEVIRTUAL, (run >> 8) as u8, run as u8, op::RETURN]),
    );
    let id = linker.classes().register(builder.build()).unwrap();
    let code = linker.link_method(MethodId::new(id, 0)).unwrap();
    assert!(matches!(code.instructions[1], Instruction::InvokeVoidNoArgs(_)));
}
