//! Tests for method linking

use std::sync::Arc;

use bytecode_system::{
    op, Assembler, CallSite, CatchType, FieldSlot, Handler, Instruction, LinkError, NamedField,
    RawCode, SymbolKind, TableSwitch, Unresolved,
};
use class_model::{install_core_classes, names, AccessFlags, ClassBuilder, ClassTable};
use core_types::{Category, FieldAccessMode, MethodId, Severity, ValueKind};
use linker::{Linker, NoHostNatives};

fn linker_with(mode: FieldAccessMode) -> Linker {
    let _ = env_logger::builder().is_test(true).try_init();
    let classes = Arc::new(ClassTable::new());
    install_core_classes(&classes).unwrap();
    Linker::new(classes, mode, Arc::new(NoHostNatives))
}

fn linker() -> Linker {
    linker_with(FieldAccessMode::Generic)
}

/// Registers `app/Main` with one static method and links it.
fn link_static(
    linker: &Linker,
    descriptor: &str,
    build: impl FnOnce(&mut ClassBuilder) -> RawCode,
) -> Result<Arc<bytecode_system::LinkedCode>, LinkError> {
    let mut builder = ClassBuilder::new("app/Main");
    let code = build(&mut builder);
    builder.method("run", descriptor, AccessFlags::STATIC, code);
    let id = linker.classes().register(builder.build()).unwrap();
    let class = linker.classes().get(id).unwrap();
    linker.link(&class, class.method("run", descriptor).unwrap())
}

#[test]
fn test_branch_into_operand_is_broken_flow() {
    let linker = linker();
    // goto +2 lands on the goto's own operand byte
    let result = link_static(&linker, "()V", |_| {
        RawCode::new(0, 0, vec![op::GOTO, 0x00, 0x02, op::RETURN])
    });
    assert_eq!(result, Err(LinkError::BrokenFlow { offset: 0, target: 2 }));
    assert_eq!(linker.classes().load_log().count(Severity::Error), 1);
    assert!(linker.classes().load_log().mentions("broken flow"));
}

#[test]
fn test_branch_past_end_is_broken_flow() {
    let linker = linker();
    let result = link_static(&linker, "()V", |_| {
        RawCode::new(0, 0, vec![op::GOTO, 0x00, 0x10, op::RETURN])
    });
    assert_eq!(result, Err(LinkError::BrokenFlow { offset: 0, target: 16 }));
}

#[test]
fn test_converging_paths_with_different_depths() {
    let linker = linker();
    let result = link_static(&linker, "(I)V", |_| {
        let mut asm = Assembler::new(1, 1);
        let join = asm.label();
        asm.emit(op::ILOAD_0).branch(op::IFEQ, join).emit(op::ICONST_1);
        asm.bind(join);
        asm.emit(op::RETURN);
        asm.finish().unwrap()
    });
    assert!(matches!(result, Err(LinkError::StackMismatch { index: 3, .. })));
}

#[test]
fn test_linking_is_idempotent() {
    let linker = linker();
    let mut builder = ClassBuilder::new("app/Main");
    builder
        .method("ok", "()I", AccessFlags::STATIC, RawCode::new(1, 0, vec![op::ICONST_1, op::IRETURN]))
        .method("bad", "()V", AccessFlags::STATIC, RawCode::new(1, 0, vec![op::POP, op::RETURN]));
    let id = linker.classes().register(builder.build()).unwrap();

    let first = linker.link_method(MethodId::new(id, 0)).unwrap();
    let second = linker.link_method(MethodId::new(id, 0)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let failure = linker.link_method(MethodId::new(id, 1)).unwrap_err();
    let logged = linker.classes().load_log().entries().len();
    assert_eq!(linker.link_method(MethodId::new(id, 1)).unwrap_err(), failure);
    assert_eq!(linker.classes().load_log().entries().len(), logged);
    assert_eq!(failure, LinkError::Underflow { index: 0 });
}

#[test]
fn test_fast_local_forms() {
    let linker = linker();
    let code = link_static(&linker, "(IJ)V", |_| {
        let mut asm = Assembler::new(2, 300);
        asm.emit(op::ILOAD_0)
            .emit(op::ISTORE_3)
            .emit_u8(op::LLOAD, 1)
            .emit_u8(op::LSTORE, 5)
            .raw(&[op::WIDE, op::ILOAD, 0x01, 0x00])
            .emit(op::POP)
            .raw(&[op::WIDE, op::IINC, 0x01, 0x00, 0xff, 0xfe])
            .iinc(3, 1)
            .emit(op::RETURN);
        asm.finish().unwrap()
    })
    .unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::Load0(Category::One),
            Instruction::Store3(Category::One),
            Instruction::Load1(Category::Two),
            Instruction::Store(5, Category::Two),
            Instruction::Load(256, Category::One),
            Instruction::Pop,
            Instruction::Iinc { index: 256, delta: -2 },
            Instruction::Iinc { index: 3, delta: 1 },
            Instruction::Return,
        ]
    );
}

#[test]
fn test_constants_decoded_once() {
    let linker = linker();
    let code = link_static(&linker, "()V", |b| {
        let text = b.string("hello");
        let big = b.integer(100_000);
        let wide = b.long(1 << 40);
        let mut asm = Assembler::new(2, 0);
        asm.emit_u8(op::LDC, text as u8)
            .emit(op::POP)
            .emit_u16(op::LDC_W, big)
            .emit(op::POP)
            .emit_u16(op::LDC2_W, wide)
            .emit(op::POP2)
            .emit_u8(op::BIPUSH, 0xf6)
            .emit(op::POP)
            .emit(op::RETURN);
        asm.finish().unwrap()
    })
    .unwrap();
    assert_eq!(code.instructions[0], Instruction::PushString("hello".into()));
    assert_eq!(code.instructions[2], Instruction::PushInt(100_000));
    assert_eq!(code.instructions[4], Instruction::PushLong(1 << 40));
    assert_eq!(code.instructions[6], Instruction::PushInt(-10));
}

#[test]
fn test_invocation_forms() {
    let linker = linker();
    let code = link_static(&linker, "(Lapp/Main;)V", |b| {
        let tick = b.method_ref("app/Main", "tick", "()V");
        let add = b.method_ref("app/Main", "add", "(IJ)I");
        let helper = b.method_ref("app/Main", "helper", "()V");
        b.method("tick", "()V", AccessFlags::PUBLIC, RawCode::new(0, 1, vec![op::RETURN]))
            .method(
                "add",
                "(IJ)I",
                AccessFlags::PUBLIC,
                RawCode::new(1, 4, vec![op::ICONST_0, op::IRETURN]),
            )
            .method("helper", "()V", AccessFlags::STATIC, RawCode::new(0, 0, vec![op::RETURN]));
        let mut asm = Assembler::new(4, 1);
        asm.emit(op::ALOAD_0)
            .emit_u16(op::INVOKEVIRTUAL, tick)
            .emit(op::ALOAD_0)
            .emit(op::ICONST_1)
            .emit(op::LCONST_0)
            .emit_u16(op::INVOKEVIRTUAL, add)
            .emit(op::POP)
            .emit_u16(op::INVOKESTATIC, helper)
            .emit(op::RETURN);
        asm.finish().unwrap()
    })
    .unwrap();

    let main = linker.classes().by_name("app/Main").unwrap();
    let signatures = linker.signatures();
    assert_eq!(
        code.instructions[1],
        Instruction::InvokeVoidNoArgs(signatures.get("tick", "()V").unwrap())
    );
    assert_eq!(
        code.instructions[5],
        Instruction::InvokeVirtual {
            signature: signatures.get("add", "(IJ)I").unwrap(),
            site: Arc::new(CallSite::new(vec![Category::One, Category::Two], Some(Category::One))),
        }
    );
    assert_eq!(
        code.instructions[7],
        Instruction::InvokeStatic {
            method: main.method("helper", "()V").unwrap().id,
            site: Arc::new(CallSite::new(Vec::new(), None)),
        }
    );
}

#[test]
fn test_interface_call_uses_signature() {
    let linker = linker();
    let code = link_static(&linker, "(Ljava/lang/Runnable;)V", |b| {
        let run = b.interface_method_ref(names::RUNNABLE, "run", "()V");
        let mut asm = Assembler::new(1, 1);
        asm.emit(op::ALOAD_0).invoke_interface(run, 1).emit(op::RETURN);
        asm.finish().unwrap()
    })
    .unwrap();
    assert_eq!(
        code.instructions[1],
        Instruction::InvokeInterface {
            signature: linker.signatures().get("run", "()V").unwrap(),
            site: Arc::new(CallSite::new(Vec::new(), None)),
        }
    );
}

fn point_getter(mode: FieldAccessMode) -> Instruction {
    let linker = linker_with(mode);
    let mut point = ClassBuilder::new("app/Point");
    point.field("x", "I", AccessFlags::PUBLIC).field("y", "J", AccessFlags::PUBLIC);
    linker.classes().register(point.build()).unwrap();
    let code = link_static(&linker, "(Lapp/Point;)J", |b| {
        let y = b.field_ref("app/Point", "y", "J");
        let mut asm = Assembler::new(2, 1);
        asm.emit(op::ALOAD_0).emit_u16(op::GETFIELD, y).emit(op::LRETURN);
        asm.finish().unwrap()
    })
    .unwrap();
    code.instructions[1].clone()
}

#[test]
fn test_generic_field_access() {
    assert_eq!(
        point_getter(FieldAccessMode::Generic),
        Instruction::GetField(Arc::new(NamedField {
            name: "y".into(),
            descriptor: "J".into(),
            kind: ValueKind::Long,
        }))
    );
}

#[test]
fn test_precompiled_field_access() {
    assert_eq!(
        point_getter(FieldAccessMode::PrecompiledBridge),
        Instruction::GetFieldSlot(FieldSlot {
            slot: 1,
            kind: ValueKind::Long,
        })
    );
}

#[test]
fn test_missing_symbols_link_as_unresolved() {
    let linker = linker();
    let code = link_static(&linker, "()I", |b| {
        let gone = b.field_ref("app/Gone", "x", "I");
        let nothing = b.method_ref("app/Main", "nothing", "(I)V");
        let mut asm = Assembler::new(2, 0);
        asm.emit_u16(op::GETSTATIC, gone)
            .emit_u16(op::INVOKESTATIC, nothing)
            .emit(op::ICONST_0)
            .emit(op::IRETURN);
        asm.finish().unwrap()
    })
    .unwrap();

    assert_eq!(
        code.instructions[0],
        Instruction::Unresolved(Box::new(Unresolved {
            kind: SymbolKind::Class,
            symbol: "app/Gone".to_string(),
            pops: Vec::new(),
            push: Some(Category::One),
        }))
    );
    assert_eq!(
        code.instructions[1],
        Instruction::Unresolved(Box::new(Unresolved {
            kind: SymbolKind::Method,
            symbol: "app/Main.nothing:(I)V".to_string(),
            pops: vec![Category::One],
            push: None,
        }))
    );
    let log = linker.classes().load_log();
    assert_eq!(log.count(Severity::Warning), 2);
    assert_eq!(log.count(Severity::Error), 0);
    assert!(log.mentions("app/Gone"));
}

#[test]
fn test_switch_targets_become_indices() {
    let linker = linker();
    let code = link_static(&linker, "(I)I", |_| {
        let mut asm = Assembler::new(1, 1);
        let (a, b, other) = (asm.label(), asm.label(), asm.label());
        asm.emit(op::ILOAD_0).table_switch(0, &[a, b], other);
        asm.bind(a);
        asm.emit(op::ICONST_1).emit(op::IRETURN);
        asm.bind(b);
        asm.emit(op::ICONST_2).emit(op::IRETURN);
        asm.bind(other);
        asm.emit(op::ICONST_0).emit(op::IRETURN);
        asm.finish().unwrap()
    })
    .unwrap();
    assert_eq!(
        code.instructions[1],
        Instruction::TableSwitch(Box::new(TableSwitch {
            low: 0,
            targets: vec![2, 4],
            default: 6,
        }))
    );
}

#[test]
fn test_handler_ranges_become_indices() {
    let linker = linker();
    let code = link_static(&linker, "()V", |b| {
        let arithmetic = b.class_ref(names::ARITHMETIC);
        let mut asm = Assembler::new(2, 0);
        let (start, end, handler, done) = (asm.label(), asm.label(), asm.label(), asm.label());
        asm.bind(start);
        asm.emit(op::ICONST_1).emit(op::ICONST_0).emit(op::IDIV).emit(op::POP);
        asm.bind(end);
        asm.branch(op::GOTO, done);
        asm.bind(handler);
        asm.emit(op::POP);
        asm.bind(done);
        asm.emit(op::RETURN);
        asm.handler(start, end, handler, arithmetic);
        asm.finish().unwrap()
    })
    .unwrap();
    let arithmetic = linker.classes().lookup(names::ARITHMETIC).unwrap();
    assert_eq!(
        code.handlers,
        vec![Handler {
            start: 0,
            end: 4,
            target: 5,
            catch: CatchType::Class(arithmetic),
        }]
    );
}

#[test]
fn test_subroutines_rejected() {
    let linker = linker();
    let result = link_static(&linker, "()V", |_| {
        RawCode::new(1, 0, vec![op::JSR, 0x00, 0x03, op::RETURN])
    });
    assert!(matches!(result, Err(LinkError::Unsupported { offset: 0, .. })));
}

#[test]
fn test_native_method_has_no_code() {
    let linker = linker();
    let object = linker.classes().by_name(names::OBJECT).unwrap();
    let notify = object.method("notify", "()V").unwrap();
    assert_eq!(linker.link(&object, notify), Err(LinkError::EmptyCode));
}

#[test]
fn test_link_all_counts_failures() {
    let linker = linker();
    let mut builder = ClassBuilder::new("app/Mixed");
    builder
        .method("a", "()V", AccessFlags::STATIC, RawCode::new(0, 0, vec![op::RETURN]))
        .method("b", "()V", AccessFlags::STATIC, RawCode::new(0, 0, vec![op::NOP]));
    let id = linker.classes().register(builder.build()).unwrap();
    assert_eq!(linker.link_all(id), 1);
}
