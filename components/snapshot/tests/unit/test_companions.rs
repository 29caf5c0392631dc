//! Native companions across save and load.

use std::any::Any;

use bytecode_system::op;
use class_model::{AccessFlags, ClassBuilder};
use core_types::Value;
use interpreter::Engine;
use memory_manager::NativeCompanion;
use serde::{Deserialize, Serialize};
use snapshot::{load, save, CompanionRegistry, SnapshotError};

use crate::support::{engine_at, static_method};

const HOST: &str = "app/Host";
const HANDLE: &str = "app/Handle";
const USER: &str = "app/User";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    hits: i32,
}

impl NativeCompanion for Counter {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Loads `app/Handle`, the `app/Host` natives and `app/User`, whose
/// `setup()V` stores a fresh handle and whose `bump()I` counts on it.
fn prepare(engine: &mut Engine) {
    engine.load(ClassBuilder::new(HANDLE).build()).unwrap();
    let mut host = ClassBuilder::new(HOST);
    host.native_method("make", "()Ljava/lang/Object;", AccessFlags::STATIC)
        .native_method("bump", "(Ljava/lang/Object;)I", AccessFlags::STATIC);
    engine.load(host.build()).unwrap();
    engine.register_native(HOST, "make", "()Ljava/lang/Object;", |ctx, _| {
        let handle = ctx.new_object(HANDLE)?;
        ctx.attach_companion(handle, Box::<Counter>::default());
        Ok(Some(Value::Ref(handle)))
    });
    engine.register_native(HOST, "bump", "(Ljava/lang/Object;)I", |ctx, args| {
        let handle = args[0].as_reference().unwrap_or_default();
        let counter = ctx.companion_mut::<Counter>(handle).expect("handle has a counter");
        counter.hits += 1;
        Ok(Some(Value::Int(counter.hits)))
    });

    let mut user = ClassBuilder::new(USER);
    user.field("handle", "Ljava/lang/Object;", AccessFlags::STATIC);
    let handle = user.field_ref(USER, "handle", "Ljava/lang/Object;");
    let make = user.method_ref(HOST, "make", "()Ljava/lang/Object;");
    let bump = user.method_ref(HOST, "bump", "(Ljava/lang/Object;)I");
    static_method(&mut user, "setup", "()V", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::INVOKESTATIC, make).emit_u16(op::PUTSTATIC, handle).emit(op::RETURN);
    });
    static_method(&mut user, "bump", "()I", AccessFlags::empty(), (1, 0), |asm| {
        asm.emit_u16(op::GETSTATIC, handle).emit_u16(op::INVOKESTATIC, bump).emit(op::IRETURN);
    });
    engine.load(user.build()).unwrap();
}

fn bump(engine: &mut Engine) -> Option<Value> {
    engine.invoke(USER, "bump", "()I", Vec::new()).unwrap()
}

#[test]
fn test_companion_state_carried_by_codec() {
    let mut codecs = CompanionRegistry::new();
    codecs.register_serde::<Counter>(HANDLE);

    let (mut source, _) = engine_at(0);
    prepare(&mut source);
    source.invoke(USER, "setup", "()V", Vec::new()).unwrap();
    assert_eq!(bump(&mut source), Some(Value::Int(1)));
    let bytes = save(&source, &codecs).unwrap();

    let (mut engine, _) = engine_at(0);
    prepare(&mut engine);
    load(&mut engine, &bytes, &codecs).unwrap();
    assert_eq!(bump(&mut engine), Some(Value::Int(2)));
}

#[test]
fn test_companion_without_codec_fails_capture() {
    let (mut engine, _) = engine_at(0);
    prepare(&mut engine);
    engine.invoke(USER, "setup", "()V", Vec::new()).unwrap();
    let err = save(&engine, &CompanionRegistry::new()).unwrap_err();
    assert!(matches!(err, SnapshotError::NoCodec(ref class) if class == HANDLE));
}
