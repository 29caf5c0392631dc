//! Engine fixtures shared by the unit tests.

use std::sync::Arc;

use bytecode_system::Assembler;
use class_model::{AccessFlags, ClassBuilder, ClassTable};
use core_types::VmConfig;
use interpreter::Engine;
use scheduler::ManualClock;

pub const APP: &str = "app/App";

pub fn engine() -> Engine {
    engine_with(VmConfig::default()).0
}

pub fn engine_with(config: VmConfig) -> (Engine, Arc<ManualClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(ManualClock::new(0));
    let engine = Engine::with_clock(Arc::new(ClassTable::new()), config, clock.clone()).unwrap();
    (engine, clock)
}

/// Adds a static method whose body `body` emits into a fresh assembler.
pub fn static_method(
    builder: &mut ClassBuilder,
    name: &str,
    descriptor: &str,
    limits: (u16, u16),
    body: impl FnOnce(&mut Assembler),
) {
    method(builder, name, descriptor, AccessFlags::STATIC, limits, body);
}

pub fn method(
    builder: &mut ClassBuilder,
    name: &str,
    descriptor: &str,
    flags: AccessFlags,
    limits: (u16, u16),
    body: impl FnOnce(&mut Assembler),
) {
    let mut asm = Assembler::new(limits.0, limits.1);
    body(&mut asm);
    builder.method(name, descriptor, flags, asm.finish().unwrap());
}
