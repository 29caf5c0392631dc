//! Integration test suite for the handset VM
//!
//! Tests here drive several components together: classes built with the
//! assembler, linked on first call, run by the engine on the scheduler,
//! and captured into snapshots.

use std::sync::Arc;

use bytecode_system::Assembler;
use class_model::{AccessFlags, ClassBuilder, ClassTable};
use core_types::VmConfig;
use interpreter::Engine;
use scheduler::ManualClock;

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use class_model;
    pub use core_types;
    pub use interpreter;
    pub use linker;
    pub use memory_manager;
    pub use scheduler;
    pub use snapshot;
}

/// Application class name used throughout the suite.
pub const APP: &str = "app/App";

/// Engine on a manual clock at zero.
pub fn engine_with(config: VmConfig) -> (Engine, Arc<ManualClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(ManualClock::new(0));
    let engine = match Engine::with_clock(Arc::new(ClassTable::new()), config, clock.clone()) {
        Ok(engine) => engine,
        Err(err) => panic!("engine bootstrap failed: {}", err),
    };
    (engine, clock)
}

/// Adds a static method assembled by `body`.
pub fn static_method(
    builder: &mut ClassBuilder,
    name: &str,
    descriptor: &str,
    flags: AccessFlags,
    limits: (u16, u16),
    body: impl FnOnce(&mut Assembler),
) {
    let mut asm = Assembler::new(limits.0, limits.1);
    body(&mut asm);
    match asm.finish() {
        Ok(code) => {
            builder.method(name, descriptor, AccessFlags::STATIC | flags, code);
        }
        Err(err) => panic!("{}{} failed to assemble: {:?}", name, descriptor, err),
    }
}
