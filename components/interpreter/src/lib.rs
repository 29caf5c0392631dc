//! Frame interpreter for handset bytecode
//!
//! This crate runs linked methods on cooperative Java threads:
//! - A frame stack per thread, one [`Value`](core_types::Value) per operand
//! - Slices of a fixed instruction budget, rotated by the scheduler
//! - Exception unwinding through linked handler tables
//! - Lazy class initialization on synthetic threads
//! - Engine builtins and host natives behind one native bridge
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytecode_system::{op, Assembler};
//! use class_model::{AccessFlags, ClassBuilder, ClassTable};
//! use core_types::{Value, VmConfig};
//! use interpreter::{Engine, RunOutcome};
//!
//! let mut engine = Engine::new(Arc::new(ClassTable::new()), VmConfig::default()).unwrap();
//!
//! let mut asm = Assembler::new(1, 1);
//! asm.emit(op::ICONST_5).emit(op::IRETURN);
//! let mut builder = ClassBuilder::new("app/Main");
//! builder.method("five", "()I", AccessFlags::STATIC, asm.finish().unwrap());
//! engine.load(builder.build()).unwrap();
//!
//! engine.spawn("app/Main", "five", "()I", Vec::new()).unwrap();
//! assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
//! assert_eq!(engine.invoke("app/Main", "five", "()I", Vec::new()).unwrap(), Some(Value::Int(5)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod arith;
mod builtins;
mod dispatch;
mod engine;
mod exceptions;
mod frame;
mod init;
mod invoke;
mod natives;
mod objects;
mod roots;
mod trap;

pub use engine::Engine;
pub use frame::Frame;
pub use natives::{HostNative, NativeContext, NativeRegistry};
pub use trap::{EngineError, RunOutcome, SliceEnd, Trap, UncaughtException};
