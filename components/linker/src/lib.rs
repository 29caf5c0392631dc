//! Class preparation and method linking for the handset VM.
//!
//! The linker turns loaded classes into something the interpreter can run:
//!
//! - [`Linker::prepare`] resolves a class's superclass chain and interfaces,
//!   assigns instance field slots, computes the allocation size and builds
//!   the virtual table keyed by global [`SignatureTable`] ids.
//! - [`Linker::link`] decodes a method's raw bytecode once into a resolved
//!   instruction stream, converting branch offsets into instruction indices,
//!   then runs the stack-depth verifier over it.
//! - [`Linker::bind_native`] binds a native method to an engine builtin or a
//!   host native.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use bytecode_system::{op, Assembler};
//! use class_model::{install_core_classes, AccessFlags, ClassBuilder, ClassTable};
//! use core_types::FieldAccessMode;
//! use linker::{Linker, NoHostNatives};
//!
//! let classes = Arc::new(ClassTable::new());
//! install_core_classes(&classes).unwrap();
//!
//! let mut asm = Assembler::new(2, 0);
//! asm.emit(op::ICONST_2).emit(op::ICONST_3).emit(op::IADD).emit(op::IRETURN);
//! let mut builder = ClassBuilder::new("app/Main");
//! builder.method("three", "()I", AccessFlags::STATIC, asm.finish().unwrap());
//! let main = classes.register(builder.build()).unwrap();
//!
//! let linker = Linker::new(classes.clone(), FieldAccessMode::Generic, Arc::new(NoHostNatives));
//! let class = linker.prepare(main).unwrap();
//! let code = linker.link(&class, class.method("three", "()I").unwrap()).unwrap();
//! assert_eq!(code.len(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decode;
mod linker;
mod natives;
mod signature;

pub use linker::Linker;
pub use natives::{builtin_native, NativeResolver, NoHostNatives};
pub use signature::SignatureTable;
