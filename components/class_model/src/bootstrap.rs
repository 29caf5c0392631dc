//! Core class bootstrap
//!
//! The engine raises exceptions, starts threads and interns strings, so a
//! handful of `java/lang` classes must always exist. [`install_core_classes`]
//! registers a minimal definition for each one the class source did not
//! provide. Classes the source does provide are left untouched.

use bytecode_system::{op, Assembler, AsmError, RawCode};

use crate::definition::{ClassBuilder, ClassDefinition};
use crate::flags::AccessFlags;
use crate::table::ClassTable;
use core_types::Severity;

/// Internal names of the classes the engine relies on.
#[allow(missing_docs)]
pub mod names {
    pub const OBJECT: &str = "java/lang/Object";
    pub const CLASS: &str = "java/lang/Class";
    pub const STRING: &str = "java/lang/String";
    pub const RUNNABLE: &str = "java/lang/Runnable";
    pub const THREAD: &str = "java/lang/Thread";
    pub const SYSTEM: &str = "java/lang/System";
    pub const THROWABLE: &str = "java/lang/Throwable";
    pub const EXCEPTION: &str = "java/lang/Exception";
    pub const ERROR: &str = "java/lang/Error";
    pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";
    pub const NULL_POINTER: &str = "java/lang/NullPointerException";
    pub const ARITHMETIC: &str = "java/lang/ArithmeticException";
    pub const INDEX_OUT_OF_BOUNDS: &str = "java/lang/IndexOutOfBoundsException";
    pub const ARRAY_INDEX_OUT_OF_BOUNDS: &str = "java/lang/ArrayIndexOutOfBoundsException";
    pub const NEGATIVE_ARRAY_SIZE: &str = "java/lang/NegativeArraySizeException";
    pub const CLASS_CAST: &str = "java/lang/ClassCastException";
    pub const ARRAY_STORE: &str = "java/lang/ArrayStoreException";
    pub const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";
    pub const ILLEGAL_MONITOR_STATE: &str = "java/lang/IllegalMonitorStateException";
    pub const ILLEGAL_THREAD_STATE: &str = "java/lang/IllegalThreadStateException";
    pub const INTERRUPTED: &str = "java/lang/InterruptedException";
    pub const VIRTUAL_MACHINE_ERROR: &str = "java/lang/VirtualMachineError";
    pub const OUT_OF_MEMORY: &str = "java/lang/OutOfMemoryError";
    pub const STACK_OVERFLOW: &str = "java/lang/StackOverflowError";
    pub const LINKAGE_ERROR: &str = "java/lang/LinkageError";
    pub const NO_CLASS_DEF_FOUND: &str = "java/lang/NoClassDefFoundError";
    pub const INCOMPATIBLE_CLASS_CHANGE: &str = "java/lang/IncompatibleClassChangeError";
    pub const NO_SUCH_METHOD: &str = "java/lang/NoSuchMethodError";
    pub const NO_SUCH_FIELD: &str = "java/lang/NoSuchFieldError";
    pub const ABSTRACT_METHOD: &str = "java/lang/AbstractMethodError";
    pub const UNSATISFIED_LINK: &str = "java/lang/UnsatisfiedLinkError";
}

/// `(class, superclass)` for every throwable the engine may raise.
const THROWABLES: &[(&str, &str)] = &[
    (names::EXCEPTION, names::THROWABLE),
    (names::ERROR, names::THROWABLE),
    (names::RUNTIME_EXCEPTION, names::EXCEPTION),
    (names::NULL_POINTER, names::RUNTIME_EXCEPTION),
    (names::ARITHMETIC, names::RUNTIME_EXCEPTION),
    (names::INDEX_OUT_OF_BOUNDS, names::RUNTIME_EXCEPTION),
    (names::ARRAY_INDEX_OUT_OF_BOUNDS, names::INDEX_OUT_OF_BOUNDS),
    (names::NEGATIVE_ARRAY_SIZE, names::RUNTIME_EXCEPTION),
    (names::CLASS_CAST, names::RUNTIME_EXCEPTION),
    (names::ARRAY_STORE, names::RUNTIME_EXCEPTION),
    (names::ILLEGAL_ARGUMENT, names::RUNTIME_EXCEPTION),
    (names::ILLEGAL_MONITOR_STATE, names::RUNTIME_EXCEPTION),
    (names::ILLEGAL_THREAD_STATE, names::ILLEGAL_ARGUMENT),
    (names::INTERRUPTED, names::EXCEPTION),
    (names::VIRTUAL_MACHINE_ERROR, names::ERROR),
    (names::OUT_OF_MEMORY, names::VIRTUAL_MACHINE_ERROR),
    (names::STACK_OVERFLOW, names::VIRTUAL_MACHINE_ERROR),
    (names::LINKAGE_ERROR, names::ERROR),
    (names::NO_CLASS_DEF_FOUND, names::LINKAGE_ERROR),
    (names::INCOMPATIBLE_CLASS_CHANGE, names::LINKAGE_ERROR),
    (names::NO_SUCH_METHOD, names::INCOMPATIBLE_CLASS_CHANGE),
    (names::NO_SUCH_FIELD, names::INCOMPATIBLE_CLASS_CHANGE),
    (names::ABSTRACT_METHOD, names::INCOMPATIBLE_CLASS_CHANGE),
    (names::UNSATISFIED_LINK, names::LINKAGE_ERROR),
];

const PUBLIC: AccessFlags = AccessFlags::PUBLIC;
const PUBLIC_FINAL: AccessFlags = AccessFlags::PUBLIC.union(AccessFlags::FINAL);
const PUBLIC_STATIC: AccessFlags = AccessFlags::PUBLIC.union(AccessFlags::STATIC);

/// `return`
fn empty_body(max_locals: u16) -> RawCode {
    RawCode::new(0, max_locals, vec![op::RETURN])
}

/// Constructor that calls the superclass constructor with the same arguments.
fn chaining_constructor(builder: &mut ClassBuilder, super_name: &str, with_message: bool) -> Result<(), AsmError> {
    let descriptor = if with_message { "(Ljava/lang/String;)V" } else { "()V" };
    let target = builder.method_ref(super_name, "<init>", descriptor);
    let mut asm = Assembler::new(2, if with_message { 2 } else { 1 });
    asm.emit(op::ALOAD_0);
    if with_message {
        asm.emit(op::ALOAD_1);
    }
    asm.emit_u16(op::INVOKESPECIAL, target).emit(op::RETURN);
    builder.method("<init>", descriptor, PUBLIC, asm.finish()?);
    Ok(())
}

fn object() -> Result<ClassDefinition, AsmError> {
    let mut builder = ClassBuilder::new(names::OBJECT);
    builder.method("<init>", "()V", PUBLIC, empty_body(1));

    let mut asm = Assembler::new(2, 2);
    let differ = asm.label();
    asm.emit(op::ALOAD_0).emit(op::ALOAD_1);
    asm.branch(op::IF_ACMPNE, differ);
    asm.emit(op::ICONST_1).emit(op::IRETURN);
    asm.bind(differ);
    asm.emit(op::ICONST_0).emit(op::IRETURN);
    builder.method("equals", "(Ljava/lang/Object;)Z", PUBLIC, asm.finish()?);

    builder
        .native_method("wait", "()V", PUBLIC_FINAL)
        .native_method("wait", "(J)V", PUBLIC_FINAL)
        .native_method("notify", "()V", PUBLIC_FINAL)
        .native_method("notifyAll", "()V", PUBLIC_FINAL)
        .native_method("hashCode", "()I", PUBLIC)
        .native_method("getClass", "()Ljava/lang/Class;", PUBLIC_FINAL);
    Ok(builder.build())
}

fn final_class(name: &str) -> ClassDefinition {
    let mut builder = ClassBuilder::new(name);
    builder.flags(PUBLIC_FINAL);
    builder.method("<init>", "()V", PUBLIC, empty_body(1));
    builder.build()
}

fn runnable() -> ClassDefinition {
    let mut builder = ClassBuilder::interface(names::RUNNABLE);
    builder.abstract_method("run", "()V");
    builder.build()
}

fn thread() -> Result<ClassDefinition, AsmError> {
    let mut builder = ClassBuilder::new(names::THREAD);
    builder
        .implements(names::RUNNABLE)
        .field("target", "Ljava/lang/Runnable;", AccessFlags::PRIVATE);
    let target = builder.field_ref(names::THREAD, "target", "Ljava/lang/Runnable;");
    let run = builder.interface_method_ref(names::RUNNABLE, "run", "()V");
    chaining_constructor(&mut builder, names::OBJECT, false)?;

    let object_init = builder.method_ref(names::OBJECT, "<init>", "()V");
    let mut asm = Assembler::new(2, 2);
    asm.emit(op::ALOAD_0)
        .emit_u16(op::INVOKESPECIAL, object_init)
        .emit(op::ALOAD_0)
        .emit(op::ALOAD_1)
        .emit_u16(op::PUTFIELD, target)
        .emit(op::RETURN);
    builder.method("<init>", "(Ljava/lang/Runnable;)V", PUBLIC, asm.finish()?);

    let mut asm = Assembler::new(2, 1);
    let none = asm.label();
    asm.emit(op::ALOAD_0).emit_u16(op::GETFIELD, target).emit(op::DUP);
    asm.branch(op::IFNULL, none);
    asm.invoke_interface(run, 1).emit(op::RETURN);
    asm.bind(none);
    asm.emit(op::POP).emit(op::RETURN);
    builder.method("run", "()V", PUBLIC, asm.finish()?);

    builder
        .native_method("start", "()V", PUBLIC)
        .native_method("interrupt", "()V", PUBLIC)
        .native_method("isAlive", "()Z", PUBLIC_FINAL)
        .native_method("join", "()V", PUBLIC_FINAL)
        .native_method("sleep", "(J)V", PUBLIC_STATIC)
        .native_method("yield", "()V", PUBLIC_STATIC)
        .native_method("currentThread", "()Ljava/lang/Thread;", PUBLIC_STATIC);
    Ok(builder.build())
}

fn system() -> ClassDefinition {
    let mut builder = ClassBuilder::new(names::SYSTEM);
    builder
        .flags(PUBLIC_FINAL)
        .native_method("gc", "()V", PUBLIC_STATIC)
        .native_method(
            "arraycopy",
            "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            PUBLIC_STATIC,
        )
        .native_method("currentTimeMillis", "()J", PUBLIC_STATIC)
        .native_method("identityHashCode", "(Ljava/lang/Object;)I", PUBLIC_STATIC);
    builder.build()
}

fn throwable() -> Result<ClassDefinition, AsmError> {
    let mut builder = ClassBuilder::new(names::THROWABLE);
    builder.field("message", "Ljava/lang/String;", AccessFlags::PRIVATE);
    let message = builder.field_ref(names::THROWABLE, "message", "Ljava/lang/String;");
    chaining_constructor(&mut builder, names::OBJECT, false)?;

    let object_init = builder.method_ref(names::OBJECT, "<init>", "()V");
    let mut asm = Assembler::new(2, 2);
    asm.emit(op::ALOAD_0)
        .emit_u16(op::INVOKESPECIAL, object_init)
        .emit(op::ALOAD_0)
        .emit(op::ALOAD_1)
        .emit_u16(op::PUTFIELD, message)
        .emit(op::RETURN);
    builder.method("<init>", "(Ljava/lang/String;)V", PUBLIC, asm.finish()?);

    let mut asm = Assembler::new(1, 1);
    asm.emit(op::ALOAD_0)
        .emit_u16(op::GETFIELD, message)
        .emit(op::ARETURN);
    builder.method("getMessage", "()Ljava/lang/String;", PUBLIC, asm.finish()?);
    Ok(builder.build())
}

fn subclass_throwable(name: &str, super_name: &str) -> Result<ClassDefinition, AsmError> {
    let mut builder = ClassBuilder::new(name);
    builder.extends(super_name);
    chaining_constructor(&mut builder, super_name, false)?;
    chaining_constructor(&mut builder, super_name, true)?;
    Ok(builder.build())
}

/// Every core class definition, superclasses before subclasses.
pub fn core_definitions() -> Result<Vec<ClassDefinition>, AsmError> {
    let mut definitions = vec![
        object()?,
        final_class(names::CLASS),
        final_class(names::STRING),
        runnable(),
        thread()?,
        system(),
        throwable()?,
    ];
    for (name, super_name) in THROWABLES {
        definitions.push(subclass_throwable(name, super_name)?);
    }
    Ok(definitions)
}

/// Registers every core class the table does not already hold.
///
/// # Returns
///
/// The number of classes installed.
pub fn install_core_classes(table: &ClassTable) -> Result<usize, AsmError> {
    let mut installed = 0;
    for definition in core_definitions()? {
        if table.lookup(&definition.name).is_some() {
            continue;
        }
        let name = definition.name.clone();
        if table.register(definition).is_ok() {
            table
                .load_log()
                .record(Severity::Info, name, "installed built-in core class");
            installed += 1;
        }
    }
    Ok(installed)
}
