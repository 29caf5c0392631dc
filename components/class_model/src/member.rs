//! Fields and methods.

use std::fmt;
use std::sync::Arc;

use bytecode_system::{FieldSlot, LinkError, LinkedCode, RawCode};
use core_types::{ClassId, MethodId, NativeId, ValueKind};
use once_cell::sync::OnceCell;

use crate::descriptor::{FieldType, MethodDescriptor};
use crate::flags::AccessFlags;

/// A declared field.
#[derive(Debug)]
pub struct Field {
    /// Declaring class
    pub class: ClassId,
    /// Field name
    pub name: Arc<str>,
    /// Field descriptor
    pub descriptor: Arc<str>,
    /// Parsed type
    pub field_type: FieldType,
    /// Access flags
    pub flags: AccessFlags,
    slot: OnceCell<u16>,
}

impl Field {
    /// Creates a field with no slot assigned yet.
    pub fn new(
        class: ClassId,
        name: Arc<str>,
        descriptor: Arc<str>,
        field_type: FieldType,
        flags: AccessFlags,
    ) -> Self {
        Self {
            class,
            name,
            descriptor,
            field_type,
            flags,
            slot: OnceCell::new(),
        }
    }

    /// Storage kind.
    pub fn kind(&self) -> ValueKind {
        self.field_type.kind()
    }

    /// True for static fields.
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// Storage slot: an index into the class's static storage for static
    /// fields, into the object's field storage for instance fields. `None`
    /// until the class layout is computed.
    pub fn slot(&self) -> Option<u16> {
        self.slot.get().copied()
    }

    /// Assigns the slot. Returns false if one was already assigned.
    pub fn assign_slot(&self, slot: u16) -> bool {
        self.slot.set(slot).is_ok()
    }

    /// Direct slot accessor for instance fields, used by the precompiled
    /// field-access strategy.
    pub fn accessor(&self) -> Option<FieldSlot> {
        if self.is_static() {
            return None;
        }
        self.slot().map(|slot| FieldSlot {
            slot,
            kind: self.kind(),
        })
    }
}

/// Engine-implemented natives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `Object.wait()`, `wait(J)`, `wait(JI)`
    ObjectWait,
    /// `Object.notify()`
    ObjectNotify,
    /// `Object.notifyAll()`
    ObjectNotifyAll,
    /// `Object.hashCode()`
    ObjectHashCode,
    /// `Object.getClass()`
    ObjectGetClass,
    /// `Thread.sleep(J)`
    ThreadSleep,
    /// `Thread.yield()`
    ThreadYield,
    /// `Thread.currentThread()`
    ThreadCurrentThread,
    /// `Thread.start()`
    ThreadStart,
    /// `Thread.interrupt()`
    ThreadInterrupt,
    /// `Thread.isAlive()`
    ThreadIsAlive,
    /// `Thread.join()`
    ThreadJoin,
    /// `System.gc()`
    SystemGc,
    /// `System.arraycopy(...)`
    SystemArraycopy,
    /// `System.currentTimeMillis()`
    SystemCurrentTimeMillis,
    /// `System.identityHashCode(Object)`
    SystemIdentityHashCode,
}

/// What a native method is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeBinding {
    /// Implemented by the engine
    Builtin(Builtin),
    /// Registered by the host
    Host(NativeId),
    /// Nothing registered; invoking raises `UnsatisfiedLinkError`
    Unbound,
}

/// The body of a method.
#[derive(Debug)]
pub enum MethodBody {
    /// Bytecode, linked on first use
    Bytecode {
        /// Body as delivered by the class source
        raw: RawCode,
        /// Result of linking, set at most once
        linked: OnceCell<Result<Arc<LinkedCode>, LinkError>>,
    },
    /// Host or engine native, bound on first use
    Native(OnceCell<NativeBinding>),
    /// Abstract or interface method
    Abstract,
}

/// A declared method.
#[derive(Debug)]
pub struct Method {
    /// This method's id
    pub id: MethodId,
    /// Internal name of the declaring class
    pub class_name: Arc<str>,
    /// Method name
    pub name: Arc<str>,
    /// Method descriptor
    pub descriptor: Arc<str>,
    /// Parsed descriptor
    pub signature: MethodDescriptor,
    /// Access flags
    pub flags: AccessFlags,
    /// Body
    pub body: MethodBody,
}

impl Method {
    /// True for static methods.
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// True for synchronized methods.
    pub fn is_synchronized(&self) -> bool {
        self.flags.is_synchronized()
    }

    /// True for `<init>` and `<clinit>`.
    pub fn is_initializer(&self) -> bool {
        self.name.starts_with('<')
    }

    /// Operand stack entries consumed by a call, including the receiver.
    pub fn arg_count(&self) -> usize {
        self.signature.params.len() + usize::from(!self.is_static())
    }

    /// Local variable slots taken by the arguments, including the receiver.
    pub fn arg_slots(&self) -> u16 {
        self.signature.param_slots() + u16::from(!self.is_static())
    }

    /// True if the method takes no arguments and returns `void`.
    pub fn is_void_no_args(&self) -> bool {
        self.signature.params.is_empty() && self.signature.returns.is_none()
    }

    /// Linked code, if the method is bytecode and has linked successfully.
    pub fn linked(&self) -> Option<Arc<LinkedCode>> {
        match &self.body {
            MethodBody::Bytecode { linked, .. } => linked.get()?.as_ref().ok().cloned(),
            _ => None,
        }
    }

    /// Native binding, if the method is native and has been bound.
    pub fn native_binding(&self) -> Option<NativeBinding> {
        match &self.body {
            MethodBody::Native(binding) => binding.get().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}
