//! Native method binding
//!
//! Native methods bind once, at link time, to an explicit
//! [`NativeBinding`]: an engine builtin from the fixed table below, a host
//! native found through a [`NativeResolver`], or nothing.

use class_model::{names, Builtin};
use core_types::NativeId;

/// Looks up host natives by owning class, name and descriptor.
pub trait NativeResolver: Send + Sync {
    /// Host native registered for this method, if any.
    fn resolve(&self, class: &str, name: &str, descriptor: &str) -> Option<NativeId>;
}

/// Resolver with no host natives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostNatives;

impl NativeResolver for NoHostNatives {
    fn resolve(&self, _class: &str, _name: &str, _descriptor: &str) -> Option<NativeId> {
        None
    }
}

/// Engine builtin implementing this method, if any.
pub fn builtin_native(class: &str, name: &str, descriptor: &str) -> Option<Builtin> {
    let builtin = match (class, name, descriptor) {
        (names::OBJECT, "wait", "()V" | "(J)V" | "(JI)V") => Builtin::ObjectWait,
        (names::OBJECT, "notify", "()V") => Builtin::ObjectNotify,
        (names::OBJECT, "notifyAll", "()V") => Builtin::ObjectNotifyAll,
        (names::OBJECT, "hashCode", "()I") => Builtin::ObjectHashCode,
        (names::OBJECT, "getClass", "()Ljava/lang/Class;") => Builtin::ObjectGetClass,
        (names::THREAD, "sleep", "(J)V") => Builtin::ThreadSleep,
        (names::THREAD, "yield", "()V") => Builtin::ThreadYield,
        (names::THREAD, "currentThread", "()Ljava/lang/Thread;") => Builtin::ThreadCurrentThread,
        (names::THREAD, "start", "()V") => Builtin::ThreadStart,
        (names::THREAD, "interrupt", "()V") => Builtin::ThreadInterrupt,
        (names::THREAD, "isAlive", "()Z") => Builtin::ThreadIsAlive,
        (names::THREAD, "join", "()V") => Builtin::ThreadJoin,
        (names::SYSTEM, "gc", "()V") => Builtin::SystemGc,
        (names::SYSTEM, "arraycopy", "(Ljava/lang/Object;ILjava/lang/Object;II)V") => {
            Builtin::SystemArraycopy
        }
        (names::SYSTEM, "currentTimeMillis", "()J") => Builtin::SystemCurrentTimeMillis,
        (names::SYSTEM, "identityHashCode", "(Ljava/lang/Object;)I") => {
            Builtin::SystemIdentityHashCode
        }
        _ => return None,
    };
    Some(builtin)
}
