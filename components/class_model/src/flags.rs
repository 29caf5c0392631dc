//! Access flags shared by classes, fields and methods.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Class-file access flags.
    ///
    /// `SYNCHRONIZED` shares its bit with the class-level `SUPER` flag, which
    /// the engine ignores.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u16 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible in the declaring class only
        const PRIVATE = 0x0002;
        /// Visible to subclasses
        const PROTECTED = 0x0004;
        /// Class member rather than instance member
        const STATIC = 0x0008;
        /// Cannot be overridden or reassigned
        const FINAL = 0x0010;
        /// Invocation enters the receiver's (or class mirror's) monitor
        const SYNCHRONIZED = 0x0020;
        /// Field is volatile
        const VOLATILE = 0x0040;
        /// Field is not serialized
        const TRANSIENT = 0x0080;
        /// Body is supplied by the host
        const NATIVE = 0x0100;
        /// Class is an interface
        const INTERFACE = 0x0200;
        /// No body / cannot be instantiated
        const ABSTRACT = 0x0400;
        /// Compiler-generated
        const SYNTHETIC = 0x1000;
    }
}

impl AccessFlags {
    /// True for static members.
    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    /// True for native methods.
    pub fn is_native(self) -> bool {
        self.contains(AccessFlags::NATIVE)
    }

    /// True for abstract methods and classes.
    pub fn is_abstract(self) -> bool {
        self.contains(AccessFlags::ABSTRACT)
    }

    /// True for synchronized methods.
    pub fn is_synchronized(self) -> bool {
        self.contains(AccessFlags::SYNCHRONIZED)
    }

    /// True for interfaces.
    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }

    /// True for private members.
    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }
}
