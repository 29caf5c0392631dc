//! Class definitions as delivered by the class source
//!
//! A [`ClassDefinition`] is the already-parsed, unlinked form of a class.
//! Hosts either deserialize definitions produced by their own parser or
//! build them with [`ClassBuilder`].

use bytecode_system::RawCode;
use serde::{Deserialize, Serialize};

use crate::constant_pool::{Constant, ConstantPool, MemberRef};
use crate::flags::AccessFlags;

/// Unlinked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Access flags
    pub flags: AccessFlags,
}

/// Unlinked method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Access flags
    pub flags: AccessFlags,
    /// Bytecode; `None` for native and abstract methods
    pub code: Option<RawCode>,
}

/// Unlinked class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    /// Internal name
    pub name: String,
    /// Superclass internal name; `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Access flags
    pub flags: AccessFlags,
    /// Constant pool entries from index 1; wide entries occupy one element
    pub constants: Vec<Constant>,
    /// Declared fields
    pub fields: Vec<FieldDefinition>,
    /// Declared methods
    pub methods: Vec<MethodDefinition>,
}

/// Incremental [`ClassDefinition`] builder.
///
/// Constant helpers return the pool index to use as an instruction operand.
///
/// # Examples
///
/// ```
/// use bytecode_system::{op, Assembler};
/// use class_model::{AccessFlags, ClassBuilder};
///
/// let mut builder = ClassBuilder::new("app/Counter");
/// builder.field("count", "I", AccessFlags::STATIC);
/// let count = builder.field_ref("app/Counter", "count", "I");
///
/// let mut asm = Assembler::new(2, 0);
/// asm.emit_u16(op::GETSTATIC, count)
///     .emit(op::ICONST_1)
///     .emit(op::IADD)
///     .emit_u16(op::PUTSTATIC, count)
///     .emit(op::RETURN);
/// builder.method("bump", "()V", AccessFlags::STATIC, asm.finish().unwrap());
///
/// let class = builder.build();
/// assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
/// assert_eq!(class.methods.len(), 1);
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    definition: ClassDefinition,
    pool: ConstantPool,
}

impl ClassBuilder {
    /// Starts a public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        let super_name = (name != "java/lang/Object").then(|| "java/lang/Object".to_string());
        Self {
            definition: ClassDefinition {
                name: name.to_string(),
                super_name,
                interfaces: Vec::new(),
                flags: AccessFlags::PUBLIC,
                constants: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
            pool: ConstantPool::new(),
        }
    }

    /// Starts a public interface.
    pub fn interface(name: &str) -> Self {
        let mut builder = Self::new(name);
        builder.definition.flags = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        builder
    }

    /// Sets the superclass.
    pub fn extends(&mut self, super_name: &str) -> &mut Self {
        self.definition.super_name = Some(super_name.to_string());
        self
    }

    /// Adds a directly implemented interface.
    pub fn implements(&mut self, interface: &str) -> &mut Self {
        self.definition.interfaces.push(interface.to_string());
        self
    }

    /// Replaces the class access flags.
    pub fn flags(&mut self, flags: AccessFlags) -> &mut Self {
        self.definition.flags = flags;
        self
    }

    /// Declares a field.
    pub fn field(&mut self, name: &str, descriptor: &str, flags: AccessFlags) -> &mut Self {
        self.definition.fields.push(FieldDefinition {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags,
        });
        self
    }

    /// Declares a bytecode method.
    pub fn method(&mut self, name: &str, descriptor: &str, flags: AccessFlags, code: RawCode) -> &mut Self {
        self.push_method(name, descriptor, flags, Some(code))
    }

    /// Declares a native method.
    pub fn native_method(&mut self, name: &str, descriptor: &str, flags: AccessFlags) -> &mut Self {
        self.push_method(name, descriptor, flags | AccessFlags::NATIVE, None)
    }

    /// Declares an abstract method.
    pub fn abstract_method(&mut self, name: &str, descriptor: &str) -> &mut Self {
        self.push_method(
            name,
            descriptor,
            AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            None,
        )
    }

    fn push_method(
        &mut self,
        name: &str,
        descriptor: &str,
        flags: AccessFlags,
        code: Option<RawCode>,
    ) -> &mut Self {
        self.definition.methods.push(MethodDefinition {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags,
            code,
        });
        self
    }

    /// Adds any constant and returns its index.
    pub fn constant(&mut self, constant: Constant) -> u16 {
        self.pool.intern(constant)
    }

    /// Class constant.
    pub fn class_ref(&mut self, name: &str) -> u16 {
        self.constant(Constant::Class(name.into()))
    }

    /// String constant.
    pub fn string(&mut self, text: &str) -> u16 {
        self.constant(Constant::String(text.into()))
    }

    /// `int` constant.
    pub fn integer(&mut self, value: i32) -> u16 {
        self.constant(Constant::Integer(value))
    }

    /// `long` constant.
    pub fn long(&mut self, value: i64) -> u16 {
        self.constant(Constant::Long(value))
    }

    /// `float` constant.
    pub fn float(&mut self, value: f32) -> u16 {
        self.constant(Constant::Float(value))
    }

    /// `double` constant.
    pub fn double(&mut self, value: f64) -> u16 {
        self.constant(Constant::Double(value))
    }

    /// Field reference constant.
    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.constant(Constant::FieldRef(MemberRef::new(class, name, descriptor)))
    }

    /// Class method reference constant.
    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.constant(Constant::MethodRef(MemberRef::new(class, name, descriptor)))
    }

    /// Interface method reference constant.
    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.constant(Constant::InterfaceMethodRef(MemberRef::new(
            class, name, descriptor,
        )))
    }

    /// Produces the definition.
    pub fn build(&self) -> ClassDefinition {
        let mut definition = self.definition.clone();
        definition.constants = self.pool.entries();
        definition
    }
}
