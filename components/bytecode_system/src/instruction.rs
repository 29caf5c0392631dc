//! Resolved instruction set
//!
//! The linker rewrites each method's offset-addressed class-file bytecode into
//! a flat `Vec<Instruction>`. Every payload is resolved up front: constants
//! carry their literal, invocations carry a [`MethodId`] or global
//! [`SignatureId`], branches carry absolute instruction indices. Nothing in an
//! instruction refers back to the constant pool.

use std::sync::Arc;

use core_types::{Category, ClassId, MethodId, SignatureId, ValueKind};

/// Numeric operand type of an arithmetic, negation or conversion instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumType {
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl NumType {
    /// Stack category of a value of this type.
    pub fn category(self) -> Category {
        match self {
            NumType::Long | NumType::Double => Category::Two,
            NumType::Int | NumType::Float => Category::One,
        }
    }
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<<`
    Shl,
    /// arithmetic `>>`
    Shr,
    /// logical `>>>`
    Ushr,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
}

impl ArithOp {
    /// Shift operators take an `int` shift distance regardless of operand type.
    pub fn is_shift(self) -> bool {
        matches!(self, ArithOp::Shl | ArithOp::Shr | ArithOp::Ushr)
    }
}

/// Three-way comparisons pushing -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `lcmp`
    Long,
    /// `fcmpl`: NaN compares as -1
    FloatL,
    /// `fcmpg`: NaN compares as 1
    FloatG,
    /// `dcmpl`
    DoubleL,
    /// `dcmpg`
    DoubleG,
}

impl CompareOp {
    /// Category of each operand.
    pub fn operand_category(self) -> Category {
        match self {
            CompareOp::Long | CompareOp::DoubleL | CompareOp::DoubleG => Category::Two,
            CompareOp::FloatL | CompareOp::FloatG => Category::One,
        }
    }
}

/// Branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl Cond {
    /// Evaluates the condition for `lhs <op> rhs`.
    pub fn test(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Cond::Eq => lhs == rhs,
            Cond::Ne => lhs != rhs,
            Cond::Lt => lhs < rhs,
            Cond::Ge => lhs >= rhs,
            Cond::Gt => lhs > rhs,
            Cond::Le => lhs <= rhs,
        }
    }
}

/// Static field, resolved to its declaring class and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticSlot {
    /// Class that declares the field
    pub class: ClassId,
    /// Index in that class's static storage
    pub slot: u16,
    /// Field kind
    pub kind: ValueKind,
}

/// Instance field accessed by name against the receiver's class at run time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedField {
    /// Field name
    pub name: Arc<str>,
    /// Field descriptor
    pub descriptor: Arc<str>,
    /// Field kind
    pub kind: ValueKind,
}

/// Instance field resolved to a fixed slot at link time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSlot {
    /// Index into the object's field storage
    pub slot: u16,
    /// Field kind
    pub kind: ValueKind,
}

/// Parameter and return shape of an invocation.
///
/// The receiver, if any, is not listed in `params`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Category of each declared parameter in order
    pub params: Arc<[Category]>,
    /// Category of the return value, `None` for `void`
    pub returns: Option<Category>,
}

impl CallSite {
    /// Creates a call site shape.
    pub fn new(params: Vec<Category>, returns: Option<Category>) -> Self {
        Self {
            params: params.into(),
            returns,
        }
    }

    /// Number of operand stack entries consumed, excluding the receiver.
    pub fn arg_count(&self) -> usize {
        self.params.len()
    }
}

/// `tableswitch` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableSwitch {
    /// Lowest matched key
    pub low: i32,
    /// Target per key, starting at `low`
    pub targets: Vec<u32>,
    /// Target when the key is out of range
    pub default: u32,
}

/// `lookupswitch` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupSwitch {
    /// `(key, target)` pairs sorted by key
    pub pairs: Vec<(i32, u32)>,
    /// Target when no key matches
    pub default: u32,
}

/// What a reference to a missing symbol was trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A class (raises `NoClassDefFoundError`)
    Class,
    /// A method (raises `NoSuchMethodError`)
    Method,
    /// A field (raises `NoSuchFieldError`)
    Field,
}

/// Placeholder for an instruction whose symbolic reference did not resolve.
///
/// Linking succeeds; executing the instruction applies the missing-symbol
/// policy. The stack shape is kept so the verifier can still check the method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unresolved {
    /// Kind of the missing symbol
    pub kind: SymbolKind,
    /// `Class`, `Class.name:descriptor` or similar, for the error message
    pub symbol: String,
    /// Operands the original instruction would pop, bottom first
    pub pops: Vec<Category>,
    /// Value the original instruction would push
    pub push: Option<Category>,
}

/// One resolved instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Does nothing
    Nop,
    /// Push an `int` literal
    PushInt(i32),
    /// Push a `long` literal
    PushLong(i64),
    /// Push a `float` literal
    PushFloat(f32),
    /// Push a `double` literal
    PushDouble(f64),
    /// Push `null`
    PushNull,
    /// Push the interned string object for this text
    PushString(Arc<str>),
    /// Push the class mirror object
    PushClass(ClassId),

    /// Load local 0
    Load0(Category),
    /// Load local 1
    Load1(Category),
    /// Load local 2
    Load2(Category),
    /// Load local 3
    Load3(Category),
    /// Load any local
    Load(u16, Category),
    /// Store local 0
    Store0(Category),
    /// Store local 1
    Store1(Category),
    /// Store local 2
    Store2(Category),
    /// Store local 3
    Store3(Category),
    /// Store any local
    Store(u16, Category),
    /// Add a constant to an `int` local
    Iinc {
        /// Local index
        index: u16,
        /// Signed increment
        delta: i16,
    },

    /// `array[index]` of the given element kind
    ArrayLoad(ValueKind),
    /// `array[index] = value`
    ArrayStore(ValueKind),

    /// Discard one category-1 value
    Pop,
    /// Discard two category-1 values or one category-2 value
    Pop2,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top value beneath the second
    DupX1,
    /// Duplicate the top value beneath the second and third slots
    DupX2,
    /// Duplicate the top two slots
    Dup2,
    /// Duplicate the top two slots beneath the third
    Dup2X1,
    /// Duplicate the top two slots beneath the third and fourth
    Dup2X2,
    /// Swap the top two category-1 values
    Swap,

    /// Binary arithmetic
    Arith(ArithOp, NumType),
    /// Negation
    Neg(NumType),
    /// Numeric widening or narrowing between primitive types
    Convert(NumType, NumType),
    /// `int` to `byte`, `char` or `short`
    Narrow(ValueKind),
    /// Three-way comparison
    Compare(CompareOp),

    /// Branch when `value <cond> 0`
    IfZero(Cond, u32),
    /// Branch when `lhs <cond> rhs` for two ints
    IfCmp(Cond, u32),
    /// Branch on reference (in)equality; `true` means branch when equal
    IfRefEq(bool, u32),
    /// Branch on null; `true` means branch when null
    IfNull(bool, u32),
    /// Unconditional jump
    Goto(u32),
    /// Dense switch
    TableSwitch(Box<TableSwitch>),
    /// Sparse switch
    LookupSwitch(Box<LookupSwitch>),

    /// Return from a `void` method
    Return,
    /// Return the top value
    ReturnValue(Category),

    /// Read a static field
    GetStatic(StaticSlot),
    /// Write a static field
    PutStatic(StaticSlot),
    /// Read an instance field by name
    GetField(Arc<NamedField>),
    /// Write an instance field by name
    PutField(Arc<NamedField>),
    /// Read an instance field from a fixed slot
    GetFieldSlot(FieldSlot),
    /// Write an instance field to a fixed slot
    PutFieldSlot(FieldSlot),

    /// Call a static method
    InvokeStatic {
        /// Target method
        method: MethodId,
        /// Parameter and return shape
        site: Arc<CallSite>,
    },
    /// Call a constructor, private or superclass method without dispatch
    InvokeSpecial {
        /// Target method
        method: MethodId,
        /// Parameter and return shape
        site: Arc<CallSite>,
    },
    /// Virtual dispatch through the receiver's virtual table
    InvokeVirtual {
        /// Global signature id
        signature: SignatureId,
        /// Parameter and return shape
        site: Arc<CallSite>,
    },
    /// Interface dispatch through the receiver's virtual table
    InvokeInterface {
        /// Global signature id
        signature: SignatureId,
        /// Parameter and return shape
        site: Arc<CallSite>,
    },
    /// Virtual `()V` call. Carries no call site, so the interpreter skips
    /// argument counting and pops only the receiver. The target is still
    /// selected from the receiver's virtual table on every execution.
    InvokeVoidNoArgs(SignatureId),

    /// Allocate an instance
    New(ClassId),
    /// Allocate a primitive array
    NewArray(ValueKind),
    /// Allocate a reference array of the given array class
    NewRefArray(ClassId),
    /// Allocate a nested array of the given array class
    MultiNewArray {
        /// Array class of the outermost array
        class: ClassId,
        /// Number of dimension counts on the stack
        dims: u8,
    },
    /// Push an array's length
    ArrayLength,
    /// Throw the top reference
    Throw,
    /// Checked cast
    CheckCast(ClassId),
    /// Type test
    InstanceOf(ClassId),
    /// Enter the object's monitor
    MonitorEnter,
    /// Exit the object's monitor
    MonitorExit,

    /// Reference to a symbol that did not resolve at link time
    Unresolved(Box<Unresolved>),
}

impl Instruction {
    /// Local load with the fast variant for indices 0-3.
    pub fn load(index: u16, category: Category) -> Self {
        match index {
            0 => Instruction::Load0(category),
            1 => Instruction::Load1(category),
            2 => Instruction::Load2(category),
            3 => Instruction::Load3(category),
            _ => Instruction::Load(index, category),
        }
    }

    /// Local store with the fast variant for indices 0-3.
    pub fn store(index: u16, category: Category) -> Self {
        match index {
            0 => Instruction::Store0(category),
            1 => Instruction::Store1(category),
            2 => Instruction::Store2(category),
            3 => Instruction::Store3(category),
            _ => Instruction::Store(index, category),
        }
    }

    /// Branch targets of this instruction, excluding fall-through.
    pub fn branch_targets(&self) -> Vec<u32> {
        match self {
            Instruction::IfZero(_, t)
            | Instruction::IfCmp(_, t)
            | Instruction::IfRefEq(_, t)
            | Instruction::IfNull(_, t)
            | Instruction::Goto(t) => vec![*t],
            Instruction::TableSwitch(table) => {
                let mut targets = table.targets.clone();
                targets.push(table.default);
                targets
            }
            Instruction::LookupSwitch(lookup) => {
                let mut targets: Vec<u32> = lookup.pairs.iter().map(|(_, t)| *t).collect();
                targets.push(lookup.default);
                targets
            }
            _ => Vec::new(),
        }
    }

    /// True if control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Goto(_)
                | Instruction::TableSwitch(_)
                | Instruction::LookupSwitch(_)
                | Instruction::Return
                | Instruction::ReturnValue(_)
                | Instruction::Throw
        )
    }
}
