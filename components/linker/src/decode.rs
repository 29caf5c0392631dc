//! Raw bytecode to resolved instructions
//!
//! Two passes over a method body. The first walks instruction lengths and
//! records which byte offsets start an instruction; the second decodes each
//! instruction, resolving constant pool operands against the class table and
//! converting byte-relative branch deltas into absolute instruction indices.

use std::sync::Arc;

use bytecode_system::{
    fixed_length, mnemonic, op, ArithOp, CallSite, CatchType, CompareOp, Cond, FieldSlot, Handler,
    Instruction, LinkError, LinkedCode, LookupSwitch, NamedField, NumType, RawCode, RawHandler, StaticSlot,
    SymbolKind, TableSwitch, Unresolved,
};
use class_model::{ClassInfo, Constant, FieldType, MemberRef, Method, MethodDescriptor};
use core_types::{Category, ClassId, FieldAccessMode, Severity, ValueKind};

use crate::linker::Linker;

const NUM_TYPES: [NumType; 4] = [NumType::Int, NumType::Long, NumType::Float, NumType::Double];
const CONDS: [Cond; 6] = [Cond::Eq, Cond::Ne, Cond::Lt, Cond::Ge, Cond::Gt, Cond::Le];
/// Load/store groups in opcode order: `i`, `l`, `f`, `d`, `a`.
const LOCAL_CATEGORIES: [Category; 5] = [
    Category::One,
    Category::Two,
    Category::One,
    Category::Two,
    Category::One,
];
/// Array load/store element kinds in opcode order.
const ARRAY_KINDS: [ValueKind; 8] = [
    ValueKind::Int,
    ValueKind::Long,
    ValueKind::Float,
    ValueKind::Double,
    ValueKind::Reference,
    ValueKind::Byte,
    ValueKind::Char,
    ValueKind::Short,
];

fn read_u16(code: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([code[at], code[at + 1]])
}

fn read_i16(code: &[u8], at: usize) -> i16 {
    i16::from_be_bytes([code[at], code[at + 1]])
}

fn read_i32(code: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
}

/// Offset of the first byte after `tableswitch`/`lookupswitch` padding.
fn switch_base(pc: usize) -> usize {
    (pc + 4) & !3
}

/// Byte length of the instruction at `pc`.
fn instruction_length(code: &[u8], pc: usize) -> Result<usize, LinkError> {
    let offset = pc as u32;
    let truncated = LinkError::Truncated { offset };
    let opcode = code[pc];
    let length = match opcode {
        op::TABLESWITCH => {
            let base = switch_base(pc);
            if base + 12 > code.len() {
                return Err(truncated);
            }
            let low = read_i32(code, base + 4) as i64;
            let high = read_i32(code, base + 8) as i64;
            if high < low {
                return Err(LinkError::BadConstant {
                    offset,
                    index: 0,
                    reason: format!("tableswitch range {}..{} is empty", low, high),
                });
            }
            base + 12 + 4 * (high - low + 1) as usize - pc
        }
        op::LOOKUPSWITCH => {
            let base = switch_base(pc);
            if base + 8 > code.len() {
                return Err(truncated);
            }
            let pairs = read_i32(code, base + 4);
            if pairs < 0 {
                return Err(LinkError::BadConstant {
                    offset,
                    index: 0,
                    reason: "negative lookupswitch pair count".to_string(),
                });
            }
            base + 8 + 8 * pairs as usize - pc
        }
        op::WIDE => match code.get(pc + 1) {
            None => return Err(truncated),
            Some(&op::IINC) => 6,
            Some(&(op::ILOAD..=op::ALOAD)) | Some(&(op::ISTORE..=op::ASTORE)) | Some(&op::RET) => 4,
            Some(&other) => {
                return Err(LinkError::InvalidOpcode {
                    offset: offset + 1,
                    opcode: other,
                })
            }
        },
        other => fixed_length(other).ok_or(LinkError::InvalidOpcode {
            offset,
            opcode: other,
        })?,
    };
    if pc + length > code.len() {
        return Err(truncated);
    }
    Ok(length)
}

/// Decodes one method body.
pub(crate) struct Decoder<'a> {
    linker: &'a Linker,
    class: &'a ClassInfo,
    method: &'a Method,
    raw: &'a RawCode,
    code: &'a [u8],
    /// Instruction index for each byte offset that starts an instruction
    boundaries: Vec<Option<u32>>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(linker: &'a Linker, class: &'a ClassInfo, method: &'a Method, raw: &'a RawCode) -> Self {
        Self {
            linker,
            class,
            method,
            raw,
            code: &raw.code,
            boundaries: Vec::new(),
        }
    }

    pub(crate) fn decode(mut self) -> Result<LinkedCode, LinkError> {
        if self.code.is_empty() {
            return Err(LinkError::EmptyCode);
        }
        let mut starts = Vec::new();
        self.boundaries = vec![None; self.code.len() + 1];
        let mut pc = 0;
        while pc < self.code.len() {
            self.boundaries[pc] = Some(starts.len() as u32);
            let length = instruction_length(self.code, pc)?;
            starts.push((pc, length));
            pc += length;
        }
        self.boundaries[self.code.len()] = Some(starts.len() as u32);

        let mut instructions = Vec::with_capacity(starts.len());
        for (pc, _) in &starts {
            instructions.push(self.instruction(*pc)?);
        }
        let handlers = self
            .raw
            .handlers
            .iter()
            .map(|h| self.handler(h))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LinkedCode {
            instructions,
            handlers,
            max_stack: self.raw.max_stack,
            max_locals: self.raw.max_locals,
        })
    }

    fn subject(&self) -> String {
        self.method.to_string()
    }

    fn missing(&self, kind: SymbolKind, symbol: String, pops: Vec<Category>, push: Option<Category>) -> Instruction {
        self.linker
            .classes()
            .load_log()
            .record(Severity::Warning, self.subject(), format!("unresolved {:?} {}", kind, symbol));
        Instruction::Unresolved(Box::new(Unresolved {
            kind,
            symbol,
            pops,
            push,
        }))
    }

    fn branch(&self, pc: usize, delta: i64) -> Result<u32, LinkError> {
        let target = pc as i64 + delta;
        let broken = LinkError::BrokenFlow {
            offset: pc as u32,
            target,
        };
        if target < 0 || target as usize >= self.code.len() {
            return Err(broken);
        }
        self.boundaries[target as usize].ok_or(broken)
    }

    fn handler(&self, raw: &RawHandler) -> Result<Handler, LinkError> {
        let index = |offset: u16, allow_end: bool| -> Result<u32, LinkError> {
            let at = offset as usize;
            let in_range = at < self.code.len() || (allow_end && at == self.code.len());
            match self.boundaries.get(at).copied().flatten() {
                Some(index) if in_range => Ok(index),
                _ => Err(LinkError::BrokenFlow {
                    offset: u32::from(raw.start_pc),
                    target: i64::from(offset),
                }),
            }
        };
        let catch = if raw.catch_type == 0 {
            CatchType::Any
        } else {
            match self.constant(raw.handler_pc as usize, raw.catch_type)? {
                Constant::Class(name) => match self.class_id(&name) {
                    Some(id) => CatchType::Class(id),
                    None => {
                        self.linker.classes().load_log().record(
                            Severity::Warning,
                            self.subject(),
                            format!("handler catches missing class {}", name),
                        );
                        CatchType::Unresolved(name.to_string())
                    }
                },
                other => return Err(self.bad_constant(raw.handler_pc as usize, raw.catch_type, &other, "class")),
            }
        };
        Ok(Handler {
            start: index(raw.start_pc, false)?,
            end: index(raw.end_pc, true)?,
            target: index(raw.handler_pc, false)?,
            catch,
        })
    }

    fn constant(&self, pc: usize, index: u16) -> Result<Constant, LinkError> {
        self.class
            .constant_pool
            .get(index)
            .filter(|c| !matches!(c, Constant::Unusable))
            .ok_or_else(|| LinkError::BadConstant {
                offset: pc as u32,
                index,
                reason: "index out of range".to_string(),
            })
    }

    fn bad_constant(&self, pc: usize, index: u16, found: &Constant, wanted: &str) -> LinkError {
        LinkError::BadConstant {
            offset: pc as u32,
            index,
            reason: format!("expected {}, found {}", wanted, found.tag()),
        }
    }

    /// Class id for a class constant name, creating array classes on demand.
    fn class_id(&self, name: &str) -> Option<ClassId> {
        let classes = self.linker.classes();
        if name.starts_with('[') {
            classes.array_class(name).ok()
        } else {
            classes.lookup(name)
        }
    }

    fn class_operand(&self, pc: usize) -> Result<Arc<str>, LinkError> {
        let index = read_u16(self.code, pc + 1);
        match self.constant(pc, index)? {
            Constant::Class(name) => Ok(name),
            other => Err(self.bad_constant(pc, index, &other, "class")),
        }
    }

    fn member_operand(&self, pc: usize, field: bool) -> Result<MemberRef, LinkError> {
        let index = read_u16(self.code, pc + 1);
        match self.constant(pc, index)? {
            Constant::FieldRef(member) if field => Ok(member),
            Constant::MethodRef(member) | Constant::InterfaceMethodRef(member) if !field => Ok(member),
            other => Err(self.bad_constant(pc, index, &other, if field { "fieldref" } else { "methodref" })),
        }
    }

    fn field_type(&self, pc: usize, member: &MemberRef) -> Result<FieldType, LinkError> {
        FieldType::parse(&member.descriptor).map_err(|e| LinkError::BadConstant {
            offset: pc as u32,
            index: read_u16(self.code, pc + 1),
            reason: e.to_string(),
        })
    }

    fn method_descriptor(&self, pc: usize, member: &MemberRef) -> Result<MethodDescriptor, LinkError> {
        MethodDescriptor::parse(&member.descriptor).map_err(|e| LinkError::BadConstant {
            offset: pc as u32,
            index: read_u16(self.code, pc + 1),
            reason: e.to_string(),
        })
    }

    fn load_constant(&self, pc: usize, index: u16, wide: bool) -> Result<Instruction, LinkError> {
        let constant = self.constant(pc, index)?;
        Ok(match (constant, wide) {
            (Constant::Integer(v), false) => Instruction::PushInt(v),
            (Constant::Float(v), false) => Instruction::PushFloat(v),
            (Constant::String(text), false) => Instruction::PushString(text),
            (Constant::Class(name), false) => match self.class_id(&name) {
                Some(id) => Instruction::PushClass(id),
                None => self.missing(SymbolKind::Class, name.to_string(), Vec::new(), Some(Category::One)),
            },
            (Constant::Long(v), true) => Instruction::PushLong(v),
            (Constant::Double(v), true) => Instruction::PushDouble(v),
            (other, _) => return Err(self.bad_constant(pc, index, &other, "loadable constant")),
        })
    }

    fn static_field(&self, pc: usize, put: bool) -> Result<Instruction, LinkError> {
        let member = self.member_operand(pc, true)?;
        let field_type = self.field_type(pc, &member)?;
        let category = field_type.category();
        let (pops, push) = if put {
            (vec![category], None)
        } else {
            (Vec::new(), Some(category))
        };
        let classes = self.linker.classes();
        let Some(owner) = classes.lookup(&member.class) else {
            return Ok(self.missing(SymbolKind::Class, member.class.to_string(), pops, push));
        };
        let resolved = classes.resolve_field(owner, &member.name, &member.descriptor).ok().and_then(|id| {
            let class = classes.get(id.class)?;
            let field = class.fields.get(id.index as usize)?;
            if !field.is_static() {
                return None;
            }
            Some(StaticSlot {
                class: id.class,
                slot: field.slot()?,
                kind: field.kind(),
            })
        });
        Ok(match resolved {
            Some(slot) if put => Instruction::PutStatic(slot),
            Some(slot) => Instruction::GetStatic(slot),
            None => self.missing(SymbolKind::Field, member.to_string(), pops, push),
        })
    }

    fn instance_field(&self, pc: usize, put: bool) -> Result<Instruction, LinkError> {
        let member = self.member_operand(pc, true)?;
        let field_type = self.field_type(pc, &member)?;
        let category = field_type.category();
        let (pops, push) = if put {
            (vec![Category::One, category], None)
        } else {
            (vec![Category::One], Some(category))
        };
        let classes = self.linker.classes();
        let Some(owner) = classes.lookup(&member.class) else {
            return Ok(self.missing(SymbolKind::Class, member.class.to_string(), pops, push));
        };
        let Ok(id) = classes.resolve_field(owner, &member.name, &member.descriptor) else {
            return Ok(self.missing(SymbolKind::Field, member.to_string(), pops, push));
        };
        let slot = match self.linker.field_access() {
            FieldAccessMode::Generic => None,
            FieldAccessMode::PrecompiledBridge => self
                .linker
                .prepare(id.class)
                .and_then(|class| class.fields.get(id.index as usize)?.accessor()),
        };
        Ok(match (slot, put) {
            (Some(slot), false) => Instruction::GetFieldSlot(slot),
            (Some(slot), true) => Instruction::PutFieldSlot(slot),
            (None, _) => {
                let named = Arc::new(NamedField {
                    name: member.name.clone(),
                    descriptor: member.descriptor.clone(),
                    kind: field_type.kind(),
                });
                if put {
                    Instruction::PutField(named)
                } else {
                    Instruction::GetField(named)
                }
            }
        })
    }

    fn invoke(&self, pc: usize, opcode: u8) -> Result<Instruction, LinkError> {
        let member = self.member_operand(pc, false)?;
        let descriptor = self.method_descriptor(pc, &member)?;
        let has_receiver = opcode != op::INVOKESTATIC;
        let site = Arc::new(CallSite::new(
            descriptor.param_categories(),
            descriptor.return_category(),
        ));
        let mut pops = Vec::with_capacity(site.params.len() + 1);
        if has_receiver {
            pops.push(Category::One);
        }
        pops.extend(site.params.iter().copied());

        let classes = self.linker.classes();
        let Some(owner) = self.class_id(&member.class) else {
            return Ok(self.missing(SymbolKind::Class, member.class.to_string(), pops, site.returns));
        };
        let Ok(method) = classes.resolve_method(owner, &member.name, &member.descriptor) else {
            return Ok(self.missing(SymbolKind::Method, member.to_string(), pops, site.returns));
        };
        Ok(match opcode {
            op::INVOKESTATIC => Instruction::InvokeStatic { method, site },
            op::INVOKESPECIAL => Instruction::InvokeSpecial { method, site },
            _ => {
                let signature = self.linker.signatures().intern(&member.name, &member.descriptor);
                if opcode == op::INVOKEINTERFACE {
                    Instruction::InvokeInterface { signature, site }
                } else if descriptor.params.is_empty() && descriptor.returns.is_none() {
                    Instruction::InvokeVoidNoArgs(signature)
                } else {
                    Instruction::InvokeVirtual { signature, site }
                }
            }
        })
    }

    fn class_instruction(
        &self,
        pc: usize,
        pops: Vec<Category>,
        build: impl FnOnce(ClassId) -> Instruction,
    ) -> Result<Instruction, LinkError> {
        let name = self.class_operand(pc)?;
        Ok(match self.class_id(&name) {
            Some(id) => build(id),
            None => self.missing(SymbolKind::Class, name.to_string(), pops, Some(Category::One)),
        })
    }

    fn instruction(&self, pc: usize) -> Result<Instruction, LinkError> {
        let code = self.code;
        let opcode = code[pc];
        let offset = pc as u32;
        let u16_operand = || read_u16(code, pc + 1);
        use Instruction as I;

        Ok(match opcode {
            op::NOP => I::Nop,
            op::ACONST_NULL => I::PushNull,
            op::ICONST_M1..=op::ICONST_5 => I::PushInt(i32::from(opcode) - i32::from(op::ICONST_0)),
            op::LCONST_0 | op::LCONST_1 => I::PushLong(i64::from(opcode - op::LCONST_0)),
            op::FCONST_0..=op::FCONST_2 => I::PushFloat(f32::from(opcode - op::FCONST_0)),
            op::DCONST_0 | op::DCONST_1 => I::PushDouble(f64::from(opcode - op::DCONST_0)),
            op::BIPUSH => I::PushInt(i32::from(code[pc + 1] as i8)),
            op::SIPUSH => I::PushInt(i32::from(read_i16(code, pc + 1))),
            op::LDC => self.load_constant(pc, u16::from(code[pc + 1]), false)?,
            op::LDC_W => self.load_constant(pc, u16_operand(), false)?,
            op::LDC2_W => self.load_constant(pc, u16_operand(), true)?,

            op::ILOAD..=op::ALOAD => {
                I::load(u16::from(code[pc + 1]), LOCAL_CATEGORIES[usize::from(opcode - op::ILOAD)])
            }
            op::ILOAD_0..=op::ALOAD_3 => {
                let n = usize::from(opcode - op::ILOAD_0);
                I::load((n % 4) as u16, LOCAL_CATEGORIES[n / 4])
            }
            op::IALOAD..=op::SALOAD => I::ArrayLoad(ARRAY_KINDS[usize::from(opcode - op::IALOAD)]),
            op::ISTORE..=op::ASTORE => {
                I::store(u16::from(code[pc + 1]), LOCAL_CATEGORIES[usize::from(opcode - op::ISTORE)])
            }
            op::ISTORE_0..=op::ASTORE_3 => {
                let n = usize::from(opcode - op::ISTORE_0);
                I::store((n % 4) as u16, LOCAL_CATEGORIES[n / 4])
            }
            op::IASTORE..=op::SASTORE => I::ArrayStore(ARRAY_KINDS[usize::from(opcode - op::IASTORE)]),

            op::POP => I::Pop,
            op::POP2 => I::Pop2,
            op::DUP => I::Dup,
            op::DUP_X1 => I::DupX1,
            op::DUP_X2 => I::DupX2,
            op::DUP2 => I::Dup2,
            op::DUP2_X1 => I::Dup2X1,
            op::DUP2_X2 => I::Dup2X2,
            op::SWAP => I::Swap,

            op::IADD..=op::DREM => {
                let n = usize::from(opcode - op::IADD);
                let ops = [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Rem];
                I::Arith(ops[n / 4], NUM_TYPES[n % 4])
            }
            op::INEG..=op::DNEG => I::Neg(NUM_TYPES[usize::from(opcode - op::INEG)]),
            op::ISHL..=op::LUSHR => {
                let n = usize::from(opcode - op::ISHL);
                let ops = [ArithOp::Shl, ArithOp::Shr, ArithOp::Ushr];
                I::Arith(ops[n / 2], NUM_TYPES[n % 2])
            }
            op::IAND..=op::LXOR => {
                let n = usize::from(opcode - op::IAND);
                let ops = [ArithOp::And, ArithOp::Or, ArithOp::Xor];
                I::Arith(ops[n / 2], NUM_TYPES[n % 2])
            }
            op::IINC => I::Iinc {
                index: u16::from(code[pc + 1]),
                delta: i16::from(code[pc + 2] as i8),
            },
            op::I2L..=op::D2F => {
                let n = usize::from(opcode - op::I2L);
                let from = NUM_TYPES[n / 3];
                let targets: Vec<NumType> = NUM_TYPES.iter().copied().filter(|t| *t != from).collect();
                I::Convert(from, targets[n % 3])
            }
            op::I2B => I::Narrow(ValueKind::Byte),
            op::I2C => I::Narrow(ValueKind::Char),
            op::I2S => I::Narrow(ValueKind::Short),
            op::LCMP => I::Compare(CompareOp::Long),
            op::FCMPL => I::Compare(CompareOp::FloatL),
            op::FCMPG => I::Compare(CompareOp::FloatG),
            op::DCMPL => I::Compare(CompareOp::DoubleL),
            op::DCMPG => I::Compare(CompareOp::DoubleG),

            op::IFEQ..=op::IFLE => I::IfZero(
                CONDS[usize::from(opcode - op::IFEQ)],
                self.branch(pc, i64::from(read_i16(code, pc + 1)))?,
            ),
            op::IF_ICMPEQ..=op::IF_ICMPLE => I::IfCmp(
                CONDS[usize::from(opcode - op::IF_ICMPEQ)],
                self.branch(pc, i64::from(read_i16(code, pc + 1)))?,
            ),
            op::IF_ACMPEQ | op::IF_ACMPNE => I::IfRefEq(
                opcode == op::IF_ACMPEQ,
                self.branch(pc, i64::from(read_i16(code, pc + 1)))?,
            ),
            op::IFNULL | op::IFNONNULL => I::IfNull(
                opcode == op::IFNULL,
                self.branch(pc, i64::from(read_i16(code, pc + 1)))?,
            ),
            op::GOTO => I::Goto(self.branch(pc, i64::from(read_i16(code, pc + 1)))?),
            op::GOTO_W => I::Goto(self.branch(pc, i64::from(read_i32(code, pc + 1)))?),
            op::TABLESWITCH => {
                let base = switch_base(pc);
                let default = self.branch(pc, i64::from(read_i32(code, base)))?;
                let low = read_i32(code, base + 4);
                let high = read_i32(code, base + 8);
                let count = (i64::from(high) - i64::from(low) + 1) as usize;
                let targets = (0..count)
                    .map(|i| self.branch(pc, i64::from(read_i32(code, base + 12 + 4 * i))))
                    .collect::<Result<Vec<_>, _>>()?;
                I::TableSwitch(Box::new(TableSwitch { low, targets, default }))
            }
            op::LOOKUPSWITCH => {
                let base = switch_base(pc);
                let default = self.branch(pc, i64::from(read_i32(code, base)))?;
                let count = read_i32(code, base + 4) as usize;
                let pairs = (0..count)
                    .map(|i| {
                        let at = base + 8 + 8 * i;
                        Ok((read_i32(code, at), self.branch(pc, i64::from(read_i32(code, at + 4)))?))
                    })
                    .collect::<Result<Vec<_>, LinkError>>()?;
                I::LookupSwitch(Box::new(LookupSwitch { pairs, default }))
            }

            op::IRETURN | op::FRETURN | op::ARETURN => I::ReturnValue(Category::One),
            op::LRETURN | op::DRETURN => I::ReturnValue(Category::Two),
            op::RETURN => I::Return,

            op::GETSTATIC => self.static_field(pc, false)?,
            op::PUTSTATIC => self.static_field(pc, true)?,
            op::GETFIELD => self.instance_field(pc, false)?,
            op::PUTFIELD => self.instance_field(pc, true)?,
            op::INVOKEVIRTUAL | op::INVOKESPECIAL | op::INVOKESTATIC | op::INVOKEINTERFACE => {
                self.invoke(pc, opcode)?
            }

            op::NEW => self.class_instruction(pc, Vec::new(), I::New)?,
            op::NEWARRAY => match ValueKind::from_array_type_code(code[pc + 1]) {
                Some(kind) => I::NewArray(kind),
                None => {
                    return Err(LinkError::BadConstant {
                        offset,
                        index: u16::from(code[pc + 1]),
                        reason: "invalid newarray type code".to_string(),
                    })
                }
            },
            op::ANEWARRAY => {
                let component = self.class_operand(pc)?;
                let array = if component.starts_with('[') {
                    format!("[{}", component)
                } else {
                    format!("[L{};", component)
                };
                match self.class_id(&array) {
                    Some(id) => I::NewRefArray(id),
                    None => self.missing(SymbolKind::Class, component.to_string(), vec![Category::One], Some(Category::One)),
                }
            }
            op::MULTIANEWARRAY => {
                let dims = code[pc + 3];
                if dims == 0 {
                    return Err(LinkError::BadConstant {
                        offset,
                        index: u16_operand(),
                        reason: "multianewarray with zero dimensions".to_string(),
                    });
                }
                self.class_instruction(pc, vec![Category::One; usize::from(dims)], |class| {
                    I::MultiNewArray { class, dims }
                })?
            }
            op::ARRAYLENGTH => I::ArrayLength,
            op::ATHROW => I::Throw,
            op::CHECKCAST => self.class_instruction(pc, vec![Category::One], I::CheckCast)?,
            op::INSTANCEOF => self.class_instruction(pc, vec![Category::One], I::InstanceOf)?,
            op::MONITORENTER => I::MonitorEnter,
            op::MONITOREXIT => I::MonitorExit,

            op::WIDE => {
                let inner = code[pc + 1];
                let index = read_u16(code, pc + 2);
                match inner {
                    op::IINC => I::Iinc {
                        index,
                        delta: read_i16(code, pc + 4),
                    },
                    op::ILOAD..=op::ALOAD => I::load(index, LOCAL_CATEGORIES[usize::from(inner - op::ILOAD)]),
                    op::ISTORE..=op::ASTORE => I::store(index, LOCAL_CATEGORIES[usize::from(inner - op::ISTORE)]),
                    _ => {
                        return Err(LinkError::Unsupported {
                            offset,
                            mnemonic: mnemonic(inner),
                        })
                    }
                }
            }

            op::JSR | op::JSR_W | op::RET | op::INVOKEDYNAMIC => {
                return Err(LinkError::Unsupported {
                    offset,
                    mnemonic: mnemonic(opcode),
                })
            }
            other => {
                return Err(LinkError::InvalidOpcode {
                    offset,
                    opcode: other,
                })
            }
        })
    }
}
