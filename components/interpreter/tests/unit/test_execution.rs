//! Arithmetic, control flow and calls.

use bytecode_system::op;
use class_model::ClassBuilder;
use core_types::Value;

use crate::support::{engine, static_method, APP};

fn call(builder: ClassBuilder, name: &str, descriptor: &str, args: Vec<Value>) -> Option<Value> {
    let mut engine = engine();
    engine.load(builder.build()).unwrap();
    engine.invoke(APP, name, descriptor, args).unwrap()
}

#[test]
fn test_int_arithmetic() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "calc", "(II)I", (2, 2), |asm| {
        asm.emit(op::ILOAD_0).emit(op::ILOAD_1).emit(op::IMUL);
        asm.emit(op::ILOAD_0).emit(op::IADD);
        asm.emit(op::ILOAD_1).emit(op::ISUB).emit(op::IRETURN);
    });
    let result = call(b, "calc", "(II)I", vec![Value::Int(6), Value::Int(7)]);
    assert_eq!(result, Some(Value::Int(41)));
}

#[test]
fn test_int_overflow_wraps() {
    let mut b = ClassBuilder::new(APP);
    let max = b.integer(i32::MAX);
    static_method(&mut b, "wrap", "()I", (2, 0), |asm| {
        asm.emit_u8(op::LDC, max as u8).emit(op::ICONST_1).emit(op::IADD).emit(op::IRETURN);
    });
    assert_eq!(call(b, "wrap", "()I", Vec::new()), Some(Value::Int(i32::MIN)));
}

#[test]
fn test_min_int_divided_by_minus_one() {
    let mut b = ClassBuilder::new(APP);
    let min = b.integer(i32::MIN);
    static_method(&mut b, "div", "()I", (2, 0), |asm| {
        asm.emit_u8(op::LDC, min as u8).emit(op::ICONST_M1).emit(op::IDIV).emit(op::IRETURN);
    });
    assert_eq!(call(b, "div", "()I", Vec::new()), Some(Value::Int(i32::MIN)));
}

#[test]
fn test_shift_distance_is_masked() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "shift", "()I", (2, 0), |asm| {
        asm.emit(op::ICONST_1).emit_u8(op::BIPUSH, 33).emit(op::ISHL).emit(op::IRETURN);
    });
    assert_eq!(call(b, "shift", "()I", Vec::new()), Some(Value::Int(2)));
}

#[test]
fn test_narrowing_to_byte() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "narrow", "()I", (1, 0), |asm| {
        asm.emit_i16(op::SIPUSH, 200).emit(op::I2B).emit(op::IRETURN);
    });
    assert_eq!(call(b, "narrow", "()I", Vec::new()), Some(Value::Int(-56)));
}

#[test]
fn test_long_parameters_take_two_slots() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "mul", "(JJ)J", (4, 4), |asm| {
        asm.emit(op::LLOAD_0).emit(op::LLOAD_2).emit(op::LMUL).emit(op::LRETURN);
    });
    let result = call(b, "mul", "(JJ)J", vec![Value::Long(3_000_000_000), Value::Long(3)]);
    assert_eq!(result, Some(Value::Long(9_000_000_000)));
}

#[test]
fn test_long_compare() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "cmp", "(JJ)I", (4, 4), |asm| {
        asm.emit(op::LLOAD_0).emit(op::LLOAD_2).emit(op::LCMP).emit(op::IRETURN);
    });
    let result = call(b, "cmp", "(JJ)I", vec![Value::Long(-5), Value::Long(2)]);
    assert_eq!(result, Some(Value::Int(-1)));
}

#[test]
fn test_double_division_by_zero_is_infinite() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "inf", "()D", (4, 0), |asm| {
        asm.emit(op::DCONST_1).emit(op::DCONST_0).emit(op::DDIV).emit(op::DRETURN);
    });
    assert_eq!(call(b, "inf", "()D", Vec::new()), Some(Value::Double(f64::INFINITY)));
}

#[test]
fn test_counting_loop() {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "sum", "()I", (2, 2), |asm| {
        let head = asm.label();
        let done = asm.label();
        asm.emit(op::ICONST_0).emit(op::ISTORE_0);
        asm.emit(op::ICONST_1).emit(op::ISTORE_1);
        asm.bind(head);
        asm.emit(op::ILOAD_1).emit_u8(op::BIPUSH, 10);
        asm.branch(op::IF_ICMPGT, done);
        asm.emit(op::ILOAD_0).emit(op::ILOAD_1).emit(op::IADD).emit(op::ISTORE_0);
        asm.iinc(1, 1);
        asm.branch(op::GOTO, head);
        asm.bind(done);
        asm.emit(op::ILOAD_0).emit(op::IRETURN);
    });
    assert_eq!(call(b, "sum", "()I", Vec::new()), Some(Value::Int(55)));
}

#[test]
fn test_recursive_static_calls() {
    let mut b = ClassBuilder::new(APP);
    let fact = b.method_ref(APP, "fact", "(I)I");
    static_method(&mut b, "fact", "(I)I", (3, 1), |asm| {
        let recurse = asm.label();
        asm.emit(op::ILOAD_0).emit(op::ICONST_1);
        asm.branch(op::IF_ICMPGT, recurse);
        asm.emit(op::ICONST_1).emit(op::IRETURN);
        asm.bind(recurse);
        asm.emit(op::ILOAD_0).emit(op::ILOAD_0).emit(op::ICONST_1).emit(op::ISUB);
        asm.emit_u16(op::INVOKESTATIC, fact);
        asm.emit(op::IMUL).emit(op::IRETURN);
    });
    assert_eq!(call(b, "fact", "(I)I", vec![Value::Int(10)]), Some(Value::Int(3_628_800)));
}

fn switch_class(lookup: bool) -> ClassBuilder {
    let mut b = ClassBuilder::new(APP);
    static_method(&mut b, "pick", "(I)I", (1, 1), |asm| {
        let cases = [asm.label(), asm.label(), asm.label()];
        let default = asm.label();
        asm.emit(op::ILOAD_0);
        if lookup {
            asm.lookup_switch(&[(0, cases[0]), (100, cases[1]), (200, cases[2])], default);
        } else {
            asm.table_switch(0, &cases, default);
        }
        for (case, value) in cases.iter().zip([10u8, 20, 30]) {
            asm.bind(*case);
            asm.emit_u8(op::BIPUSH, value).emit(op::IRETURN);
        }
        asm.bind(default);
        asm.emit(op::ICONST_M1).emit(op::IRETURN);
    });
    b
}

#[test]
fn test_table_switch() {
    let mut engine = engine();
    engine.load(switch_class(false).build()).unwrap();
    let pick = |engine: &mut interpreter::Engine, n| engine.invoke(APP, "pick", "(I)I", vec![Value::Int(n)]).unwrap();
    assert_eq!(pick(&mut engine, 0), Some(Value::Int(10)));
    assert_eq!(pick(&mut engine, 2), Some(Value::Int(30)));
    assert_eq!(pick(&mut engine, 3), Some(Value::Int(-1)));
    assert_eq!(pick(&mut engine, -1), Some(Value::Int(-1)));
}

#[test]
fn test_lookup_switch() {
    let mut engine = engine();
    engine.load(switch_class(true).build()).unwrap();
    let pick = |engine: &mut interpreter::Engine, n| engine.invoke(APP, "pick", "(I)I", vec![Value::Int(n)]).unwrap();
    assert_eq!(pick(&mut engine, 100), Some(Value::Int(20)));
    assert_eq!(pick(&mut engine, 200), Some(Value::Int(30)));
    assert_eq!(pick(&mut engine, 1), Some(Value::Int(-1)));
}

#[test]
fn test_string_literals_are_interned() {
    let mut b = ClassBuilder::new(APP);
    let hello = b.string("hello");
    static_method(&mut b, "same", "()I", (2, 0), |asm| {
        let differ = asm.label();
        asm.emit_u8(op::LDC, hello as u8).emit_u8(op::LDC, hello as u8);
        asm.branch(op::IF_ACMPNE, differ);
        asm.emit(op::ICONST_1).emit(op::IRETURN);
        asm.bind(differ);
        asm.emit(op::ICONST_0).emit(op::IRETURN);
    });
    let mut engine = engine();
    engine.load(b.build()).unwrap();
    assert_eq!(engine.invoke(APP, "same", "()I", Vec::new()).unwrap(), Some(Value::Int(1)));
    let interned = engine.heap().interned("hello").unwrap();
    assert_eq!(engine.string_text(interned).as_deref(), Some("hello"));
}
