//! Java arithmetic.
//!
//! Integer operations wrap, shifts mask their distance to the operand
//! width, and division by zero is reported to the caller, which raises
//! `ArithmeticException`. Floating-point operations follow IEEE 754, with
//! `%` truncating like C `fmod`.

use bytecode_system::{ArithOp, CompareOp, NumType};
use core_types::Value;
use num_traits::{Float, PrimInt, WrappingAdd, WrappingMul, WrappingNeg, WrappingSub};

/// Integer division or remainder by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivideByZero;

/// Applies a binary operator to two `int`s or two `long`s. Shift distances
/// arrive as the same type and are masked here.
pub fn integer<T>(op: ArithOp, lhs: T, rhs: T) -> Result<T, DivideByZero>
where
    T: PrimInt + WrappingAdd + WrappingSub + WrappingMul + WrappingNeg,
{
    let bits = T::zero().count_zeros();
    let distance = || (rhs.to_i64().unwrap_or(0) as u32) & (bits - 1);
    Ok(match op {
        ArithOp::Add => lhs.wrapping_add(&rhs),
        ArithOp::Sub => lhs.wrapping_sub(&rhs),
        ArithOp::Mul => lhs.wrapping_mul(&rhs),
        ArithOp::Div | ArithOp::Rem if rhs.is_zero() => return Err(DivideByZero),
        // MIN / -1 overflows; Java wraps to MIN with remainder 0.
        ArithOp::Div if rhs == T::zero() - T::one() => lhs.wrapping_neg(),
        ArithOp::Rem if rhs == T::zero() - T::one() => T::zero(),
        ArithOp::Div => lhs / rhs,
        ArithOp::Rem => lhs % rhs,
        ArithOp::Shl => lhs.signed_shl(distance()),
        ArithOp::Shr => lhs.signed_shr(distance()),
        ArithOp::Ushr => lhs.unsigned_shr(distance()),
        ArithOp::And => lhs & rhs,
        ArithOp::Or => lhs | rhs,
        ArithOp::Xor => lhs ^ rhs,
    })
}

/// Shift distance popped as an `int` for a `long` shift.
pub fn long_shift(op: ArithOp, lhs: i64, distance: i32) -> i64 {
    let n = (distance & 0x3f) as u32;
    match op {
        ArithOp::Shl => lhs.signed_shl(n),
        ArithOp::Shr => lhs.signed_shr(n),
        _ => lhs.unsigned_shr(n),
    }
}

/// Applies a binary operator to two `float`s or two `double`s. Bitwise and
/// shift operators do not exist for floating point and yield NaN.
pub fn floating<F: Float>(op: ArithOp, lhs: F, rhs: F) -> F {
    match op {
        ArithOp::Add => lhs + rhs,
        ArithOp::Sub => lhs - rhs,
        ArithOp::Mul => lhs * rhs,
        ArithOp::Div => lhs / rhs,
        ArithOp::Rem => lhs % rhs,
        _ => F::nan(),
    }
}

/// `fcmpl`/`fcmpg`/`dcmpl`/`dcmpg`: -1, 0 or 1, with NaN giving the bias
/// of the instruction.
pub fn compare_floating<F: Float>(op: CompareOp, lhs: F, rhs: F) -> i32 {
    if lhs.is_nan() || rhs.is_nan() {
        return match op {
            CompareOp::FloatG | CompareOp::DoubleG => 1,
            _ => -1,
        };
    }
    match lhs.partial_cmp(&rhs) {
        Some(std::cmp::Ordering::Less) => -1,
        Some(std::cmp::Ordering::Greater) => 1,
        _ => 0,
    }
}

/// Primitive conversion (`i2l`, `f2i`, `d2f`...). Floating-point to
/// integer conversion saturates and maps NaN to zero.
pub fn convert(value: Value, to: NumType) -> Option<Value> {
    Some(match (value, to) {
        (Value::Int(x), NumType::Int) => Value::Int(x),
        (Value::Int(x), NumType::Long) => Value::Long(i64::from(x)),
        (Value::Int(x), NumType::Float) => Value::Float(x as f32),
        (Value::Int(x), NumType::Double) => Value::Double(f64::from(x)),
        (Value::Long(x), NumType::Int) => Value::Int(x as i32),
        (Value::Long(x), NumType::Long) => Value::Long(x),
        (Value::Long(x), NumType::Float) => Value::Float(x as f32),
        (Value::Long(x), NumType::Double) => Value::Double(x as f64),
        (Value::Float(x), NumType::Int) => Value::Int(x as i32),
        (Value::Float(x), NumType::Long) => Value::Long(x as i64),
        (Value::Float(x), NumType::Float) => Value::Float(x),
        (Value::Float(x), NumType::Double) => Value::Double(f64::from(x)),
        (Value::Double(x), NumType::Int) => Value::Int(x as i32),
        (Value::Double(x), NumType::Long) => Value::Long(x as i64),
        (Value::Double(x), NumType::Float) => Value::Float(x as f32),
        (Value::Double(x), NumType::Double) => Value::Double(x),
        _ => return None,
    })
}

/// `lcmp`.
pub fn compare_long(lhs: i64, rhs: i64) -> i32 {
    match lhs.cmp(&rhs) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}
