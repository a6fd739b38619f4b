//! The arithmetic and comparison engine.
//!
//! This is the single implementation of operator semantics; the iterative
//! interpreter calls it directly and the compiled stack machine calls it
//! through the memory codec, so the two realizations cannot drift.
//!
//! Dispatch is by `(type, type)` pair and then operator, with exhaustive
//! matches over the closed value set. The coercion ladder:
//!
//! 1. comparisons route to their own path (equality is total; ordering on
//!    complex values or mismatched types is a typed error)
//! 2. `str + str` concatenates; every other string arithmetic errors
//! 3. bools coerce to integers
//! 4. int pairs stay exact; `/` promotes to float; `//` and `%` follow
//!    the divisor's sign; zero divisors raise operator-specific errors
//! 5. int/float pairs promote the int (lossy above 2^53 - deliberate;
//!    precision-safe comparison uses `Int::cmp_f64` instead)
//! 6. anything paired with complex promotes to complex

use std::cmp::Ordering;

use coil_ir::{BinaryOp, UnaryOp};

use crate::errors::{
    unsupported_binary, unsupported_unary, zero_division, EvalResult, RuntimeError,
    COMPLEX_DIV_BY_ZERO, DIV_BY_ZERO, FLOAT_DIV_BY_ZERO, FLOAT_FLOORDIV_BY_ZERO,
    FLOAT_MOD_BY_ZERO, INT_FLOORDIV_OR_MOD_BY_ZERO, ZERO_TO_NEGATIVE_POWER,
};
use crate::value::{Complex, Heap, Int, Value};

#[cfg(test)]
mod tests;

/// Numeric view of a value, with bools already coerced to integers.
enum Number {
    Int(Int),
    Float(f64),
    Complex(Complex),
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(i.clone())),
        Value::Bool(b) => Some(Number::Int(Int::from_i64(i64::from(*b)))),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::Complex(c) => Some(Number::Complex(*c)),
        _ => None,
    }
}

impl Number {
    fn to_complex(&self) -> Complex {
        match self {
            Number::Int(i) => Complex::from_real(i.to_f64()),
            Number::Float(f) => Complex::from_real(*f),
            Number::Complex(c) => *c,
        }
    }
}

/// Evaluate a binary operation.
pub fn evaluate_binary(op: BinaryOp, left: Value, right: Value) -> EvalResult {
    if op.is_comparison() {
        return evaluate_comparison(op, &left, &right);
    }
    if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
        return match op {
            BinaryOp::Add => Ok(Value::string(format!("{}{}", &**a, &**b))),
            _ => Err(unsupported_binary(op, &left, &right)),
        };
    }
    let (Some(lhs), Some(rhs)) = (as_number(&left), as_number(&right)) else {
        return Err(unsupported_binary(op, &left, &right));
    };
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => int_binary(op, &a, &b, &left, &right),
        (lhs @ Number::Complex(_), rhs) | (lhs, rhs @ Number::Complex(_)) => {
            complex_binary(op, lhs.to_complex(), rhs.to_complex(), &left, &right)
        }
        (Number::Int(a), Number::Float(b)) => float_binary(op, a.to_f64(), b),
        (Number::Float(a), Number::Int(b)) => float_binary(op, a, b.to_f64()),
        (Number::Float(a), Number::Float(b)) => float_binary(op, a, b),
    }
}

/// Evaluate a unary operation. `not` is total; `-`/`+` require a number.
pub fn evaluate_unary(op: UnaryOp, value: Value) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match as_number(&value) {
            Some(Number::Int(i)) => Ok(Value::Int(i.neg())),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            Some(Number::Complex(c)) => Ok(Value::Complex(c.neg())),
            None => Err(unsupported_unary("unary -", &value)),
        },
        UnaryOp::Pos => match as_number(&value) {
            Some(Number::Int(i)) => Ok(Value::Int(i)),
            Some(Number::Float(f)) => Ok(Value::Float(f)),
            Some(Number::Complex(c)) => Ok(Value::Complex(c)),
            None => Err(unsupported_unary("unary +", &value)),
        },
    }
}

/// Binary operations on exact integers.
fn int_binary(op: BinaryOp, a: &Int, b: &Int, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Int(a.add(b))),
        BinaryOp::Sub => Ok(Value::Int(a.sub(b))),
        BinaryOp::Mul => Ok(Value::Int(a.mul(b))),
        // True division always promotes to float.
        BinaryOp::Div => {
            if b.is_zero() {
                Err(zero_division(DIV_BY_ZERO))
            } else {
                Ok(Value::Float(a.to_f64() / b.to_f64()))
            }
        }
        BinaryOp::FloorDiv => a
            .floor_div(b)
            .map(Value::Int)
            .ok_or_else(|| zero_division(INT_FLOORDIV_OR_MOD_BY_ZERO)),
        BinaryOp::Mod => a
            .mod_floor(b)
            .map(Value::Int)
            .ok_or_else(|| zero_division(INT_FLOORDIV_OR_MOD_BY_ZERO)),
        BinaryOp::Pow => {
            if b.signum() < 0 {
                if a.is_zero() {
                    Err(zero_division(ZERO_TO_NEGATIVE_POWER))
                } else {
                    Ok(Value::Float(a.to_f64().powf(b.to_f64())))
                }
            } else {
                a.pow_exact(b)
                    .map(Value::Int)
                    .ok_or_else(|| unsupported_binary(op, left, right))
            }
        }
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => unreachable!("comparisons route to evaluate_comparison"),
    }
}

/// Binary operations on doubles.
fn float_binary(op: BinaryOp, a: f64, b: f64) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div => {
            if b == 0.0 {
                Err(zero_division(FLOAT_DIV_BY_ZERO))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                Err(zero_division(FLOAT_FLOORDIV_BY_ZERO))
            } else {
                Ok(Value::Float((a / b).floor()))
            }
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                Err(zero_division(FLOAT_MOD_BY_ZERO))
            } else {
                Ok(Value::Float(python_fmod(a, b)))
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                Err(zero_division(ZERO_TO_NEGATIVE_POWER))
            } else {
                Ok(Value::Float(a.powf(b)))
            }
        }
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => unreachable!("comparisons route to evaluate_comparison"),
    }
}

/// Float modulo with the divisor's sign convention: adjust the truncating
/// remainder by the divisor when the signs disagree, and give a zero
/// result the divisor's sign.
fn python_fmod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r == 0.0 {
        0.0f64.copysign(b)
    } else if (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

/// Binary operations on complex values.
fn complex_binary(op: BinaryOp, a: Complex, b: Complex, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Complex(a.add(b))),
        BinaryOp::Sub => Ok(Value::Complex(a.sub(b))),
        BinaryOp::Mul => Ok(Value::Complex(a.mul(b))),
        BinaryOp::Div => {
            if b.is_zero() {
                Err(zero_division(COMPLEX_DIV_BY_ZERO))
            } else {
                Ok(Value::Complex(a.div(b)))
            }
        }
        // No floor, modulo, or power over complex values.
        BinaryOp::FloorDiv | BinaryOp::Mod | BinaryOp::Pow => {
            Err(unsupported_binary(op, left, right))
        }
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => unreachable!("comparisons route to evaluate_comparison"),
    }
}

/// Comparison path: equality is total over the value set, ordering errors
/// on complex values and mismatched non-numeric types.
fn evaluate_comparison(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!equals(left, right))),
        _ => match order(op, left, right)? {
            // Unordered (NaN involved): every ordering comparison is false.
            None => Ok(Value::Bool(false)),
            Some(ord) => Ok(Value::Bool(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::GtEq => ord != Ordering::Less,
                _ => unreachable!("equality handled above"),
            })),
        },
    }
}

/// Semantic equality. Total: mismatched types compare unequal, they do
/// not error.
pub fn equals(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return number_equals(&a, &b);
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        (Value::Pair(a), Value::Pair(b)) => pair_equals(a, b),
        // Functions compare by identity: same body, same captured frame.
        (Value::Closure(a), Value::Closure(b)) => a == b,
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        (Value::Error(a), Value::Error(b)) => a == b,
        _ => false,
    }
}

/// Public ordering comparison over the value set.
///
/// `Ok(None)` means unordered (NaN); every ordering operator is then
/// false.
pub fn compare(left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeError> {
    order(BinaryOp::Lt, left, right)
}

fn number_equals(a: &Number, b: &Number) -> bool {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x == y,
        (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
            i.cmp_f64(*f) == Some(Ordering::Equal)
        }
        (Number::Float(x), Number::Float(y)) => x == y,
        (Number::Complex(x), Number::Complex(y)) => x == y,
        (Number::Complex(c), Number::Int(i)) | (Number::Int(i), Number::Complex(c)) => {
            c.im == 0.0 && i.cmp_f64(c.re) == Some(Ordering::Equal)
        }
        (Number::Complex(c), Number::Float(f)) | (Number::Float(f), Number::Complex(c)) => {
            c.im == 0.0 && c.re == *f
        }
    }
}

/// Structural pair equality without host recursion: long guest lists are
/// pairs nested thousands deep.
fn pair_equals(a: &Heap<(Value, Value)>, b: &Heap<(Value, Value)>) -> bool {
    let mut worklist: Vec<(Value, Value)> = vec![(
        Value::Pair(a.clone()),
        Value::Pair(b.clone()),
    )];
    while let Some((x, y)) = worklist.pop() {
        match (x, y) {
            (Value::Pair(p), Value::Pair(q)) => {
                if Heap::ptr_eq(&p, &q) {
                    continue;
                }
                worklist.push((p.0.clone(), q.0.clone()));
                worklist.push((p.1.clone(), q.1.clone()));
            }
            (x, y) => {
                if !equals(&x, &y) {
                    return false;
                }
            }
        }
    }
    true
}

fn order(
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<Option<Ordering>, RuntimeError> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return match (a, b) {
            (Number::Complex(_), _) | (_, Number::Complex(_)) => {
                Err(unsupported_binary(op, left, right))
            }
            (Number::Int(x), Number::Int(y)) => Ok(Some(x.cmp(&y))),
            (Number::Int(i), Number::Float(f)) => Ok(i.cmp_f64(f)),
            (Number::Float(f), Number::Int(i)) => Ok(i.cmp_f64(f).map(Ordering::reverse)),
            (Number::Float(x), Number::Float(y)) => Ok(x.partial_cmp(&y)),
        };
    }
    match (left, right) {
        // Lexicographic by code unit.
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        _ => Err(unsupported_binary(op, left, right)),
    }
}
