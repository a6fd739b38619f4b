use std::cmp::Ordering;

use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::value::format_float;

fn int(v: i64) -> Value {
    Value::int(v)
}

fn big(base: i64, exp: u32) -> Value {
    Value::big(BigInt::from(base).pow(exp))
}

fn eval(op: BinaryOp, l: Value, r: Value) -> Value {
    evaluate_binary(op, l, r).expect("operation succeeds")
}

fn eval_err(op: BinaryOp, l: Value, r: Value) -> RuntimeError {
    evaluate_binary(op, l, r).expect_err("operation fails")
}

#[test]
fn exact_addition_beyond_doubles() {
    let a = big(10, 300);
    let b = int(1);
    let sum = eval(BinaryOp::Add, a, b);
    let Value::Int(n) = sum else {
        panic!("expected int")
    };
    let expected = BigInt::from(10).pow(300u32) + 1;
    assert_eq!(n.to_bigint(), expected);
}

#[test]
fn small_arithmetic_stays_exact_at_i64_edges() {
    let max = int(i64::MAX);
    let one = int(1);
    let Value::Int(n) = eval(BinaryOp::Add, max, one) else {
        panic!("expected int")
    };
    assert_eq!(n.to_bigint(), BigInt::from(i64::MAX) + 1);
}

#[test]
fn true_division_promotes_to_float() {
    assert_eq!(eval(BinaryOp::Div, int(1), int(2)), Value::Float(0.5));
    assert_eq!(eval(BinaryOp::Div, int(4), int(2)), Value::Float(2.0));
}

#[test]
fn floor_division_and_modulo_follow_divisor_sign() {
    assert_eq!(eval(BinaryOp::FloorDiv, int(7), int(2)), int(3));
    assert_eq!(eval(BinaryOp::FloorDiv, int(-7), int(2)), int(-4));
    assert_eq!(eval(BinaryOp::FloorDiv, int(7), int(-2)), int(-4));
    assert_eq!(eval(BinaryOp::Mod, int(-7), int(3)), int(2));
    assert_eq!(eval(BinaryOp::Mod, int(7), int(-3)), int(-2));
    assert_eq!(eval(BinaryOp::Mod, int(-7), int(-3)), int(-1));
}

#[test]
fn float_modulo_follows_divisor_sign() {
    assert_eq!(
        eval(BinaryOp::Mod, Value::Float(-7.0), Value::Float(3.0)),
        Value::Float(2.0)
    );
    assert_eq!(
        eval(BinaryOp::Mod, Value::Float(7.5), Value::Float(-2.0)),
        Value::Float(-0.5)
    );
}

#[test]
fn zero_divisors_raise_operator_specific_errors() {
    assert_eq!(
        eval_err(BinaryOp::Div, int(5), int(0)).to_string(),
        "division by zero"
    );
    assert_eq!(
        eval_err(BinaryOp::FloorDiv, int(5), int(0)).to_string(),
        "integer division or modulo by zero"
    );
    assert_eq!(
        eval_err(BinaryOp::Mod, int(5), int(0)).to_string(),
        "integer division or modulo by zero"
    );
    assert_eq!(
        eval_err(BinaryOp::Pow, int(0), int(-1)).to_string(),
        "0.0 cannot be raised to a negative power"
    );
    assert_eq!(
        eval_err(BinaryOp::Div, Value::Float(5.0), Value::Float(0.0)).to_string(),
        "float division by zero"
    );
    assert_eq!(
        eval_err(BinaryOp::Div, Value::complex(1.0, 0.0), Value::complex(0.0, 0.0)).to_string(),
        "complex division by zero"
    );
    for err in [
        eval_err(BinaryOp::Div, int(5), int(0)),
        eval_err(BinaryOp::Mod, int(5), int(0)),
    ] {
        assert_eq!(err.kind.label(), "ZeroDivisionError");
    }
}

#[test]
fn power_is_exact_for_nonnegative_exponents() {
    let Value::Int(n) = eval(BinaryOp::Pow, int(2), int(100)) else {
        panic!("expected int")
    };
    assert_eq!(n.to_bigint(), BigInt::from(2).pow(100u32));
}

#[test]
fn power_with_negative_exponent_promotes_to_float() {
    assert_eq!(eval(BinaryOp::Pow, int(2), int(-1)), Value::Float(0.5));
}

#[test]
fn bool_coerces_to_int_in_arithmetic() {
    assert_eq!(eval(BinaryOp::Add, Value::Bool(true), int(2)), int(3));
    assert_eq!(
        eval(BinaryOp::Mul, Value::Bool(false), Value::Float(3.5)),
        Value::Float(0.0)
    );
}

#[test]
fn bool_does_not_coerce_against_none() {
    assert_eq!(
        eval(BinaryOp::Eq, Value::Bool(false), Value::None),
        Value::Bool(false)
    );
    assert_eq!(
        eval(BinaryOp::NotEq, Value::Bool(false), Value::None),
        Value::Bool(true)
    );
}

#[test]
fn string_concatenation_and_ordering() {
    assert_eq!(
        eval(BinaryOp::Add, Value::string("ab"), Value::string("cd")),
        Value::string("abcd")
    );
    assert_eq!(
        eval(BinaryOp::Lt, Value::string("abc"), Value::string("abd")),
        Value::Bool(true)
    );
    let err = eval_err(BinaryOp::Sub, Value::string("a"), Value::string("b"));
    assert_eq!(
        err.to_string(),
        "unsupported operand type(s) for -: 'str' and 'str'"
    );
}

#[test]
fn mixed_string_int_addition_errors() {
    let err = eval_err(BinaryOp::Add, int(1), Value::string("a"));
    assert_eq!(err.kind.label(), "UnsupportedOperandType");
}

#[test]
fn complex_arithmetic_componentwise() {
    let a = Value::complex(1.0, 2.0);
    let b = Value::complex(3.0, -1.0);
    assert_eq!(eval(BinaryOp::Add, a.clone(), b.clone()), Value::complex(4.0, 1.0));
    // (1+2i)(3-i) = 3 - i + 6i - 2i^2 = 5 + 5i
    assert_eq!(eval(BinaryOp::Mul, a.clone(), b.clone()), Value::complex(5.0, 5.0));
    // Division: multiply by conjugate over |b|^2 = 10.
    assert_eq!(eval(BinaryOp::Div, a, b), Value::complex(0.1, 0.7));
}

#[test]
fn float_promotes_to_complex() {
    assert_eq!(
        eval(BinaryOp::Add, Value::Float(1.5), Value::complex(0.0, 1.0)),
        Value::complex(1.5, 1.0)
    );
}

#[test]
fn complex_ordering_is_unsupported() {
    let err = eval_err(
        BinaryOp::Lt,
        Value::complex(1.0, 0.0),
        Value::complex(2.0, 0.0),
    );
    assert_eq!(
        err.to_string(),
        "'<' not supported between instances of 'complex' and 'complex'"
    );
}

#[test]
fn complex_equality_promotes_exactly() {
    assert_eq!(
        eval(BinaryOp::Eq, int(1), Value::complex(1.0, 0.0)),
        Value::Bool(true)
    );
    assert_eq!(
        eval(BinaryOp::Eq, Value::Float(2.5), Value::complex(2.5, 0.0)),
        Value::Bool(true)
    );
    assert_eq!(
        eval(BinaryOp::Eq, int(1), Value::complex(1.0, 0.5)),
        Value::Bool(false)
    );
}

#[test]
fn two_pow_53_equals_its_float() {
    let lhs = eval(BinaryOp::Pow, int(2), int(53));
    let rhs = Value::Float(2.0f64.powi(53));
    assert_eq!(eval(BinaryOp::Eq, lhs, rhs), Value::Bool(true));
}

#[test]
fn huge_int_is_less_than_overflowed_float_literal() {
    // 1e309 overflowed to infinity in the float domain, so the comparison
    // is true even though the integer is astronomically larger in exact
    // magnitude.
    let huge = Value::big(BigInt::from(10).pow(10_000u32));
    assert_eq!(
        eval(BinaryOp::Lt, huge, Value::Float(f64::INFINITY)),
        Value::Bool(true)
    );
}

#[test]
fn big_int_float_comparison_by_digits() {
    // 3 * 10^19 (20 digits) vs 2.5e19 (20 digits): digit strings decide.
    let lhs = Value::big(BigInt::from(3) * BigInt::from(10).pow(19u32));
    assert_eq!(
        eval(BinaryOp::Gt, lhs.clone(), Value::Float(2.5e19)),
        Value::Bool(true)
    );
    assert_eq!(
        eval(BinaryOp::Lt, lhs, Value::Float(4.0e19)),
        Value::Bool(true)
    );
}

#[test]
fn negative_big_int_comparison_reverses() {
    let lhs = Value::big(-(BigInt::from(3) * BigInt::from(10).pow(19u32)));
    assert_eq!(
        eval(BinaryOp::Lt, lhs, Value::Float(-2.5e19)),
        Value::Bool(true)
    );
}

#[test]
fn one_just_above_two_pow_53_is_greater_than_the_float() {
    let lhs = Value::big(BigInt::from(2).pow(53u32) + 1);
    assert_eq!(
        eval(BinaryOp::Gt, lhs, Value::Float(2.0f64.powi(53))),
        Value::Bool(true)
    );
}

#[test]
fn nan_comparisons_are_all_false() {
    for op in [BinaryOp::Lt, BinaryOp::LtEq, BinaryOp::Gt, BinaryOp::GtEq] {
        assert_eq!(
            eval(op, int(1), Value::Float(f64::NAN)),
            Value::Bool(false)
        );
    }
    assert_eq!(
        eval(BinaryOp::Eq, int(1), Value::Float(f64::NAN)),
        Value::Bool(false)
    );
    assert_eq!(
        eval(BinaryOp::NotEq, int(1), Value::Float(f64::NAN)),
        Value::Bool(true)
    );
}

#[test]
fn unary_operators() {
    assert_eq!(
        evaluate_unary(UnaryOp::Neg, int(5)).expect("neg"),
        int(-5)
    );
    assert_eq!(
        evaluate_unary(UnaryOp::Neg, Value::Bool(true)).expect("neg bool"),
        int(-1)
    );
    assert_eq!(
        evaluate_unary(UnaryOp::Not, int(0)).expect("not"),
        Value::Bool(true)
    );
    assert_eq!(
        evaluate_unary(UnaryOp::Not, Value::string("x")).expect("not str"),
        Value::Bool(false)
    );
    assert_eq!(
        evaluate_unary(UnaryOp::Pos, Value::Bool(true)).expect("pos bool"),
        int(1)
    );
    let err = evaluate_unary(UnaryOp::Neg, Value::string("x")).expect_err("neg str");
    assert_eq!(err.to_string(), "bad operand type for unary -: 'str'");
}

#[test]
fn pair_equality_is_structural_and_iterative() {
    // Build two equal 10_000-deep lists; equality must not recurse on the
    // host stack.
    let mut a = Value::None;
    let mut b = Value::None;
    for i in 0..10_000 {
        a = Value::pair(Value::int(i), a);
        b = Value::pair(Value::int(i), b);
    }
    assert_eq!(eval(BinaryOp::Eq, a.clone(), b.clone()), Value::Bool(true));
    let c = Value::pair(Value::int(-1), b);
    assert_eq!(eval(BinaryOp::Eq, a, c), Value::Bool(false));
}

#[test]
fn equality_never_errors_across_types() {
    assert_eq!(
        eval(BinaryOp::Eq, Value::string("1"), int(1)),
        Value::Bool(false)
    );
    assert_eq!(eval(BinaryOp::Eq, Value::None, int(0)), Value::Bool(false));
}

#[test]
fn ordering_mismatch_errors() {
    let err = eval_err(BinaryOp::Lt, Value::string("a"), int(1));
    assert_eq!(
        err.to_string(),
        "'<' not supported between instances of 'str' and 'int'"
    );
}

#[test]
fn compare_reports_unordered_for_nan() {
    assert_eq!(
        compare(&int(1), &Value::Float(f64::NAN)).expect("comparable"),
        None
    );
    assert_eq!(
        compare(&int(1), &Value::Float(2.0)).expect("comparable"),
        Some(Ordering::Less)
    );
}

proptest! {
    /// Exact integer arithmetic agrees with the BigInt reference.
    #[test]
    fn int_arithmetic_matches_bigint(a in any::<i64>(), b in any::<i64>()) {
        let sum = eval(BinaryOp::Add, int(a), int(b));
        let Value::Int(n) = sum else { panic!("expected int") };
        prop_assert_eq!(n.to_bigint(), BigInt::from(a) + BigInt::from(b));

        let product = eval(BinaryOp::Mul, int(a), int(b));
        let Value::Int(n) = product else { panic!("expected int") };
        prop_assert_eq!(n.to_bigint(), BigInt::from(a) * BigInt::from(b));
    }

    /// Python's sign rule: (a // b) * b + a % b == a, and the remainder
    /// carries the divisor's sign.
    #[test]
    fn floor_div_mod_identity(a in any::<i64>(), b in any::<i64>().prop_filter("nonzero", |v| *v != 0)) {
        let q = eval(BinaryOp::FloorDiv, int(a), int(b));
        let r = eval(BinaryOp::Mod, int(a), int(b));
        let (Value::Int(q), Value::Int(r)) = (q, r) else { panic!("expected ints") };
        prop_assert_eq!(
            q.to_bigint() * BigInt::from(b) + r.to_bigint(),
            BigInt::from(a)
        );
        if !r.is_zero() {
            prop_assert_eq!(i64::from(r.signum()), b.signum());
        }
    }

    /// Formatting a float then parsing it back round-trips exactly.
    #[test]
    fn float_format_round_trips(f in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let rendered = format_float(f);
        let parsed: f64 = rendered.parse().expect("parses");
        prop_assert_eq!(parsed.to_bits(), f.to_bits());
    }
}
