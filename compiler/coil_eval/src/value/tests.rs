use std::cmp::Ordering;

use coil_ir::StringInterner;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

use super::*;

// Float formatting

#[test]
fn large_magnitudes_use_exponential_form() {
    assert_eq!(format_float(1e16), "1e+16");
    assert_eq!(format_float(-1e16), "-1e+16");
    assert_eq!(format_float(1.235e20), "1.235e+20");
}

#[test]
fn just_below_the_threshold_stays_decimal() {
    assert_eq!(format_float(1e16 - 10.0), "9999999999999990.0");
    assert_eq!(format_float(2.0f64.powi(53)), "9007199254740992.0");
}

#[test]
fn small_magnitudes_use_exponential_form() {
    assert_eq!(format_float(6.45e-9), "6.45e-09");
    assert_eq!(format_float(9.9e-5), "9.9e-05");
    assert_eq!(format_float(1e-300), "1e-300");
}

#[test]
fn boundary_small_magnitude_stays_decimal() {
    assert_eq!(format_float(1e-4), "0.0001");
}

#[test]
fn integral_floats_keep_a_trailing_zero() {
    assert_eq!(format_float(1.0), "1.0");
    assert_eq!(format_float(-3.0), "-3.0");
    assert_eq!(format_float(0.0), "0.0");
}

#[test]
fn negative_zero_is_distinct() {
    assert_eq!(format_float(-0.0), "-0.0");
}

#[test]
fn non_finite_floats() {
    assert_eq!(format_float(f64::INFINITY), "inf");
    assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    assert_eq!(format_float(f64::NAN), "nan");
}

#[test]
fn ordinary_fractions_use_shortest_digits() {
    assert_eq!(format_float(3.14), "3.14");
    assert_eq!(format_float(0.1), "0.1");
}

// Complex formatting

#[test]
fn complex_renders_with_mandatory_sign() {
    assert_eq!(format_complex(Complex::new(1.0, 2.0)), "(1.0+2.0j)");
    assert_eq!(format_complex(Complex::new(1.0, -2.0)), "(1.0-2.0j)");
    assert_eq!(format_complex(Complex::new(0.0, 1.0)), "(0.0+1.0j)");
    assert_eq!(format_complex(Complex::new(1.5, f64::NAN)), "(1.5+nanj)");
}

// Value rendering

#[test]
fn repr_of_scalars() {
    let interner = StringInterner::new();
    assert_eq!(repr(&Value::int(42), &interner), "42");
    assert_eq!(repr(&Value::Bool(true), &interner), "True");
    assert_eq!(repr(&Value::Bool(false), &interner), "False");
    assert_eq!(repr(&Value::None, &interner), "None");
    assert_eq!(
        repr(&Value::big(BigInt::from(10).pow(40u32)), &interner),
        format!("1{}", "0".repeat(40))
    );
}

#[test]
fn repr_quotes_strings_but_display_does_not() {
    let interner = StringInterner::new();
    let v = Value::string("hi");
    assert_eq!(repr(&v, &interner), "'hi'");
    assert_eq!(display(&v, &interner), "hi");

    let quoted = Value::string("it's");
    assert_eq!(repr(&quoted, &interner), "\"it's\"");
    let newline = Value::string("a\nb");
    assert_eq!(repr(&newline, &interner), "'a\\nb'");
}

#[test]
fn pairs_render_with_repr_components() {
    let interner = StringInterner::new();
    let p = Value::pair(Value::int(1), Value::pair(Value::string("x"), Value::None));
    assert_eq!(repr(&p, &interner), "[1, ['x', None]]");
}

#[test]
fn functions_render_by_name() {
    let interner = StringInterner::new();
    let name = interner.intern("compose");
    let closure = Value::Closure(ClosureValue {
        func: coil_ir::FuncId::from_raw(0),
        name,
        arity: 2,
        env: crate::env::EnvId::from_raw(0),
    });
    assert_eq!(repr(&closure, &interner), "<function compose>");

    let lambda = Value::Closure(ClosureValue {
        func: coil_ir::FuncId::from_raw(1),
        name: coil_ir::Name::EMPTY,
        arity: 1,
        env: crate::env::EnvId::from_raw(0),
    });
    assert_eq!(repr(&lambda, &interner), "<lambda>");
    assert_eq!(
        repr(&Value::Builtin(crate::builtins::Builtin::Abs), &interner),
        "<builtin function abs>"
    );
}

// Truthiness

#[test]
fn truthiness_over_the_value_set() {
    assert!(!Value::int(0).is_truthy());
    assert!(Value::int(-1).is_truthy());
    assert!(!Value::Float(0.0).is_truthy());
    assert!(!Value::Float(-0.0).is_truthy());
    assert!(Value::Float(f64::NAN).is_truthy());
    assert!(!Value::complex(0.0, 0.0).is_truthy());
    assert!(Value::complex(0.0, 0.5).is_truthy());
    assert!(!Value::string("").is_truthy());
    assert!(Value::string(" ").is_truthy());
    assert!(!Value::None.is_truthy());
    assert!(Value::pair(Value::None, Value::None).is_truthy());
    assert!(Value::error("boom").is_truthy());
}

#[test]
fn type_names() {
    assert_eq!(Value::int(1).type_name(), "int");
    assert_eq!(Value::None.type_name(), "NoneType");
    assert_eq!(Value::pair(Value::None, Value::None).type_name(), "pair");
    assert_eq!(Value::error("x").type_name(), "error");
}

// The integer tower

#[test]
fn int_normalizes_at_the_i64_boundary() {
    let max = Int::from_i64(i64::MAX);
    let spilled = max.add(&Int::from_i64(1));
    assert!(spilled.to_i64().is_none());
    let back = spilled.sub(&Int::from_i64(1));
    assert_eq!(back.to_i64(), Some(i64::MAX));
}

#[test]
fn int_floor_division_handles_i64_min() {
    let min = Int::from_i64(i64::MIN);
    let quotient = min.floor_div(&Int::from_i64(-1)).expect("nonzero divisor");
    assert_eq!(quotient.to_bigint(), -BigInt::from(i64::MIN));
}

#[test]
fn int_cmp_f64_exact_window() {
    let exact = Int::from_i64(1 << 53);
    assert_eq!(exact.cmp_f64(2.0f64.powi(53)), Some(Ordering::Equal));
    let above = exact.add(&Int::from_i64(1));
    assert_eq!(above.cmp_f64(2.0f64.powi(53)), Some(Ordering::Greater));
}

#[test]
fn int_cmp_f64_against_infinities_and_nan() {
    let huge = Int::from_bigint(BigInt::from(10).pow(10_000u32));
    assert_eq!(huge.cmp_f64(f64::INFINITY), Some(Ordering::Less));
    assert_eq!(huge.cmp_f64(f64::NEG_INFINITY), Some(Ordering::Greater));
    assert_eq!(huge.cmp_f64(f64::NAN), None);
    assert_eq!(huge.cmp_f64(1e300), Some(Ordering::Greater));
}

#[test]
fn int_display_is_exact_decimal() {
    let n = Int::from_bigint(BigInt::from(10).pow(300u32));
    let rendered = n.to_string();
    assert_eq!(rendered.len(), 301);
    assert!(rendered.starts_with('1'));
    assert!(rendered[1..].bytes().all(|b| b == b'0'));
}
