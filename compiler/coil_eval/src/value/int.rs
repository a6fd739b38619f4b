//! The arbitrary-precision integer tower.
//!
//! `Int` keeps `i64`-representable values inline and spills to a heap
//! `BigInt` only beyond that range; the representation is normalized, so
//! the big path never stores a value that fits in `i64`. All arithmetic
//! goes through these methods - the raw representation is private, so
//! unchecked native arithmetic on the inner `i64` cannot leak in.
//!
//! The split mirrors the compiled target's memory contract exactly: a
//! `Small` value is a tag-0 payload, a `Big` value a tag-9 heap record.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive};

use super::heap::Heap;

#[derive(Clone, Debug)]
enum Repr {
    Small(i64),
    Big(Heap<BigInt>),
}

/// Arbitrary-precision integer value.
#[derive(Clone, Debug)]
pub struct Int(Repr);

impl Int {
    /// The value zero.
    pub fn zero() -> Self {
        Int(Repr::Small(0))
    }

    pub fn from_i64(v: i64) -> Self {
        Int(Repr::Small(v))
    }

    /// Normalizing constructor: values in `i64` range stay inline.
    pub fn from_bigint(v: BigInt) -> Self {
        match v.to_i64() {
            Some(small) => Int(Repr::Small(small)),
            None => Int(Repr::Big(Heap::new(v))),
        }
    }

    /// The inline value, if this fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        match &self.0 {
            Repr::Small(v) => Some(*v),
            Repr::Big(_) => None,
        }
    }

    /// Convert to `f64`, saturating to infinity beyond `f64` range.
    ///
    /// Deliberately lossy above 2^53: arithmetic promotion mirrors the
    /// Python semantics, precision-safe comparison goes through
    /// [`Int::cmp_f64`] instead.
    pub fn to_f64(&self) -> f64 {
        match &self.0 {
            Repr::Small(v) => *v as f64,
            Repr::Big(b) => b.to_f64().unwrap_or(if b.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }),
        }
    }

    /// The full value as a `BigInt`.
    pub fn to_bigint(&self) -> BigInt {
        match &self.0 {
            Repr::Small(v) => BigInt::from(*v),
            Repr::Big(b) => (**b).clone(),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(&self.0, Repr::Small(0))
    }

    /// Sign as -1, 0, or 1.
    pub fn signum(&self) -> i32 {
        match &self.0 {
            Repr::Small(v) => match v.cmp(&0) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            },
            // Big values are out of i64 range and never zero.
            Repr::Big(b) => {
                if b.is_negative() {
                    -1
                } else {
                    1
                }
            }
        }
    }

    /// Exact addition.
    pub fn add(&self, other: &Int) -> Int {
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) => match a.checked_add(*b) {
                Some(v) => Int::from_i64(v),
                None => Int::from_bigint(BigInt::from(*a) + BigInt::from(*b)),
            },
            _ => Int::from_bigint(self.to_bigint() + other.to_bigint()),
        }
    }

    /// Exact subtraction.
    pub fn sub(&self, other: &Int) -> Int {
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) => match a.checked_sub(*b) {
                Some(v) => Int::from_i64(v),
                None => Int::from_bigint(BigInt::from(*a) - BigInt::from(*b)),
            },
            _ => Int::from_bigint(self.to_bigint() - other.to_bigint()),
        }
    }

    /// Exact multiplication.
    pub fn mul(&self, other: &Int) -> Int {
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) => match a.checked_mul(*b) {
                Some(v) => Int::from_i64(v),
                None => Int::from_bigint(BigInt::from(*a) * BigInt::from(*b)),
            },
            _ => Int::from_bigint(self.to_bigint() * other.to_bigint()),
        }
    }

    /// Floor division with the divisor's sign convention.
    ///
    /// Returns `None` on a zero divisor.
    pub fn floor_div(&self, other: &Int) -> Option<Int> {
        if other.is_zero() {
            return None;
        }
        match (&self.0, &other.0) {
            // i64::MIN // -1 overflows the small path.
            (Repr::Small(a), Repr::Small(b)) if !(*a == i64::MIN && *b == -1) => {
                Some(Int::from_i64(a.div_floor(b)))
            }
            _ => Some(Int::from_bigint(
                self.to_bigint().div_floor(&other.to_bigint()),
            )),
        }
    }

    /// Modulo with the divisor's sign convention: the result's sign
    /// matches the divisor, not the dividend.
    ///
    /// Returns `None` on a zero divisor.
    pub fn mod_floor(&self, other: &Int) -> Option<Int> {
        if other.is_zero() {
            return None;
        }
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) if !(*a == i64::MIN && *b == -1) => {
                Some(Int::from_i64(a.mod_floor(b)))
            }
            _ => Some(Int::from_bigint(
                self.to_bigint().mod_floor(&other.to_bigint()),
            )),
        }
    }

    /// Exact power for a non-negative exponent.
    ///
    /// Returns `None` when the exponent does not fit in `u64` - such a
    /// result could not be materialized anyway.
    pub fn pow_exact(&self, exp: &Int) -> Option<Int> {
        let exp = match &exp.0 {
            Repr::Small(e) => u64::try_from(*e).ok()?,
            Repr::Big(b) => b.to_u64()?,
        };
        if let Repr::Small(base) = self.0 {
            if let Ok(small_exp) = u32::try_from(exp) {
                if let Some(v) = base.checked_pow(small_exp) {
                    return Some(Int::from_i64(v));
                }
            }
        }
        Some(Int::from_bigint(match u32::try_from(exp) {
            Ok(e) => self.to_bigint().pow(e),
            Err(_) => bigint_pow(self.to_bigint(), exp),
        }))
    }

    /// Exact negation.
    pub fn neg(&self) -> Int {
        match &self.0 {
            Repr::Small(v) => match v.checked_neg() {
                Some(n) => Int::from_i64(n),
                None => Int::from_bigint(-BigInt::from(*v)),
            },
            Repr::Big(b) => Int::from_bigint(-(**b).clone()),
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> Int {
        if self.signum() < 0 {
            self.neg()
        } else {
            self.clone()
        }
    }

    /// Precision-safe comparison against a float.
    ///
    /// Returns `None` only for NaN. Infinities are decisive; values whose
    /// magnitude fits exactly in a double (<= 2^53) compare natively; the
    /// rest compare by decimal digit count, breaking ties on the exact
    /// digit strings. This reproduces Python's behavior exactly:
    /// `2**53 == 2.0**53` holds, while `10**10000 < 1e309` holds because
    /// the float literal already overflowed to infinity.
    pub fn cmp_f64(&self, f: f64) -> Option<Ordering> {
        if f.is_nan() {
            return None;
        }
        if f == f64::INFINITY {
            return Some(Ordering::Less);
        }
        if f == f64::NEG_INFINITY {
            return Some(Ordering::Greater);
        }

        let sign_i = self.signum();
        let sign_f = if f > 0.0 {
            1
        } else if f < 0.0 {
            -1
        } else {
            0
        };
        if sign_i != sign_f {
            return Some(sign_i.cmp(&sign_f));
        }
        if sign_i == 0 {
            return Some(Ordering::Equal);
        }

        const EXACT_LIMIT: u64 = 1 << 53;
        if let Some(v) = self.to_i64() {
            if v.unsigned_abs() <= EXACT_LIMIT {
                // Exactly representable: native compare handles any
                // fractional part of the float.
                return (v as f64).partial_cmp(&f);
            }
        }

        // Beyond 2^53: compare decimal digit counts, then digit strings.
        let negative = sign_i < 0;
        let int_digits = self.digits_abs();
        let f_abs = f.abs();
        let float_digits = format!("{:.0}", f_abs.trunc());
        let ord = match int_digits.len().cmp(&float_digits.len()) {
            Ordering::Equal => match int_digits.cmp(&float_digits) {
                // Integer parts agree digit for digit; only a fractional
                // part of the float can separate them.
                Ordering::Equal => {
                    if f_abs.fract() > 0.0 {
                        Ordering::Less
                    } else {
                        Ordering::Equal
                    }
                }
                ord => ord,
            },
            ord => ord,
        };
        Some(if negative { ord.reverse() } else { ord })
    }

    /// Decimal digits of the absolute value.
    fn digits_abs(&self) -> String {
        match &self.0 {
            Repr::Small(v) => v.unsigned_abs().to_string(),
            Repr::Big(b) => b.magnitude().to_string(),
        }
    }
}

/// Exponentiation by squaring for exponents beyond `u32`.
fn bigint_pow(base: BigInt, exp: u64) -> BigInt {
    let mut result = BigInt::from(1);
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result *= &b;
        }
        b = &b * &b;
        e >>= 1;
    }
    result
}

impl Ord for Int {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) => a.cmp(b),
            // A big value lies strictly outside i64 range, so its sign
            // decides against any small value.
            (Repr::Small(_), Repr::Big(b)) => {
                if b.is_negative() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Repr::Big(a), Repr::Small(_)) => {
                if a.is_negative() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Repr::Big(a), Repr::Big(b)) => (**a).cmp(b),
        }
    }
}

impl PartialOrd for Int {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Int {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Int {}

impl From<i64> for Int {
    fn from(v: i64) -> Self {
        Int::from_i64(v)
    }
}

impl From<BigInt> for Int {
    fn from(v: BigInt) -> Self {
        Int::from_bigint(v)
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Small(v) => write!(f, "{v}"),
            Repr::Big(b) => write!(f, "{b}"),
        }
    }
}
