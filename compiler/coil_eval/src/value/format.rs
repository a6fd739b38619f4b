//! Value formatting, faithful to CPython's `repr`.
//!
//! The float rules are the load-bearing part: magnitude at or above 1e16,
//! or nonzero below 1e-4, renders in exponential form with a sign-included
//! two-digit exponent; integral floats in between keep a trailing `.0`;
//! `-0.0` stays distinct from `0.0`; infinities and NaN render as `inf`,
//! `-inf`, `nan`. Rust's shortest round-trip `Display` for `f64` selects
//! the same digits as CPython's `repr`.

use coil_ir::StringInterner;
use coil_stack::ensure_headroom;

use super::{Complex, Value};

/// Format a float exactly as the dialect's `repr` does.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let magnitude = f.abs();
    if magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-4) {
        let shortest = format!("{f:e}");
        let (mantissa, exponent) = shortest
            .split_once('e')
            .unwrap_or((shortest.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else if f == f.trunc() {
        // Integral value below 1e16: exact digits plus a trailing ".0".
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Format a complex value: `(re+imj)` with per-component float rules and
/// a mandatory sign before the imaginary part.
pub fn format_complex(c: Complex) -> String {
    let re = format_float(c.re);
    let im = format_float(c.im);
    if im.starts_with('-') {
        format!("({re}{im}j)")
    } else {
        format!("({re}+{im}j)")
    }
}

/// Canonical representation of a value (`repr` semantics: strings are
/// quoted).
pub fn repr(value: &Value, interner: &StringInterner) -> String {
    ensure_headroom(|| match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Complex(c) => format_complex(*c),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_owned(),
        Value::Str(s) => quote_str(s),
        Value::None => "None".to_owned(),
        Value::Closure(c) => {
            if c.name.is_empty() {
                "<lambda>".to_owned()
            } else {
                format!("<function {}>", interner.lookup(c.name))
            }
        }
        Value::Builtin(b) => format!("<builtin function {}>", b.name()),
        Value::Pair(p) => {
            let (head, tail) = &**p;
            format!("[{}, {}]", repr(head, interner), repr(tail, interner))
        }
        Value::Error(msg) => (**msg).clone(),
    })
}

/// Human-facing rendering (`str` semantics): strings render raw, every
/// other variant matches `repr`.
pub fn display(value: &Value, interner: &StringInterner) -> String {
    match value {
        Value::Str(s) => (**s).clone(),
        _ => repr(value, interner),
    }
}

/// Quote a string the way Python's `repr` does: single quotes unless
/// the content contains a single quote but no double quote.
fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
