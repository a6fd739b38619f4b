//! The bit-exact linear-memory contract.
//!
//! Every value is a (tag: u32, payload: u64) pair:
//!
//! | tag | variant | payload |
//! |-----|---------|---------|
//! | 0   | Int     | `i64` two's complement |
//! | 1   | Float   | raw `f64` bits |
//! | 2   | Complex | heap address of 16 bytes: re `f64`, im `f64` |
//! | 3   | Bool    | 0 / 1 |
//! | 4   | Str     | upper 32 bits heap address, lower 32 bits byte length |
//! | 5   | Closure | MSB..LSB: 16-bit function tag, 8-bit arity, 8-bit frame size, 32-bit parent env address |
//! | 6   | None    | 0 |
//! | 7   | Unbound | sentinel; reading it is a fatal trap |
//! | 8   | Pair    | heap address of 24 bytes: head tag i32 + head payload i64 + tail tag i32 + tail payload i64 |
//! | 9   | BigInt  | heap address of: sign i32, magnitude byte length u32, little-endian magnitude bytes |
//!
//! Tag 9 unifies the compiled target's integers with the interpreter's
//! arbitrary precision: values representable in `i64` use tag 0, larger
//! magnitudes spill to a heap record, and both paths agree on every
//! observable value.
//!
//! An environment record is word 0 = parent address (0 = none) followed
//! by one 12-byte slot (4-byte tag + 8-byte payload) per declared
//! binding, in declaration order. The heap is a bump pointer; nothing is
//! reclaimed within a run.

use coil_eval::{ClosureValue, Complex, Int, Value};
use coil_ir::FuncId;
use coil_stack::ensure_headroom;
use num_bigint::{BigInt, Sign};

use crate::instr::{CompiledProgram, USER_FUNC_BASE};

/// Value tags.
pub mod tag {
    pub const INT: u32 = 0;
    pub const FLOAT: u32 = 1;
    pub const COMPLEX: u32 = 2;
    pub const BOOL: u32 = 3;
    pub const STR: u32 = 4;
    pub const CLOSURE: u32 = 5;
    pub const NONE: u32 = 6;
    pub const UNBOUND: u32 = 7;
    pub const PAIR: u32 = 8;
    pub const BIG_INT: u32 = 9;
}

/// A (tag, payload) pair.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TaggedValue {
    pub tag: u32,
    pub payload: u64,
}

impl TaggedValue {
    pub const NONE: TaggedValue = TaggedValue {
        tag: tag::NONE,
        payload: 0,
    };
    pub const UNBOUND: TaggedValue = TaggedValue {
        tag: tag::UNBOUND,
        payload: 0,
    };

    pub const fn bool(b: bool) -> TaggedValue {
        TaggedValue {
            tag: tag::BOOL,
            payload: b as u64,
        }
    }

    /// The dialect-level type name for a tag, used in trap messages.
    pub fn type_name(self) -> &'static str {
        match self.tag {
            tag::INT | tag::BIG_INT => "int",
            tag::FLOAT => "float",
            tag::COMPLEX => "complex",
            tag::BOOL => "bool",
            tag::STR => "str",
            tag::CLOSURE => "function",
            tag::NONE => "NoneType",
            tag::PAIR => "pair",
            _ => "unbound",
        }
    }
}

/// Address 0 is the null parent; allocation starts past it, 8-aligned.
const HEAP_BASE: u32 = 8;

/// Bump-allocated linear memory for one run.
#[derive(Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
}

impl LinearMemory {
    pub fn new() -> Self {
        LinearMemory {
            bytes: vec![0; HEAP_BASE as usize],
        }
    }

    /// Allocate `size` bytes, 8-aligned. The bump pointer only advances.
    pub fn alloc(&mut self, size: u32) -> u32 {
        let aligned = self.bytes.len().next_multiple_of(8);
        let addr = u32::try_from(aligned)
            .unwrap_or_else(|_| panic!("linear memory exceeds u32 addressing"));
        self.bytes.resize(aligned + size as usize, 0);
        addr
    }

    /// Bytes in use (the bump pointer).
    pub fn heap_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn write_u32(&mut self, addr: u32, v: u32) {
        self.bytes[addr as usize..addr as usize + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn read_u32(&self, addr: u32) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.bytes[addr as usize..addr as usize + 4]);
        u32::from_le_bytes(buf)
    }

    pub fn write_u64(&mut self, addr: u32, v: u64) {
        self.bytes[addr as usize..addr as usize + 8].copy_from_slice(&v.to_le_bytes());
    }

    pub fn read_u64(&self, addr: u32) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[addr as usize..addr as usize + 8]);
        u64::from_le_bytes(buf)
    }

    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) {
        self.bytes[addr as usize..addr as usize + bytes.len()].copy_from_slice(bytes);
    }

    pub fn read_bytes(&self, addr: u32, len: u32) -> &[u8] {
        &self.bytes[addr as usize..(addr + len) as usize]
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

// Environment records

/// Allocate an environment record: parent word plus `slots` unbound
/// 12-byte slots.
pub fn alloc_env(mem: &mut LinearMemory, parent: u32, slots: u32) -> u32 {
    let addr = mem.alloc(4 + 12 * slots);
    mem.write_u32(addr, parent);
    for index in 0..slots {
        write_slot(mem, addr, index, TaggedValue::UNBOUND);
    }
    addr
}

fn slot_addr(env: u32, index: u32) -> u32 {
    env + 4 + 12 * index
}

/// Write a slot of the record itself.
pub fn write_slot(mem: &mut LinearMemory, env: u32, index: u32, value: TaggedValue) {
    let at = slot_addr(env, index);
    mem.write_u32(at, value.tag);
    mem.write_u64(at + 4, value.payload);
}

/// Read a slot of the record itself (may be the unbound sentinel).
pub fn read_slot(mem: &LinearMemory, env: u32, index: u32) -> TaggedValue {
    let at = slot_addr(env, index);
    TaggedValue {
        tag: mem.read_u32(at),
        payload: mem.read_u64(at + 4),
    }
}

/// Follow `depth` parent words from `env`.
pub fn env_at_depth(mem: &LinearMemory, env: u32, depth: u32) -> u32 {
    let mut current = env;
    for _ in 0..depth {
        current = mem.read_u32(current);
        debug_assert_ne!(current, 0, "lexical address escapes the record chain");
    }
    current
}

/// Read through a lexical address.
pub fn env_read(mem: &LinearMemory, env: u32, depth: u32, index: u32) -> TaggedValue {
    read_slot(mem, env_at_depth(mem, env, depth), index)
}

/// Write through a lexical address.
pub fn env_write(mem: &mut LinearMemory, env: u32, depth: u32, index: u32, value: TaggedValue) {
    let target = env_at_depth(mem, env, depth);
    write_slot(mem, target, index, value);
}

// Closure payload packing

/// Unpacked closure payload fields.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ClosureParts {
    pub func_tag: u16,
    pub arity: u8,
    pub frame_size: u8,
    pub parent_env: u32,
}

/// Pack closure fields, MSB to LSB: 16-bit function tag, 8-bit arity,
/// 8-bit captured-frame size, 32-bit parent environment address.
pub fn pack_closure(parts: ClosureParts) -> u64 {
    (u64::from(parts.func_tag) << 48)
        | (u64::from(parts.arity) << 40)
        | (u64::from(parts.frame_size) << 32)
        | u64::from(parts.parent_env)
}

pub fn unpack_closure(payload: u64) -> ClosureParts {
    ClosureParts {
        func_tag: (payload >> 48) as u16,
        arity: (payload >> 40) as u8,
        frame_size: (payload >> 32) as u8,
        parent_env: payload as u32,
    }
}

// Value codec

/// A value with no memory representation (functions and error values
/// never flow through the codec in a compiled program).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Unencodable {
    pub type_name: &'static str,
}

/// Encode a data value into the memory contract.
pub fn encode(mem: &mut LinearMemory, value: &Value) -> Result<TaggedValue, Unencodable> {
    ensure_headroom(|| match value {
        Value::Int(i) => Ok(encode_int(mem, i)),
        Value::Float(f) => Ok(TaggedValue {
            tag: tag::FLOAT,
            payload: f.to_bits(),
        }),
        Value::Complex(c) => {
            let addr = mem.alloc(16);
            mem.write_u64(addr, c.re.to_bits());
            mem.write_u64(addr + 8, c.im.to_bits());
            Ok(TaggedValue {
                tag: tag::COMPLEX,
                payload: u64::from(addr),
            })
        }
        Value::Bool(b) => Ok(TaggedValue::bool(*b)),
        Value::Str(s) => Ok(encode_str(mem, s)),
        Value::None => Ok(TaggedValue::NONE),
        Value::Pair(p) => {
            let head = encode(mem, &p.0)?;
            let tail = encode(mem, &p.1)?;
            Ok(write_pair(mem, head, tail))
        }
        Value::Closure(_) | Value::Builtin(_) | Value::Error(_) => Err(Unencodable {
            type_name: value.type_name(),
        }),
    })
}

/// Encode an integer: tag 0 when it fits `i64`, tag 9 heap record
/// otherwise.
pub fn encode_int(mem: &mut LinearMemory, value: &Int) -> TaggedValue {
    match value.to_i64() {
        Some(v) => TaggedValue {
            tag: tag::INT,
            payload: v as u64,
        },
        None => {
            let big = value.to_bigint();
            let (sign, bytes) = big.to_bytes_le();
            let sign_word: i32 = match sign {
                Sign::Minus => -1,
                Sign::NoSign => 0,
                Sign::Plus => 1,
            };
            let len = u32::try_from(bytes.len())
                .unwrap_or_else(|_| panic!("big integer exceeds u32 bytes"));
            let addr = mem.alloc(8 + len);
            mem.write_u32(addr, sign_word as u32);
            mem.write_u32(addr + 4, len);
            mem.write_bytes(addr + 8, &bytes);
            TaggedValue {
                tag: tag::BIG_INT,
                payload: u64::from(addr),
            }
        }
    }
}

/// Encode a string: bytes on the heap, address in the upper 32 payload
/// bits, byte length in the lower 32.
pub fn encode_str(mem: &mut LinearMemory, s: &str) -> TaggedValue {
    let len =
        u32::try_from(s.len()).unwrap_or_else(|_| panic!("string exceeds u32 bytes"));
    let addr = mem.alloc(len.max(1));
    mem.write_bytes(addr, s.as_bytes());
    TaggedValue {
        tag: tag::STR,
        payload: (u64::from(addr) << 32) | u64::from(len),
    }
}

/// Write a pair record: head tag i32 + head payload i64 + tail tag i32 +
/// tail payload i64, 24 bytes.
pub fn write_pair(mem: &mut LinearMemory, head: TaggedValue, tail: TaggedValue) -> TaggedValue {
    let addr = mem.alloc(24);
    mem.write_u32(addr, head.tag);
    mem.write_u64(addr + 4, head.payload);
    mem.write_u32(addr + 12, tail.tag);
    mem.write_u64(addr + 16, tail.payload);
    TaggedValue {
        tag: tag::PAIR,
        payload: u64::from(addr),
    }
}

/// Read the components of a pair record.
pub fn read_pair(mem: &LinearMemory, pair: TaggedValue) -> (TaggedValue, TaggedValue) {
    let addr = pair.payload as u32;
    (
        TaggedValue {
            tag: mem.read_u32(addr),
            payload: mem.read_u64(addr + 4),
        },
        TaggedValue {
            tag: mem.read_u32(addr + 12),
            payload: mem.read_u64(addr + 16),
        },
    )
}

/// Decode a memory value back into the engine's value model.
///
/// Closures decode against the program's function table; the interpreter
/// ids in the result are table-relative (the captured-environment field
/// carries the record address), which is all rendering and equality need.
///
/// # Panics
/// Panics on the unbound sentinel or an unknown tag; callers trap on
/// unbound slots before decoding.
pub fn decode(mem: &LinearMemory, value: TaggedValue, program: &CompiledProgram) -> Value {
    ensure_headroom(|| match value.tag {
        tag::INT => Value::int(value.payload as i64),
        tag::FLOAT => Value::Float(f64::from_bits(value.payload)),
        tag::COMPLEX => {
            let addr = value.payload as u32;
            Value::Complex(Complex::new(
                f64::from_bits(mem.read_u64(addr)),
                f64::from_bits(mem.read_u64(addr + 8)),
            ))
        }
        tag::BOOL => Value::Bool(value.payload != 0),
        tag::STR => {
            let addr = (value.payload >> 32) as u32;
            let len = value.payload as u32;
            let bytes = mem.read_bytes(addr, len);
            Value::string(String::from_utf8_lossy(bytes).into_owned())
        }
        tag::CLOSURE => {
            let parts = unpack_closure(value.payload);
            if let Some(builtin) = builtin_for_tag(parts.func_tag) {
                Value::Builtin(builtin)
            } else {
                let name = program
                    .user_function(parts.func_tag)
                    .map_or(coil_ir::Name::EMPTY, |f| f.name);
                Value::Closure(ClosureValue {
                    func: FuncId::from_raw(u32::from(parts.func_tag - USER_FUNC_BASE)),
                    name,
                    arity: u32::from(parts.arity),
                    env: coil_eval::EnvId::from_raw(parts.parent_env),
                })
            }
        }
        tag::NONE => Value::None,
        tag::PAIR => {
            let (head, tail) = read_pair(mem, value);
            Value::pair(decode(mem, head, program), decode(mem, tail, program))
        }
        tag::BIG_INT => {
            let addr = value.payload as u32;
            let sign_word = mem.read_u32(addr) as i32;
            let len = mem.read_u32(addr + 4);
            let bytes = mem.read_bytes(addr + 8, len);
            let sign = match sign_word {
                -1 => Sign::Minus,
                0 => Sign::NoSign,
                _ => Sign::Plus,
            };
            Value::big(BigInt::from_bytes_le(sign, bytes))
        }
        tag::UNBOUND => panic!("decoded the unbound sentinel"),
        other => panic!("unknown value tag {other}"),
    })
}

fn builtin_for_tag(func_tag: u16) -> Option<coil_eval::Builtin> {
    if func_tag < USER_FUNC_BASE {
        coil_eval::Builtin::from_index(u32::from(func_tag))
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
