use coil_eval::Value;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

use super::*;

fn empty_program() -> CompiledProgram {
    CompiledProgram {
        functions: Vec::new(),
        entry: 0,
    }
}

fn round_trip(value: &Value) -> Value {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, value).expect("encodable");
    decode(&mem, tv, &empty_program())
}

#[test]
fn int_payload_is_twos_complement() {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, &Value::int(-1)).expect("encodable");
    assert_eq!(tv.tag, tag::INT);
    assert_eq!(tv.payload, u64::MAX);

    let tv = encode(&mut mem, &Value::int(i64::MIN)).expect("encodable");
    assert_eq!(tv.payload, 1u64 << 63);
}

#[test]
fn float_payload_is_raw_bits() {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, &Value::Float(-0.0)).expect("encodable");
    assert_eq!(tv.tag, tag::FLOAT);
    assert_eq!(tv.payload, (-0.0f64).to_bits());
}

#[test]
fn big_integers_spill_to_tag_nine() {
    let mut mem = LinearMemory::new();
    let big = BigInt::from(10).pow(50u32);
    let tv = encode(&mut mem, &Value::big(big.clone())).expect("encodable");
    assert_eq!(tv.tag, tag::BIG_INT);
    let decoded = decode(&mem, tv, &empty_program());
    assert_eq!(decoded, Value::big(big));
}

#[test]
fn negative_big_integer_round_trips() {
    let value = Value::big(-(BigInt::from(7).pow(40u32)));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn string_payload_packs_address_and_length() {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, &Value::string("hello")).expect("encodable");
    assert_eq!(tv.tag, tag::STR);
    let addr = (tv.payload >> 32) as u32;
    let len = tv.payload as u32;
    assert_eq!(len, 5);
    assert_eq!(mem.read_bytes(addr, len), b"hello");
}

#[test]
fn complex_record_is_two_doubles() {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, &Value::complex(1.5, -2.5)).expect("encodable");
    assert_eq!(tv.tag, tag::COMPLEX);
    let addr = tv.payload as u32;
    assert_eq!(f64::from_bits(mem.read_u64(addr)), 1.5);
    assert_eq!(f64::from_bits(mem.read_u64(addr + 8)), -2.5);
}

#[test]
fn pair_record_layout_is_24_bytes() {
    let mut mem = LinearMemory::new();
    let head = encode(&mut mem, &Value::int(1)).expect("encodable");
    let tail = encode(&mut mem, &Value::None).expect("encodable");
    let pair = write_pair(&mut mem, head, tail);
    let addr = pair.payload as u32;
    assert_eq!(mem.read_u32(addr), tag::INT);
    assert_eq!(mem.read_u64(addr + 4), 1);
    assert_eq!(mem.read_u32(addr + 12), tag::NONE);
    assert_eq!(mem.read_u64(addr + 16), 0);
}

#[test]
fn nested_pairs_round_trip() {
    let value = Value::pair(
        Value::int(1),
        Value::pair(Value::string("two"), Value::pair(Value::Float(3.0), Value::None)),
    );
    assert_eq!(round_trip(&value), value);
}

#[test]
fn scalar_round_trips() {
    for value in [
        Value::int(0),
        Value::int(i64::MAX),
        Value::Bool(true),
        Value::Bool(false),
        Value::None,
        Value::Float(f64::INFINITY),
        Value::string(""),
        Value::complex(0.0, 1.0),
    ] {
        assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn nan_round_trips_bit_exactly() {
    let mut mem = LinearMemory::new();
    let tv = encode(&mut mem, &Value::Float(f64::NAN)).expect("encodable");
    assert_eq!(tv.payload, f64::NAN.to_bits());
}

#[test]
fn functions_are_unencodable_data() {
    let mut mem = LinearMemory::new();
    let err = encode(&mut mem, &Value::Builtin(coil_eval::Builtin::Abs))
        .expect_err("functions have no data encoding");
    assert_eq!(err.type_name, "function");
}

#[test]
fn closure_payload_bit_layout() {
    let parts = ClosureParts {
        func_tag: 0x0102,
        arity: 3,
        frame_size: 7,
        parent_env: 0xDEAD_BEEF,
    };
    let payload = pack_closure(parts);
    assert_eq!(payload >> 48, 0x0102);
    assert_eq!((payload >> 40) & 0xFF, 3);
    assert_eq!((payload >> 32) & 0xFF, 7);
    assert_eq!(payload & 0xFFFF_FFFF, 0xDEAD_BEEF);
    assert_eq!(unpack_closure(payload), parts);
}

#[test]
fn environment_records_follow_the_slot_layout() {
    let mut mem = LinearMemory::new();
    let parent = alloc_env(&mut mem, 0, 1);
    let child = alloc_env(&mut mem, parent, 2);

    // Word 0 is the parent address; slots start at +4 in 12-byte strides.
    assert_eq!(mem.read_u32(child), parent);
    assert_eq!(read_slot(&mem, child, 0), TaggedValue::UNBOUND);
    assert_eq!(read_slot(&mem, child, 1), TaggedValue::UNBOUND);

    write_slot(&mut mem, parent, 0, TaggedValue::bool(true));
    assert_eq!(env_read(&mem, child, 1, 0), TaggedValue::bool(true));

    env_write(&mut mem, child, 0, 1, TaggedValue::NONE);
    assert_eq!(read_slot(&mem, child, 1), TaggedValue::NONE);
    // The raw bytes sit where the contract says they sit.
    assert_eq!(mem.read_u32(child + 4 + 12), tag::NONE);
}

#[test]
fn bump_allocation_is_monotone_and_aligned() {
    let mut mem = LinearMemory::new();
    let a = mem.alloc(3);
    let b = mem.alloc(24);
    let c = mem.alloc(1);
    assert!(a < b && b < c);
    assert_eq!(a % 8, 0);
    assert_eq!(b % 8, 0);
    assert_eq!(c % 8, 0);
    assert!(mem.heap_size() >= (c as usize) + 1);
}
