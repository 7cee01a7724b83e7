//! Packing: `Value` tree -> self-delimiting byte stream (§4.2-§4.5).

use crate::depth_tracking::RecursionGuard;
use crate::error::Result;
use crate::integer::width_for_signed;
use crate::marker::{
    width_for_length, KIND_BYTEARRAY, KIND_BYTES, KIND_CLASS, KIND_DICT, KIND_FROZENSET,
    KIND_INSTANCE, KIND_SET, KIND_SINGLETON, KIND_STR, KIND_TUPLE, TAG_FALSE, TAG_NULL, TAG_TRUE,
};
use crate::value::Value;
use crate::writer::Writer;

/// Encode `value` to a self-delimiting payload (no outer frame).
pub fn pack(value: &Value) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    let mut guard = RecursionGuard::new(crate::depth_tracking::max_depth());
    encode_value(&mut w, value, &mut guard)?;
    Ok(w.into_vec())
}

/// Encode `value` then prepend an outer `W | L(W)` frame (§4.5, §6.1).
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let payload = pack(value)?;
    let mut w = Writer::with_capacity(payload.len() + 9);
    w.push_byte(width_for_length(payload.len() as u64));
    write_length_field(&mut w, payload.len() as u64);
    w.push_bytes(&payload);
    Ok(w.into_vec())
}

/// Write a length-prefixed string value and return its fully encoded bytes.
/// Used both for the `Str` value kind and as the identity-byte builder for
/// the registry (`ID(T)`/`ID(s)` in §4.4).
pub(crate) fn pack_str(s: &str) -> Vec<u8> {
    let mut w = Writer::new();
    write_str(&mut w, s);
    w.into_vec()
}

fn write_str(w: &mut Writer, s: &str) {
    encode_tagged_bytes(w, KIND_STR, s.as_bytes());
}

fn write_length_field(w: &mut Writer, len: u64) -> u8 {
    let width = width_for_length(len);
    let bytes = (len as i64).to_le_bytes();
    w.push_bytes(&bytes[..width as usize]);
    width
}

fn encode_value(w: &mut Writer, value: &Value, guard: &mut RecursionGuard) -> Result<()> {
    match value {
        Value::Null => w.push_byte(TAG_NULL),
        Value::Bool(true) => w.push_byte(TAG_TRUE),
        Value::Bool(false) => w.push_byte(TAG_FALSE),
        Value::Int(v) => encode_int(w, *v),
        Value::UInt(v) => {
            w.push_byte(crate::marker::KIND_UINT);
            w.push_bytes(&v.to_le_bytes());
        }
        Value::Float(v) => {
            // Host byte order by design (§9); this only catches an
            // accidental to_le/to_be substitution during a refactor.
            debug_assert_eq!(
                f64::from_ne_bytes(v.to_bits().to_ne_bytes()).to_bits(),
                v.to_bits()
            );
            w.push_byte(crate::marker::KIND_FLOAT);
            w.push_bytes(&v.to_bits().to_ne_bytes());
        }
        Value::Complex(re, im) => {
            w.push_byte(crate::marker::KIND_COMPLEX);
            w.push_bytes(&re.to_bits().to_ne_bytes());
            w.push_bytes(&im.to_bits().to_ne_bytes());
        }
        Value::Str(s) => write_str(w, s),
        Value::Bytes(b) => encode_tagged_bytes(w, KIND_BYTES, b),
        Value::ByteArray(b) => encode_tagged_bytes(w, KIND_BYTEARRAY, b),
        Value::Tuple(items) => encode_seq(w, KIND_TUPLE, items, guard)?,
        Value::List(items) => encode_seq(w, crate::marker::KIND_LIST, items, guard)?,
        Value::Dict(pairs) => encode_dict(w, pairs, guard)?,
        Value::Set(items) => encode_seq(w, KIND_SET, items, guard)?,
        Value::FrozenSet(items) => encode_seq(w, KIND_FROZENSET, items, guard)?,
        Value::ClassRef { module, qualname } => encode_class(w, module, qualname),
        Value::Singleton(name) => encode_singleton(w, name),
        Value::Instance(inst) => encode_instance(w, inst, guard)?,
    }
    Ok(())
}

fn encode_int(w: &mut Writer, v: i64) {
    let width = width_for_signed(v);
    w.push_byte(width);
    w.push_bytes(&v.to_le_bytes()[..width as usize]);
}

fn encode_tagged_bytes(w: &mut Writer, kind: u8, bytes: &[u8]) {
    let width = width_for_length(bytes.len() as u64);
    w.push_byte(kind | width);
    write_length_field(w, bytes.len() as u64);
    w.push_bytes(bytes);
}

fn encode_seq(
    w: &mut Writer,
    kind: u8,
    items: &[Value],
    guard: &mut RecursionGuard,
) -> Result<()> {
    let _descent = guard.descend()?;
    let width = width_for_length(items.len() as u64);
    w.push_byte(kind | width);
    write_length_field(w, items.len() as u64);
    for item in items {
        encode_value(w, item, guard)?;
    }
    Ok(())
}

fn encode_dict(w: &mut Writer, pairs: &[(Value, Value)], guard: &mut RecursionGuard) -> Result<()> {
    let _descent = guard.descend()?;
    let width = width_for_length(pairs.len() as u64);
    w.push_byte(KIND_DICT | width);
    write_length_field(w, pairs.len() as u64);
    for (k, v) in pairs {
        encode_value(w, k, guard)?;
        encode_value(w, v, guard)?;
    }
    Ok(())
}

fn encode_class(w: &mut Writer, module: &str, qualname: &str) {
    let id = crate::registry::class_identity_bytes(module, qualname);
    let width = width_for_length(id.len() as u64);
    w.push_byte(KIND_CLASS | width);
    write_length_field(w, id.len() as u64);
    w.push_bytes(&id);
}

fn encode_singleton(w: &mut Writer, name: &str) {
    let id = crate::registry::singleton_identity_bytes(name);
    let width = width_for_length(id.len() as u64);
    w.push_byte(KIND_SINGLETON | width);
    write_length_field(w, id.len() as u64);
    w.push_bytes(&id);
}

/// Build the reduction tuple `(callable, args, [state, [extend, [update]]])`,
/// filling any gap before the last present optional slot with `Null` so the
/// positional decode in `de.rs` can recover it, then pack it as a tuple into
/// a scratch buffer (§4.4).
fn encode_instance(
    w: &mut Writer,
    inst: &crate::value::Instance,
    guard: &mut RecursionGuard,
) -> Result<()> {
    let _descent = guard.descend()?;
    let mut items = vec![inst.callable.clone(), Value::Tuple(inst.args.clone())];
    let trailing = [&inst.state, &inst.extend, &inst.update];
    if let Some(last) = trailing.iter().rposition(|slot| slot.is_some()) {
        for slot in trailing.iter().take(last + 1) {
            items.push(slot.clone().unwrap_or(Value::Null));
        }
    }

    let mut scratch = Writer::new();
    encode_value(&mut scratch, &Value::Tuple(items), guard)?;

    let width = width_for_length(scratch.len() as u64);
    w.push_byte(KIND_INSTANCE | width);
    write_length_field(w, scratch.len() as u64);
    w.append(&scratch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::registry::{register, Handle};
    use crate::value::Instance;

    #[test]
    fn scenario_null_true_false() {
        assert_eq!(pack(&Value::Null).unwrap(), vec![0x21]);
        assert_eq!(pack(&Value::Bool(true)).unwrap(), vec![0x22]);
        assert_eq!(pack(&Value::Bool(false)).unwrap(), vec![0x23]);
    }

    #[test]
    fn scenario_int_widths() {
        assert_eq!(pack(&Value::Int(127)).unwrap(), vec![0x01, 0x7f]);
        assert_eq!(pack(&Value::Int(128)).unwrap(), vec![0x02, 0x80, 0x00]);
        assert_eq!(pack(&Value::Int(-1)).unwrap(), vec![0x01, 0xff]);
    }

    #[test]
    fn scenario_str() {
        assert_eq!(
            pack(&Value::Str("hi".to_string())).unwrap(),
            vec![0x31, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn scenario_tuple() {
        assert_eq!(
            pack(&Value::Tuple(vec![Value::Int(1), Value::Int(2)])).unwrap(),
            vec![0x61, 0x02, 0x01, 0x01, 0x01, 0x02]
        );
    }

    #[test]
    fn scenario_empty_dict() {
        assert_eq!(pack(&Value::Dict(vec![])).unwrap(), vec![0x81, 0x00]);
    }

    #[test]
    fn scenario_encode_frame() {
        let value = Value::Tuple(vec![Value::Int(1)]);
        let payload = pack(&value).unwrap();
        assert_eq!(payload, vec![0x61, 0x01, 0x01, 0x01]);
        // frame = W | L(W) | payload; payload is 4 bytes so W=1, L(W)=[0x04].
        let mut expected = vec![0x01u8, payload.len() as u8];
        expected.extend_from_slice(&payload);
        assert_eq!(encode(&value).unwrap(), expected);
    }

    #[test]
    fn preregistered_builtin_singleton_roundtrips() {
        // §8 scenario 8: registering NotImplemented, then packing it,
        // produces a SINGLETON tag whose identity is `pack_str("NotImplemented")`,
        // and unpacking returns the same handle back.
        let value = Value::Singleton("NotImplemented".to_string());
        let bytes = pack(&value).unwrap();
        assert_eq!(bytes[0] & 0xF0, 0xE0);
        assert_eq!(crate::de::unpack(&bytes).unwrap(), value);
    }

    #[test]
    fn instance_with_no_optional_slots_packs_as_two_element_tuple_body() {
        let inst = Instance {
            callable: Value::ClassRef {
                module: "builtins".to_string(),
                qualname: "set".to_string(),
            },
            args: vec![],
            state: None,
            extend: None,
            update: None,
        };
        let bytes = pack(&Value::Instance(Box::new(inst))).unwrap();
        // tag INSTANCE|1, length, then a 2-tuple (callable, args).
        assert_eq!(bytes[0] & 0xF0, 0xF0);
    }

    #[test]
    fn instance_with_gap_is_reconstructed_from_the_one_present_optional_slot() {
        fn empty_list(_args: &[Value]) -> Result<Value> {
            Ok(Value::List(Vec::new()))
        }
        register(Handle::class_with_constructor(
            "ser_tests",
            "GapListLike",
            empty_list,
        ))
        .unwrap();
        let inst = Instance {
            callable: Value::ClassRef {
                module: "ser_tests".to_string(),
                qualname: "GapListLike".to_string(),
            },
            args: vec![],
            state: None,
            extend: Some(Value::List(vec![Value::Int(1)])),
            update: None,
        };
        let bytes = pack(&Value::Instance(Box::new(inst))).unwrap();
        let back = crate::de::unpack(&bytes).unwrap();
        assert_eq!(back, Value::List(vec![Value::Int(1)]));
    }

    #[test]
    fn max_depth_minus_one_packs_and_plus_one_fails() {
        fn nested(depth: usize) -> Value {
            let mut v = Value::Tuple(vec![]);
            for _ in 0..depth {
                v = Value::Tuple(vec![v]);
            }
            v
        }
        let max = crate::depth_tracking::DEFAULT_MAX_DEPTH;
        assert!(pack(&nested(max - 1)).is_ok());
        assert!(matches!(pack(&nested(max + 1)), Err(Error::Recursion)));
    }
}
