//! Property tests over the round-trip, framing, and width-minimality laws
//! described in §8: for any value built from the structural kinds (no
//! registry-dependent `ClassRef`/`Singleton`/`Instance`, since those need a
//! live registration to unpack), `unpack(pack(v)) == v`; `encode` prepends
//! exactly the outer length frame `pack` needs; and every length/integer tag
//! picks the narrowest width that fits.

use proptest::prelude::*;

use crate::value::Value;
use crate::{encode, pack, size, unpack};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::UInt),
        // NaN isn't reflexively equal to itself, so round-trip equality
        // would spuriously fail; restrict to finite floats.
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Float),
        ".*".prop_map(Value::Str),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::ByteArray),
    ]
}

fn value_tree() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Tuple),
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::List),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..8).prop_map(Value::Dict),
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Set),
            proptest::collection::vec(inner, 0..8).prop_map(Value::FrozenSet),
        ]
    })
}

proptest! {
    #[test]
    fn pack_unpack_roundtrips(v in value_tree()) {
        let bytes = pack(&v).unwrap();
        prop_assert_eq!(unpack(&bytes).unwrap(), v);
    }

    #[test]
    fn encode_prepends_exactly_the_length_frame(v in value_tree()) {
        let payload = pack(&v).unwrap();
        let framed = encode(&v).unwrap();
        let width = framed[0] as usize;
        prop_assert!(matches!(width, 1 | 2 | 4 | 8));
        let header_len = 1 + width;
        prop_assert_eq!(&framed[header_len..], &payload[..]);
        prop_assert_eq!(size(&framed[1..header_len]).unwrap(), payload.len() as i64);
    }

    #[test]
    fn int_tag_width_is_narrowest_that_fits(v in any::<i64>()) {
        let bytes = pack(&Value::Int(v)).unwrap();
        let width = bytes[0] as usize;
        prop_assert!(matches!(width, 1 | 2 | 4 | 8));
        prop_assert_eq!(bytes.len(), 1 + width);
        if width > 1 {
            let narrower = width / 2;
            let lo = -(1i64 << (narrower * 8 - 1));
            let hi = 1i64 << (narrower * 8 - 1);
            prop_assert!(v < lo || v >= hi);
        }
    }

    #[test]
    fn str_tag_length_width_is_narrowest_that_fits(s in ".*") {
        let bytes = pack(&Value::Str(s.clone())).unwrap();
        let width = (bytes[0] & 0x0F) as usize;
        let len = s.as_bytes().len() as u64;
        let expected = crate::marker::width_for_length(len);
        prop_assert_eq!(width as u8, expected);
    }
}
