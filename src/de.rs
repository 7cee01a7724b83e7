//! Unpacking: byte stream -> `Value` tree, with grammar validation and
//! registry-backed identity resolution (§4.4-§4.6).

use crate::depth_tracking::RecursionGuard;
use crate::error::{Error, Result};
use crate::marker::Tag;
use crate::registry;
use crate::value::Value;

/// Decode exactly one value from `buf`. Trailing bytes are ignored; the
/// caller is expected to have already framed the input (§4.5).
pub fn unpack(buf: &[u8]) -> Result<Value> {
    let mut p = Unpacker::new(buf);
    p.read_value()
}

/// Interpret a 1/2/4/8-byte buffer as the signed little-endian length field
/// of an `encode`d outer frame (§4.5).
pub fn size(buf: &[u8]) -> Result<i64> {
    let width = buf.len();
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(Error::BadLength { offset: 0 });
    }
    Ok(read_signed_le(buf, width))
}

struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
    guard: RecursionGuard,
}

impl<'a> Unpacker<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Unpacker {
            buf,
            pos: 0,
            guard: RecursionGuard::new(crate::depth_tracking::max_depth()),
        }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(Error::Eof {
                offset: self.pos,
                needed: n - (self.buf.len() - self.pos),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a `W`-byte length field, rejecting negative values (§4.1).
    fn read_len(&mut self, width: u8) -> Result<usize> {
        let offset = self.pos;
        let bytes = self.read_bytes(width as usize)?;
        let v = read_signed_le(bytes, width as usize);
        if v < 0 {
            return Err(Error::BadLength { offset });
        }
        Ok(v as usize)
    }

    fn read_value(&mut self) -> Result<Value> {
        let tag_offset = self.pos;
        let tag_byte = self.read_byte()?;
        let tag = Tag::from_byte(tag_byte).ok_or(Error::InvalidTag {
            offset: tag_offset,
            tag: tag_byte,
        })?;
        match tag {
            Tag::Int(width) => {
                let bytes = self.read_bytes(width as usize)?;
                Ok(Value::Int(read_signed_le(bytes, width as usize)))
            }
            Tag::UInt => {
                let bytes = self.read_bytes(8)?;
                Ok(Value::UInt(u64::from_le_bytes(bytes.try_into().unwrap())))
            }
            Tag::Float => {
                let bytes = self.read_bytes(8)?;
                let bits = u64::from_ne_bytes(bytes.try_into().unwrap());
                Ok(Value::Float(f64::from_bits(bits)))
            }
            Tag::Complex => {
                let re_bytes = self.read_bytes(8)?;
                let re = f64::from_bits(u64::from_ne_bytes(re_bytes.try_into().unwrap()));
                let im_bytes = self.read_bytes(8)?;
                let im = f64::from_bits(u64::from_ne_bytes(im_bytes.try_into().unwrap()));
                Ok(Value::Complex(re, im))
            }
            Tag::Null => Ok(Value::Null),
            Tag::True => Ok(Value::Bool(true)),
            Tag::False => Ok(Value::Bool(false)),
            Tag::Str(width) => {
                let offset = self.pos;
                let len = self.read_len(width)?;
                let bytes = self.read_bytes(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| Error::BadEncoding { offset })?
                    .to_string();
                Ok(Value::Str(s))
            }
            Tag::Bytes(width) => {
                let len = self.read_len(width)?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            Tag::ByteArray(width) => {
                let len = self.read_len(width)?;
                Ok(Value::ByteArray(self.read_bytes(len)?.to_vec()))
            }
            Tag::Tuple(width) => Ok(Value::Tuple(self.read_seq(width)?)),
            Tag::List(width) => Ok(Value::List(self.read_seq(width)?)),
            Tag::Dict(width) => {
                let _descent = self.guard.descend()?;
                let n = self.read_len(width)?;
                let mut pairs = Vec::with_capacity(n);
                for _ in 0..n {
                    let k = self.read_value()?;
                    let v = self.read_value()?;
                    pairs.push((k, v));
                }
                Ok(Value::Dict(pairs))
            }
            Tag::Set(width) => Ok(Value::Set(self.read_seq(width)?)),
            Tag::FrozenSet(width) => Ok(Value::FrozenSet(self.read_seq(width)?)),
            Tag::Class(width) => self.read_class(width),
            Tag::Singleton(width) => self.read_singleton(width),
            Tag::Instance(width) => self.read_instance(width),
        }
    }

    fn read_seq(&mut self, width: u8) -> Result<Vec<Value>> {
        let _descent = self.guard.descend()?;
        let n = self.read_len(width)?;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(self.read_value()?);
        }
        Ok(items)
    }

    fn read_class(&mut self, width: u8) -> Result<Value> {
        let len = self.read_len(width)?;
        let id = self.read_bytes(len)?;
        let mut inner = Unpacker::new(id);
        let module = expect_str(inner.read_value()?)?;
        let qualname = expect_str(inner.read_value()?)?;
        if registry::lookup_class(id).is_none() {
            return Err(Error::NotRegistered {
                kind: "class",
                identity: describe_class(&module, &qualname),
            });
        }
        Ok(Value::ClassRef { module, qualname })
    }

    fn read_singleton(&mut self, width: u8) -> Result<Value> {
        let len = self.read_len(width)?;
        let id = self.read_bytes(len)?;
        if let Some(value) = registry::lookup_singleton(id) {
            return Ok(value);
        }
        let mut inner = Unpacker::new(id);
        let name = expect_str(inner.read_value()?)?;
        Err(Error::NotRegistered {
            kind: "singleton",
            identity: format!("'{}'", name),
        })
    }

    fn read_instance(&mut self, width: u8) -> Result<Value> {
        let _descent = self.guard.descend()?;
        let len = self.read_len(width)?;
        let body = self.read_bytes(len)?;
        // Swap in the scratch body as the active buffer so the nested
        // reduction tuple is decoded through the same recursion guard as
        // the rest of the call, rather than resetting the depth counter.
        let saved_buf = self.buf;
        let saved_pos = self.pos;
        self.buf = body;
        self.pos = 0;
        let reduction = self.read_value();
        self.buf = saved_buf;
        self.pos = saved_pos;
        let (callable, args, state, extend, update) = parse_reduction(reduction?)?;
        crate::reconstruct::reconstruct(callable, args, state, extend, update)
    }
}

pub(crate) fn describe_class(module: &str, qualname: &str) -> String {
    if module == "builtins" {
        format!("'{}'", qualname)
    } else {
        format!("<class '{}.{}'>", module, qualname)
    }
}

fn expect_str(v: Value) -> Result<String> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(Error::TypeUnpackable {
            reason: format!("expected a string in identity bytes, found {:?}", other),
        }),
    }
}

/// Validate and split a decoded reduction tuple into its named parts, per
/// §4.4's `(callable, args, [state, [extend, [update]]])` shape. Does not
/// resolve `callable` against the registry or construct anything; that is
/// `reconstruct::reconstruct`'s job.
#[allow(clippy::type_complexity)]
fn parse_reduction(
    reduction: Value,
) -> Result<(Value, Vec<Value>, Option<Value>, Option<Value>, Option<Value>)> {
    let items = match reduction {
        Value::Tuple(items) => items,
        other => {
            return Err(Error::BadReduce {
                reason: format!("reduction descriptor must be a tuple, found {:?}", other),
            })
        }
    };
    if !(2..=5).contains(&items.len()) {
        return Err(Error::BadReduce {
            reason: format!(
                "reduction tuple must have 2 to 5 elements, found {}",
                items.len()
            ),
        });
    }
    let mut items = items.into_iter();
    let callable = items.next().unwrap();
    let args = match items.next().unwrap() {
        Value::Tuple(args) => args,
        other => {
            return Err(Error::BadReduce {
                reason: format!("reduction args must be a tuple, found {:?}", other),
            })
        }
    };
    let present_or_none = |v: Value| -> Option<Value> {
        if matches!(v, Value::Null) {
            None
        } else {
            Some(v)
        }
    };
    let state = items.next().and_then(present_or_none);
    let extend = items.next().and_then(present_or_none);
    let update = items.next().and_then(present_or_none);
    Ok((callable, args, state, extend, update))
}

fn read_signed_le(bytes: &[u8], width: usize) -> i64 {
    match width {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_le_bytes(bytes.try_into().unwrap()) as i64,
        4 => i32::from_le_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_le_bytes(bytes.try_into().unwrap()),
        _ => unreachable!("width is always 1, 2, 4, or 8"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::pack;

    #[test]
    fn scenario_null_roundtrip() {
        assert_eq!(unpack(&[0x21]).unwrap(), Value::Null);
    }

    #[test]
    fn size_reads_every_valid_width() {
        assert_eq!(size(&[0x7f]).unwrap(), 127);
        assert_eq!(size(&(300i16).to_le_bytes()).unwrap(), 300);
        assert_eq!(size(&(70000i32).to_le_bytes()).unwrap(), 70000);
        assert_eq!(size(&(5_000_000_000i64).to_le_bytes()).unwrap(), 5_000_000_000);
    }

    #[test]
    fn size_rejects_other_lengths() {
        assert!(matches!(size(&[1, 2, 3]), Err(Error::BadLength { .. })));
        assert!(matches!(size(&[]), Err(Error::BadLength { .. })));
    }

    #[test]
    fn invalid_tag_is_rejected() {
        assert!(matches!(
            unpack(&[0x00]),
            Err(Error::InvalidTag { tag: 0x00, .. })
        ));
    }

    #[test]
    fn truncated_input_is_eof() {
        assert!(matches!(unpack(&[0x31, 0x02, b'h']), Err(Error::Eof { .. })));
    }

    #[test]
    fn invalid_utf8_is_bad_encoding() {
        let bytes = vec![0x31, 0x01, 0xff];
        assert!(matches!(unpack(&bytes), Err(Error::BadEncoding { .. })));
    }

    #[test]
    fn unregistered_singleton_fails() {
        let bytes = pack(&Value::Singleton("procpack::tests::NeverRegistered".to_string())).unwrap();
        assert!(matches!(
            unpack(&bytes),
            Err(Error::NotRegistered { kind: "singleton", .. })
        ));
    }

    #[test]
    fn unregistered_class_fails() {
        let bytes = pack(&Value::ClassRef {
            module: "procpack_tests".to_string(),
            qualname: "NeverRegistered".to_string(),
        })
        .unwrap();
        assert!(matches!(
            unpack(&bytes),
            Err(Error::NotRegistered { kind: "class", .. })
        ));
    }

    #[test]
    fn registered_class_roundtrips() {
        crate::registry::register(crate::registry::Handle::class(
            "procpack_tests",
            "Registered",
        ))
        .unwrap();
        let value = Value::ClassRef {
            module: "procpack_tests".to_string(),
            qualname: "Registered".to_string(),
        };
        let bytes = pack(&value).unwrap();
        assert_eq!(unpack(&bytes).unwrap(), value);
    }

    #[test]
    fn max_depth_minus_one_unpacks_and_plus_one_fails() {
        fn nested(depth: usize) -> Value {
            let mut v = Value::Tuple(vec![]);
            for _ in 0..depth {
                v = Value::Tuple(vec![v]);
            }
            v
        }
        let max = crate::depth_tracking::DEFAULT_MAX_DEPTH;
        // Build the bytes directly rather than through `pack`, which would
        // itself reject the over-limit tree before we get to unpack it.
        let ok_bytes = build_nested_tuple_bytes(max - 1);
        assert!(unpack(&ok_bytes).is_ok());
        let bad_bytes = build_nested_tuple_bytes(max + 1);
        assert!(matches!(unpack(&bad_bytes), Err(Error::Recursion)));
    }

    fn build_nested_tuple_bytes(depth: usize) -> Vec<u8> {
        let mut bytes = vec![0x60 | 0x01, 0x00];
        for _ in 0..depth {
            let mut next = vec![0x60 | 0x01, 0x01];
            next.extend_from_slice(&bytes);
            bytes = next;
        }
        bytes
    }

    #[test]
    fn instance_with_registered_class_reconstructs_through_state_extend_update() {
        use crate::value::Instance;

        fn list_ctor(_args: &[Value]) -> Result<Value> {
            Ok(Value::List(vec![]))
        }
        crate::registry::register(crate::registry::Handle::class_with_constructor(
            "de_tests",
            "ListLike",
            list_ctor,
        ))
        .unwrap();

        let inst = Instance {
            callable: Value::ClassRef {
                module: "de_tests".to_string(),
                qualname: "ListLike".to_string(),
            },
            args: vec![],
            state: None,
            extend: Some(Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
            update: None,
        };
        let bytes = pack(&Value::Instance(Box::new(inst))).unwrap();
        assert_eq!(
            unpack(&bytes).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn instance_with_unregistered_callable_fails_to_reconstruct() {
        use crate::value::Instance;

        let inst = Instance {
            callable: Value::ClassRef {
                module: "de_tests".to_string(),
                qualname: "NeverRegisteredForInstance".to_string(),
            },
            args: vec![],
            state: None,
            extend: None,
            update: None,
        };
        let bytes = pack(&Value::Instance(Box::new(inst))).unwrap();
        assert!(matches!(
            unpack(&bytes),
            Err(Error::NotRegistered { kind: "class", .. })
        ));
    }

    #[test]
    fn instance_with_singleton_callable_ignores_args_and_returns_the_registered_value() {
        use crate::value::Instance;

        let value = Value::Singleton("NotImplemented".to_string());
        let inst = Instance {
            callable: Value::Singleton("NotImplemented".to_string()),
            args: vec![Value::Int(1)],
            state: None,
            extend: None,
            update: None,
        };
        let bytes = pack(&Value::Instance(Box::new(inst))).unwrap();
        assert_eq!(unpack(&bytes).unwrap(), value);
    }

    #[test]
    fn malformed_reduction_shape_is_bad_reduce() {
        // INSTANCE|1, len=3, body = TUPLE|1 len=1 [Null]: only 1 element,
        // but a reduction descriptor needs 2-5.
        let bad = vec![0xF0 | 0x01, 0x03, 0x60 | 0x01, 0x01, 0x21];
        assert!(matches!(unpack(&bad), Err(Error::BadReduce { .. })));
    }
}
