//! The dynamically typed value tree the codec packs and unpacks.

/// The full universe of values the wire format can carry: the 14 structural
/// kinds of §3 plus the three identity/reduction kinds.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer, used only when a value doesn't fit in `Int`.
    UInt(u64),
    Float(f64),
    /// `(real, imag)`.
    Complex(f64, f64),
    Str(String),
    /// Immutable byte sequence.
    Bytes(Vec<u8>),
    /// Mutable byte sequence. Distinct from `Bytes` only in the host
    /// language's mutability contract; the wire encoding is identical.
    ByteArray(Vec<u8>),
    /// Ordered, immutable.
    Tuple(Vec<Value>),
    /// Ordered, mutable.
    List(Vec<Value>),
    /// Insertion-ordered `(key, value)` pairs. Dict equality is unordered.
    Dict(Vec<(Value, Value)>),
    /// Mutable, unordered. Modeled as an insertion-ordered `Vec` so repacking
    /// a decoded set is deterministic within a process; equality and the
    /// public contract remain order-independent (§9).
    Set(Vec<Value>),
    /// Immutable, unordered. Same internal model as `Set`.
    FrozenSet(Vec<Value>),
    /// A reference to a type, identified by `(module, qualname)`.
    ClassRef { module: String, qualname: String },
    /// A reference to a registered singleton, identified by its canonical name.
    Singleton(String),
    /// An instance reduction descriptor: `callable(*args)`, optionally
    /// followed by state/extend/update reconstruction steps.
    Instance(Box<Instance>),
}

/// The reduction descriptor carried by an `Instance` value (§4.4).
///
/// On encode, this descriptor is what actually goes on the wire. On decode,
/// `reconstruct::reconstruct` consumes it: it calls `callable`'s registered
/// constructor with `args`, then applies whichever of `state`/`extend`/
/// `update` are present, in that order, and the resulting live `Value` (not
/// an `Instance`) is what `unpack` returns.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub callable: Value,
    pub args: Vec<Value>,
    pub state: Option<Value>,
    pub extend: Option<Value>,
    pub update: Option<Value>,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Complex(ar, ai), Value::Complex(br, bi)) => ar == br && ai == bi,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => dict_eq(a, b),
            (Value::Set(a), Value::Set(b)) => set_eq(a, b),
            (Value::FrozenSet(a), Value::FrozenSet(b)) => set_eq(a, b),
            (
                Value::ClassRef {
                    module: am,
                    qualname: aq,
                },
                Value::ClassRef {
                    module: bm,
                    qualname: bq,
                },
            ) => am == bm && aq == bq,
            (Value::Singleton(a), Value::Singleton(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

fn dict_eq(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .all(|(k, v)| b.iter().any(|(bk, bv)| bk == k && bv == v))
}

fn set_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|v| b.contains(v))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }
}
