//! The process-wide registry mapping encoded identity bytes to live handles.
//!
//! Modeled the way a DICOM attribute dictionary or similar process-wide
//! lookup table is usually built in this ecosystem: a lazily-initialized
//! `RwLock<HashMap<..>>` behind a single accessor function, rather than an
//! external `lazy_static`/`once_cell` dependency, since `std::sync::OnceLock`
//! now covers the same need.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::error::{Error, Result};
use crate::ser::pack_str;
use crate::value::Value;

/// Builds the live value `o` a registered class reduces to, given the
/// reduction's `args` tuple (§4.4: "call `callable(*args)` to construct `o`").
/// Since this codec's value universe is closed, the default constructor used
/// by [`Handle::class`] ignores `args` and returns an empty `Dict`, which the
/// structural state/extend/update fallback in `reconstruct.rs` can then fill.
pub type Constructor = fn(&[Value]) -> Result<Value>;

/// Applies one reconstruction step (`set_state`/`extend`/`update`) to the
/// freshly constructed object in place, in lieu of calling a host method.
pub type ReconstructHook = fn(&mut Value, Value) -> Result<()>;

fn default_construct(_args: &[Value]) -> Result<Value> {
    Ok(Value::Dict(Vec::new()))
}

/// A handle that can be registered so that decoding a matching `Class` or
/// `Singleton` identity can re-resolve it.
#[derive(Clone, Debug, PartialEq)]
pub enum Handle {
    /// Registers that `(module, qualname)` names a known type. Decoding a
    /// matching `Class` identity succeeds and returns the `ClassRef`;
    /// decoding an `Instance` reduction naming it calls `construct` and then
    /// applies whichever of `set_state`/`extend`/`update` are present,
    /// falling back to the structural defaults in `reconstruct.rs` for any
    /// step left `None`.
    Class {
        module: String,
        qualname: String,
        construct: Constructor,
        set_state: Option<ReconstructHook>,
        extend: Option<ReconstructHook>,
        update: Option<ReconstructHook>,
    },
    /// Registers a singleton: decoding a matching `Singleton` identity
    /// returns `value` instead of failing.
    Singleton { name: String, value: Value },
}

impl Handle {
    /// Registers a class with the default constructor (an empty `Dict`) and
    /// no custom reconstruction hooks.
    pub fn class(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Handle::Class {
            module: module.into(),
            qualname: qualname.into(),
            construct: default_construct,
            set_state: None,
            extend: None,
            update: None,
        }
    }

    /// Registers a class with a custom constructor, e.g. one that returns a
    /// `List`/`Set` seed instead of the default empty `Dict`.
    pub fn class_with_constructor(
        module: impl Into<String>,
        qualname: impl Into<String>,
        construct: Constructor,
    ) -> Self {
        Handle::Class {
            module: module.into(),
            qualname: qualname.into(),
            construct,
            set_state: None,
            extend: None,
            update: None,
        }
    }

    /// Overrides one or more reconstruction steps with custom hooks; any
    /// argument left `None` keeps using the structural fallback.
    pub fn with_hooks(
        mut self,
        set_state: Option<ReconstructHook>,
        extend: Option<ReconstructHook>,
        update: Option<ReconstructHook>,
    ) -> Self {
        if let Handle::Class {
            set_state: s,
            extend: e,
            update: u,
            ..
        } = &mut self
        {
            *s = set_state;
            *e = extend;
            *u = update;
        }
        self
    }

    pub fn singleton(name: impl Into<String>, value: Value) -> Self {
        Handle::Singleton {
            name: name.into(),
            value,
        }
    }

    /// Compute `ID(T)` or `ID(s)` per §4.4: the concatenation of the packed
    /// identity strings. This is the registry key.
    fn identity_bytes(&self) -> Vec<u8> {
        match self {
            Handle::Class {
                module, qualname, ..
            } => class_identity_bytes(module, qualname),
            Handle::Singleton { name, .. } => singleton_identity_bytes(name),
        }
    }

    fn describe(&self) -> String {
        match self {
            Handle::Class {
                module, qualname, ..
            } => format!("<class '{}.{}'>", module, qualname),
            Handle::Singleton { name, .. } => format!("'{}'", name),
        }
    }
}

/// `ID(T)` per §4.4: shared between registration and instance reconstruction
/// so both build the same registry key from a `(module, qualname)` pair.
pub(crate) fn class_identity_bytes(module: &str, qualname: &str) -> Vec<u8> {
    let mut bytes = pack_str(module);
    bytes.extend_from_slice(&pack_str(qualname));
    bytes
}

/// `ID(s)` per §4.4.
pub(crate) fn singleton_identity_bytes(name: &str) -> Vec<u8> {
    pack_str(name)
}

type Table = HashMap<Vec<u8>, Handle>;

static REGISTRY: OnceLock<RwLock<Table>> = OnceLock::new();

fn registry() -> &'static RwLock<Table> {
    REGISTRY.get_or_init(|| {
        let mut table = HashMap::new();
        for name in ["NotImplemented", "Ellipsis"] {
            let handle = Handle::singleton(name, Value::Singleton(name.to_string()));
            table.insert(handle.identity_bytes(), handle);
        }
        RwLock::new(table)
    })
}

/// Add `handle` to the registry.
///
/// Idempotent if `handle` is already registered under the same identity with
/// identical contents. Fails with [`Error::AlreadyRegistered`] if the
/// identity is already mapped to a *different* handle (§9 open question:
/// this repo rejects rather than silently overwriting).
pub fn register(handle: Handle) -> Result<()> {
    let identity = handle.identity_bytes();
    let mut table = registry().write().unwrap_or_else(|e| e.into_inner());
    match table.get(&identity) {
        Some(existing) if *existing == handle => Ok(()),
        Some(_) => Err(Error::AlreadyRegistered {
            identity: handle.describe(),
        }),
        None => {
            table.insert(identity, handle);
            Ok(())
        }
    }
}

/// Look up a `Class` identity. Returns the registered handle if present.
pub(crate) fn lookup_class(identity: &[u8]) -> Option<Handle> {
    let table = registry().read().unwrap_or_else(|e| e.into_inner());
    match table.get(identity) {
        Some(handle @ Handle::Class { .. }) => Some(handle.clone()),
        _ => None,
    }
}

/// Look up a `Singleton` identity. Returns the registered value if present.
pub(crate) fn lookup_singleton(identity: &[u8]) -> Option<Value> {
    let table = registry().read().unwrap_or_else(|e| e.into_inner());
    match table.get(identity) {
        Some(Handle::Singleton { value, .. }) => Some(value.clone()),
        _ => None,
    }
}
