//! Instance reconstruction: turns a decoded `(callable, args, [state,
//! [extend, [update]]])` reduction into the live `Value` it describes (§4.4).
//!
//! `callable` is resolved against the registry the same way a `ClassRef` or
//! `Singleton` value is; a class's registered [`Constructor`] stands in for
//! calling the host type, and each of `state`/`extend`/`update` is applied
//! either by the class's registered [`ReconstructHook`] or, if none is
//! registered for that step, by a structural fallback: `state` dict-merges
//! into a `Dict` object, `extend` appends/unions into a `List`/`Set`, and
//! `update` dict-merges pairs into a `Dict`, mirroring the host-language
//! `__setstate__`/`extend`/`update` semantics this codec has no live object
//! to actually invoke.

use crate::error::{Error, Result};
use crate::registry::{self, Handle, ReconstructHook};
use crate::value::Value;

#[derive(Default)]
struct Hooks {
    set_state: Option<ReconstructHook>,
    extend: Option<ReconstructHook>,
    update: Option<ReconstructHook>,
}

pub(crate) fn reconstruct(
    callable: Value,
    args: Vec<Value>,
    state: Option<Value>,
    extend: Option<Value>,
    update: Option<Value>,
) -> Result<Value> {
    let (mut obj, hooks) = construct(&callable, &args)?;
    if let Some(state) = state {
        apply_state(&mut obj, state, hooks.set_state)?;
    }
    if let Some(extend) = extend {
        apply_extend(&mut obj, extend, hooks.extend)?;
    }
    if let Some(update) = update {
        apply_update(&mut obj, update, hooks.update)?;
    }
    Ok(obj)
}

fn construct(callable: &Value, args: &[Value]) -> Result<(Value, Hooks)> {
    match callable {
        Value::ClassRef { module, qualname } => {
            let identity = registry::class_identity_bytes(module, qualname);
            match registry::lookup_class(&identity) {
                Some(Handle::Class {
                    construct,
                    set_state,
                    extend,
                    update,
                    ..
                }) => {
                    let obj = construct(args)?;
                    Ok((
                        obj,
                        Hooks {
                            set_state,
                            extend,
                            update,
                        },
                    ))
                }
                _ => Err(Error::NotRegistered {
                    kind: "class",
                    identity: crate::de::describe_class(module, qualname),
                }),
            }
        }
        Value::Singleton(name) => {
            let identity = registry::singleton_identity_bytes(name);
            match registry::lookup_singleton(&identity) {
                Some(value) => Ok((value, Hooks::default())),
                None => Err(Error::NotRegistered {
                    kind: "singleton",
                    identity: format!("'{}'", name),
                }),
            }
        }
        other => Err(Error::TypeUnpackable {
            reason: format!(
                "instance callable must be a registered class or singleton, found {:?}",
                other
            ),
        }),
    }
}

fn apply_state(obj: &mut Value, state: Value, hook: Option<ReconstructHook>) -> Result<()> {
    if let Some(hook) = hook {
        return hook(obj, state);
    }
    let fields = match obj {
        Value::Dict(fields) => fields,
        _ => {
            return Err(Error::BadState {
                reason: format!(
                    "no set_state hook registered and constructed object is not a Dict: {:?}",
                    obj
                ),
            })
        }
    };
    let updates = match state {
        Value::Dict(pairs) => pairs,
        other => {
            return Err(Error::BadState {
                reason: format!("state must be a Dict without a custom hook, found {:?}", other),
            })
        }
    };
    for (key, value) in updates {
        merge_field(fields, key, value)?;
    }
    Ok(())
}

fn apply_extend(obj: &mut Value, extend: Value, hook: Option<ReconstructHook>) -> Result<()> {
    if let Some(hook) = hook {
        return hook(obj, extend);
    }
    match obj {
        Value::List(items) => {
            items.extend(sequence_items(extend)?);
            Ok(())
        }
        Value::Set(items) => {
            for item in sequence_items(extend)? {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Ok(())
        }
        _ => Err(Error::BadState {
            reason: format!(
                "no extend hook registered and constructed object is not a List or Set: {:?}",
                obj
            ),
        }),
    }
}

fn apply_update(obj: &mut Value, update: Value, hook: Option<ReconstructHook>) -> Result<()> {
    if let Some(hook) = hook {
        return hook(obj, update);
    }
    let fields = match obj {
        Value::Dict(fields) => fields,
        _ => {
            return Err(Error::BadState {
                reason: format!(
                    "no update hook registered and constructed object is not a Dict: {:?}",
                    obj
                ),
            })
        }
    };
    let pairs = match update {
        Value::Dict(pairs) => pairs,
        other => key_value_pairs(other)?,
    };
    for (key, value) in pairs {
        merge_field(fields, key, value)?;
    }
    Ok(())
}

fn merge_field(fields: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Result<()> {
    if !matches!(key, Value::Str(_)) {
        return Err(Error::BadState {
            reason: format!("dict-merge key must be a Str, found {:?}", key),
        });
    }
    if let Some(existing) = fields.iter_mut().find(|(k, _)| *k == key) {
        existing.1 = value;
    } else {
        fields.push((key, value));
    }
    Ok(())
}

fn sequence_items(v: Value) -> Result<Vec<Value>> {
    match v {
        Value::Tuple(items) | Value::List(items) | Value::Set(items) | Value::FrozenSet(items) => {
            Ok(items)
        }
        other => Err(Error::BadState {
            reason: format!(
                "extend source must be a Tuple/List/Set/FrozenSet, found {:?}",
                other
            ),
        }),
    }
}

fn key_value_pairs(v: Value) -> Result<Vec<(Value, Value)>> {
    sequence_items(v)?
        .into_iter()
        .map(|item| match item {
            Value::Tuple(mut pair) | Value::List(mut pair) if pair.len() == 2 => {
                let value = pair.pop().unwrap();
                let key = pair.pop().unwrap();
                Ok((key, value))
            }
            other => Err(Error::BadState {
                reason: format!("update pair must be a 2-element Tuple or List, found {:?}", other),
            }),
        })
        .collect()
}
