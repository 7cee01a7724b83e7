//! Width selection and generic-integer packing for the `Int`/`UInt` primitives.

use crate::error::{Error, Result};
use crate::value::Value;

/// The narrowest width `W ∈ {1, 2, 4, 8}` such that
/// `-2^(8W-1) <= v < 2^(8W-1)`.
///
/// Boundary: `v=127 => W=1`, `v=128 => W=2`, `v=-128 => W=1`, `v=-129 => W=2`.
pub fn width_for_signed(v: i64) -> u8 {
    if (-128..128).contains(&v) {
        1
    } else if (-32768..32768).contains(&v) {
        2
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&v) {
        4
    } else {
        8
    }
}

/// Pack a generic host integer into the narrowest representable [`Value`].
///
/// Attempts signed 64-bit first; on positive overflow retries as unsigned
/// 64-bit; on negative overflow (a value below `i64::MIN`) reports
/// [`Error::Overflow`], matching §4.2's description of packing a value from a
/// host numeric type wider than 64 bits.
pub fn pack_generic_int(v: i128) -> Result<Value> {
    if let Ok(v) = i64::try_from(v) {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = u64::try_from(v) {
        return Ok(Value::UInt(v));
    }
    Err(Error::Overflow)
}
