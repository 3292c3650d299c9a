//! Numeric coercion for loosely-typed `Bson` inputs.
//!
//! Guidelines
//! - Return `Option` when a non-numeric value should stop the caller (limit/offset setters).
//! - Saturate instead of panicking when converting between widths.

use bson::Bson;

/// Reads an integer out of a numeric-looking value.
///
/// Int32/Int64 pass through, finite doubles are truncated toward zero, and strings are
/// accepted when they parse as an integer or a finite float. Everything else is `None`.
#[must_use]
pub fn bson_to_i64_lenient(v: &Bson) -> Option<i64> {
    match v {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) => f64_to_i64_trunc(*f),
        Bson::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(f64_to_i64_trunc))
        }
        _ => None,
    }
}

/// Numeric value as `f64`, `None` for non-numbers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bson_to_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        Bson::Decimal128(d) => d.to_string().parse::<f64>().ok(),
        _ => None,
    }
}

#[must_use]
pub const fn is_number(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn f64_to_i64_trunc(v: f64) -> Option<i64> {
    if !v.is_finite() || v >= i64::MAX as f64 || v <= i64::MIN as f64 {
        return None;
    }
    Some(v.trunc() as i64)
}

#[inline]
#[must_use]
pub fn i64_to_usize_saturating(v: i64) -> usize {
    if v <= 0 { 0 } else { usize::try_from(v).unwrap_or(usize::MAX) }
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
