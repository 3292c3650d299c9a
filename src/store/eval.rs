use bson::{Bson, Document};
use std::cmp::Ordering;

use super::StoreError;
use crate::utils::num::{bson_to_f64, is_number};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;

const EARTH_RADIUS_RADIANS_PER_DEGREE: f64 = std::f64::consts::PI / 180.0;

/// Evaluates a compiled filter document against `doc`.
///
/// # Errors
/// `InvalidOperation` for an unknown `$` operator or a malformed operand.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$or" => any_branch(doc, cond, key)?,
            "$and" => all_branches(doc, cond, key)?,
            "$nor" => !any_branch(doc, cond, key)?,
            k if k.starts_with('$') => {
                return Err(StoreError::InvalidOperation(format!("unknown top level operator: {k}")));
            }
            path => match_field(get_path(doc, path), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn branches<'a>(cond: &'a Bson, op: &str) -> Result<Vec<&'a Document>, StoreError> {
    match cond {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|b| {
                b.as_document().ok_or_else(|| {
                    StoreError::InvalidOperation(format!("{op} entries must be documents"))
                })
            })
            .collect(),
        _ => Err(StoreError::InvalidOperation(format!("{op} requires a nonempty array"))),
    }
}

fn any_branch(doc: &Document, cond: &Bson, op: &str) -> Result<bool, StoreError> {
    for b in branches(cond, op)? {
        if matches(doc, b)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn all_branches(doc: &Document, cond: &Bson, op: &str) -> Result<bool, StoreError> {
    for b in branches(cond, op)? {
        if !matches(doc, b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A condition is an operator map when its first key starts with `$`.
fn as_operator_map(cond: &Bson) -> Option<&Document> {
    match cond {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn match_field(value: Option<&Bson>, cond: &Bson) -> Result<bool, StoreError> {
    match as_operator_map(cond) {
        Some(ops) => match_operators(value, ops),
        None => Ok(equals_or_contains(value, cond)),
    }
}

/// Applies an operator map to a single value. Used by `$pull` criteria too.
pub(crate) fn match_operators(value: Option<&Bson>, ops: &Document) -> Result<bool, StoreError> {
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals_or_contains(value, operand),
            "$ne" => !equals_or_contains(value, operand),
            "$gt" => any_cmp(value, operand, |o| o == Ordering::Greater),
            "$gte" => any_cmp(value, operand, |o| o != Ordering::Less),
            "$lt" => any_cmp(value, operand, |o| o == Ordering::Less),
            "$lte" => any_cmp(value, operand, |o| o != Ordering::Greater),
            "$in" => in_set(value, array_operand(op, operand)?),
            "$nin" => !in_set(value, array_operand(op, operand)?),
            "$all" => contains_all(value, array_operand(op, operand)?),
            "$exists" => value.is_some() == truthy(operand),
            "$regex" => regex_match(value, operand, ops.get("$options"))?,
            "$near" | "$nearSphere" => near(value, op, operand, ops.get("$maxDistance"))?,
            // consumed by the operators above
            "$options" | "$maxDistance" => true,
            other => {
                return Err(StoreError::InvalidOperation(format!("unknown operator: {other}")));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn array_operand<'a>(op: &str, operand: &'a Bson) -> Result<&'a [Bson], StoreError> {
    match operand {
        Bson::Array(a) => Ok(a),
        _ => Err(StoreError::InvalidOperation(format!("{op} needs an array"))),
    }
}

const fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Null => false,
        _ => true,
    }
}

/// Equality with numeric widening; an array field matches if it equals the operand
/// or any element does. A missing field only equals `null`.
fn equals_or_contains(value: Option<&Bson>, operand: &Bson) -> bool {
    match value {
        None => matches!(operand, Bson::Null),
        Some(v) => {
            values_equal(v, operand)
                || matches!(v, Bson::Array(items) if items.iter().any(|x| values_equal(x, operand)))
        }
    }
}

pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_number(a) && is_number(b) {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

/// Ordering only within the same type bracket; `None` when the values don't compare.
fn cmp_same_kind(a: &Bson, b: &Bson) -> Option<Ordering> {
    if is_number(a) && is_number(b) {
        return Some(compare_bson(a, b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ => None,
    }
}

fn any_cmp(value: Option<&Bson>, operand: &Bson, pred: impl Fn(Ordering) -> bool) -> bool {
    match value {
        None => false,
        Some(Bson::Array(items)) => {
            items.iter().any(|x| cmp_same_kind(x, operand).is_some_and(&pred))
        }
        Some(v) => cmp_same_kind(v, operand).is_some_and(pred),
    }
}

fn in_set(value: Option<&Bson>, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| equals_or_contains(value, x))
}

fn contains_all(value: Option<&Bson>, wanted: &[Bson]) -> bool {
    if wanted.is_empty() {
        return false;
    }
    wanted.iter().take(MAX_IN_SET).all(|w| equals_or_contains(value, w))
}

#[cfg(feature = "regex")]
fn regex_match(
    value: Option<&Bson>,
    pattern: &Bson,
    options: Option<&Bson>,
) -> Result<bool, StoreError> {
    let Bson::String(pattern) = pattern else {
        return Err(StoreError::InvalidOperation("$regex needs a string".into()));
    };
    let flags = options.and_then(Bson::as_str).unwrap_or("");
    let mut re = regex::RegexBuilder::new(pattern);
    for f in flags.chars() {
        match f {
            'i' => re.case_insensitive(true),
            'm' => re.multi_line(true),
            's' => re.dot_matches_new_line(true),
            'x' => re.ignore_whitespace(true),
            other => {
                return Err(StoreError::InvalidOperation(format!("invalid regex flag: {other}")));
            }
        };
    }
    let re = re.build().map_err(|e| StoreError::InvalidOperation(e.to_string()))?;
    Ok(match value {
        Some(Bson::String(s)) => re.is_match(s),
        Some(Bson::Array(items)) => items.iter().any(|x| x.as_str().is_some_and(|s| re.is_match(s))),
        _ => false,
    })
}

#[cfg(not(feature = "regex"))]
fn regex_match(
    _value: Option<&Bson>,
    _pattern: &Bson,
    _options: Option<&Bson>,
) -> Result<bool, StoreError> {
    Err(StoreError::InvalidOperation("$regex requires the `regex` feature".into()))
}

fn point(v: &Bson) -> Option<(f64, f64)> {
    match v {
        Bson::Array(xs) if xs.len() == 2 => Some((bson_to_f64(&xs[0])?, bson_to_f64(&xs[1])?)),
        _ => None,
    }
}

/// Planar distance for `$near`, great-circle radians for `$nearSphere` (`[lng, lat]`).
fn near(
    value: Option<&Bson>,
    op: &str,
    operand: &Bson,
    max: Option<&Bson>,
) -> Result<bool, StoreError> {
    let target =
        point(operand).ok_or_else(|| StoreError::InvalidOperation(format!("{op} needs [x, y]")))?;
    let Some(here) = value.and_then(point) else {
        return Ok(false);
    };
    let dist = if op == "$nearSphere" { sphere_distance(here, target) } else { plane_distance(here, target) };
    Ok(match max.and_then(bson_to_f64) {
        Some(m) => dist <= m,
        None => true,
    })
}

fn plane_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn sphere_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lng1, lat1) = (a.0 * EARTH_RADIUS_RADIANS_PER_DEGREE, a.1 * EARTH_RADIUS_RADIANS_PER_DEGREE);
    let (lng2, lat2) = (b.0 * EARTH_RADIUS_RADIANS_PER_DEGREE, b.1 * EARTH_RADIUS_RADIANS_PER_DEGREE);
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lng2 - lng1) / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Sorts by each `field: 1|-1` entry of `sort` in turn.
pub fn compare_docs(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, dir) in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, field), get_path(b, field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            let desc = bson_to_f64(dir).is_some_and(|d| d < 0.0);
            return if desc { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for (depth, part) in parts.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Bson::Document(d) => cur = d.get(part)?,
            _ => return None,
        }
    }
    Some(cur)
}

/// Total order used for sorting: numbers by value, same-type values naturally,
/// mixed types by type rank.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_number(a) && is_number(b) {
        let x = bson_to_f64(a).unwrap_or(f64::NAN);
        let y = bson_to_f64(b).unwrap_or(f64::NAN);
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => (x.time, x.increment).cmp(&(y.time, y.increment)),
        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| u8::from(x.subtype).cmp(&u8::from(y.subtype)))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Undefined => 1,
        T::Null => 2,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 3,
        T::String(_) | T::Symbol(_) => 4,
        T::Document(_) => 5,
        T::Array(_) => 6,
        T::Binary(_) => 7,
        T::ObjectId(_) => 8,
        T::Boolean(_) => 9,
        T::DateTime(_) => 10,
        T::Timestamp(_) => 11,
        T::RegularExpression(_) => 12,
        T::DbPointer(_) => 13,
        T::JavaScriptCode(_) | T::JavaScriptCodeWithScope(_) => 14,
        T::MaxKey => 250,
    }
}

/// Applies a `field: 1` (include) or `field: 0` (exclude) projection.
/// `_id` stays unless explicitly excluded.
pub fn project(doc: &Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return doc.clone();
    }
    let including = projection.iter().any(|(k, v)| k != "_id" && truthy(v));
    if including {
        let mut out = Document::new();
        let keep_id = projection.get("_id").is_none_or(truthy);
        if keep_id && let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
        for (field, flag) in projection {
            if field == "_id" || !truthy(flag) {
                continue;
            }
            if let Some(v) = get_path(doc, field) {
                super::apply::set_path(&mut out, field, v.clone());
            }
        }
        out
    } else {
        let mut out = doc.clone();
        for (field, _) in projection {
            super::apply::unset_path(&mut out, field);
        }
        out
    }
}
