use bson::{Bson, Document};

use super::StoreError;
use super::eval::{get_path, match_operators, values_equal};

fn ensure_subdoc<'a>(root: &'a mut Document, key: &str) -> &'a mut Document {
    if !matches!(root.get(key), Some(Bson::Document(_))) {
        root.insert(key.to_string(), Document::new());
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => d,
        _ => unreachable!(),
    }
}

fn traverse_to_parent<'a>(root: &'a mut Document, path: &str) -> (&'a mut Document, String) {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    let mut last = String::new();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            last = seg.to_string();
            break;
        }
        cur = ensure_subdoc(cur, seg);
    }
    (cur, last)
}

pub(crate) fn set_path(root: &mut Document, path: &str, value: Bson) {
    let (parent, last) = traverse_to_parent(root, path);
    parent.insert(last, value);
}

pub(crate) fn unset_path(root: &mut Document, path: &str) -> Option<Bson> {
    // don't create intermediate documents just to remove nothing
    get_path(root, path)?;
    let (parent, last) = traverse_to_parent(root, path);
    parent.remove(&last)
}

fn payload<'a>(op: &str, v: &'a Bson) -> Result<&'a Document, StoreError> {
    v.as_document()
        .ok_or_else(|| StoreError::InvalidOperation(format!("{op} needs a document")))
}

fn add(current: Option<&Bson>, by: &Bson, field: &str) -> Result<Bson, StoreError> {
    let bad = || StoreError::InvalidOperation(format!("cannot $inc non-numeric field `{field}`"));
    let current = current.unwrap_or(&Bson::Int32(0));
    Ok(match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            a.checked_add(*b).map_or_else(|| Bson::Int64(i64::from(*a) + i64::from(*b)), Bson::Int32)
        }
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a).saturating_add(*b)),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.saturating_add(i64::from(*b))),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.saturating_add(*b)),
        (a, b) => {
            let x = crate::utils::num::bson_to_f64(a).ok_or_else(bad)?;
            let y = crate::utils::num::bson_to_f64(b).ok_or_else(bad)?;
            Bson::Double(x + y)
        }
    })
}

/// Items for `$push`/`$addToSet`: the `$each` list if present, else the value itself.
fn each_items(v: &Bson) -> Vec<Bson> {
    match v {
        Bson::Document(d) if d.contains_key("$each") => match d.get("$each") {
            Some(Bson::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        },
        other => vec![other.clone()],
    }
}

fn array_at<'a>(doc: &'a mut Document, path: &str) -> Result<&'a mut Vec<Bson>, StoreError> {
    if get_path(doc, path).is_none() {
        set_path(doc, path, Bson::Array(Vec::new()));
    }
    let (parent, last) = traverse_to_parent(doc, path);
    match parent.get_mut(&last) {
        Some(Bson::Array(a)) => Ok(a),
        _ => Err(StoreError::InvalidOperation(format!("field `{path}` is not an array"))),
    }
}

fn rename_pairs(v: &Bson) -> Result<Vec<(String, String)>, StoreError> {
    let bad = || StoreError::InvalidOperation("$rename targets must be strings".into());
    let docs: Vec<&Document> = match v {
        Bson::Document(d) => vec![d],
        Bson::Array(items) => items.iter().filter_map(Bson::as_document).collect(),
        _ => return Err(bad()),
    };
    let mut out = Vec::new();
    for d in docs {
        for (old, new) in d {
            out.push((old.clone(), new.as_str().ok_or_else(bad)?.to_string()));
        }
    }
    Ok(out)
}

fn pull_matches(item: &Bson, criteria: &Bson) -> Result<bool, StoreError> {
    match criteria {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            match_operators(Some(item), ops)
        }
        Bson::Document(fields) => match item {
            Bson::Document(d) => super::eval::matches(d, fields),
            _ => Ok(false),
        },
        other => Ok(values_equal(item, other)),
    }
}

/// Applies an update document in place and reports whether anything changed.
///
/// A document with no `$` keys replaces the stored one, keeping its `_id`.
///
/// # Errors
/// `InvalidOperation` for unknown operators or type mismatches. `doc` is left
/// untouched on error.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let before = doc.clone();
    let mut next = doc.clone();

    if !update.keys().any(|k| k.starts_with('$')) {
        let id = next.get("_id").cloned();
        next = update.clone();
        if let Some(id) = id {
            next.insert("_id", id);
        }
    }

    for (op, spec) in update.iter().filter(|(k, _)| k.starts_with('$')) {
        match op.as_str() {
            "$set" => {
                for (k, v) in payload(op, spec)? {
                    set_path(&mut next, k, v.clone());
                }
            }
            "$inc" => {
                for (k, v) in payload(op, spec)? {
                    let sum = add(get_path(&next, k), v, k)?;
                    set_path(&mut next, k, sum);
                }
            }
            "$unset" => {
                for (k, _) in payload(op, spec)? {
                    unset_path(&mut next, k);
                }
            }
            "$push" => {
                for (k, v) in payload(op, spec)? {
                    array_at(&mut next, k)?.extend(each_items(v));
                }
            }
            "$addToSet" => {
                for (k, v) in payload(op, spec)? {
                    let arr = array_at(&mut next, k)?;
                    for item in each_items(v) {
                        if !arr.iter().any(|x| values_equal(x, &item)) {
                            arr.push(item);
                        }
                    }
                }
            }
            "$pop" => {
                for (k, v) in payload(op, spec)? {
                    if get_path(&next, k).is_none() {
                        continue;
                    }
                    let first = crate::utils::num::bson_to_f64(v).is_some_and(|n| n < 0.0);
                    let arr = array_at(&mut next, k)?;
                    if first {
                        if !arr.is_empty() {
                            arr.remove(0);
                        }
                    } else {
                        arr.pop();
                    }
                }
            }
            "$pull" => {
                for (k, criteria) in payload(op, spec)? {
                    if get_path(&next, k).is_none() {
                        continue;
                    }
                    let arr = array_at(&mut next, k)?;
                    let mut kept = Vec::with_capacity(arr.len());
                    for item in arr.drain(..) {
                        if !pull_matches(&item, criteria)? {
                            kept.push(item);
                        }
                    }
                    *arr = kept;
                }
            }
            "$rename" => {
                for (old, new) in rename_pairs(spec)? {
                    if let Some(v) = unset_path(&mut next, &old) {
                        set_path(&mut next, &new, v);
                    }
                }
            }
            other => {
                return Err(StoreError::InvalidOperation(format!("unknown update operator: {other}")));
            }
        }
    }

    let changed = next != before;
    *doc = next;
    Ok(changed)
}
