use serde_json::Value;
use std::cmp::Ordering;

/// A single entity instance (user, product, category, transaction, log) as
/// returned by the remote inventory API: a flat mapping from field name to a
/// JSON primitive.
///
/// No schema is enforced here; each view knows which fields it renders. The
/// only invariant the rest of the crate relies on is that the `id` field is
/// stable and unique within one fetched collection.
pub type Record = serde_json::Map<String, Value>;

/// Read a record's numeric `id` field.
///
/// # Returns
/// * `Option<i64>` - the identity, or `None` when the field is missing or
///   not an integer
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Read a record's `parent_id` field.
///
/// `None` means the record is a root (the field is absent or JSON null).
pub fn parent_id(record: &Record) -> Option<i64> {
    record.get("parent_id").and_then(Value::as_i64)
}

/// Rank used to order values of different runtime types against each other.
///
/// Missing and null fields sort as minimal so that records lacking the sort
/// column cluster at one consistent end instead of raising an error.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        // Arrays/objects never appear in list payloads; give them a stable
        // rank anyway so the comparison stays total.
        Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
    }
}

/// Generic three-way comparison between two optional field values.
///
/// Numbers compare numerically, strings lexicographically by byte; values of
/// different runtime types compare by [`type_rank`]. This is deliberately
/// locale-unaware and never coerces between types.
///
/// # Arguments
/// * `a` - left field value, `None` when the record lacks the field
/// * `b` - right field value
///
/// # Returns
/// * `Ordering` - a total order over all JSON field values
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()),
        // Both missing/null.
        _ => Ordering::Equal,
    }
}
