//! Filter evaluation — does one field value satisfy one predicate?
//!
//! Evaluation is total: it never fails, it answers `false` when a date or
//! number cannot be parsed. Unknown operators answer `true`, so a malformed
//! filter proposed by the rewriter cannot empty a result set on its own.

use patentrag_core::date::parse_date_value;
use patentrag_core::filter::{Filter, FilterOp};
use patentrag_core::record::{columns, display_value, PatentRecord};
use serde_json::Value;

/// Evaluate `op` between a field value and the comparison value.
pub fn evaluate(field: &Value, op: FilterOp, compare: &Value) -> bool {
    match op {
        FilterOp::Eq => normalized(field) == normalized(compare),
        FilterOp::Neq => normalized(field) != normalized(compare),
        FilterOp::Contains => normalized(field).contains(&normalized(compare)),
        FilterOp::StartsWith => normalized(field).starts_with(&normalized(compare)),
        FilterOp::In => {
            let needle = normalized(field);
            candidates(compare).iter().any(|c| {
                let c = normalized(c);
                needle == c || needle.contains(&c)
            })
        }
        FilterOp::Gte => compare_ordered(field, compare).is_some_and(|o| o.is_ge()),
        FilterOp::Lte => compare_ordered(field, compare).is_some_and(|o| o.is_le()),
        FilterOp::Between => between(field, compare),
        FilterOp::Unsupported => true,
    }
}

/// Whether a record passes every filter. `chunk_text` backs the
/// `_chunk_text` pseudo-column.
pub fn record_matches(record: &PatentRecord, chunk_text: &str, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        if f.column == columns::CHUNK_TEXT {
            evaluate(&Value::String(chunk_text.to_string()), f.op, &f.value)
        } else {
            evaluate(&record.field(&f.column), f.op, &f.value)
        }
    })
}

/// Records passing every filter, in table order.
pub fn apply_filters<'a>(records: &'a [PatentRecord], filters: &[Filter]) -> Vec<&'a PatentRecord> {
    records
        .iter()
        .filter(|r| {
            filters.iter().all(|f| {
                // Chunk text only exists during passage search; table-level
                // filtering has nothing to compare it against.
                f.column == columns::CHUNK_TEXT || evaluate(&r.field(&f.column), f.op, &f.value)
            })
        })
        .collect()
}

fn normalized(value: &Value) -> String {
    display_value(value).unwrap_or_default().trim().to_lowercase()
}

fn candidates(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn compare_ordered(field: &Value, compare: &Value) -> Option<std::cmp::Ordering> {
    if let Value::Number(n) = field {
        let lhs = n.as_f64()?;
        if let Some(rhs) = as_number(compare) {
            return lhs.partial_cmp(&rhs);
        }
    }
    let lhs = parse_date_value(field)?;
    let rhs = parse_date_value(compare)?;
    Some(lhs.cmp(&rhs))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn between(field: &Value, compare: &Value) -> bool {
    let Value::Array(bounds) = compare else {
        return false;
    };
    let [low, high] = bounds.as_slice() else {
        return false;
    };
    let (Some(low), Some(high)) = (parse_date_value(low), parse_date_value(high)) else {
        return false;
    };
    parse_date_value(field).is_some_and(|d| low <= d && d <= high)
}
