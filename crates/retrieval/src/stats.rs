//! Frequency tables over record columns.

use patentrag_core::date::year_of;
use patentrag_core::record::{display_value, PatentRecord};
use std::collections::{BTreeMap, HashMap};

const MULTI_VALUE_SEPARATORS: &[char] = &[';', ',', '|'];

/// The `k` most frequent values of `field`.
///
/// Multi-valued cells are split on `;`, `,` and `|`. Equal counts keep the
/// order in which each value was first seen.
pub fn top_k_groups<'a, I>(records: I, field: &str, k: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a PatentRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(raw) = display_value(&record.field(field)) else {
            continue;
        };
        for token in raw.split(MULTI_VALUE_SEPARATORS) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let count = counts.entry(token.to_string()).or_insert_with(|| {
                order.push(token.to_string());
                0
            });
            *count += 1;
        }
    }

    let mut groups: Vec<(String, usize)> = order
        .into_iter()
        .map(|key| {
            let n = counts[&key];
            (key, n)
        })
        .collect();
    // Stable sort keeps first-seen order among ties.
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups.truncate(k);
    groups
}

/// Record counts per publication year, ascending. Unparsable dates are dropped.
pub fn group_by_year<'a, I>(records: I, date_field: &str) -> Vec<(i32, usize)>
where
    I: IntoIterator<Item = &'a PatentRecord>,
{
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        if let Some(year) = year_of(&record.field(date_field)) {
            *years.entry(year).or_default() += 1;
        }
    }
    years.into_iter().collect()
}
