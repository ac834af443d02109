use super::{Turn, TurnHandler, NOT_ENOUGH_INFO};
use crate::intent;
use async_trait::async_trait;
use patentrag_core::date::year_of;
use patentrag_core::error::Result;
use patentrag_core::record::{columns, PatentRecord};
use patentrag_retrieval::{apply_filters, group_by_year, top_k_groups, Corpus};
use std::sync::Arc;
use tracing::debug;

/// Grouped counts over the filtered corpus, one example patent per group.
pub struct AggregationHandler {
    corpus: Arc<Corpus>,
}

impl AggregationHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for AggregationHandler {
    fn name(&self) -> &'static str {
        "aggregation"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        let Some(spec) = turn.plan.aggregation.as_ref().filter(|a| !a.group_by.is_empty()) else {
            return Ok(None);
        };
        let matching = apply_filters(self.corpus.records(), &turn.plan.filters);
        let by_year = spec.group_by == columns::PUBLICATION_DATE || intent::asks_each_year(turn.message);

        let groups: Vec<(String, usize, Option<&PatentRecord>)> = if by_year {
            group_by_year(matching.iter().copied(), columns::PUBLICATION_DATE)
                .into_iter()
                .map(|(year, n)| {
                    let example = matching
                        .iter()
                        .copied()
                        .find(|r| year_of(&r.field(columns::PUBLICATION_DATE)) == Some(year));
                    (year.to_string(), n, example)
                })
                .collect()
        } else {
            top_k_groups(matching.iter().copied(), &spec.group_by, spec.top_k)
                .into_iter()
                .map(|(key, n)| {
                    let needle = key.to_lowercase();
                    let example = matching.iter().copied().find(|r| {
                        r.text(&spec.group_by)
                            .is_some_and(|v| v.to_lowercase().contains(&needle))
                    });
                    (key, n, example)
                })
                .collect()
        };
        debug!(group_by = %spec.group_by, by_year, groups = groups.len(), "Aggregated");

        if groups.is_empty() {
            return Ok(Some(NOT_ENOUGH_INFO.into()));
        }

        let counting = intent::asks_counts(turn.message);
        let lines: Vec<String> = groups
            .iter()
            .map(|(key, n, example)| match example {
                Some(r) if counting => format!(
                    "• {key} — {n} patents (e.g. ({}) “{}”)",
                    r.publication_number,
                    r.title()
                ),
                Some(r) => format!(
                    "• {key} — {n} patents; example: ({}) “{}”",
                    r.publication_number,
                    r.title()
                ),
                None => format!("• {key} — {n} patents"),
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }
}
