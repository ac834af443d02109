//! Date-driven answers over the filtered corpus.

use super::{Turn, TurnHandler, CITATION_REFUSAL, NOT_ENOUGH_INFO};
use crate::intent;
use async_trait::async_trait;
use patentrag_core::date::{long_date, parse_date_value};
use patentrag_core::error::Result;
use patentrag_core::record::columns;
use patentrag_retrieval::{apply_filters, group_by_year, Corpus};
use std::cmp::Reverse;
use std::sync::Arc;

const LATEST_LIMIT: usize = 10;

/// Filing counts per publication year.
pub struct FilingTimelineHandler {
    corpus: Arc<Corpus>,
}

impl FilingTimelineHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for FilingTimelineHandler {
    fn name(&self) -> &'static str {
        "filing_timeline"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        if !intent::asks_filing_timeline(turn.message) {
            return Ok(None);
        }
        let matching = apply_filters(self.corpus.records(), &turn.plan.filters);
        let years = group_by_year(matching, columns::PUBLICATION_DATE);
        if years.is_empty() {
            return Ok(Some(NOT_ENOUGH_INFO.into()));
        }
        let lines: Vec<String> = years
            .iter()
            .map(|(year, count)| format!("• {year}: {count} patents"))
            .collect();
        Ok(Some(lines.join("\n")))
    }
}

/// The most recently published matching patents.
pub struct LatestHandler {
    corpus: Arc<Corpus>,
}

impl LatestHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for LatestHandler {
    fn name(&self) -> &'static str {
        "latest"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        if !intent::asks_latest(turn.message) {
            return Ok(None);
        }
        let mut dated: Vec<_> = apply_filters(self.corpus.records(), &turn.plan.filters)
            .into_iter()
            .filter_map(|r| parse_date_value(&r.field(columns::PUBLICATION_DATE)).map(|d| (d, r)))
            .collect();
        if dated.is_empty() {
            return Ok(Some(CITATION_REFUSAL.into()));
        }
        dated.sort_by_key(|(date, _)| Reverse(*date));

        let lines: Vec<String> = dated
            .iter()
            .take(LATEST_LIMIT)
            .map(|(date, r)| {
                format!(
                    "• ({}) {} — Patent published on {}",
                    r.publication_number,
                    r.title(),
                    long_date(*date)
                )
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }
}
