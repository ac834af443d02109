//! Turn handlers — the cascade of specialised answers.
//!
//! The orchestrator offers each turn to its handlers in a fixed order. A
//! handler either answers the turn (`Some`) or passes (`None`). Not-found
//! and empty results are answers, never errors; only generation failures
//! surface as `Err`.
//!
//! | Handler | Trigger |
//! |---------|---------|
//! | [`ImproveHandler`] | "improve / innovate / build on / extend … ID" (runs before rewriting) |
//! | [`NoveltyHandler`] | "inventor" + "applicant" + "new", with a cited ID in history |
//! | [`InventorViewHandler`] | "inventor" + "this patent", with a cited ID in history |
//! | [`ClaimsHandler`] | "claims of/for ID" |
//! | [`PriorArtHandler`] | "prior art / cited by ID" |
//! | [`FamilyHandler`] | "family" / "parent" with an ID |
//! | [`FilingTimelineHandler`] | "how … filed" |
//! | [`LatestHandler`] | "latest" / "recent" |
//! | [`AggregationHandler`] | aggregation with a `group_by` |
//! | [`RetrievalHandler`] | everything else |

mod aggregate;
mod improve;
mod lookup;
mod retrieval;
mod timeline;

pub use aggregate::AggregationHandler;
pub use improve::ImproveHandler;
pub use lookup::{ClaimsHandler, FamilyHandler, InventorViewHandler, NoveltyHandler, PriorArtHandler};
pub use retrieval::{RetrievalHandler, RetrievalLimits};
pub use timeline::{FilingTimelineHandler, LatestHandler};

use async_trait::async_trait;
use patentrag_core::error::Result;
use patentrag_core::filter::QueryPlan;
use patentrag_core::message::Message;

/// Answer when filters or retrieval leave nothing to work with.
pub const NOT_ENOUGH_INFO: &str = "I don't have enough information in the provided patents.";

/// The refusal the final-answer model is told to use.
pub const CITATION_REFUSAL: &str = "I don't have enough information.";

/// One user turn as seen by a handler.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// The raw user message.
    pub message: &'a str,
    /// Retained conversation, oldest first, excluding this turn.
    pub history: &'a [Message],
    /// Working query plan: rewritten query, merged filters, priority, aggregation.
    pub plan: &'a QueryPlan,
}

#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// `Ok(Some(answer))` ends the turn; `Ok(None)` falls through.
    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use patentrag_core::filter::QueryPlan;
    use patentrag_core::record::{columns, PatentRecord};
    use patentrag_retrieval::Corpus;
    use std::sync::Arc;

    /// A small corpus covering every handler.
    pub fn corpus() -> Arc<Corpus> {
        Arc::new(Corpus::new(vec![
            PatentRecord::new("EP1001")
                .with(columns::TITLE, "Solar still")
                .with(columns::ABSTRACT, "Evaporates brine with sunlight.")
                .with(columns::CLAIMS, "1. A still comprising a basin.")
                .with(columns::ANALYSIS, "Cheaper than reverse osmosis.")
                .with(columns::INVENTOR_NAMES, "Ada Lovelace")
                .with(columns::APPLICANT_NAMES, "Acme Water")
                .with(columns::PRIOR_ART, "EP2002; WO3003, XX999")
                .with(columns::SDG_NUMBER, 6)
                .with(columns::IPC_TECHNOLOGIES, "Desalination; Solar")
                .with(columns::PUBLICATION_DATE, "2021-03-04"),
            PatentRecord::new("EP2002")
                .with(columns::TITLE, "Membrane module")
                .with(columns::PARENT, "EP1001")
                .with(columns::SDG_NUMBER, 6)
                .with(columns::IPC_TECHNOLOGIES, "Desalination, Membranes")
                .with(columns::PUBLICATION_DATE, "20220615"),
            PatentRecord::new("WO3003")
                .with(columns::TITLE, "Wind blade")
                .with(columns::SDG_NUMBER, 7)
                .with(columns::IPC_TECHNOLOGIES, "Wind")
                .with(columns::PUBLICATION_DATE, "2019/11/22"),
            PatentRecord::new("EP4004")
                .with(columns::TITLE, "Undated pump")
                .with(columns::SDG_NUMBER, 6)
                .with(columns::PUBLICATION_DATE, "unknown"),
        ]))
    }

    pub fn plan() -> QueryPlan {
        QueryPlan::passthrough("q")
    }
}
