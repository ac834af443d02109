//! The per-turn conversation orchestrator.
//!
//! A turn goes through four steps:
//!
//! 1. **Early handlers** see the raw message before any rewriting (the
//!    improvement brainstorm).
//! 2. **Plan**: carry-over filters for "this category" follow-ups, then the
//!    rewriter's plan merged on top, then an explicit "SDG N" filter.
//! 3. **Cascade**: lookups, timelines, aggregation, and finally retrieval.
//! 4. **Commit**: the answering turn is appended to the session together
//!    with the filters and aggregation it used.
//!
//! Nothing is written to the session before step 4, so an error anywhere
//! leaves it exactly as it was.

use crate::context::{ContextSummarizer, SummaryLimits};
use crate::handlers::{
    AggregationHandler, ClaimsHandler, FamilyHandler, FilingTimelineHandler, ImproveHandler,
    InventorViewHandler, LatestHandler, NoveltyHandler, PriorArtHandler, RetrievalHandler,
    RetrievalLimits, Turn, TurnHandler, NOT_ENOUGH_INFO,
};
use crate::intent;
use crate::llm::Generator;
use crate::rewriter::QueryRewriter;
use crate::session::ConversationState;
use patentrag_config::AppConfig;
use patentrag_core::error::Result;
use patentrag_core::filter::{Filter, FilterOp, QueryPlan};
use patentrag_core::record::columns;
use patentrag_core::retrieval::TokenCounter;
use patentrag_retrieval::{Corpus, PassageSearch};
use std::sync::Arc;
use tracing::{debug, info};

/// Tunables taken from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub retrieval: RetrievalLimits,
    pub summary: SummaryLimits,
    /// Messages of history the rewriter sees.
    pub rewriter_history: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retrieval: RetrievalLimits::default(),
            summary: SummaryLimits::default(),
            rewriter_history: 10,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retrieval: RetrievalLimits {
                max_candidates: config.retrieval.max_candidates,
                top_k: config.retrieval.top_k_return,
                passage_budget: config.passage_budget(),
            },
            summary: SummaryLimits {
                ceiling: config.context.summary_ceiling,
                chunk_tokens: config.context.summary_chunk_tokens,
            },
            rewriter_history: config.conversation.rewriter_history,
        }
    }
}

pub struct Orchestrator {
    rewriter: Arc<dyn QueryRewriter>,
    early: Vec<Box<dyn TurnHandler>>,
    cascade: Vec<Box<dyn TurnHandler>>,
    rewriter_history: usize,
}

impl Orchestrator {
    /// Wire the standard handler cascade over one shared corpus and search.
    pub fn new(
        corpus: Arc<Corpus>,
        search: Arc<dyn PassageSearch>,
        generator: Generator,
        rewriter: Arc<dyn QueryRewriter>,
        counter: Arc<dyn TokenCounter>,
        settings: OrchestratorSettings,
    ) -> Self {
        let summarizer = ContextSummarizer::new(generator.clone(), counter.clone(), settings.summary);
        let early: Vec<Box<dyn TurnHandler>> =
            vec![Box::new(ImproveHandler::new(corpus.clone(), generator.clone()))];
        let cascade: Vec<Box<dyn TurnHandler>> = vec![
            Box::new(NoveltyHandler::new(corpus.clone())),
            Box::new(InventorViewHandler::new(corpus.clone())),
            Box::new(ClaimsHandler::new(corpus.clone(), generator.clone())),
            Box::new(PriorArtHandler::new(corpus.clone())),
            Box::new(FamilyHandler::new(corpus.clone())),
            Box::new(FilingTimelineHandler::new(corpus.clone())),
            Box::new(LatestHandler::new(corpus.clone())),
            Box::new(AggregationHandler::new(corpus)),
            Box::new(RetrievalHandler::new(
                search,
                summarizer,
                counter,
                generator,
                settings.retrieval,
            )),
        ];
        Self {
            rewriter,
            early,
            cascade,
            rewriter_history: settings.rewriter_history,
        }
    }

    /// Handler names in the order they are tried.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.early
            .iter()
            .chain(&self.cascade)
            .map(|h| h.name())
            .collect()
    }

    /// Answer one user message, updating `session` only on success.
    pub async fn ask(&self, session: &mut ConversationState, message: &str) -> Result<String> {
        let history = session.messages();

        let raw_plan = QueryPlan::passthrough(message);
        let turn = Turn {
            message,
            history: &history,
            plan: &raw_plan,
        };
        for handler in &self.early {
            if let Some(answer) = handler.try_handle(&turn).await? {
                info!(handler = handler.name(), "Turn answered before rewriting");
                session.push_turn(message, answer.clone());
                return Ok(answer);
            }
        }

        let plan = self.plan(session, message).await?;
        let turn = Turn {
            message,
            history: &history,
            plan: &plan,
        };
        for handler in &self.cascade {
            if let Some(answer) = handler.try_handle(&turn).await? {
                info!(handler = handler.name(), "Turn answered");
                session.set_carry_over(plan.filters.clone(), plan.aggregation.clone());
                session.push_turn(message, answer.clone());
                return Ok(answer);
            }
        }

        // The retrieval handler always answers; this only guards an empty cascade.
        session.push_turn(message, NOT_ENOUGH_INFO);
        Ok(NOT_ENOUGH_INFO.to_string())
    }

    /// Carry-over, then the rewritten plan, then the SDG filter.
    async fn plan(&self, session: &ConversationState, message: &str) -> Result<QueryPlan> {
        let (mut filters, mut aggregation) = if intent::mentions_this_category(message) {
            (
                session.last_filters().to_vec(),
                session.last_aggregation().cloned(),
            )
        } else {
            (Vec::new(), None)
        };

        let rewritten = self
            .rewriter
            .rewrite(&session.recent_messages(self.rewriter_history), message)
            .await?;

        for filter in rewritten.filters {
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }
        if aggregation.is_none() {
            aggregation = rewritten.aggregation;
        }
        if let Some(n) = intent::sdg_number(message)
            && !filters.iter().any(|f| f.column == columns::SDG_NUMBER)
        {
            filters.insert(0, Filter::new(columns::SDG_NUMBER, FilterOp::Eq, n));
        }

        debug!(
            query = %rewritten.rewritten_query,
            filters = filters.len(),
            aggregation = aggregation.is_some(),
            "Turn plan ready"
        );
        Ok(QueryPlan {
            rewritten_query: rewritten.rewritten_query,
            column_priority: rewritten.column_priority,
            filters,
            aggregation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HeuristicTokenCounter;
    use crate::handlers::fixtures;
    use crate::test_helpers::{passage, ScriptedRewriter, ScriptedSearch, SequentialMockProvider};
    use patentrag_core::error::{Error, ProviderError};
    use patentrag_core::filter::AggregationSpec;

    struct Harness {
        orchestrator: Orchestrator,
        provider: Arc<SequentialMockProvider>,
        rewriter: Arc<ScriptedRewriter>,
        search: Arc<ScriptedSearch>,
    }

    fn harness(
        responses: Vec<std::result::Result<String, ProviderError>>,
        plans: Vec<QueryPlan>,
        search: ScriptedSearch,
    ) -> Harness {
        let provider = Arc::new(SequentialMockProvider::new(responses));
        let rewriter = Arc::new(ScriptedRewriter::new(plans));
        let search = Arc::new(search);
        let orchestrator = Orchestrator::new(
            fixtures::corpus(),
            search.clone(),
            Generator::new(provider.clone(), "mock-model"),
            rewriter.clone(),
            Arc::new(HeuristicTokenCounter),
            OrchestratorSettings::default(),
        );
        Harness {
            orchestrator,
            provider,
            rewriter,
            search,
        }
    }

    fn sdg(n: i64) -> Filter {
        Filter::new(columns::SDG_NUMBER, FilterOp::Eq, n)
    }

    #[test]
    fn cascade_order() {
        let h = harness(vec![], vec![], ScriptedSearch::empty());
        assert_eq!(
            h.orchestrator.handler_names(),
            vec![
                "improve",
                "novelty",
                "inventor_view",
                "claims",
                "prior_art",
                "family",
                "filing_timeline",
                "latest",
                "aggregation",
                "retrieval",
            ]
        );
    }

    #[test]
    fn settings_follow_config() {
        let settings = OrchestratorSettings::from_config(&AppConfig::default());
        assert_eq!(settings.retrieval.max_candidates, 400);
        assert_eq!(settings.retrieval.top_k, 60);
        assert_eq!(settings.retrieval.passage_budget, 58_000);
        assert_eq!(settings.summary.ceiling, 60_000);
        assert_eq!(settings.rewriter_history, 10);
    }

    #[tokio::test]
    async fn explicit_sdg_filter_is_not_duplicated() {
        let plan = QueryPlan {
            filters: vec![sdg(6)],
            ..QueryPlan::passthrough("membranes")
        };
        let h = harness(
            vec![Ok("answer".into())],
            vec![plan],
            ScriptedSearch::new(vec![vec![passage("EP1001", "basin")]]),
        );
        let mut session = ConversationState::default();

        h.orchestrator
            .ask(&mut session, "SDG 6 patents about membranes")
            .await
            .unwrap();
        assert_eq!(h.search.filters()[0], vec![sdg(6)]);
        assert_eq!(session.last_filters(), &[sdg(6)]);
    }

    #[tokio::test]
    async fn sdg_filter_inserted_first_when_missing() {
        let plan = QueryPlan {
            filters: vec![Filter::new(columns::ABSTRACT, FilterOp::Contains, "membrane")],
            ..QueryPlan::passthrough("membranes")
        };
        let h = harness(
            vec![Ok("answer".into())],
            vec![plan],
            ScriptedSearch::new(vec![vec![passage("EP1001", "basin")]]),
        );
        let mut session = ConversationState::default();

        h.orchestrator.ask(&mut session, "sdg13 membranes").await.unwrap();
        let filters = &h.search.filters()[0];
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], sdg(13));
    }

    #[tokio::test]
    async fn unknown_improve_target_appends_one_pair_without_generation() {
        let h = harness(vec![], vec![], ScriptedSearch::empty());
        let mut session = ConversationState::default();
        session.set_carry_over(vec![sdg(7)], None);

        let answer = h
            .orchestrator
            .ask(&mut session, "improve patent 123456")
            .await
            .unwrap();

        assert_eq!(answer, "Sorry, I don't have patent 123456.");
        assert_eq!(session.len(), 1);
        assert_eq!(h.provider.call_count(), 0);
        assert!(h.rewriter.history_lens().is_empty());
        assert_eq!(session.last_filters(), &[sdg(7)]);
    }

    #[tokio::test]
    async fn this_category_reuses_previous_filters_and_aggregation() {
        let first = QueryPlan {
            filters: vec![sdg(6)],
            aggregation: Some(AggregationSpec::new(columns::IPC_TECHNOLOGIES, 1)),
            ..QueryPlan::passthrough("sdg 6 technologies")
        };
        let h = harness(vec![], vec![first], ScriptedSearch::empty());
        let mut session = ConversationState::default();

        let a1 = h
            .orchestrator
            .ask(&mut session, "Top technologies in SDG 6")
            .await
            .unwrap();
        assert_eq!(a1, "• Desalination — 2 patents (e.g. (EP1001) “Solar still”)");

        let a2 = h
            .orchestrator
            .ask(&mut session, "Top ones in this category")
            .await
            .unwrap();
        assert_eq!(a2, a1);
        assert_eq!(session.len(), 2);
        assert_eq!(session.last_filters(), &[sdg(6)]);
        assert_eq!(h.rewriter.history_lens(), vec![0, 2]);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn follow_up_without_category_phrase_starts_fresh() {
        let first = QueryPlan {
            filters: vec![sdg(6)],
            aggregation: Some(AggregationSpec::new(columns::IPC_TECHNOLOGIES, 1)),
            ..QueryPlan::passthrough("q")
        };
        let h = harness(
            vec![Ok("fresh answer".into())],
            vec![first],
            ScriptedSearch::new(vec![vec![passage("WO3003", "blade")]]),
        );
        let mut session = ConversationState::default();

        h.orchestrator.ask(&mut session, "Top technologies").await.unwrap();
        let answer = h.orchestrator.ask(&mut session, "wind turbines?").await.unwrap();

        assert_eq!(answer, "fresh answer");
        assert!(h.search.filters()[0].is_empty());
        assert!(session.last_filters().is_empty());
        assert!(session.last_aggregation().is_none());
    }

    #[tokio::test]
    async fn nothing_retrieved_answers_without_generation() {
        let h = harness(vec![], vec![], ScriptedSearch::empty());
        let mut session = ConversationState::default();

        let answer = h
            .orchestrator
            .ask(&mut session, "quantum desalination?")
            .await
            .unwrap();

        assert_eq!(answer, NOT_ENOUGH_INFO);
        assert_eq!(h.search.calls().len(), 3);
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn failed_generation_leaves_session_untouched() {
        let h = harness(
            vec![Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            })],
            vec![QueryPlan {
                filters: vec![sdg(7)],
                ..QueryPlan::passthrough("q")
            }],
            ScriptedSearch::new(vec![vec![passage("EP1001", "basin")]]),
        );
        let mut session = ConversationState::default();
        session.push_turn("earlier", "reply");
        session.set_carry_over(vec![sdg(6)], None);

        let err = h
            .orchestrator
            .ask(&mut session, "solar stills?")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(ProviderError::ApiError { status_code: 500, .. })));
        assert_eq!(session.len(), 1);
        assert_eq!(session.last_filters(), &[sdg(6)]);
    }

    #[tokio::test]
    async fn history_is_bounded_by_max_turns() {
        let h = harness(vec![], vec![], ScriptedSearch::empty());
        let mut session = ConversationState::new(2);
        for q in ["first?", "second?", "third?"] {
            h.orchestrator.ask(&mut session, q).await.unwrap();
        }
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[0].content, "second?");
        assert_eq!(h.rewriter.history_lens(), vec![0, 2, 4]);
    }
}
