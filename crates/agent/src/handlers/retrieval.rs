//! The default path: relaxed semantic retrieval and a citation-constrained answer.

use super::{Turn, TurnHandler, CITATION_REFUSAL, NOT_ENOUGH_INFO};
use crate::context::{pack_passages, ContextSummarizer};
use crate::intent;
use crate::llm::{Generator, Sampling};
use async_trait::async_trait;
use patentrag_core::error::Result;
use patentrag_core::filter::Filter;
use patentrag_core::message::Message;
use patentrag_core::retrieval::{Passage, TokenCounter};
use patentrag_retrieval::{PassageSearch, SearchRequest};
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieval sizes and the passage token budget.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalLimits {
    pub max_candidates: usize,
    pub top_k: usize,
    pub passage_budget: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            max_candidates: 400,
            top_k: 60,
            passage_budget: 58_000,
        }
    }
}

pub struct RetrievalHandler {
    search: Arc<dyn PassageSearch>,
    summarizer: ContextSummarizer,
    counter: Arc<dyn TokenCounter>,
    generator: Generator,
    limits: RetrievalLimits,
}

impl RetrievalHandler {
    pub fn new(
        search: Arc<dyn PassageSearch>,
        summarizer: ContextSummarizer,
        counter: Arc<dyn TokenCounter>,
        generator: Generator,
        limits: RetrievalLimits,
    ) -> Self {
        Self {
            search,
            summarizer,
            counter,
            generator,
            limits,
        }
    }

    /// Filters and priority, then priority only, then pure semantic search.
    async fn retrieve(&self, turn: &Turn<'_>) -> Result<Vec<Passage>> {
        let plan = turn.plan;
        let stages: [(&str, &[Filter], &[String]); 3] = [
            ("filtered", &plan.filters, &plan.column_priority),
            ("priority_only", &[], &plan.column_priority),
            ("semantic", &[], &[]),
        ];

        for (stage, filters, column_priority) in stages {
            let passages = self
                .search
                .search(SearchRequest {
                    query: &plan.rewritten_query,
                    max_candidates: self.limits.max_candidates,
                    filters,
                    column_priority,
                    top_k: self.limits.top_k,
                })
                .await?;
            if !passages.is_empty() {
                debug!(stage, passages = passages.len(), "Retrieval stage matched");
                return Ok(passages);
            }
            info!(stage, "Retrieval stage empty, relaxing");
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl TurnHandler for RetrievalHandler {
    fn name(&self) -> &'static str {
        "retrieval"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        let passages = self.retrieve(turn).await?;
        if passages.is_empty() {
            return Ok(Some(NOT_ENOUGH_INFO.into()));
        }

        let packed = pack_passages(passages, self.counter.as_ref(), self.limits.passage_budget);
        info!(
            passages = packed.passages.len(),
            tokens = packed.tokens,
            dropped = packed.dropped,
            "Passages packed"
        );

        let ids: Vec<&str> = packed
            .passages
            .iter()
            .map(|p| p.publication_number.as_str())
            .collect();
        let lines: Vec<String> = packed.passages.iter().map(Passage::to_context_line).collect();
        let context = self
            .summarizer
            .summarize(&turn.plan.rewritten_query, &lines)
            .await?;

        let mut messages = Vec::with_capacity(turn.history.len() + 2);
        messages.push(Message::system(citation_instruction(
            &ids,
            intent::mentions_applicant_or_country(turn.message),
        )));
        messages.extend(turn.history.iter().cloned());
        messages.push(Message::user(format!(
            "QUESTION: {}\n\nCONTEXT:\n{}",
            turn.message, context
        )));

        let answer = self.generator.complete(messages, Sampling::ANSWER).await?;
        Ok(Some(answer))
    }
}

/// The system instruction whitelisting exactly `ids` as citable sources.
pub fn citation_instruction(ids: &[&str], with_countries: bool) -> String {
    let allowed = if ids.is_empty() {
        "NONE".to_string()
    } else {
        ids.join(", ")
    };
    let countries = if with_countries { ", applicant_countries" } else { "" };
    format!(
        "You may cite ONLY these publication numbers: {allowed}. \
         If none answer, reply: '{CITATION_REFUSAL}'\n\
         Format bullets as: (publication_number, title_en, publication_date{countries}) — short note."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{HeuristicTokenCounter, SummaryLimits};
    use crate::test_helpers::{passage, scripted_generator, ScriptedSearch, SequentialMockProvider};
    use patentrag_core::filter::{FilterOp, QueryPlan};

    fn build(
        search: Arc<ScriptedSearch>,
        answers: &[&str],
        passage_budget: usize,
    ) -> (RetrievalHandler, Arc<SequentialMockProvider>) {
        let (generator, provider) = scripted_generator(answers);
        let counter: Arc<dyn TokenCounter> = Arc::new(HeuristicTokenCounter);
        let summarizer = ContextSummarizer::new(generator.clone(), counter.clone(), SummaryLimits::default());
        let limits = RetrievalLimits {
            passage_budget,
            ..RetrievalLimits::default()
        };
        (RetrievalHandler::new(search, summarizer, counter, generator, limits), provider)
    }

    fn filtered_plan() -> QueryPlan {
        QueryPlan {
            rewritten_query: "membrane desalination".into(),
            column_priority: vec!["abstract_text".into()],
            filters: vec![Filter::new("sdg_number", FilterOp::Eq, 6)],
            aggregation: None,
        }
    }

    #[tokio::test]
    async fn relaxes_until_something_matches() {
        let search = Arc::new(ScriptedSearch::new(vec![
            vec![],
            vec![],
            vec![passage("EP1", "solar basin")],
        ]));
        let (handler, provider) = build(search.clone(), &["(EP1, Title EP1, 2021) — basin"], 1_000);
        let plan = filtered_plan();
        let turn = Turn { message: "membranes?", history: &[], plan: &plan };

        let answer = handler.try_handle(&turn).await.unwrap();
        assert_eq!(answer.as_deref(), Some("(EP1, Title EP1, 2021) — basin"));
        assert_eq!(search.calls(), vec![(1, 1), (0, 1), (0, 0)]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn all_stages_empty_skips_generation() {
        let search = Arc::new(ScriptedSearch::empty());
        let (handler, provider) = build(search.clone(), &[], 1_000);
        let plan = filtered_plan();
        let turn = Turn { message: "anything?", history: &[], plan: &plan };

        let answer = handler.try_handle(&turn).await.unwrap();
        assert_eq!(answer.as_deref(), Some(NOT_ENOUGH_INFO));
        assert_eq!(search.calls().len(), 3);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn prompt_whitelists_packed_ids_only() {
        // 40 chars = 10 tokens each; budget 25 keeps the first two distinct ids.
        let body = "x".repeat(40);
        let search = Arc::new(ScriptedSearch::new(vec![vec![
            passage("EP1", &body),
            passage("EP1", &body),
            passage("EP2", &body),
            passage("EP3", &body),
        ]]));
        let (handler, provider) = build(search, &["answer"], 25);
        let plan = filtered_plan();
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let turn = Turn { message: "Which applicant country?", history: &history, plan: &plan };

        handler.try_handle(&turn).await.unwrap();
        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 4);

        let system = &request.messages[0].content;
        assert!(system.contains("You may cite ONLY these publication numbers: EP1, EP2."));
        assert!(system.contains("publication_date, applicant_countries)"));
        assert_eq!(request.messages[1].content, "earlier");

        let user = &request.messages[3].content;
        assert!(user.starts_with("QUESTION: Which applicant country?\n\nCONTEXT:\n[EP1] \"Title EP1\" || "));
        assert!(!user.contains("[EP3]"));
        assert_eq!(request.temperature, 0.0);
    }

    #[test]
    fn instruction_without_ids_or_countries() {
        let text = citation_instruction(&[], false);
        assert!(text.starts_with("You may cite ONLY these publication numbers: NONE."));
        assert!(text.contains("reply: 'I don't have enough information.'"));
        assert!(text.contains("(publication_number, title_en, publication_date) — short note."));
    }
}
