use super::{Turn, TurnHandler};
use crate::intent;
use crate::llm::{Generator, Sampling};
use async_trait::async_trait;
use patentrag_core::error::Result;
use patentrag_core::message::Message;
use patentrag_core::record::columns;
use patentrag_retrieval::Corpus;
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a domain expert in R&D. I'll give you a patent; \
propose at least five concrete improvements or spin-off innovations based on its core idea.";

/// Brainstorms improvements on a named patent.
pub struct ImproveHandler {
    corpus: Arc<Corpus>,
    generator: Generator,
}

impl ImproveHandler {
    pub fn new(corpus: Arc<Corpus>, generator: Generator) -> Self {
        Self { corpus, generator }
    }
}

#[async_trait]
impl TurnHandler for ImproveHandler {
    fn name(&self) -> &'static str {
        "improve"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        let Some(id) = intent::improve_target(turn.message) else {
            return Ok(None);
        };
        let Some(record) = self.corpus.get(&id) else {
            info!(id = %id, "Improve target not in corpus");
            return Ok(Some(format!("Sorry, I don't have patent {id}.")));
        };

        let section = |col: &str| record.text(col).unwrap_or_default();
        let prompt = format!(
            "Patent {id}: {title}\n\nAbstract:\n{abs}\n\nClaims:\n{claims}\n\n\
             Inventor's analysis:\n{analysis}\n\nPlease brainstorm improvements or new applications.",
            id = record.publication_number,
            title = record.title(),
            abs = section(columns::ABSTRACT),
            claims = section(columns::CLAIMS),
            analysis = section(columns::ANALYSIS),
        );
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let answer = self.generator.complete(messages, Sampling::BRAINSTORM).await?;
        Ok(Some(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use crate::test_helpers::scripted_generator;

    #[tokio::test]
    async fn brainstorms_on_known_patent() {
        let (generator, provider) = scripted_generator(&["1. Add a condenser"]);
        let handler = ImproveHandler::new(fixtures::corpus(), generator);
        let plan = fixtures::plan();
        let turn = Turn { message: "How could we improve patent EP1001?", history: &[], plan: &plan };

        let answer = handler.try_handle(&turn).await.unwrap();
        assert_eq!(answer.as_deref(), Some("1. Add a condenser"));

        let request = &provider.requests()[0];
        assert_eq!(request.temperature, 0.7);
        let prompt = &request.messages[1].content;
        assert!(prompt.starts_with("Patent EP1001: Solar still"));
        assert!(prompt.contains("Claims:\n1. A still comprising a basin."));
        assert!(prompt.contains("Inventor's analysis:\nCheaper than reverse osmosis."));
    }

    #[tokio::test]
    async fn unknown_patent_answers_without_generation() {
        let (generator, provider) = scripted_generator(&[]);
        let handler = ImproveHandler::new(fixtures::corpus(), generator);
        let plan = fixtures::plan();
        let turn = Turn { message: "improve patent 123456", history: &[], plan: &plan };

        let answer = handler.try_handle(&turn).await.unwrap();
        assert_eq!(answer.as_deref(), Some("Sorry, I don't have patent 123456."));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn passes_without_target() {
        let (generator, _) = scripted_generator(&[]);
        let handler = ImproveHandler::new(fixtures::corpus(), generator);
        let plan = fixtures::plan();
        let turn = Turn { message: "how can we improve water access?", history: &[], plan: &plan };
        assert!(handler.try_handle(&turn).await.unwrap().is_none());
    }
}
