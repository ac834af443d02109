//! Single-patent lookups answered straight from the corpus.

use super::{Turn, TurnHandler};
use crate::intent;
use crate::llm::{Generator, Sampling};
use async_trait::async_trait;
use patentrag_core::error::Result;
use patentrag_core::message::Message;
use patentrag_core::record::{columns, PatentRecord};
use patentrag_retrieval::Corpus;
use std::sync::Arc;

const NOT_PROVIDED: &str = "not provided";

/// Inventors, applicants and what is new about the last cited patent.
pub struct NoveltyHandler {
    corpus: Arc<Corpus>,
}

impl NoveltyHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for NoveltyHandler {
    fn name(&self) -> &'static str {
        "novelty"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        if !intent::asks_inventor_applicant_novelty(turn.message) {
            return Ok(None);
        }
        let Some(id) = intent::last_cited_id(turn.history) else {
            return Ok(None);
        };
        let Some(record) = self.corpus.get(&id) else {
            return Ok(Some("I don't have enough information on that patent.".into()));
        };

        let inventors = record.text(columns::INVENTOR_NAMES);
        let applicants = record.text(columns::APPLICANT_NAMES);
        let novelty = record
            .text(columns::ANALYSIS)
            .or_else(|| record.text(columns::ABSTRACT));
        Ok(Some(format!(
            "({}) Inventor(s): {}; Applicant(s): {}.\nNew in this invention: {}",
            record.publication_number,
            inventors.as_deref().unwrap_or(NOT_PROVIDED),
            applicants.as_deref().unwrap_or(NOT_PROVIDED),
            novelty.as_deref().unwrap_or(NOT_PROVIDED),
        )))
    }
}

/// The inventor's own explanation of the last cited patent.
pub struct InventorViewHandler {
    corpus: Arc<Corpus>,
}

impl InventorViewHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for InventorViewHandler {
    fn name(&self) -> &'static str {
        "inventor_view"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        if !intent::asks_inventor_view(turn.message) {
            return Ok(None);
        }
        let Some(id) = intent::last_cited_id(turn.history) else {
            return Ok(None);
        };
        let explanation = self
            .corpus
            .get(&id)
            .and_then(|r| r.text(columns::ANALYSIS).map(|e| (r, e)));
        Ok(Some(match explanation {
            Some((record, text)) => {
                format!("({}) according to the inventor: {}", record.publication_number, text)
            }
            None => "I don't have enough information from the inventor's explanation.".into(),
        }))
    }
}

/// Plain-English summary of a patent's claims.
pub struct ClaimsHandler {
    corpus: Arc<Corpus>,
    generator: Generator,
}

impl ClaimsHandler {
    pub fn new(corpus: Arc<Corpus>, generator: Generator) -> Self {
        Self { corpus, generator }
    }
}

#[async_trait]
impl TurnHandler for ClaimsHandler {
    fn name(&self) -> &'static str {
        "claims"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        let Some(id) = intent::claims_target(turn.message) else {
            return Ok(None);
        };
        let Some(claims) = self.corpus.get(&id).and_then(|r| r.text(columns::CLAIMS)) else {
            return Ok(Some("I don't have enough information to summarize the claims.".into()));
        };
        let messages = vec![
            Message::system("Summarise these patent claims in plain English."),
            Message::user(claims),
        ];
        let summary = self.generator.complete(messages, Sampling::CLAIMS).await?;
        Ok(Some(summary))
    }
}

/// Lists the prior art a patent cites, with titles where the corpus has them.
pub struct PriorArtHandler {
    corpus: Arc<Corpus>,
}

impl PriorArtHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for PriorArtHandler {
    fn name(&self) -> &'static str {
        "prior_art"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        let Some(id) = intent::prior_art_target(turn.message) else {
            return Ok(None);
        };
        let cited = self
            .corpus
            .get(&id)
            .and_then(|r| r.text(columns::PRIOR_ART))
            .map(|raw| split_ids(&raw))
            .unwrap_or_default();
        if cited.is_empty() {
            return Ok(Some("I don't have enough information on prior art.".into()));
        }

        let bullets: Vec<String> = cited
            .iter()
            .map(|a| match self.corpus.get(a).map(PatentRecord::title) {
                Some(title) if !title.is_empty() => format!("• ({a}) “{title}”"),
                _ => format!("• ({a})"),
            })
            .collect();
        Ok(Some(bullets.join("\n")))
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lists a patent and its children (records naming it as parent).
pub struct FamilyHandler {
    corpus: Arc<Corpus>,
}

impl FamilyHandler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TurnHandler for FamilyHandler {
    fn name(&self) -> &'static str {
        "family"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Result<Option<String>> {
        if !intent::asks_family(turn.message) {
            return Ok(None);
        }
        let Some(id) = intent::publication_number_in(turn.message) else {
            return Ok(None);
        };

        let members: Vec<String> = self
            .corpus
            .records()
            .iter()
            .filter(|r| {
                r.publication_number == id || r.text(columns::PARENT).is_some_and(|p| p.trim() == id)
            })
            .map(|r| {
                format!(
                    "• ({}) {} — filed {}",
                    r.publication_number,
                    r.title(),
                    r.text(columns::PUBLICATION_DATE).unwrap_or_default()
                )
            })
            .collect();

        if members.is_empty() {
            Ok(Some("I don't have enough information on this patent family.".into()))
        } else {
            Ok(Some(members.join("\n")))
        }
    }
}
