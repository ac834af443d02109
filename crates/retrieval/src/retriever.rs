//! Passage retrieval — nearest chunks, filtered, one per patent, re-ranked.

use crate::corpus::Corpus;
use crate::filter::record_matches;
use async_trait::async_trait;
use patentrag_core::error::RetrievalError;
use patentrag_core::filter::Filter;
use patentrag_core::record::Chunk;
use patentrag_core::retrieval::{Encoder, Passage, VectorIndex};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Parameters of one passage search.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Nearest chunks requested from the index.
    pub max_candidates: usize,
    pub filters: &'a [Filter],
    /// Columns whose query-token matches boost a hit, most important first.
    pub column_priority: &'a [String],
    /// Passages returned after ranking.
    pub top_k: usize,
}

/// Anything that can answer a [`SearchRequest`].
#[async_trait]
pub trait PassageSearch: Send + Sync {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<Passage>, RetrievalError>;
}

/// A surviving candidate. Distance and bonus never leave this module.
struct SearchHit<'a> {
    chunk: &'a Chunk,
    distance: f32,
    rank: f32,
}

/// Semantic retriever over the shared record table and chunk index.
pub struct PassageRetriever {
    corpus: Arc<Corpus>,
    chunks: Arc<Vec<Chunk>>,
    encoder: Arc<dyn Encoder>,
    index: Arc<dyn VectorIndex>,
}

impl PassageRetriever {
    /// `chunks[i]` must describe the vector at position `i` of `index`.
    pub fn new(
        corpus: Arc<Corpus>,
        chunks: Arc<Vec<Chunk>>,
        encoder: Arc<dyn Encoder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            corpus,
            chunks,
            encoder,
            index,
        }
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }
}

#[async_trait]
impl PassageSearch for PassageRetriever {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<Passage>, RetrievalError> {
        let query_vector = self.encoder.encode(request.query).await?;
        let candidates = self.index.search(&query_vector, request.max_candidates)?;
        let candidate_count = candidates.len();

        // Filter, then keep the first surviving chunk of each patent.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut hits: Vec<SearchHit<'_>> = Vec::new();
        for candidate in candidates {
            let Some(chunk) = self.chunks.get(candidate.chunk) else {
                continue;
            };
            let Some(record) = self.corpus.get(&chunk.publication_number) else {
                continue;
            };
            if !request.filters.is_empty() && !record_matches(record, &chunk.text, request.filters) {
                continue;
            }
            if seen.insert(chunk.publication_number.as_str()) {
                hits.push(SearchHit {
                    chunk,
                    distance: candidate.distance,
                    rank: 0.0,
                });
            }
        }

        if request.column_priority.is_empty() {
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        } else {
            let tokens: Vec<String> = request
                .query
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            let len = request.column_priority.len();
            for hit in &mut hits {
                let mut bonus = 0.0f32;
                if let Some(record) = self.corpus.get(&hit.chunk.publication_number) {
                    for (i, column) in request.column_priority.iter().enumerate() {
                        let Some(cell) = record.text(column) else {
                            continue;
                        };
                        let cell = cell.to_lowercase();
                        if tokens.iter().any(|t| cell.contains(t.as_str())) {
                            bonus += (len - i) as f32;
                        }
                    }
                }
                hit.rank = -hit.distance + bonus;
            }
            hits.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        }

        hits.truncate(request.top_k);
        debug!(
            candidates = candidate_count,
            returned = hits.len(),
            filters = request.filters.len(),
            "Passage search"
        );

        Ok(hits
            .into_iter()
            .map(|hit| Passage {
                publication_number: hit.chunk.publication_number.clone(),
                title: self
                    .corpus
                    .get(&hit.chunk.publication_number)
                    .map(|r| r.title())
                    .unwrap_or_default(),
                text: hit.chunk.text.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_index::FlatIndex;
    use patentrag_core::filter::FilterOp;
    use patentrag_core::record::{columns, PatentRecord};

    /// Encodes every query to the origin; chunk distances are their squared x.
    struct OriginEncoder;

    #[async_trait]
    impl Encoder for OriginEncoder {
        fn name(&self) -> &str {
            "origin"
        }

        async fn encode(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![0.0])
        }
    }

    fn chunk(id: &str, sequence: usize, text: &str) -> Chunk {
        Chunk {
            publication_number: id.into(),
            sequence,
            text: text.into(),
        }
    }

    /// A at distance 1 and 4, B at 9, C at 16.
    fn retriever() -> PassageRetriever {
        let corpus = Corpus::new(vec![
            PatentRecord::new("A")
                .with(columns::TITLE, "Wind turbine blade")
                .with(columns::SDG_NUMBER, 7),
            PatentRecord::new("B")
                .with(columns::TITLE, "Solar desalination still")
                .with(columns::SDG_NUMBER, 6),
            PatentRecord::new("C")
                .with(columns::TITLE, "Membrane filter")
                .with(columns::ABSTRACT, "A desalination membrane")
                .with(columns::SDG_NUMBER, 6),
        ]);
        let chunks = vec![
            chunk("A", 0, "first A chunk"),
            chunk("A", 1, "second A chunk"),
            chunk("B", 0, "B chunk about brine"),
            chunk("C", 0, "C chunk about graphene"),
        ];
        let mut index = FlatIndex::new(1);
        for x in [1.0, 2.0, 3.0, 4.0] {
            index.add(vec![x]).unwrap();
        }
        PassageRetriever::new(
            Arc::new(corpus),
            Arc::new(chunks),
            Arc::new(OriginEncoder),
            Arc::new(index),
        )
    }

    fn request<'a>(filters: &'a [Filter], priority: &'a [String]) -> SearchRequest<'a> {
        SearchRequest {
            query: "desalination",
            max_candidates: 400,
            filters,
            column_priority: priority,
            top_k: 60,
        }
    }

    fn ids(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.publication_number.as_str()).collect()
    }

    #[tokio::test]
    async fn one_passage_per_patent_by_distance() {
        let r = retriever();
        let passages = r.search(request(&[], &[])).await.unwrap();
        assert_eq!(ids(&passages), vec!["A", "B", "C"]);
        assert_eq!(passages[0].text, "first A chunk");
        assert_eq!(passages[0].title, "Wind turbine blade");
    }

    #[tokio::test]
    async fn filters_drop_candidates() {
        let r = retriever();
        let filters = vec![Filter::new(columns::SDG_NUMBER, FilterOp::Eq, 6)];
        let passages = r.search(request(&filters, &[])).await.unwrap();
        assert_eq!(ids(&passages), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn chunk_text_filter_checks_each_chunk() {
        let r = retriever();
        let filters = vec![Filter::new(columns::CHUNK_TEXT, FilterOp::Contains, "second")];
        let passages = r.search(request(&filters, &[])).await.unwrap();
        assert_eq!(ids(&passages), vec!["A"]);
        assert_eq!(passages[0].text, "second A chunk");
    }

    #[tokio::test]
    async fn nothing_survives_is_empty_not_error() {
        let r = retriever();
        let filters = vec![Filter::new(columns::SDG_NUMBER, FilterOp::Eq, 99)];
        assert!(r.search(request(&filters, &[])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn priority_bonus_reranks() {
        let r = retriever();
        let priority = vec![columns::ABSTRACT.to_string(), columns::TITLE.to_string()];
        // C: abstract (2) + title? no => 2 - 16 = -14; B: title (1) - 9 = -8; A: -1.
        let passages = r.search(request(&[], &priority)).await.unwrap();
        assert_eq!(ids(&passages), vec!["A", "B", "C"]);

        // Larger bonus flips the order once it outweighs distance.
        let priority: Vec<String> = std::iter::repeat(columns::ABSTRACT.to_string())
            .take(5)
            .chain(std::iter::once(columns::TITLE.to_string()))
            .collect();
        // C: 6+5+4+3+2 = 20 - 16 = 4; B: 1 - 9 = -8; A: -1.
        let passages = r.search(request(&[], &priority)).await.unwrap();
        assert_eq!(ids(&passages), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let r = retriever();
        let mut req = request(&[], &[]);
        req.top_k = 2;
        assert_eq!(r.search(req).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn max_candidates_limits_index_scan() {
        let r = retriever();
        let mut req = request(&[], &[]);
        req.max_candidates = 2;
        // Both nearest chunks belong to A.
        assert_eq!(ids(&r.search(req).await.unwrap()), vec!["A"]);
    }
}
