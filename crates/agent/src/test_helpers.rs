//! Shared test helpers: scripted providers and rewriters.

use crate::llm::Generator;
use crate::rewriter::QueryRewriter;
use patentrag_core::error::{ProviderError, RetrievalError};
use patentrag_core::filter::{Filter, QueryPlan};
use patentrag_core::message::Message;
use patentrag_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use patentrag_core::retrieval::Passage;
use patentrag_retrieval::{PassageSearch, SearchRequest};
use std::sync::{Arc, Mutex};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();

        if responses.is_empty() {
            panic!(
                "SequentialMockProvider: no more responses (call #{})",
                requests.len()
            );
        }

        let model = request.model.clone();
        requests.push(request);
        let text = responses.remove(0)?;
        Ok(make_text_response(&text, &model))
    }
}

pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.into(),
    }
}

/// A generator over a scripted provider, plus a handle to inspect it.
pub fn scripted_generator(texts: &[&str]) -> (Generator, Arc<SequentialMockProvider>) {
    let provider = Arc::new(SequentialMockProvider::texts(texts));
    (Generator::new(provider.clone(), "mock-model"), provider)
}

/// Returns scripted plans in order, then passthrough plans. Records the
/// history length it was given on each call.
pub struct ScriptedRewriter {
    plans: Mutex<Vec<QueryPlan>>,
    history_lens: Mutex<Vec<usize>>,
}

impl ScriptedRewriter {
    pub fn new(plans: Vec<QueryPlan>) -> Self {
        Self {
            plans: Mutex::new(plans),
            history_lens: Mutex::new(Vec::new()),
        }
    }

    pub fn passthrough() -> Self {
        Self::new(Vec::new())
    }

    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QueryRewriter for ScriptedRewriter {
    async fn rewrite(&self, history: &[Message], message: &str) -> Result<QueryPlan, ProviderError> {
        self.history_lens.lock().unwrap().push(history.len());
        let mut plans = self.plans.lock().unwrap();
        if plans.is_empty() {
            Ok(QueryPlan::passthrough(message))
        } else {
            Ok(plans.remove(0))
        }
    }
}

/// Returns scripted result sets in order, then empty results. Records the
/// filters and priority length of every request.
pub struct ScriptedSearch {
    results: Mutex<Vec<Vec<Passage>>>,
    calls: Mutex<Vec<(Vec<Filter>, usize)>>,
}

impl ScriptedSearch {
    pub fn new(results: Vec<Vec<Passage>>) -> Self {
        Self {
            results: Mutex::new(results),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// `(filter count, priority count)` per call.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(f, p)| (f.len(), *p))
            .collect()
    }

    pub fn filters(&self) -> Vec<Vec<Filter>> {
        self.calls.lock().unwrap().iter().map(|(f, _)| f.clone()).collect()
    }
}

#[async_trait::async_trait]
impl PassageSearch for ScriptedSearch {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<Passage>, RetrievalError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.filters.to_vec(), request.column_priority.len()));
        let mut results = self.results.lock().unwrap();
        Ok(if results.is_empty() { Vec::new() } else { results.remove(0) })
    }
}

pub fn passage(id: &str, text: &str) -> Passage {
    Passage {
        publication_number: id.into(),
        title: format!("Title {id}"),
        text: text.into(),
    }
}
