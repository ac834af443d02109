//! Per-conversation state: a bounded window of turn pairs plus the
//! filters and aggregation carried over to "this category" follow-ups.
//!
//! Each conversation owns exactly one `ConversationState`. The orchestrator
//! only mutates it once a turn has produced its answer, so a failed turn
//! leaves it untouched.

use patentrag_core::filter::{AggregationSpec, Filter};
use patentrag_core::message::Message;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: VecDeque<(Message, Message)>,
    max_turns: usize,
    last_filters: Vec<Filter>,
    last_aggregation: Option<AggregationSpec>,
}

impl ConversationState {
    /// Keep at most `max_turns` user/assistant pairs.
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns),
            max_turns,
            last_filters: Vec::new(),
            last_aggregation: None,
        }
    }

    /// Append one exchange, evicting the oldest pair beyond capacity.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns
            .push_back((Message::user(user), Message::assistant(assistant)));
    }

    /// Replace the carry-over baseline.
    pub fn set_carry_over(&mut self, filters: Vec<Filter>, aggregation: Option<AggregationSpec>) {
        self.last_filters = filters;
        self.last_aggregation = aggregation;
    }

    /// All retained messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .flat_map(|(u, a)| [u.clone(), a.clone()])
            .collect()
    }

    /// The last `n` retained messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> Vec<Message> {
        let all = self.messages();
        let skip = all.len().saturating_sub(n);
        all.into_iter().skip(skip).collect()
    }

    pub fn last_filters(&self) -> &[Filter] {
        &self.last_filters
    }

    pub fn last_aggregation(&self) -> Option<&AggregationSpec> {
        self.last_aggregation.as_ref()
    }

    /// Number of retained turn pairs.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Forget history and carry-over.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.last_filters.clear();
        self.last_aggregation = None;
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(5)
    }
}
