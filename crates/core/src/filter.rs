//! Structured query types: filters, aggregation specs, and the rewritten
//! query plan returned by the natural-language query rewriter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{columns, is_known_column};

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Contains,
    StartsWith,
    In,
    Gte,
    Lte,
    Between,
    /// Any operator name this build does not know. Evaluates to `true`.
    #[serde(other)]
    Unsupported,
}

/// One `{column, op, value}` predicate over a record column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether the filter names a whitelisted column or the chunk-text pseudo-column.
    pub fn is_allowed(&self) -> bool {
        self.column == columns::CHUNK_TEXT || is_known_column(&self.column)
    }
}

/// Group-by request: frequency table over `group_by`, `top_k` largest buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    10
}

impl AggregationSpec {
    pub fn new(group_by: impl Into<String>, top_k: usize) -> Self {
        Self {
            group_by: group_by.into(),
            top_k,
        }
    }
}

/// The structured form of one user question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Query text used for semantic retrieval.
    pub rewritten_query: String,

    /// Columns whose matches boost a passage, most important first.
    #[serde(default)]
    pub column_priority: Vec<String>,

    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationSpec>,
}

impl QueryPlan {
    /// The degraded plan used when the rewriter output cannot be trusted:
    /// the raw message, no priorities, no filters.
    pub fn passthrough(user_message: &str) -> Self {
        Self {
            rewritten_query: user_message.to_string(),
            ..Self::default()
        }
    }

    /// Drop priority columns and filters outside the column whitelist.
    pub fn sanitized(mut self) -> Self {
        self.column_priority.retain(|c| is_known_column(c));
        self.filters.retain(Filter::is_allowed);
        self
    }
}
