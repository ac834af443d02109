//! Natural-language question → structured [`QueryPlan`].
//!
//! The LLM-backed rewriter never fails on bad output: anything that is not
//! a parsable JSON object degrades to the raw message with no filters and
//! no column priority. Columns outside the whitelist are dropped.

use crate::llm::{Generator, Sampling};
use async_trait::async_trait;
use patentrag_core::error::ProviderError;
use patentrag_core::filter::{AggregationSpec, Filter, QueryPlan};
use patentrag_core::message::Message;
use patentrag_core::record::COLUMN_WHITELIST;
use serde_json::Value;
use tracing::{debug, warn};

/// Turns a question plus recent history into a [`QueryPlan`].
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// Only generation failures are errors; malformed output degrades.
    async fn rewrite(&self, history: &[Message], message: &str) -> Result<QueryPlan, ProviderError>;
}

pub struct LlmQueryRewriter {
    generator: Generator,
    system_prompt: String,
}

impl LlmQueryRewriter {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            system_prompt: system_prompt(),
        }
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(&self, history: &[Message], message: &str) -> Result<QueryPlan, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(message));

        let raw = self.generator.complete(messages, Sampling::REWRITE).await?;
        let plan = parse_plan(&raw, message);
        debug!(
            query = %plan.rewritten_query,
            filters = plan.filters.len(),
            priority = plan.column_priority.len(),
            aggregation = plan.aggregation.is_some(),
            "Query rewritten"
        );
        Ok(plan)
    }
}

/// Parse rewriter output, degrading to [`QueryPlan::passthrough`].
///
/// The JSON object is taken from the first `{` to the last `}` so prose
/// or code fences around it are ignored. Individual malformed filters are
/// skipped rather than discarding the whole plan.
pub fn parse_plan(raw: &str, user_message: &str) -> QueryPlan {
    let Some(span) = json_span(raw) else {
        warn!("Rewriter output has no JSON object, using raw message");
        return QueryPlan::passthrough(user_message);
    };
    let value: Value = match serde_json::from_str(span) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) | Err(_) => {
            warn!("Rewriter output is not a JSON object, using raw message");
            return QueryPlan::passthrough(user_message);
        }
    };

    let rewritten_query = value
        .get("rewritten_query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .unwrap_or(user_message)
        .to_string();

    let column_priority = value
        .get("column_priority")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let filters = value
        .get("filters")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|f| serde_json::from_value::<Filter>(f.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let aggregation = value
        .get("aggregation")
        .and_then(|a| serde_json::from_value::<AggregationSpec>(a.clone()).ok());

    QueryPlan {
        rewritten_query,
        column_priority,
        filters,
        aggregation,
    }
    .sanitized()
}

fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn system_prompt() -> String {
    format!(
        r#"You are an expert at translating patent-search questions into a STRICT JSON spec.

Return JSON with keys:
  rewritten_query : string
  column_priority : ordered subset of columns from this whitelist:
    {whitelist}
  filters         : list of {{column, op, value}} filters
  aggregation     : OPTIONAL object with keys
                    - group_by: column to aggregate on
                    - top_k: integer

Examples:

1) "Show me SDG 6 patents about membrane desalination."
{{
  "rewritten_query":"membrane desalination",
  "column_priority":["sdg_number","ipc_technologies","abstract_text","title_en"],
  "filters":[
    {{"column":"sdg_number","op":"eq","value":6}},
    {{"column":"ipc_technologies","op":"contains","value":"membrane"}},
    {{"column":"abstract_text","op":"contains","value":"desalination"}}
  ]
}}

2) "Show me SDG 6 patents technologies"
{{
  "rewritten_query":"technology themes in SDG 6 patents",
  "column_priority":["sdg_number","ipc_technologies","analysis_explanation"],
  "filters":[{{"column":"sdg_number","op":"eq","value":6}}],
  "aggregation":{{"group_by":"ipc_technologies","top_k":10}}
}}

3) "List SDG 13 filings on direct-air CO2 capture"
{{
  "rewritten_query":"direct air capture patents",
  "column_priority":["sdg_number","abstract_text","analysis_explanation"],
  "filters":[
    {{"column":"sdg_number","op":"eq","value":13}},
    {{"column":"abstract_text","op":"contains","value":"direct air capture"}}
  ]
}}

4) "Give me SDG 9 robotic-manufacturing patents published between 2022 and 2024"
{{
  "rewritten_query":"robotic manufacturing patents",
  "column_priority":["sdg_number","publication_date","abstract_text"],
  "filters":[
    {{"column":"sdg_number","op":"eq","value":9}},
    {{"column":"publication_date","op":"between","value":["2022-01-01","2024-12-31"]}},
    {{"column":"abstract_text","op":"contains","value":"robotic"}},
    {{"column":"abstract_text","op":"contains","value":"manufacturing"}}
  ]
}}

Supported ops: eq, neq, contains, startswith, in, gte, lte, between.
ONLY output the JSON, no extra commentary."#,
        whitelist = COLUMN_WHITELIST.join(", ")
    )
}
