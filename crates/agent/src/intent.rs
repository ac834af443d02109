//! Intent predicates over the raw user message.
//!
//! Each trigger of the turn cascade is a named function so it can be tested
//! on its own. Precedence between overlapping triggers is decided by the
//! order of the handlers in the orchestrator, not here.

use patentrag_core::message::{Message, Role};
use regex_lite::Regex;
use std::sync::LazyLock;

static IMPROVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:improve|innovate|build on|extend)\s+(?:the\s+)?(?:patent\s+)?.*?\(?\b([A-Za-z]{0,4}\d{4,}[A-Za-z0-9]*)\)?",
    )
    .expect("static regex")
});

static SDG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsdg\s*(\d+)\b").expect("static regex"));

static CLAIMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bclaims\s+(?:of|for)\s+(?:patent\s+)?([A-Z0-9]+)").expect("static regex")
});

static PRIOR_ART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:prior[- ]art|cited\s+by)\s+(?:(?:of|for)\s+)?(?:patent\s+)?([A-Z0-9]+)")
        .expect("static regex")
});

static FAMILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:family|parent)\b").expect("static regex"));

static FILING_TIMELINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhow\b.*\bfiled\b").expect("static regex"));

static LATEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:latest|recent)\b").expect("static regex"));

static INVENTOR_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binventor\b").expect("static regex"));

static CITED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([A-Za-z]{0,4}\d[A-Za-z0-9]*)[,)]").expect("static regex")
});

/// "improve / innovate / build on / extend (the) (patent) … ID".
pub fn improve_target(message: &str) -> Option<String> {
    IMPROVE
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn mentions_this_category(message: &str) -> bool {
    message.to_lowercase().contains("this category")
}

/// The `N` of "SDG N".
pub fn sdg_number(message: &str) -> Option<i64> {
    SDG.captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Asks who invented/applied for the last cited patent and what is new.
pub fn asks_inventor_applicant_novelty(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("inventor") && lower.contains("applicant") && lower.contains("new")
}

/// Asks for the inventor's own view of the last cited patent.
pub fn asks_inventor_view(message: &str) -> bool {
    INVENTOR_WORD.is_match(message) && message.to_lowercase().contains("this patent")
}

/// "claims of/for ID".
pub fn claims_target(message: &str) -> Option<String> {
    CLAIMS
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// "prior art / prior-art / cited by ID".
pub fn prior_art_target(message: &str) -> Option<String> {
    PRIOR_ART
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn asks_family(message: &str) -> bool {
    FAMILY.is_match(message)
}

/// First word that looks like a publication number: alphanumeric, at least
/// four characters, with a digit in it.
pub fn publication_number_in(message: &str) -> Option<String> {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|t| t.len() >= 4 && t.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// "how … filed".
pub fn asks_filing_timeline(message: &str) -> bool {
    FILING_TIMELINE.is_match(message)
}

/// "latest" / "recent".
pub fn asks_latest(message: &str) -> bool {
    LATEST.is_match(message)
}

/// Counting phrasing for aggregation answers.
pub fn asks_counts(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["top", "count", "how many", "number"]
        .iter()
        .any(|w| lower.contains(w))
}

pub fn asks_each_year(message: &str) -> bool {
    message.to_lowercase().contains("each year")
}

/// Whether the final answer should list applicant countries.
pub fn mentions_applicant_or_country(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("applicant") || lower.contains("country")
}

/// The publication number most recently cited as `(ID)` by the assistant.
pub fn last_cited_id(history: &[Message]) -> Option<String> {
    history
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .find_map(|m| {
            CITED_ID
                .captures(&m.content)
                .and_then(|c| c.get(1))
                .map(|id| id.as_str().to_string())
        })
}
