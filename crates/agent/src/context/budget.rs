//! Passage packing under a token budget.

use patentrag_core::retrieval::{Passage, TokenCounter};
use std::collections::HashSet;

/// Passages that fit, in rank order, with the tokens they use.
#[derive(Debug, Clone, Default)]
pub struct PackedPassages {
    pub passages: Vec<Passage>,
    pub tokens: usize,
    /// Passages left out because the budget ran out.
    pub dropped: usize,
}

/// Keep the first passage of each patent while the running token count of
/// passage texts stays within `budget`.
///
/// Packing stops at the first passage that would overflow; it is not
/// truncated and nothing after it is considered.
pub fn pack_passages(
    passages: Vec<Passage>,
    counter: &dyn TokenCounter,
    budget: usize,
) -> PackedPassages {
    let total = passages.len();
    let mut seen: HashSet<String> = HashSet::new();
    let mut packed = PackedPassages::default();
    let mut considered = 0;

    for passage in passages {
        considered += 1;
        if seen.contains(&passage.publication_number) {
            continue;
        }
        let tokens = counter.count(&passage.text);
        if packed.tokens + tokens > budget {
            packed.dropped = total - considered + 1;
            break;
        }
        seen.insert(passage.publication_number.clone());
        packed.tokens += tokens;
        packed.passages.push(passage);
    }

    packed
}
