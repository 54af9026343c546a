//! Evidence budgeting.
//!
//! Lengths are counted in characters, never bytes, so truncation cannot
//! split a multi-byte character.

use crate::types::Passage;
use multihop_core::EvidenceBudget;

/// Appended to a passage cut at the per-passage limit.
pub const TRUNCATION_MARKER: &str = " [...]";

/// Fit passages into a character budget.
///
/// Each passage is cut to `max_chars_per_passage` (plus the marker), then
/// the longest prefix whose total stays within `max_total_chars` is kept.
/// The first passage that does not fit ends the selection; nothing after
/// it is considered.
pub fn apply_budget(passages: &[Passage], budget: EvidenceBudget) -> Vec<Passage> {
    let mut selected = Vec::new();
    let mut total = 0usize;

    for passage in passages {
        let text = truncate_text(&passage.text, budget.max_chars_per_passage);
        let len = text.chars().count();

        if total + len > budget.max_total_chars {
            tracing::debug!(
                kept = selected.len(),
                dropped = passages.len() - selected.len(),
                "Evidence budget exhausted"
            );
            break;
        }

        total += len;
        selected.push(Passage {
            text,
            ..passage.clone()
        });
    }

    selected
}

/// Cut `text` to `max_chars` characters, marking the cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
    }
}
