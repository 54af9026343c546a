//! Evidence deduplication.

use crate::types::Passage;
use std::collections::HashSet;

/// Keep the first occurrence of every `(document_id, chunk_index)`.
///
/// Order of the survivors is the order of their first appearance.
pub fn dedup_passages(passages: Vec<Passage>) -> Vec<Passage> {
    let mut seen = HashSet::with_capacity(passages.len());
    passages
        .into_iter()
        .filter(|passage| seen.insert(passage.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collection;

    fn keys(passages: &[Passage]) -> Vec<(String, u32)> {
        passages
            .iter()
            .map(|p| (p.document_id.clone(), p.chunk_index))
            .collect()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let passages = vec![
            Passage::new(Collection::Documents, "d1", 2, "first copy"),
            Passage::new(Collection::Documents, "d3", 0, "other"),
            Passage::new(Collection::Transcripts, "d1", 2, "second copy"),
            Passage::new(Collection::Documents, "d1", 3, "neighbour chunk"),
        ];

        let deduped = dedup_passages(passages);
        assert_eq!(
            keys(&deduped),
            vec![
                ("d1".to_string(), 2),
                ("d3".to_string(), 0),
                ("d1".to_string(), 3)
            ]
        );
        assert_eq!(deduped[0].text, "first copy");
    }

    #[test]
    fn test_idempotent() {
        let passages = vec![
            Passage::new(Collection::Documents, "a", 0, "x"),
            Passage::new(Collection::Documents, "a", 0, "x"),
            Passage::new(Collection::Documents, "b", 1, "y"),
        ];

        let once = dedup_passages(passages);
        let twice = dedup_passages(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_passages(Vec::new()).is_empty());
    }
}
