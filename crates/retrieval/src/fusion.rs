//! Weighted interleaving of ranked passage lists.
//!
//! Each source has a ranked list and a weight. At every step the source
//! with the highest remaining priority contributes its next passage, where
//!
//! ```text
//! priority = weight * (1 - consumed / len)
//! ```
//!
//! Sources are visited in descending weight order and only a priority
//! greater by more than a small epsilon displaces the current best, so
//! ties go to the heavier source. Relative order within each source is never
//! changed.

use crate::types::{Collection, Passage};

/// Priorities closer than this are equal.
const PRIORITY_EPSILON: f64 = 1e-9;

/// Ranked output of one source, ready for fusion.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub collection: Collection,
    pub weight: f64,
    pub passages: Vec<Passage>,
}

impl RankedList {
    pub fn new(collection: Collection, weight: f64, passages: Vec<Passage>) -> Self {
        Self {
            collection,
            weight,
            passages,
        }
    }
}

struct Cursor {
    weight: f64,
    len: usize,
    consumed: usize,
    passages: std::vec::IntoIter<Passage>,
}

impl Cursor {
    fn priority(&self) -> Option<f64> {
        if self.consumed >= self.len {
            return None;
        }
        Some(self.weight * (1.0 - self.consumed as f64 / self.len as f64))
    }
}

/// Merge ranked lists into one list of at most `k` passages.
///
/// Empty lists are ignored. A single non-empty list passes through
/// unchanged apart from the `k` cap.
pub fn fuse(lists: Vec<RankedList>, k: usize) -> Vec<Passage> {
    let mut lists: Vec<RankedList> = lists
        .into_iter()
        .filter(|list| !list.passages.is_empty())
        .collect();

    if lists.is_empty() || k == 0 {
        return Vec::new();
    }

    if lists.len() == 1 {
        let mut passages = lists.remove(0).passages;
        passages.truncate(k);
        return passages;
    }

    // Stable sort keeps declaration order among equal weights
    lists.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut cursors: Vec<Cursor> = lists
        .into_iter()
        .map(|list| Cursor {
            weight: list.weight,
            len: list.passages.len(),
            consumed: 0,
            passages: list.passages.into_iter(),
        })
        .collect();

    let mut fused = Vec::with_capacity(k.min(cursors.iter().map(|c| c.len).sum()));

    while fused.len() < k {
        let mut best: Option<(usize, f64)> = None;
        for (i, cursor) in cursors.iter().enumerate() {
            if let Some(priority) = cursor.priority() {
                match best {
                    Some((_, best_priority)) if priority <= best_priority + PRIORITY_EPSILON => {}
                    _ => best = Some((i, priority)),
                }
            }
        }

        let Some((winner, _)) = best else {
            break;
        };

        let cursor = &mut cursors[winner];
        match cursor.passages.next() {
            Some(passage) => {
                cursor.consumed += 1;
                fused.push(passage);
            }
            None => cursor.consumed = cursor.len,
        }
    }

    fused
}
