//! Citation deduplication.

use std::collections::HashMap;

use conductor_core::tool::Citation;

/// Collapse citations that point at the same document chunk, keeping the
/// highest score (never an average), and order the survivors best first.
///
/// Equal scores are ordered by document id, then chunk index, so the output
/// does not depend on the order tools finished in.
pub fn dedup(citations: impl IntoIterator<Item = Citation>) -> Vec<Citation> {
    let mut best: HashMap<(String, usize), Citation> = HashMap::new();

    for citation in citations {
        let key = (citation.document_id.clone(), citation.chunk_index);
        match best.get(&key) {
            Some(existing) if existing.score >= citation.score => {}
            _ => {
                best.insert(key, citation);
            }
        }
    }

    let mut deduped: Vec<Citation> = best.into_values().collect();
    deduped.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.document_id.cmp(&b.document_id))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(doc: &str, chunk: usize, score: f32) -> Citation {
        Citation {
            document_id: doc.into(),
            chunk_index: chunk,
            score,
            text: String::new(),
        }
    }

    #[test]
    fn higher_score_wins() {
        let out = dedup(vec![cite("A", 3, 0.7), cite("A", 3, 0.9)]);
        assert_eq!(out.len(), 1);
        assert!((out[0].score - 0.9).abs() < f32::EPSILON);

        let out = dedup(vec![cite("A", 3, 0.9), cite("A", 3, 0.7)]);
        assert_eq!(out.len(), 1);
        assert!((out[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn distinct_chunks_are_kept_and_sorted() {
        let out = dedup(vec![cite("A", 1, 0.2), cite("B", 0, 0.8), cite("A", 2, 0.5)]);
        let keys: Vec<_> = out.iter().map(|c| (c.document_id.as_str(), c.chunk_index)).collect();
        assert_eq!(keys, [("B", 0), ("A", 2), ("A", 1)]);
    }

    #[test]
    fn ties_are_ordered_by_key() {
        let out = dedup(vec![cite("b", 0, 0.5), cite("a", 1, 0.5), cite("a", 0, 0.5)]);
        let keys: Vec<_> = out.iter().map(|c| (c.document_id.as_str(), c.chunk_index)).collect();
        assert_eq!(keys, [("a", 0), ("a", 1), ("b", 0)]);
    }
}
