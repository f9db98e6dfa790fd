//! Word-level Jaccard similarity used for dedup clustering.

use std::collections::HashSet;

/// Similarity in [0, 1]: shared words over total distinct words,
/// case-insensitive. Two empty texts are identical.
pub fn content_similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let words_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        assert_eq!(content_similarity("fix the bug", "fix the bug"), 1.0);
    }

    #[test]
    fn case_is_ignored() {
        assert_eq!(content_similarity("Fix The Bug", "fix the bug"), 1.0);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(content_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn partial_overlap_is_fractional() {
        let sim = content_similarity("a b c d", "a b x y");
        assert!(sim > 0.0 && sim < 1.0);
    }
}
