//! Bounded edit distance for `EDIT_DISTANCE` term expansion.
//!
//! Distances count insertions, deletions, substitutions and transpositions
//! of adjacent characters (optimal string alignment). Candidates further
//! than the threshold are rejected without finishing the table.

use std::cmp::min;

/// Edit distance between two strings with an early-exit threshold.
///
/// Returns `None` as soon as the distance is known to exceed `threshold`.
#[allow(clippy::needless_range_loop)]
pub fn edit_distance_within(a: &[char], b: &[char], threshold: usize) -> Option<usize> {
    let len1 = a.len();
    let len2 = b.len();

    if len1.abs_diff(len2) > threshold {
        return None;
    }
    if len1 == 0 || len2 == 0 {
        let d = len1.max(len2);
        return (d <= threshold).then_some(d);
    }

    // Three rows: two back for transpositions.
    let mut prev2 = vec![0usize; len2 + 1];
    let mut prev = (0..=len2).collect::<Vec<_>>();
    let mut curr = vec![0usize; len2 + 1];

    for i in 1..=len1 {
        curr[0] = i;
        let mut row_min = i;

        for j in 1..=len2 {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = min(min(prev[j] + 1, curr[j - 1] + 1), prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = min(best, prev2[j - 2] + 1);
            }
            curr[j] = best;
            row_min = min(row_min, best);
        }

        if row_min > threshold {
            return None;
        }

        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[len2];
    (distance <= threshold).then_some(distance)
}

/// Matches candidate terms against a fixed target.
#[derive(Debug, Clone)]
pub struct EditDistanceMatcher {
    target: Vec<char>,
    max_distance: usize,
    fixed_prefix: String,
}

impl EditDistanceMatcher {
    /// Create a matcher. The first `fixed_prefix_len` characters of the
    /// target must match exactly.
    pub fn new(target: &str, max_distance: usize, fixed_prefix_len: usize) -> Self {
        let fixed_prefix: String = target.chars().take(fixed_prefix_len).collect();
        EditDistanceMatcher {
            target: target.chars().collect(),
            max_distance,
            fixed_prefix,
        }
    }

    /// The prefix every candidate must start with.
    pub fn prefix(&self) -> &str {
        &self.fixed_prefix
    }

    /// Distance to `candidate`, or `None` if it is out of range.
    pub fn distance(&self, candidate: &str) -> Option<usize> {
        if !candidate.starts_with(&self.fixed_prefix) {
            return None;
        }
        let chars: Vec<char> = candidate.chars().collect();
        edit_distance_within(&self.target, &chars, self.max_distance)
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.distance(candidate).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(a: &str, b: &str, t: usize) -> Option<usize> {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        edit_distance_within(&a, &b, t)
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(d("kitten", "sitting", 5), Some(3));
        assert_eq!(d("kitten", "sitting", 2), None);
        assert_eq!(d("", "abc", 3), Some(3));
        assert_eq!(d("same", "same", 0), Some(0));
    }

    #[test]
    fn test_transposition_costs_one() {
        assert_eq!(d("ab", "ba", 1), Some(1));
        assert_eq!(d("test", "tset", 1), Some(1));
    }

    #[test]
    fn test_matcher_prefix() {
        let m = EditDistanceMatcher::new("though", 1, 2);
        assert!(m.is_match("thougn"));
        assert!(!m.is_match("tough"));
        assert_eq!(m.prefix(), "th");
    }
}
