//! Match results.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, DocId};

/// Per-term statistics reported with a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermInfo {
    /// Number of documents containing the term.
    pub termfreq: DocCount,
    /// Highest weight the term could contribute to a document.
    pub maxweight: f64,
}

/// One ranked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MSetItem {
    pub docid: DocId,
    pub weight: f64,
    /// Zero-based rank within the whole result list.
    pub rank: DocCount,
    /// Collapse key, or empty if the document was not collapsed on.
    pub collapse_key: String,
    /// Documents with the same collapse key removed in favour of this one
    /// and the other survivors (a lower bound).
    pub collapse_count: DocCount,
    #[serde(skip)]
    pub(crate) sort_key: Vec<u8>,
}

impl MSetItem {
    pub(crate) fn new(docid: DocId, weight: f64, sort_key: Vec<u8>, collapse_key: String) -> Self {
        MSetItem {
            docid,
            weight,
            rank: 0,
            collapse_key,
            collapse_count: 0,
            sort_key,
        }
    }
}

/// Lower, estimated and upper counts of matching documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchBounds {
    pub lower: DocCount,
    pub estimated: DocCount,
    pub upper: DocCount,
}

/// A ranked slice of the documents matching a query, with match-count
/// bounds and per-term statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MSet {
    pub(crate) first: DocCount,
    pub(crate) items: Vec<MSetItem>,
    pub(crate) bounds: MatchBounds,
    pub(crate) uncollapsed: MatchBounds,
    pub(crate) max_possible: f64,
    pub(crate) max_attained: f64,
    #[serde(skip)]
    pub(crate) term_info: AHashMap<String, TermInfo>,
}

impl MSet {
    /// Rank of the first item.
    pub fn first_item(&self) -> DocCount {
        self.first
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MSetItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MSetItem> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&MSetItem> {
        self.items.get(index)
    }

    pub fn docids(&self) -> Vec<DocId> {
        self.items.iter().map(|item| item.docid).collect()
    }

    /// Bounds on the number of matches after collapsing.
    pub fn bounds(&self) -> MatchBounds {
        self.bounds
    }

    /// Bounds on the number of matches before collapsing.
    pub fn uncollapsed_bounds(&self) -> MatchBounds {
        self.uncollapsed
    }

    pub fn matches_lower_bound(&self) -> DocCount {
        self.bounds.lower
    }

    pub fn matches_estimated(&self) -> DocCount {
        self.bounds.estimated
    }

    pub fn matches_upper_bound(&self) -> DocCount {
        self.bounds.upper
    }

    pub fn uncollapsed_matches_lower_bound(&self) -> DocCount {
        self.uncollapsed.lower
    }

    pub fn uncollapsed_matches_estimated(&self) -> DocCount {
        self.uncollapsed.estimated
    }

    pub fn uncollapsed_matches_upper_bound(&self) -> DocCount {
        self.uncollapsed.upper
    }

    /// Highest weight any document could have had.
    pub fn max_possible(&self) -> f64 {
        self.max_possible
    }

    /// Highest weight of any document seen.
    pub fn max_attained(&self) -> f64 {
        self.max_attained
    }

    /// Express `weight` as a percentage of the maximum possible weight.
    ///
    /// Positive weights map to 1..=100; 100 means the weight reached the
    /// maximum. When no weight was possible everything scores 100.
    pub fn convert_to_percent(&self, weight: f64) -> u32 {
        percent(weight, self.max_possible)
    }

    /// The smallest weight converting to at least `percent`.
    pub fn percent_to_weight(&self, percent: u32) -> f64 {
        self.max_possible * f64::from(percent.min(100)) / 100.0
    }

    pub fn item_percent(&self, index: usize) -> Option<u32> {
        self.items.get(index).map(|item| self.convert_to_percent(item.weight))
    }

    fn check_term(term: &str) -> Result<()> {
        if term.is_empty() {
            return Err(LexmatchError::no_such_term("empty term name"));
        }
        Ok(())
    }

    /// Documents containing `term`, or 0 if the query didn't use it.
    pub fn termfreq(&self, term: &str) -> Result<DocCount> {
        Self::check_term(term)?;
        Ok(self.term_info.get(term).map_or(0, |info| info.termfreq))
    }

    /// Maximum weight `term` could contribute, or 0 if the query didn't use
    /// it.
    pub fn termweight(&self, term: &str) -> Result<f64> {
        Self::check_term(term)?;
        Ok(self.term_info.get(term).map_or(0.0, |info| info.maxweight))
    }

    pub fn description(&self) -> String {
        format!(
            "MSet(first={}, size={}, matches={}..{}..{}, max_possible={})",
            self.first,
            self.items.len(),
            self.bounds.lower,
            self.bounds.estimated,
            self.bounds.upper,
            self.max_possible
        )
    }
}

impl<'a> IntoIterator for &'a MSet {
    type Item = &'a MSetItem;
    type IntoIter = std::slice::Iter<'a, MSetItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Percentage of `max_possible` reached by `weight`.
pub(crate) fn percent(weight: f64, max_possible: f64) -> u32 {
    if max_possible <= 0.0 {
        return 100;
    }
    if weight <= 0.0 {
        return 0;
    }
    let pct = (weight * 100.0 / max_possible + 100.0 * f64::EPSILON).floor();
    (pct as u32).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mset(max_possible: f64) -> MSet {
        MSet {
            max_possible,
            ..MSet::default()
        }
    }

    #[test]
    fn test_percent_conversion() {
        let m = mset(2.0);
        assert_eq!(m.convert_to_percent(2.0), 100);
        assert_eq!(m.convert_to_percent(1.0), 50);
        assert_eq!(m.convert_to_percent(1e-9), 1);
        assert_eq!(m.convert_to_percent(0.0), 0);
        for pct in 1..=100 {
            assert_eq!(m.convert_to_percent(m.percent_to_weight(pct)), pct);
        }
        assert_eq!(mset(0.0).convert_to_percent(0.0), 100);
    }

    #[test]
    fn test_term_lookups() {
        let mut m = mset(1.0);
        m.term_info.insert(
            "word".to_string(),
            TermInfo {
                termfreq: 2,
                maxweight: 1.5,
            },
        );
        assert_eq!(m.termfreq("word").ok(), Some(2));
        assert_eq!(m.termweight("word").ok(), Some(1.5));
        assert_eq!(m.termfreq("other").ok(), Some(0));
        assert!(matches!(m.termfreq(""), Err(LexmatchError::NoSuchTerm(_))));
    }
}
