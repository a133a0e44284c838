//! Configuration for a single match run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LexmatchError, Result};
use crate::matcher::sort::KeyMaker;
use crate::types::{DocCount, ValueSlot};

/// The ordering applied to the result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Value,
    ValueThenRelevance,
    RelevanceThenValue,
    Key,
    KeyThenRelevance,
    RelevanceThenKey,
}

impl SortBy {
    /// Whether weight is the first sort criterion.
    pub fn relevance_primary(self) -> bool {
        matches!(
            self,
            SortBy::Relevance | SortBy::RelevanceThenValue | SortBy::RelevanceThenKey
        )
    }

    pub fn uses_value(self) -> bool {
        matches!(
            self,
            SortBy::Value | SortBy::ValueThenRelevance | SortBy::RelevanceThenValue
        )
    }

    pub fn uses_key(self) -> bool {
        matches!(
            self,
            SortBy::Key | SortBy::KeyThenRelevance | SortBy::RelevanceThenKey
        )
    }
}

/// How documents that compare equal on every other criterion are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocidOrder {
    #[default]
    Ascending,
    Descending,
    /// Any order is acceptable; evaluated as ascending.
    DontCare,
}

/// Options controlling how a query is matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub sort_by: SortBy,
    /// Slot used by the value sorts.
    pub sort_slot: ValueSlot,
    /// Sort values (or keys) in descending rather than ascending order.
    pub sort_reverse: bool,
    pub docid_order: DocidOrder,
    /// Slot whose value is the collapse key.
    pub collapse_slot: Option<ValueSlot>,
    /// Documents kept per collapse key.
    pub collapse_max: DocCount,
    /// Drop documents scoring below this percentage of the maximum
    /// possible weight. 0 disables.
    pub percent_cutoff: u32,
    /// Drop documents scoring below this weight.
    pub weight_cutoff: f64,
    /// Examine at least this many candidates before stopping early.
    pub check_at_least: DocCount,
    /// Wall-clock limit in seconds. 0 disables.
    pub time_limit: f64,
    #[serde(skip)]
    pub key_maker: Option<Arc<dyn KeyMaker>>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            sort_by: SortBy::Relevance,
            sort_slot: 0,
            sort_reverse: false,
            docid_order: DocidOrder::Ascending,
            collapse_slot: None,
            collapse_max: 1,
            percent_cutoff: 0,
            weight_cutoff: 0.0,
            check_at_least: 0,
            time_limit: 0.0,
            key_maker: None,
        }
    }
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort_by_value(mut self, slot: ValueSlot, reverse: bool) -> Self {
        self.sort_by = SortBy::Value;
        self.sort_slot = slot;
        self.sort_reverse = reverse;
        self
    }

    pub fn with_sort_by_value_then_relevance(mut self, slot: ValueSlot, reverse: bool) -> Self {
        self.sort_by = SortBy::ValueThenRelevance;
        self.sort_slot = slot;
        self.sort_reverse = reverse;
        self
    }

    pub fn with_sort_by_relevance_then_value(mut self, slot: ValueSlot, reverse: bool) -> Self {
        self.sort_by = SortBy::RelevanceThenValue;
        self.sort_slot = slot;
        self.sort_reverse = reverse;
        self
    }

    pub fn with_sort_by_key(mut self, sort_by: SortBy, key_maker: Arc<dyn KeyMaker>, reverse: bool) -> Self {
        self.sort_by = sort_by;
        self.key_maker = Some(key_maker);
        self.sort_reverse = reverse;
        self
    }

    pub fn with_sort_by_relevance(mut self) -> Self {
        self.sort_by = SortBy::Relevance;
        self
    }

    pub fn with_docid_order(mut self, order: DocidOrder) -> Self {
        self.docid_order = order;
        self
    }

    pub fn with_collapse_key(mut self, slot: ValueSlot, collapse_max: DocCount) -> Self {
        self.collapse_slot = Some(slot);
        self.collapse_max = collapse_max;
        self
    }

    pub fn with_cutoff(mut self, percent: u32, weight: f64) -> Self {
        self.percent_cutoff = percent;
        self.weight_cutoff = weight;
        self
    }

    pub fn with_check_at_least(mut self, n: DocCount) -> Self {
        self.check_at_least = n;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = seconds;
        self
    }

    /// Reject settings that can never be valid, whatever the query.
    pub fn validate(&self) -> Result<()> {
        if self.percent_cutoff > 100 {
            return Err(LexmatchError::invalid_argument(format!(
                "percent cutoff {} is above 100",
                self.percent_cutoff
            )));
        }
        if !(self.weight_cutoff >= 0.0) {
            return Err(LexmatchError::invalid_argument("weight cutoff must be non-negative"));
        }
        if !(self.time_limit >= 0.0) {
            return Err(LexmatchError::invalid_argument("time limit must be non-negative"));
        }
        if self.collapse_slot.is_some() && self.collapse_max == 0 {
            return Err(LexmatchError::invalid_argument("collapse_max must be at least 1"));
        }
        if self.sort_by.uses_key() && self.key_maker.is_none() {
            return Err(LexmatchError::invalid_argument("sorting by key needs a KeyMaker"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MatchOptions::default();
        assert_eq!(options.sort_by, SortBy::Relevance);
        assert_eq!(options.docid_order, DocidOrder::Ascending);
        assert_eq!(options.collapse_slot, None);
        assert_eq!(options.collapse_max, 1);
        assert_eq!(options.percent_cutoff, 0);
        assert_eq!(options.weight_cutoff, 0.0);
        assert_eq!(options.check_at_least, 0);
        assert_eq!(options.time_limit, 0.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(MatchOptions::new().with_cutoff(101, 0.0).validate().is_err());
        assert!(MatchOptions::new().with_cutoff(0, -1.0).validate().is_err());
        assert!(MatchOptions::new().with_collapse_key(0, 0).validate().is_err());
        let mut keyed = MatchOptions::new();
        keyed.sort_by = SortBy::Key;
        assert!(keyed.validate().is_err());
    }

    #[test]
    fn test_serde_skips_key_maker() -> Result<()> {
        let options = MatchOptions::new().with_sort_by_value(3, true).with_collapse_key(1, 2);
        let json = serde_json::to_string(&options)?;
        let back: MatchOptions = serde_json::from_str(&json)?;
        assert_eq!(back.sort_by, SortBy::Value);
        assert_eq!(back.sort_slot, 3);
        assert!(back.sort_reverse);
        assert_eq!(back.collapse_slot, Some(1));
        assert_eq!(back.collapse_max, 2);
        let partial: MatchOptions = serde_json::from_str(r#"{"check_at_least": 5}"#)?;
        assert_eq!(partial.check_at_least, 5);
        assert_eq!(partial.collapse_max, 1);
        Ok(())
    }
}
