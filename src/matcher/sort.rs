//! Sort keys and the result ordering.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::Result;
use crate::matcher::decider::Candidate;
use crate::matcher::options::{DocidOrder, MatchOptions, SortBy};
use crate::mset::MSetItem;
use crate::types::ValueSlot;

/// Builds a byte-string sort key for a document. Keys compare bytewise.
pub trait KeyMaker: Debug + Send + Sync {
    fn key(&self, candidate: &Candidate<'_>) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
struct KeySlot {
    slot: ValueSlot,
    reverse: bool,
    default: String,
}

/// Builds a composite key from several value slots, each sorted ascending
/// or descending.
///
/// Every component but the last is escaped and terminated so that the
/// concatenation compares component by component.
#[derive(Debug, Clone, Default)]
pub struct MultiValueKeyMaker {
    slots: Vec<KeySlot>,
}

impl MultiValueKeyMaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(self, slot: ValueSlot, reverse: bool) -> Self {
        self.add_value_with_default(slot, reverse, "")
    }

    /// Use `default` for documents with no value in `slot`.
    pub fn add_value_with_default<S: Into<String>>(mut self, slot: ValueSlot, reverse: bool, default: S) -> Self {
        self.slots.push(KeySlot {
            slot,
            reverse,
            default: default.into(),
        });
        self
    }
}

impl KeyMaker for MultiValueKeyMaker {
    fn key(&self, candidate: &Candidate<'_>) -> Result<Vec<u8>> {
        let mut key = Vec::new();
        let last = self.slots.len().saturating_sub(1);
        for (i, entry) in self.slots.iter().enumerate() {
            let mut value = candidate.value(entry.slot)?;
            if value.is_empty() {
                value.clone_from(&entry.default);
            }
            encode_component(&mut key, value.as_bytes(), entry.reverse, i == last);
        }
        Ok(key)
    }
}

fn encode_component(key: &mut Vec<u8>, value: &[u8], reverse: bool, last: bool) {
    if !reverse {
        if last {
            key.extend_from_slice(value);
            return;
        }
        for &b in value {
            key.push(b);
            if b == 0 {
                key.push(0xff);
            }
        }
        key.extend_from_slice(&[0, 0]);
        return;
    }
    // Inverted bytes sort in the opposite order; the terminator must sort
    // after any inverted content, including a shorter value's.
    for &b in value {
        let inv = !b;
        key.push(inv);
        if inv == 0xff {
            key.push(0);
        }
    }
    key.extend_from_slice(&[0xff, 0xff]);
}

/// Orders result items according to the match options. `Less` means
/// ranked higher.
#[derive(Debug, Clone, Copy)]
pub struct ItemOrder {
    sort_by: SortBy,
    reverse: bool,
    docid_order: DocidOrder,
}

impl ItemOrder {
    pub fn new(options: &MatchOptions) -> Self {
        ItemOrder {
            sort_by: options.sort_by,
            reverse: options.sort_reverse,
            docid_order: options.docid_order,
        }
    }

    fn by_weight(a: &MSetItem, b: &MSetItem) -> Ordering {
        b.weight.total_cmp(&a.weight)
    }

    fn by_key(&self, a: &MSetItem, b: &MSetItem) -> Ordering {
        let ord = a.sort_key.cmp(&b.sort_key);
        if self.reverse { ord.reverse() } else { ord }
    }

    fn by_docid(&self, a: &MSetItem, b: &MSetItem) -> Ordering {
        match self.docid_order {
            DocidOrder::Descending => b.docid.cmp(&a.docid),
            DocidOrder::Ascending | DocidOrder::DontCare => a.docid.cmp(&b.docid),
        }
    }

    pub fn compare(&self, a: &MSetItem, b: &MSetItem) -> Ordering {
        let primary = match self.sort_by {
            SortBy::Relevance => Self::by_weight(a, b),
            SortBy::Value | SortBy::Key => self.by_key(a, b),
            SortBy::ValueThenRelevance | SortBy::KeyThenRelevance => {
                self.by_key(a, b).then_with(|| Self::by_weight(a, b))
            }
            SortBy::RelevanceThenValue | SortBy::RelevanceThenKey => {
                Self::by_weight(a, b).then_with(|| self.by_key(a, b))
            }
        };
        primary.then_with(|| self.by_docid(a, b))
    }

    /// Whether a document arriving after every document already seen
    /// loses every tie against them.
    pub fn later_docids_lose_ties(&self) -> bool {
        self.sort_by == SortBy::Relevance && self.docid_order != DocidOrder::Descending
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::{Database, Document, MemoryShard};

    fn item(docid: u32, weight: f64, key: &[u8]) -> MSetItem {
        MSetItem::new(docid, weight, key.to_vec(), String::new())
    }

    #[test]
    fn test_multi_value_key_order() -> Result<()> {
        let rows = [("a", "1"), ("a", "2"), ("ab", "0"), ("", "9")];
        let shard = MemoryShard::from_documents(rows.iter().map(|(x, y)| {
            Document::new()
                .with_term("t", 1)
                .with_value(0, *x)
                .with_value(1, *y)
        }));
        let db = Database::single(Arc::new(shard));
        let maker = MultiValueKeyMaker::new().add_value(0, false).add_value(1, true);
        let mut keyed = Vec::new();
        for did in 1..=4 {
            keyed.push((maker.key(&Candidate::new(&db, did))?, did));
        }
        keyed.sort();
        let order: Vec<u32> = keyed.into_iter().map(|(_, d)| d).collect();
        // Empty first, then "a" with its second slot descending, then "ab".
        assert_eq!(order, vec![4, 2, 1, 3]);
        Ok(())
    }

    #[test]
    fn test_reversed_prefix_sorts_last() {
        let mut short = Vec::new();
        encode_component(&mut short, b"a", true, true);
        let mut long = Vec::new();
        encode_component(&mut long, b"ab", true, true);
        assert!(long < short);
    }

    #[test]
    fn test_item_order() {
        let mut options = MatchOptions::default();
        let order = ItemOrder::new(&options);
        assert_eq!(order.compare(&item(2, 2.0, b""), &item(1, 1.0, b"")), Ordering::Less);
        assert_eq!(order.compare(&item(1, 1.0, b""), &item(2, 1.0, b"")), Ordering::Less);

        options = options.with_sort_by_value_then_relevance(0, true);
        let order = ItemOrder::new(&options);
        assert_eq!(order.compare(&item(1, 1.0, b"b"), &item(2, 5.0, b"a")), Ordering::Less);
        assert_eq!(order.compare(&item(1, 1.0, b"a"), &item(2, 5.0, b"a")), Ordering::Greater);
        assert!(!order.later_docids_lose_ties());
    }
}
