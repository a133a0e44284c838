//! The best-so-far result set kept while matching, and collapsing.

use std::cmp::Ordering;

use ahash::AHashMap;

use crate::matcher::sort::ItemOrder;
use crate::mset::MSetItem;
use crate::types::{DocCount, DocId};

/// Keeps the best `capacity` items seen so far.
///
/// Items are appended unsorted and the set is sorted and cut back to
/// `capacity` once it holds twice that many, which keeps insertion cheap.
#[derive(Debug)]
pub struct ProtoMSet {
    order: ItemOrder,
    capacity: usize,
    items: Vec<MSetItem>,
    /// Weight of the worst item after the last trim, once full.
    min_weight: f64,
    full: bool,
}

impl ProtoMSet {
    pub fn new(order: ItemOrder, capacity: usize) -> Self {
        ProtoMSet {
            order,
            capacity,
            items: Vec::new(),
            min_weight: 0.0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `capacity` items better than anything below
    /// [`Self::min_weight`] are known.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Weight below which an item cannot enter. Only meaningful when
    /// relevance is the primary sort.
    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item. Returns true if the minimum weight went up.
    pub fn push(&mut self, item: MSetItem) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.items.push(item);
        let limit = (self.capacity * 2).max(self.capacity + 16);
        if self.items.len() >= limit || (!self.full && self.items.len() >= self.capacity) {
            return self.trim();
        }
        false
    }

    pub fn remove(&mut self, docid: DocId) {
        self.items.retain(|item| item.docid != docid);
    }

    fn sort(&mut self) {
        let order = self.order;
        self.items.sort_by(|a, b| order.compare(a, b));
    }

    fn trim(&mut self) -> bool {
        self.sort();
        self.items.truncate(self.capacity);
        if self.items.len() < self.capacity {
            return false;
        }
        self.full = true;
        let worst = self.items.last().map_or(0.0, |item| item.weight);
        if worst > self.min_weight {
            self.min_weight = worst;
            return true;
        }
        false
    }

    /// The items ranked `first` onwards, best first.
    pub fn finish(mut self, first: usize) -> Vec<MSetItem> {
        self.sort();
        self.items.truncate(self.capacity);
        self.items.into_iter().skip(first).collect()
    }
}

/// What the collapser decided for a new document.
#[derive(Debug, PartialEq)]
pub enum CollapseOutcome {
    /// The document has no collapse key.
    NoKey,
    /// Kept; `Some(docid)` was displaced to make room.
    Kept(Option<DocId>),
    /// Dropped in favour of documents already kept.
    Rejected,
}

#[derive(Debug, Default)]
struct KeyGroup {
    kept: Vec<MSetItem>,
    dropped: DocCount,
}

/// Keeps at most `collapse_max` documents per collapse key.
#[derive(Debug)]
pub struct Collapser {
    order: ItemOrder,
    collapse_max: usize,
    groups: AHashMap<String, KeyGroup>,
    collapsed_out: DocCount,
}

impl Collapser {
    pub fn new(order: ItemOrder, collapse_max: DocCount) -> Self {
        Collapser {
            order,
            collapse_max: collapse_max.max(1) as usize,
            groups: AHashMap::new(),
            collapsed_out: 0,
        }
    }

    /// Documents dropped so far because of collapsing.
    pub fn collapsed_out(&self) -> DocCount {
        self.collapsed_out
    }

    /// Number of documents dropped that shared `key`.
    pub fn dropped_for(&self, key: &str) -> DocCount {
        self.groups.get(key).map_or(0, |g| g.dropped)
    }

    pub fn process(&mut self, item: &MSetItem) -> CollapseOutcome {
        if item.collapse_key.is_empty() {
            return CollapseOutcome::NoKey;
        }
        let order = self.order;
        let group = self.groups.entry(item.collapse_key.clone()).or_default();
        if group.kept.len() < self.collapse_max {
            group.kept.push(item.clone());
            return CollapseOutcome::Kept(None);
        }
        let worst = group
            .kept
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| order.compare(a, b))
            .map(|(i, _)| i);
        group.dropped += 1;
        self.collapsed_out += 1;
        match worst {
            Some(i) if order.compare(item, &group.kept[i]) == Ordering::Less => {
                let displaced = std::mem::replace(&mut group.kept[i], item.clone());
                CollapseOutcome::Kept(Some(displaced.docid))
            }
            _ => CollapseOutcome::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::options::MatchOptions;

    fn order() -> ItemOrder {
        ItemOrder::new(&MatchOptions::default())
    }

    fn item(docid: DocId, weight: f64, key: &str) -> MSetItem {
        MSetItem::new(docid, weight, Vec::new(), key.to_string())
    }

    #[test]
    fn test_proto_mset_keeps_best() {
        let mut proto = ProtoMSet::new(order(), 2);
        assert!(!proto.push(item(1, 1.0, "")));
        assert!(proto.push(item(2, 3.0, "")));
        assert!(proto.is_full());
        assert_eq!(proto.min_weight(), 1.0);
        for did in 3..40 {
            proto.push(item(did, f64::from(did % 5), ""));
        }
        let top = proto.finish(0);
        assert_eq!(top.iter().map(|i| i.docid).collect::<Vec<_>>(), vec![4, 9]);
    }

    #[test]
    fn test_proto_mset_offset() {
        let mut proto = ProtoMSet::new(order(), 3);
        for did in 1..=5 {
            proto.push(item(did, f64::from(did), ""));
        }
        let rest = proto.finish(1);
        assert_eq!(rest.iter().map(|i| i.docid).collect::<Vec<_>>(), vec![4, 3]);
    }

    #[test]
    fn test_collapser() {
        let mut collapser = Collapser::new(order(), 1);
        assert_eq!(collapser.process(&item(1, 1.0, "")), CollapseOutcome::NoKey);
        assert_eq!(collapser.process(&item(2, 1.0, "k")), CollapseOutcome::Kept(None));
        assert_eq!(collapser.process(&item(3, 0.5, "k")), CollapseOutcome::Rejected);
        assert_eq!(collapser.process(&item(4, 2.0, "k")), CollapseOutcome::Kept(Some(2)));
        assert_eq!(collapser.collapsed_out(), 2);
        assert_eq!(collapser.dropped_for("k"), 2);
        assert_eq!(collapser.dropped_for("other"), 0);
    }
}
