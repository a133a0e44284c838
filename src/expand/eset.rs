//! Expansion results.

use serde::{Deserialize, Serialize};

use crate::types::TermCount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ESetItem {
    pub term: String,
    pub weight: f64,
}

/// Suggested expansion terms, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ESet {
    pub(crate) items: Vec<ESetItem>,
    pub(crate) ebound: TermCount,
}

impl ESet {
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Upper bound on the number of terms that qualified before the set was
    /// cut down to size.
    pub fn ebound(&self) -> TermCount {
        self.ebound
    }

    pub fn get(&self, index: usize) -> Option<&ESetItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ESetItem> {
        self.items.iter()
    }

    pub fn terms(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.term.as_str()).collect()
    }

    pub fn description(&self) -> String {
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|item| format!("{}:{:.4}", item.term, item.weight))
            .collect();
        format!("ESet(ebound={}, [{}])", self.ebound, parts.join(", "))
    }
}

impl<'a> IntoIterator for &'a ESet {
    type Item = &'a ESetItem;
    type IntoIter = std::slice::Iter<'a, ESetItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
