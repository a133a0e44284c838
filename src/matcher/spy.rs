//! Observers that see every accepted candidate.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::{LexmatchError, Result};
use crate::matcher::decider::Candidate;
use crate::types::{DocCount, ValueSlot};

/// Sees each candidate that passed the cutoffs and the decider, whether or
/// not it ends up in the returned slice.
pub trait MatchSpy: Debug + Send {
    fn name(&self) -> &'static str;

    fn observe(&mut self, candidate: &Candidate<'_>, weight: f64) -> Result<()>;

    fn description(&self) -> String {
        self.name().to_string()
    }
}

/// Counts how often each value of a slot occurs among candidates.
#[derive(Debug, Clone, Default)]
pub struct ValueCountMatchSpy {
    slot: ValueSlot,
    counts: BTreeMap<String, DocCount>,
    total: DocCount,
}

impl ValueCountMatchSpy {
    pub fn new(slot: ValueSlot) -> Self {
        ValueCountMatchSpy {
            slot,
            ..Self::default()
        }
    }

    /// Parameters: the slot number.
    pub fn from_parameters(params: &str) -> Result<Self> {
        let slot = params.trim().parse::<ValueSlot>().map_err(|_| {
            LexmatchError::invalid_argument(format!("value_count: bad slot '{params}'"))
        })?;
        Ok(ValueCountMatchSpy::new(slot))
    }

    pub fn slot(&self) -> ValueSlot {
        self.slot
    }

    /// Number of documents observed.
    pub fn total(&self) -> DocCount {
        self.total
    }

    pub fn count(&self, value: &str) -> DocCount {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// All non-empty values with their counts, in value order.
    pub fn values(&self) -> impl Iterator<Item = (&str, DocCount)> {
        self.counts.iter().map(|(v, c)| (v.as_str(), *c))
    }

    /// The `n` most frequent values; ties go to the smaller value.
    pub fn top_values(&self, n: usize) -> Vec<(String, DocCount)> {
        let mut values: Vec<(String, DocCount)> =
            self.counts.iter().map(|(v, c)| (v.clone(), *c)).collect();
        values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        values.truncate(n);
        values
    }
}

impl MatchSpy for ValueCountMatchSpy {
    fn name(&self) -> &'static str {
        "value_count"
    }

    fn observe(&mut self, candidate: &Candidate<'_>, _weight: f64) -> Result<()> {
        self.total += 1;
        let value = candidate.value(self.slot)?;
        if !value.is_empty() {
            *self.counts.entry(value).or_default() += 1;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("ValueCountMatchSpy({})", self.slot)
    }
}

/// Counts, for each registered prefix, the terms with that prefix among
/// candidates. Only the suffix after the prefix is kept.
///
/// Reading term lists costs more than reading a value, so prefer a
/// [`ValueCountMatchSpy`] when the facet can be stored in a slot.
#[derive(Debug, Clone, Default)]
pub struct TermCountMatchSpy {
    terms: BTreeMap<String, BTreeMap<String, DocCount>>,
    documents_seen: DocCount,
    terms_seen: u64,
}

impl TermCountMatchSpy {
    pub fn new() -> Self {
        TermCountMatchSpy::default()
    }

    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        let mut spy = TermCountMatchSpy::new();
        spy.add_prefix(prefix);
        spy
    }

    /// Parameters: whitespace-separated prefixes.
    pub fn from_parameters(params: &str) -> Result<Self> {
        let mut spy = TermCountMatchSpy::new();
        for prefix in params.split_whitespace() {
            spy.add_prefix(prefix);
        }
        if spy.terms.is_empty() {
            return Err(LexmatchError::invalid_argument("term_count: no prefix given"));
        }
        Ok(spy)
    }

    /// Count terms starting with `prefix` too. Overlapping prefixes count a
    /// term once for each.
    pub fn add_prefix<S: Into<String>>(&mut self, prefix: S) {
        self.terms.entry(prefix.into()).or_default();
    }

    /// Suffixes seen after `prefix` with their document counts, or `None`
    /// if the prefix was never added.
    pub fn terms(&self, prefix: &str) -> Option<&BTreeMap<String, DocCount>> {
        self.terms.get(prefix)
    }

    pub fn documents_seen(&self) -> DocCount {
        self.documents_seen
    }

    /// Term occurrences tallied over every prefix.
    pub fn terms_seen(&self) -> u64 {
        self.terms_seen
    }

    /// The `n` most frequent suffixes of `prefix`; ties go to the smaller
    /// suffix.
    pub fn top_terms(&self, prefix: &str, n: usize) -> Vec<(String, DocCount)> {
        let Some(counts) = self.terms.get(prefix) else {
            return Vec::new();
        };
        let mut terms: Vec<(String, DocCount)> =
            counts.iter().map(|(t, c)| (t.clone(), *c)).collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(n);
        terms
    }
}

impl MatchSpy for TermCountMatchSpy {
    fn name(&self) -> &'static str {
        "term_count"
    }

    fn observe(&mut self, candidate: &Candidate<'_>, _weight: f64) -> Result<()> {
        self.documents_seen += 1;
        for (term, _) in candidate.term_list()? {
            for (prefix, counts) in self.terms.iter_mut() {
                if let Some(suffix) = term.strip_prefix(prefix.as_str()) {
                    *counts.entry(suffix.to_string()).or_default() += 1;
                    self.terms_seen += 1;
                }
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        let prefixes: Vec<&str> = self.terms.keys().map(String::as_str).collect();
        format!("TermCountMatchSpy({})", prefixes.join(" "))
    }
}
