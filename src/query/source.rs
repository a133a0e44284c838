//! Caller-supplied posting lists.
//!
//! A [`PostingSource`] can stand anywhere a term can in a query. It walks
//! the local docids of one shard and may assign each document a weight.
//! Sources used against a sharded database, or more than once in a query,
//! must support [`PostingSource::clone_box`], since every leaf needs its
//! own cursor.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::{Shard, TermPostings, ValueCursor};
use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, DocId, ValueSlot};
use crate::util::sortable::sortable_unserialise;

/// A pluggable supplier of postings.
///
/// Cursor methods follow the posting-list protocol: the source starts
/// before its first document, `next` and `skip_to` move forward only, and
/// `docid`/`weight` are only called while positioned and not at the end.
/// The `min_wt` hints let a source skip documents that cannot reach that
/// weight; ignoring them is always correct.
pub trait PostingSource: Debug + Send {
    /// Registry name used when describing a query, or empty if the source
    /// cannot be rebuilt from a description.
    fn name(&self) -> &str {
        ""
    }

    /// Parameters understood by the registry factory for [`Self::name`].
    fn parameters(&self) -> String {
        String::new()
    }

    /// A fresh copy for another shard, or `None` if copying is unsupported.
    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        None
    }

    /// Prepare to iterate over `shard`.
    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()>;

    fn termfreq_min(&self) -> DocCount;
    fn termfreq_est(&self) -> DocCount;
    fn termfreq_max(&self) -> DocCount;

    /// Upper bound on [`Self::weight`] for the remaining documents. It may
    /// decrease as iteration proceeds but must never increase.
    fn maxweight(&self) -> f64 {
        0.0
    }

    fn next(&mut self, min_wt: f64) -> Result<()>;

    fn skip_to(&mut self, did: DocId, min_wt: f64) -> Result<()> {
        while !self.at_end() && self.docid() < did {
            self.next(min_wt)?;
        }
        Ok(())
    }

    /// Position on `did` if it matches, returning whether it does.
    fn check(&mut self, did: DocId, min_wt: f64) -> Result<bool> {
        self.skip_to(did, min_wt)?;
        Ok(!self.at_end() && self.docid() == did)
    }

    fn at_end(&self) -> bool;
    fn docid(&self) -> DocId;

    fn weight(&self) -> Result<f64> {
        Ok(0.0)
    }

    fn description(&self) -> String {
        format!("PostingSource({})", self.name())
    }
}

/// Shared cursor over the documents with a value in one slot.
#[derive(Debug, Default)]
pub(crate) struct SlotCursor {
    cursor: Option<Box<dyn ValueCursor>>,
    pub(crate) value_freq: DocCount,
    pub(crate) started: bool,
}

impl SlotCursor {
    pub(crate) fn reset(&mut self, shard: &Arc<dyn Shard>, slot: ValueSlot) -> Result<()> {
        self.cursor = Some(shard.values(slot)?);
        self.value_freq = shard.value_freq(slot)?;
        self.started = false;
        Ok(())
    }

    pub(crate) fn next(&mut self) -> Result<()> {
        self.started = true;
        match self.cursor.as_mut() {
            Some(c) => c.next(),
            None => Ok(()),
        }
    }

    pub(crate) fn skip_to(&mut self, did: DocId) -> Result<()> {
        self.started = true;
        match self.cursor.as_mut() {
            Some(c) => c.skip_to(did),
            None => Ok(()),
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.cursor.as_ref().is_none_or(|c| c.at_end())
    }

    pub(crate) fn docid(&self) -> DocId {
        self.cursor.as_ref().map_or(0, |c| c.docid())
    }

    pub(crate) fn value(&self) -> &str {
        self.cursor.as_ref().map_or("", |c| c.value())
    }
}

/// Highest decoded value stored in `slot`.
fn slot_max(shard: &Arc<dyn Shard>, slot: ValueSlot) -> Result<f64> {
    if let Some((_, hi)) = shard.value_bounds(slot)? {
        if hi.is_empty() {
            return Ok(0.0);
        }
        return Ok(sortable_unserialise(&hi).max(0.0));
    }
    let mut cursor = shard.values(slot)?;
    let mut max: f64 = 0.0;
    cursor.next()?;
    while !cursor.at_end() {
        max = max.max(sortable_unserialise(cursor.value()));
        cursor.next()?;
    }
    Ok(max)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotParams {
    slot: ValueSlot,
}

/// Weights each document by the number stored in a value slot.
///
/// Values are decoded with [`sortable_unserialise`]; negative numbers
/// weigh 0.
#[derive(Debug)]
pub struct ValueWeightPostingSource {
    slot: ValueSlot,
    values: SlotCursor,
    maxweight: f64,
}

impl ValueWeightPostingSource {
    pub fn new(slot: ValueSlot) -> Self {
        ValueWeightPostingSource {
            slot,
            values: SlotCursor::default(),
            maxweight: 0.0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let p: SlotParams = parse_params(params)?;
        Ok(ValueWeightPostingSource::new(p.slot))
    }
}

impl PostingSource for ValueWeightPostingSource {
    fn name(&self) -> &str {
        "value_weight"
    }

    fn parameters(&self) -> String {
        to_params(&SlotParams { slot: self.slot })
    }

    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        Some(Box::new(ValueWeightPostingSource::new(self.slot)))
    }

    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.values.reset(shard, self.slot)?;
        self.maxweight = slot_max(shard, self.slot)?;
        Ok(())
    }

    fn termfreq_min(&self) -> DocCount {
        self.values.value_freq
    }

    fn termfreq_est(&self) -> DocCount {
        self.values.value_freq
    }

    fn termfreq_max(&self) -> DocCount {
        self.values.value_freq
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn next(&mut self, _min_wt: f64) -> Result<()> {
        self.values.next()
    }

    fn skip_to(&mut self, did: DocId, _min_wt: f64) -> Result<()> {
        self.values.skip_to(did)
    }

    fn at_end(&self) -> bool {
        self.values.started && self.values.at_end()
    }

    fn docid(&self) -> DocId {
        self.values.docid()
    }

    fn weight(&self) -> Result<f64> {
        Ok(sortable_unserialise(self.values.value()).max(0.0))
    }

    fn description(&self) -> String {
        format!("ValueWeightPostingSource(slot={})", self.slot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValueMapParams {
    slot: ValueSlot,
    #[serde(default)]
    default_weight: f64,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
}

/// Looks each document's value up in a table of weights.
#[derive(Debug)]
pub struct ValueMapPostingSource {
    params: ValueMapParams,
    values: SlotCursor,
}

impl ValueMapPostingSource {
    pub fn new(slot: ValueSlot) -> Self {
        ValueMapPostingSource {
            params: ValueMapParams {
                slot,
                default_weight: 0.0,
                weights: BTreeMap::new(),
            },
            values: SlotCursor::default(),
        }
    }

    /// Map `value` to `weight`. Negative weights are stored as 0.
    pub fn add_mapping<S: Into<String>>(&mut self, value: S, weight: f64) {
        self.params.weights.insert(value.into(), weight.max(0.0));
    }

    pub fn with_mapping<S: Into<String>>(mut self, value: S, weight: f64) -> Self {
        self.add_mapping(value, weight);
        self
    }

    /// Weight for values with no mapping.
    pub fn with_default_weight(mut self, weight: f64) -> Self {
        self.params.default_weight = weight.max(0.0);
        self
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let p: ValueMapParams = parse_params(params)?;
        let mut source = ValueMapPostingSource::new(p.slot).with_default_weight(p.default_weight);
        for (value, weight) in p.weights {
            source.add_mapping(value, weight);
        }
        Ok(source)
    }
}

impl PostingSource for ValueMapPostingSource {
    fn name(&self) -> &str {
        "value_map"
    }

    fn parameters(&self) -> String {
        to_params(&self.params)
    }

    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        Some(Box::new(ValueMapPostingSource {
            params: self.params.clone(),
            values: SlotCursor::default(),
        }))
    }

    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.values.reset(shard, self.params.slot)
    }

    fn termfreq_min(&self) -> DocCount {
        self.values.value_freq
    }

    fn termfreq_est(&self) -> DocCount {
        self.values.value_freq
    }

    fn termfreq_max(&self) -> DocCount {
        self.values.value_freq
    }

    fn maxweight(&self) -> f64 {
        self.params
            .weights
            .values()
            .copied()
            .fold(self.params.default_weight, f64::max)
    }

    fn next(&mut self, _min_wt: f64) -> Result<()> {
        self.values.next()
    }

    fn skip_to(&mut self, did: DocId, _min_wt: f64) -> Result<()> {
        self.values.skip_to(did)
    }

    fn at_end(&self) -> bool {
        self.values.started && self.values.at_end()
    }

    fn docid(&self) -> DocId {
        self.values.docid()
    }

    fn weight(&self) -> Result<f64> {
        Ok(self
            .params
            .weights
            .get(self.values.value())
            .copied()
            .unwrap_or(self.params.default_weight))
    }

    fn description(&self) -> String {
        format!("ValueMapPostingSource(slot={})", self.params.slot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FixedWeightParams {
    weight: f64,
}

/// Matches every document with the same weight.
#[derive(Debug)]
pub struct FixedWeightPostingSource {
    weight: f64,
    postings: Option<Box<dyn TermPostings>>,
    doc_count: DocCount,
    started: bool,
}

impl FixedWeightPostingSource {
    /// Negative weights are treated as 0.
    pub fn new(weight: f64) -> Self {
        FixedWeightPostingSource {
            weight: weight.max(0.0),
            postings: None,
            doc_count: 0,
            started: false,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let p: FixedWeightParams = parse_params(params)?;
        Ok(FixedWeightPostingSource::new(p.weight))
    }
}

impl PostingSource for FixedWeightPostingSource {
    fn name(&self) -> &str {
        "fixed_weight"
    }

    fn parameters(&self) -> String {
        to_params(&FixedWeightParams {
            weight: self.weight,
        })
    }

    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        Some(Box::new(FixedWeightPostingSource::new(self.weight)))
    }

    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.postings = Some(shard.postings("")?);
        self.doc_count = shard.doc_count()?;
        self.started = false;
        Ok(())
    }

    fn termfreq_min(&self) -> DocCount {
        self.doc_count
    }

    fn termfreq_est(&self) -> DocCount {
        self.doc_count
    }

    fn termfreq_max(&self) -> DocCount {
        self.doc_count
    }

    fn maxweight(&self) -> f64 {
        self.weight
    }

    fn next(&mut self, _min_wt: f64) -> Result<()> {
        self.started = true;
        match self.postings.as_mut() {
            Some(p) => p.next(),
            None => Ok(()),
        }
    }

    fn skip_to(&mut self, did: DocId, _min_wt: f64) -> Result<()> {
        self.started = true;
        match self.postings.as_mut() {
            Some(p) => p.skip_to(did),
            None => Ok(()),
        }
    }

    fn at_end(&self) -> bool {
        self.started && self.postings.as_ref().is_none_or(|p| p.at_end())
    }

    fn docid(&self) -> DocId {
        self.postings.as_ref().map_or(0, |p| p.docid())
    }

    fn weight(&self) -> Result<f64> {
        Ok(self.weight)
    }

    fn description(&self) -> String {
        format!("FixedWeightPostingSource({})", self.weight)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecreasingParams {
    slot: ValueSlot,
    #[serde(default = "default_range_start")]
    range_start: DocId,
    #[serde(default)]
    range_end: DocId,
}

fn default_range_start() -> DocId {
    1
}

/// A value-weight source for shards whose values do not increase with
/// docid over `[range_start, range_end]` (or from `range_start` to the end
/// of the shard when `range_end` is 0).
///
/// Inside that range the current value bounds every later one, so the
/// reported maxweight tightens as iteration proceeds, and once a value
/// drops below the caller's minimum the rest of the range is skipped.
#[derive(Debug)]
pub struct DecreasingValueWeightPostingSource {
    params: DecreasingParams,
    values: SlotCursor,
    maxweight: f64,
    last_docid: DocId,
}

impl DecreasingValueWeightPostingSource {
    pub fn new(slot: ValueSlot, range_start: DocId, range_end: DocId) -> Self {
        DecreasingValueWeightPostingSource {
            params: DecreasingParams {
                slot,
                range_start: range_start.max(1),
                range_end,
            },
            values: SlotCursor::default(),
            maxweight: 0.0,
            last_docid: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let p: DecreasingParams = parse_params(params)?;
        Ok(DecreasingValueWeightPostingSource::new(
            p.slot,
            p.range_start,
            p.range_end,
        ))
    }

    fn range_end(&self) -> DocId {
        if self.params.range_end == 0 {
            self.last_docid
        } else {
            self.params.range_end
        }
    }

    fn in_range(&self, did: DocId) -> bool {
        did >= self.params.range_start && did <= self.range_end()
    }

    fn current(&self) -> f64 {
        sortable_unserialise(self.values.value()).max(0.0)
    }

    /// Tighten the bound and skip the tail of the range when it cannot
    /// reach `min_wt`.
    fn settle(&mut self, min_wt: f64) -> Result<()> {
        while !self.values.at_end() && self.in_range(self.values.docid()) {
            let w = self.current();
            // Only safe when the range runs to the end of the shard.
            if self.range_end() == self.last_docid {
                self.maxweight = self.maxweight.min(w);
            }
            if w >= min_wt {
                break;
            }
            let after = self.range_end().saturating_add(1);
            self.values.skip_to(after)?;
        }
        Ok(())
    }
}

impl PostingSource for DecreasingValueWeightPostingSource {
    fn name(&self) -> &str {
        "decreasing_value_weight"
    }

    fn parameters(&self) -> String {
        to_params(&self.params)
    }

    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        Some(Box::new(DecreasingValueWeightPostingSource::new(
            self.params.slot,
            self.params.range_start,
            self.params.range_end,
        )))
    }

    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.values.reset(shard, self.params.slot)?;
        self.maxweight = slot_max(shard, self.params.slot)?;
        self.last_docid = shard.last_docid()?;
        Ok(())
    }

    fn termfreq_min(&self) -> DocCount {
        0
    }

    fn termfreq_est(&self) -> DocCount {
        self.values.value_freq
    }

    fn termfreq_max(&self) -> DocCount {
        self.values.value_freq
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn next(&mut self, min_wt: f64) -> Result<()> {
        self.values.next()?;
        self.settle(min_wt)
    }

    fn skip_to(&mut self, did: DocId, min_wt: f64) -> Result<()> {
        self.values.skip_to(did)?;
        self.settle(min_wt)
    }

    fn at_end(&self) -> bool {
        self.values.started && self.values.at_end()
    }

    fn docid(&self) -> DocId {
        self.values.docid()
    }

    fn weight(&self) -> Result<f64> {
        Ok(self.current())
    }

    fn description(&self) -> String {
        format!(
            "DecreasingValueWeightPostingSource(slot={}, {}..{})",
            self.params.slot, self.params.range_start, self.params.range_end
        )
    }
}

pub(crate) fn parse_params<T: for<'de> Deserialize<'de>>(params: &str) -> Result<T> {
    serde_json::from_str(params)
        .map_err(|e| LexmatchError::serialisation(format!("bad posting source parameters: {e}")))
}

pub(crate) fn to_params<T: Serialize>(params: &T) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Document, MemoryShard};
    use crate::util::sortable::sortable_serialise;

    fn shard() -> Arc<dyn Shard> {
        let docs = [5.0, 3.0, 2.0, 1.0].map(|v| {
            Document::new()
                .with_term("x", 1)
                .with_value(0, sortable_serialise(v))
        });
        Arc::new(
            MemoryShard::builder()
                .add_documents(docs)
                .add_document(Document::new().with_term("y", 1))
                .build(),
        )
    }

    fn drain(source: &mut dyn PostingSource, min_wt: f64) -> Result<Vec<(DocId, f64)>> {
        let mut out = Vec::new();
        source.next(min_wt)?;
        while !source.at_end() {
            out.push((source.docid(), source.weight()?));
            source.next(min_wt)?;
        }
        Ok(out)
    }

    #[test]
    fn test_value_weight() -> Result<()> {
        let mut source = ValueWeightPostingSource::new(0);
        source.reset(&shard())?;
        assert_eq!(source.termfreq_est(), 4);
        assert_eq!(source.maxweight(), 5.0);
        let got = drain(&mut source, 0.0)?;
        assert_eq!(got, vec![(1, 5.0), (2, 3.0), (3, 2.0), (4, 1.0)]);
        Ok(())
    }

    #[test]
    fn test_value_map() -> Result<()> {
        let mut source = ValueMapPostingSource::new(0)
            .with_mapping(sortable_serialise(3.0), 10.0)
            .with_default_weight(0.5);
        source.reset(&shard())?;
        assert_eq!(source.maxweight(), 10.0);
        let got = drain(&mut source, 0.0)?;
        assert_eq!(got[1], (2, 10.0));
        assert_eq!(got[0], (1, 0.5));
        Ok(())
    }

    #[test]
    fn test_fixed_weight_matches_all() -> Result<()> {
        let mut source = FixedWeightPostingSource::new(2.0);
        source.reset(&shard())?;
        assert!(source.check(5, 0.0)?);
        assert_eq!(source.weight()?, 2.0);
        source.next(0.0)?;
        assert!(source.at_end());
        Ok(())
    }

    #[test]
    fn test_decreasing_skips_low_tail() -> Result<()> {
        let mut source = DecreasingValueWeightPostingSource::new(0, 1, 0);
        source.reset(&shard())?;
        assert_eq!(source.maxweight(), 5.0);
        source.next(0.0)?;
        assert_eq!(source.docid(), 1);
        source.next(2.5)?;
        assert_eq!((source.docid(), source.weight()?), (2, 3.0));
        assert_eq!(source.maxweight(), 3.0);
        source.next(2.5)?;
        assert!(source.at_end());
        Ok(())
    }

    #[test]
    fn test_parameters_rebuild() -> Result<()> {
        let source = ValueMapPostingSource::new(3).with_mapping("a", 1.5);
        let again = ValueMapPostingSource::from_parameters(&source.parameters())?;
        assert_eq!(again.parameters(), source.parameters());
        assert!(FixedWeightPostingSource::from_parameters("not json").is_err());
        Ok(())
    }
}
