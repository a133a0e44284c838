//! Term leaves and the empty list.

use std::sync::Arc;

use crate::database::{Shard, TermPostings};
use crate::error::Result;
use crate::postlist::PostingList;
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::Estimates;
use crate::weight::Weight;

/// Matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPostList;

impl PostingList for EmptyPostList {
    fn estimates(&self) -> Estimates {
        Estimates::default()
    }

    fn maxweight(&self) -> f64 {
        0.0
    }

    fn recalc_maxweight(&mut self) -> f64 {
        0.0
    }

    fn docid(&self) -> DocId {
        0
    }

    fn at_end(&self) -> bool {
        true
    }

    fn weight(&self) -> Result<f64> {
        Ok(0.0)
    }

    fn wdf(&self) -> TermCount {
        0
    }

    fn skip_to(&mut self, _did: DocId, _w_min: f64) -> Result<()> {
        Ok(())
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        Ok(Vec::new())
    }

    fn description(&self) -> String {
        "Empty".to_string()
    }
}

/// The postings of one term in one shard, optionally weighted.
///
/// The empty term iterates every document, with wdf equal to the document
/// length.
#[derive(Debug)]
pub struct LeafPostList {
    shard: Arc<dyn Shard>,
    term: String,
    postings: Box<dyn TermPostings>,
    weight: Option<Box<dyn Weight>>,
    maxweight: f64,
    termfreq: u32,
    started: bool,
}

impl LeafPostList {
    /// Open the postings for `term`. A `None` weight makes the leaf
    /// boolean: it matches but contributes nothing.
    pub fn open(shard: Arc<dyn Shard>, term: &str, weight: Option<Box<dyn Weight>>) -> Result<Self> {
        let postings = shard.postings(term)?;
        let termfreq = postings.termfreq();
        let maxweight = weight.as_ref().map_or(0.0, |w| w.maxpart());
        Ok(LeafPostList {
            shard,
            term: term.to_string(),
            postings,
            weight,
            maxweight,
            termfreq,
            started: false,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

impl PostingList for LeafPostList {
    fn estimates(&self) -> Estimates {
        Estimates::exact(self.termfreq)
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.maxweight
    }

    fn docid(&self) -> DocId {
        if self.started { self.postings.docid() } else { 0 }
    }

    fn at_end(&self) -> bool {
        self.started && self.postings.at_end()
    }

    fn weight(&self) -> Result<f64> {
        let Some(weight) = &self.weight else {
            return Ok(0.0);
        };
        let did = self.postings.docid();
        let doclen = self.shard.doc_length(did)?;
        let uniq = self.shard.unique_terms(did)?;
        let wdf_doc_max = if weight.needs_wdf_doc_max() {
            self.shard.wdf_doc_max(did)?
        } else {
            0
        };
        Ok(weight.sumpart(self.postings.wdf(), doclen, uniq, wdf_doc_max))
    }

    fn wdf(&self) -> TermCount {
        self.postings.wdf()
    }

    fn next(&mut self, _w_min: f64) -> Result<()> {
        self.started = true;
        self.postings.next()
    }

    fn skip_to(&mut self, did: DocId, _w_min: f64) -> Result<()> {
        if self.started && (self.at_end() || self.postings.docid() >= did) {
            return Ok(());
        }
        self.started = true;
        self.postings.skip_to(did)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.shard.positions(self.postings.docid(), &self.term)
    }

    fn description(&self) -> String {
        if self.term.is_empty() {
            "AllDocs".to_string()
        } else {
            format!("Term({})", self.term)
        }
    }
}
