//! Synonym: a union weighted as one virtual term.

use std::sync::Arc;

use crate::database::Shard;
use crate::error::Result;
use crate::postlist::{PostList, PostingList};
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::Estimates;
use crate::weight::Weight;

/// Wraps an unweighted union and scores each document with a single weight
/// initialised from the combined statistics of the subqueries, using the
/// summed wdf of the children that match.
#[derive(Debug)]
pub struct SynonymPostList {
    shard: Arc<dyn Shard>,
    inner: Box<PostList>,
    weight: Box<dyn Weight>,
    maxweight: f64,
}

impl SynonymPostList {
    pub fn new(shard: Arc<dyn Shard>, inner: PostList, weight: Box<dyn Weight>) -> Self {
        let maxweight = weight.maxpart();
        SynonymPostList {
            shard,
            inner: Box::new(inner),
            weight,
            maxweight,
        }
    }
}

impl PostingList for SynonymPostList {
    fn estimates(&self) -> Estimates {
        self.inner.estimates()
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.maxweight
    }

    fn docid(&self) -> DocId {
        self.inner.docid()
    }

    fn at_end(&self) -> bool {
        self.inner.at_end()
    }

    fn weight(&self) -> Result<f64> {
        let did = self.inner.docid();
        let doclen = self.shard.doc_length(did)?;
        let uniq = self.shard.unique_terms(did)?;
        // The summed wdf can't exceed the document length.
        let wdf = self.inner.wdf().min(doclen);
        let wdf_doc_max = if self.weight.needs_wdf_doc_max() {
            // The synonym counts as one term of the document.
            self.shard.wdf_doc_max(did)?.max(wdf)
        } else {
            0
        };
        Ok(self.weight.sumpart(wdf, doclen, uniq, wdf_doc_max))
    }

    fn wdf(&self) -> TermCount {
        self.inner.wdf()
    }

    fn next(&mut self, _w_min: f64) -> Result<()> {
        self.inner.next(0.0)
    }

    fn skip_to(&mut self, did: DocId, _w_min: f64) -> Result<()> {
        self.inner.skip_to(did, 0.0)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.inner.positions()
    }

    fn description(&self) -> String {
        format!("SYNONYM{}", self.inner.description())
    }
}
