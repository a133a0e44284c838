//! Adds the term-independent part of the weight.

use std::sync::Arc;

use crate::database::Shard;
use crate::error::Result;
use crate::postlist::{PostList, PostingList};
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::Estimates;
use crate::weight::Weight;

/// Wraps the root of a shard's tree and adds `sumextra`, times `scale`, for
/// every document it returns.
#[derive(Debug)]
pub struct ExtraPostList {
    shard: Arc<dyn Shard>,
    inner: Box<PostList>,
    extra: Box<dyn Weight>,
    scale: f64,
    maxextra: f64,
}

impl ExtraPostList {
    pub fn new(shard: Arc<dyn Shard>, inner: PostList, extra: Box<dyn Weight>, scale: f64) -> Self {
        let maxextra = extra.maxextra() * scale;
        ExtraPostList {
            shard,
            inner: Box::new(inner),
            extra,
            scale,
            maxextra,
        }
    }
}

impl PostingList for ExtraPostList {
    fn estimates(&self) -> Estimates {
        self.inner.estimates()
    }

    fn maxweight(&self) -> f64 {
        self.inner.maxweight() + self.maxextra
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.inner.recalc_maxweight() + self.maxextra
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
        Ok(self.inner.weight()? + self.extra.sumextra(doclen, uniq) * self.scale)
    }

    fn wdf(&self) -> TermCount {
        self.inner.wdf()
    }

    fn next(&mut self, w_min: f64) -> Result<()> {
        self.inner.next(w_min - self.maxextra)
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        self.inner.skip_to(did, w_min - self.maxextra)
    }

    fn check(&mut self, did: DocId, w_min: f64) -> Result<bool> {
        self.inner.check(did, w_min - self.maxextra)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.inner.positions()
    }

    fn description(&self) -> String {
        format!("Extra({}, {})", self.inner.description(), self.extra.description())
    }
}
