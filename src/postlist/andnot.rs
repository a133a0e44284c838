//! Set difference.

use crate::error::Result;
use crate::postlist::{PostList, PostingList};
use crate::types::{DocCount, DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, and_not_estimates};

/// Documents matching the left child but not the right. Only the left
/// child contributes weight, and the right is only ever checked with
/// `check`.
#[derive(Debug)]
pub struct AndNotPostList {
    left: Box<PostList>,
    right: Box<PostList>,
    estimates: Estimates,
    did: DocId,
    at_end: bool,
}

impl AndNotPostList {
    pub fn new(left: PostList, right: PostList, db_size: DocCount) -> Self {
        let estimates = and_not_estimates(left.estimates(), right.estimates(), db_size);
        AndNotPostList {
            left: Box::new(left),
            right: Box::new(right),
            estimates,
            did: 0,
            at_end: false,
        }
    }
}

impl PostingList for AndNotPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.left.maxweight()
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.left.recalc_maxweight()
    }

    fn docid(&self) -> DocId {
        self.did
    }

    fn at_end(&self) -> bool {
        self.at_end
    }

    fn weight(&self) -> Result<f64> {
        self.left.weight()
    }

    fn wdf(&self) -> TermCount {
        self.left.wdf()
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.at_end || did <= self.did {
            return Ok(());
        }
        let mut target = did;
        loop {
            self.left.skip_to(target, w_min)?;
            if self.left.at_end() {
                self.at_end = true;
                return Ok(());
            }
            let candidate = self.left.docid();
            if !self.right.check(candidate, 0.0)? {
                self.did = candidate;
                return Ok(());
            }
            target = candidate + 1;
        }
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.left.positions()
    }

    fn description(&self) -> String {
        format!("({} AND_NOT {})", self.left.description(), self.right.description())
    }
}
