//! Disjunction weighted by the best child.

use crate::error::Result;
use crate::postlist::{PostList, PostingList, is_on, min_docid, union_positions};
use crate::types::{DocCount, DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, or_estimates};

/// Documents matching any child, weighted by the highest child weight.
#[derive(Debug)]
pub struct MaxPostList {
    children: Vec<PostList>,
    estimates: Estimates,
    did: DocId,
    at_end: bool,
}

impl MaxPostList {
    pub fn new(children: Vec<PostList>, db_size: DocCount) -> Self {
        let estimates = or_estimates(
            &children.iter().map(|pl| pl.estimates()).collect::<Vec<_>>(),
            db_size,
        );
        MaxPostList {
            children,
            estimates,
            did: 0,
            at_end: false,
        }
    }
}

impl PostingList for MaxPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.children.iter().map(|pl| pl.maxweight()).fold(0.0, f64::max)
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.children
            .iter_mut()
            .map(|pl| pl.recalc_maxweight())
            .fold(0.0, f64::max)
    }

    fn docid(&self) -> DocId {
        self.did
    }

    fn at_end(&self) -> bool {
        self.at_end
    }

    fn weight(&self) -> Result<f64> {
        let mut best: f64 = 0.0;
        for child in self.children.iter().filter(|pl| is_on(pl, self.did)) {
            best = best.max(child.weight()?);
        }
        Ok(best)
    }

    fn wdf(&self) -> TermCount {
        self.children
            .iter()
            .filter(|pl| is_on(pl, self.did))
            .map(|pl| pl.wdf())
            .sum()
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.at_end || did <= self.did {
            return Ok(());
        }
        for child in &mut self.children {
            if !child.at_end() && child.docid() < did {
                child.skip_to(did, w_min)?;
            }
        }
        match min_docid(&self.children) {
            Some(d) => self.did = d,
            None => self.at_end = true,
        }
        Ok(())
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        union_positions(&self.children, self.did)
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|pl| pl.description()).collect();
        format!("({})", parts.join(" MAX "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postlist::test_support::{docids, leaf, shard_of};

    #[test]
    fn test_union_of_children() {
        let shard = shard_of(&["a", "c", "b", "a b"]);
        let mut pl = PostList::Max(MaxPostList::new(vec![leaf(&shard, "a"), leaf(&shard, "b")], 4));
        assert_eq!(docids(&mut pl), vec![1, 3, 4]);
    }
}
