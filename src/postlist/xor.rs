//! Odd-parity disjunction.

use crate::error::Result;
use crate::postlist::{PostList, PostingList, is_on, min_docid, union_positions};
use crate::types::{DocCount, DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, xor_estimates};

/// Documents matching an odd number of children. Weights of the matching
/// children add.
#[derive(Debug)]
pub struct XorPostList {
    children: Vec<PostList>,
    estimates: Estimates,
    did: DocId,
    at_end: bool,
}

impl XorPostList {
    pub fn new(children: Vec<PostList>, db_size: DocCount) -> Self {
        let estimates = xor_estimates(
            &children.iter().map(|pl| pl.estimates()).collect::<Vec<_>>(),
            db_size,
        );
        XorPostList {
            children,
            estimates,
            did: 0,
            at_end: false,
        }
    }
}

impl PostingList for XorPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.children.iter().map(|pl| pl.maxweight()).sum()
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.children.iter_mut().map(|pl| pl.recalc_maxweight()).sum()
    }

    fn docid(&self) -> DocId {
        self.did
    }

    fn at_end(&self) -> bool {
        self.at_end
    }

    fn weight(&self) -> Result<f64> {
        let mut total = 0.0;
        for child in self.children.iter().filter(|pl| is_on(pl, self.did)) {
            total += child.weight()?;
        }
        Ok(total)
    }

    fn wdf(&self) -> TermCount {
        self.children
            .iter()
            .filter(|pl| is_on(pl, self.did))
            .map(|pl| pl.wdf())
            .sum()
    }

    fn skip_to(&mut self, did: DocId, _w_min: f64) -> Result<()> {
        if self.at_end || did <= self.did {
            return Ok(());
        }
        let mut target = did;
        loop {
            for child in &mut self.children {
                if !child.at_end() && child.docid() < target {
                    child.skip_to(target, 0.0)?;
                }
            }
            // Children that run out together still count for the
            // documents they matched before ending.
            let Some(candidate) = min_docid(&self.children) else {
                self.at_end = true;
                return Ok(());
            };
            let matching = self.children.iter().filter(|pl| is_on(pl, candidate)).count();
            if matching % 2 == 1 {
                self.did = candidate;
                return Ok(());
            }
            target = candidate + 1;
        }
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        union_positions(&self.children, self.did)
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|pl| pl.description()).collect();
        format!("({})", parts.join(" XOR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postlist::test_support::{docids, leaf, shard_of};

    #[test]
    fn test_parity() {
        let shard = shard_of(&["a", "a b", "a b c", "b c", "c"]);
        let children = vec![leaf(&shard, "a"), leaf(&shard, "b"), leaf(&shard, "c")];
        let mut pl = PostList::Xor(XorPostList::new(children, 5));
        assert_eq!(docids(&mut pl), vec![1, 3, 5]);
    }

    #[test]
    fn test_children_ending_together() {
        let shard = shard_of(&["a", "b", "a b"]);
        let children = vec![leaf(&shard, "a"), leaf(&shard, "b")];
        let mut pl = PostList::Xor(XorPostList::new(children, 3));
        assert_eq!(docids(&mut pl), vec![1, 2]);
    }
}
