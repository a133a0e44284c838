//! Conjunction.

use crate::error::Result;
use crate::postlist::{PostList, PostingList, union_positions};
use crate::types::{DocCount, DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, and_estimates};

/// Documents matching every child; weights add.
///
/// Children are kept rarest first. The rarest child leads and the others
/// are skipped forward to it, so most leaf-level work happens on the
/// shortest lists.
#[derive(Debug)]
pub struct AndPostList {
    children: Vec<PostList>,
    /// Position of each child in the order it was given, for callers that
    /// need to know which operand is which.
    order: Vec<usize>,
    estimates: Estimates,
    maxweight: f64,
    did: DocId,
    at_end: bool,
}

impl AndPostList {
    pub fn new(children: Vec<PostList>, db_size: DocCount) -> Self {
        let mut indexed: Vec<(usize, PostList)> = children.into_iter().enumerate().collect();
        indexed.sort_by_key(|(i, pl)| (pl.estimates().est, *i));
        let estimates = and_estimates(
            &indexed.iter().map(|(_, pl)| pl.estimates()).collect::<Vec<_>>(),
            db_size,
        );
        let maxweight = indexed.iter().map(|(_, pl)| pl.maxweight()).sum();
        let (order, children) = indexed.into_iter().unzip();
        AndPostList {
            children,
            order,
            estimates,
            maxweight,
            did: 0,
            at_end: false,
        }
    }

    /// The children in their original order.
    pub fn children_in_order(&self) -> Vec<&PostList> {
        let mut out: Vec<(usize, &PostList)> = self.order.iter().copied().zip(&self.children).collect();
        out.sort_by_key(|(i, _)| *i);
        out.into_iter().map(|(_, pl)| pl).collect()
    }

    /// Advance to the first common document at or after `target`.
    fn find_from(&mut self, mut target: DocId, w_min: f64) -> Result<()> {
        'outer: loop {
            for i in 0..self.children.len() {
                let others = self.maxweight - self.children[i].maxweight();
                let child = &mut self.children[i];
                if child.at_end() {
                    self.at_end = true;
                    return Ok(());
                }
                if child.docid() < target {
                    child.skip_to(target, w_min - others)?;
                    if child.at_end() {
                        self.at_end = true;
                        return Ok(());
                    }
                }
                if child.docid() > target {
                    target = child.docid();
                    continue 'outer;
                }
            }
            self.did = target;
            return Ok(());
        }
    }
}

impl PostingList for AndPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.maxweight = self.children.iter_mut().map(|pl| pl.recalc_maxweight()).sum();
        self.maxweight
    }

    fn docid(&self) -> DocId {
        self.did
    }

    fn at_end(&self) -> bool {
        self.at_end
    }

    fn weight(&self) -> Result<f64> {
        let mut total = 0.0;
        for child in &self.children {
            total += child.weight()?;
        }
        Ok(total)
    }

    fn wdf(&self) -> TermCount {
        self.children.iter().map(|pl| pl.wdf()).sum()
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.at_end || did <= self.did {
            return Ok(());
        }
        self.find_from(did, w_min)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        union_positions(&self.children, self.did)
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.children_in_order().iter().map(|pl| pl.description()).collect();
        format!("({})", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postlist::test_support::{docids, leaf, shard_of};

    #[test]
    fn test_intersection() -> Result<()> {
        let shard = shard_of(&["a b", "b", "a b c", "a", "c b a"]);
        let children = vec![leaf(&shard, "a"), leaf(&shard, "b"), leaf(&shard, "c")];
        let mut pl = PostList::And(AndPostList::new(children, 5));
        assert_eq!(pl.estimates().max, 2);
        assert_eq!(docids(&mut pl), vec![3, 5]);

        let children = vec![leaf(&shard, "a"), leaf(&shard, "b")];
        let mut pl = PostList::And(AndPostList::new(children, 5));
        pl.skip_to(2, 0.0)?;
        assert_eq!(pl.docid(), 3);
        Ok(())
    }

    #[test]
    fn test_description_keeps_order() {
        let shard = shard_of(&["a b", "b", "b"]);
        let pl = AndPostList::new(vec![leaf(&shard, "b"), leaf(&shard, "a")], 3);
        assert_eq!(pl.description(), "(Term(b) AND Term(a))");
    }
}
