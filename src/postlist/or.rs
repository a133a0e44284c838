//! Binary disjunction, with decay to `AND_MAYBE` and `AND`.

use crate::error::Result;
use crate::postlist::{PostList, PostingList, is_on, union_positions};
use crate::types::{DocCount, DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, or_estimates};

/// Documents matching either child; weights of the matching children add.
///
/// As the matcher's minimum weight rises the list tightens: once a
/// document matching only the left child can no longer qualify, the right
/// child becomes required, and vice versa. With both required the list
/// behaves as `AND`. The same node with the left side required from the
/// start implements `AND_MAYBE`.
#[derive(Debug)]
pub struct OrPostList {
    left: Box<PostList>,
    right: Box<PostList>,
    left_required: bool,
    right_required: bool,
    estimates: Estimates,
    did: DocId,
    left_on: bool,
    right_on: bool,
    at_end: bool,
    started: bool,
}

impl OrPostList {
    pub fn new(left: PostList, right: PostList, db_size: DocCount) -> Self {
        let estimates = or_estimates(&[left.estimates(), right.estimates()], db_size);
        OrPostList {
            left: Box::new(left),
            right: Box::new(right),
            left_required: false,
            right_required: false,
            estimates,
            did: 0,
            left_on: false,
            right_on: false,
            at_end: false,
            started: false,
        }
    }

    /// `left AND_MAYBE right`: only documents matching `left`, plus any
    /// weight from `right`.
    pub fn and_maybe(left: PostList, right: PostList) -> Self {
        let estimates = left.estimates();
        let mut pl = OrPostList::new(left, right, 0);
        pl.estimates = estimates;
        pl.left_required = true;
        pl
    }

    fn update_requirements(&mut self, w_min: f64) {
        let lmax = self.left.maxweight();
        let rmax = self.right.maxweight();
        if w_min > lmax && !self.right_required {
            log::trace!("OR: right side now required (w_min {w_min} > {lmax})");
            self.right_required = true;
        }
        if w_min > rmax && !self.left_required {
            log::trace!("OR: left side now required (w_min {w_min} > {rmax})");
            self.left_required = true;
        }
    }

    fn find_from(&mut self, target: DocId, w_min: f64) -> Result<()> {
        let lmax = self.left.maxweight();
        let rmax = self.right.maxweight();
        match (self.left_required, self.right_required) {
            (false, false) => {
                if self.left.docid() < target && !self.left.at_end() {
                    self.left.skip_to(target, w_min - rmax)?;
                }
                if self.right.docid() < target && !self.right.at_end() {
                    self.right.skip_to(target, w_min - lmax)?;
                }
                let Some(did) = [self.left.as_ref(), self.right.as_ref()]
                    .into_iter()
                    .filter(|pl| !pl.at_end())
                    .map(|pl| pl.docid())
                    .min()
                else {
                    self.at_end = true;
                    return Ok(());
                };
                self.did = did;
                self.left_on = is_on(&self.left, did);
                self.right_on = is_on(&self.right, did);
            }
            (true, false) => {
                self.did = match required_next(&mut self.left, target, w_min - rmax)? {
                    Some(did) => did,
                    None => {
                        self.at_end = true;
                        return Ok(());
                    }
                };
                self.left_on = true;
                self.right_on = self.right.check(self.did, 0.0)?;
            }
            (false, true) => {
                self.did = match required_next(&mut self.right, target, w_min - lmax)? {
                    Some(did) => did,
                    None => {
                        self.at_end = true;
                        return Ok(());
                    }
                };
                self.right_on = true;
                self.left_on = self.left.check(self.did, 0.0)?;
            }
            (true, true) => {
                let mut target = target;
                loop {
                    let Some(l) = required_next(&mut self.left, target, w_min - rmax)? else {
                        self.at_end = true;
                        return Ok(());
                    };
                    let Some(r) = required_next(&mut self.right, l, w_min - lmax)? else {
                        self.at_end = true;
                        return Ok(());
                    };
                    if l == r {
                        self.did = l;
                        break;
                    }
                    target = r;
                }
                self.left_on = true;
                self.right_on = true;
            }
        }
        Ok(())
    }
}

/// Move a required child to `target` (if behind), returning its docid or
/// `None` at its end.
fn required_next(pl: &mut PostList, target: DocId, w_min: f64) -> Result<Option<DocId>> {
    if pl.at_end() {
        return Ok(None);
    }
    if pl.docid() < target {
        pl.skip_to(target, w_min)?;
        if pl.at_end() {
            return Ok(None);
        }
    }
    Ok(Some(pl.docid()))
}

impl PostingList for OrPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.left.maxweight() + self.right.maxweight()
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.left.recalc_maxweight() + self.right.recalc_maxweight()
    }

    fn docid(&self) -> DocId {
        self.did
    }

    fn at_end(&self) -> bool {
        self.at_end
    }

    fn weight(&self) -> Result<f64> {
        let mut total = 0.0;
        if self.left_on {
            total += self.left.weight()?;
        }
        if self.right_on {
            total += self.right.weight()?;
        }
        Ok(total)
    }

    fn wdf(&self) -> TermCount {
        let mut wdf = 0;
        if self.left_on {
            wdf += self.left.wdf();
        }
        if self.right_on {
            wdf += self.right.wdf();
        }
        wdf
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.at_end || (self.started && did <= self.did) {
            return Ok(());
        }
        self.started = true;
        self.update_requirements(w_min);
        let target = did.max(self.did + 1);
        self.find_from(target, w_min)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        let mut on = Vec::with_capacity(2);
        if self.left_on {
            on.push(self.left.as_ref());
        }
        if self.right_on {
            on.push(self.right.as_ref());
        }
        union_positions(on, self.did)
    }

    fn description(&self) -> String {
        let op = match (self.left_required, self.right_required) {
            (false, false) => "OR",
            (true, false) => "AND_MAYBE",
            (false, true) => "MAYBE_AND",
            (true, true) => "AND",
        };
        format!("({} {op} {})", self.left.description(), self.right.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postlist::test_support::{docids, leaf, shard_of};

    #[test]
    fn test_union() {
        let shard = shard_of(&["a", "b", "a b", "c", "b"]);
        let mut pl = PostList::Or(OrPostList::new(leaf(&shard, "a"), leaf(&shard, "b"), 5));
        assert_eq!(docids(&mut pl), vec![1, 2, 3, 5]);
        let e = pl.estimates();
        assert_eq!((e.min, e.max), (3, 5));
    }

    #[test]
    fn test_and_maybe_only_left_docs() {
        let shard = shard_of(&["a", "b", "a b", "c", "b"]);
        let mut pl = PostList::Or(OrPostList::and_maybe(leaf(&shard, "a"), leaf(&shard, "b")));
        assert_eq!(docids(&mut pl), vec![1, 3]);
        assert_eq!(pl.estimates(), Estimates::exact(2));
    }

    #[test]
    fn test_or_with_exhausted_child() {
        let shard = shard_of(&["a", "b"]);
        let mut pl = PostList::Or(OrPostList::new(leaf(&shard, "zz"), leaf(&shard, "b"), 2));
        assert_eq!(docids(&mut pl), vec![2]);
    }
}
