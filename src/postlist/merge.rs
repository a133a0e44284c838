//! N-way merge of per-shard trees into the global docid space.

use crate::database::to_global;
use crate::error::Result;
use crate::postlist::{PostList, PostingList};
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::Estimates;

/// Merges one tree per shard. Shard `i` of `n` maps local docid `l` to
/// `(l - 1) * n + i + 1`, so at most one child sits on any global docid.
#[derive(Debug)]
pub struct MergePostList {
    children: Vec<PostList>,
    current: Option<usize>,
    did: DocId,
    at_end: bool,
}

impl MergePostList {
    pub fn new(children: Vec<PostList>) -> Self {
        MergePostList {
            children,
            current: None,
            did: 0,
            at_end: false,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.children.len()
    }

    /// The shard the current document came from.
    pub fn current_shard(&self) -> Option<usize> {
        self.current
    }

    fn n(&self) -> DocId {
        self.children.len() as DocId
    }

    /// First local docid of shard `i` whose global docid is at least `did`.
    fn local_target(&self, did: DocId, i: usize) -> DocId {
        let offset = i as DocId + 1;
        if did <= offset {
            return 1;
        }
        (did - offset).div_ceil(self.n()) + 1
    }

    fn settle(&mut self) {
        let n = self.n();
        let best = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, pl)| !pl.at_end())
            .map(|(i, pl)| (to_global(pl.docid(), i, n), i))
            .min();
        match best {
            Some((did, i)) => {
                self.did = did;
                self.current = Some(i);
            }
            None => {
                self.at_end = true;
                self.current = None;
            }
        }
    }

    fn current_child(&self) -> Option<&PostList> {
        self.current.and_then(|i| self.children.get(i))
    }
}

impl PostingList for MergePostList {
    fn estimates(&self) -> Estimates {
        let mut total = Estimates::default();
        for pl in &self.children {
            let e = pl.estimates();
            total.min = total.min.saturating_add(e.min);
            total.est = total.est.saturating_add(e.est);
            total.max = total.max.saturating_add(e.max);
        }
        total
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
        self.current_child().map_or(Ok(0.0), |pl| pl.weight())
    }

    fn wdf(&self) -> TermCount {
        self.current_child().map_or(0, |pl| pl.wdf())
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.at_end || did <= self.did {
            return Ok(());
        }
        let n = self.n();
        for i in 0..self.children.len() {
            let local = self.local_target(did, i);
            let child = &mut self.children[i];
            if child.at_end() {
                continue;
            }
            if child.docid() < local {
                child.skip_to(local, w_min)?;
            }
            debug_assert!(child.at_end() || to_global(child.docid(), i, n) >= did);
        }
        self.settle();
        Ok(())
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.current_child().map_or(Ok(Vec::new()), |pl| pl.positions())
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|pl| pl.description()).collect();
        format!("Merge({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postlist::test_support::{docids, leaf, shard_of};

    #[test]
    fn test_interleaved_merge() -> Result<()> {
        let a = shard_of(&["x", "y", "x"]);
        let b = shard_of(&["x", "x"]);
        let children = vec![leaf(&a, "x"), leaf(&b, "x")];
        let mut pl = PostList::Merge(MergePostList::new(children));
        // Shard 0 local 1,3 -> global 1,5; shard 1 local 1,2 -> global 2,4.
        assert_eq!(docids(&mut pl), vec![1, 2, 4, 5]);
        assert_eq!(pl.estimates(), Estimates::exact(4));

        let children = vec![leaf(&a, "x"), leaf(&b, "x")];
        let mut pl = PostList::Merge(MergePostList::new(children));
        pl.skip_to(3, 0.0)?;
        assert_eq!(pl.docid(), 4);
        Ok(())
    }
}
