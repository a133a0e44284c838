//! Leaves backed by a caller-supplied [`PostingSource`].

use crate::error::Result;
use crate::postlist::PostingList;
use crate::query::{PostingSource, SharedSource};
use crate::types::{DocId, TermCount};
use crate::util::estimate::Estimates;

/// The source driven by an [`ExternalPostList`]: either the query's own
/// instance or a per-shard clone of it.
#[derive(Debug)]
pub enum SourceHandle {
    Shared(SharedSource),
    Owned(Box<dyn PostingSource>),
}

impl SourceHandle {
    fn with<R>(&self, f: impl FnOnce(&dyn PostingSource) -> R) -> R {
        match self {
            SourceHandle::Shared(s) => {
                let guard = s.lock();
                f(&**guard)
            }
            SourceHandle::Owned(s) => f(&**s),
        }
    }

    fn with_mut<R>(&mut self, f: impl FnOnce(&mut dyn PostingSource) -> R) -> R {
        match self {
            SourceHandle::Shared(s) => {
                let mut guard = s.lock();
                f(&mut **guard)
            }
            SourceHandle::Owned(s) => f(&mut **s),
        }
    }
}

/// Adapts a posting source to the posting-list protocol, scaling its
/// weights by `factor`. With a factor of 0 the source's weight is never
/// asked for.
#[derive(Debug)]
pub struct ExternalPostList {
    source: SourceHandle,
    factor: f64,
    estimates: Estimates,
    maxweight: f64,
    started: bool,
    /// Set after a failed `check`, when the source may not be positioned.
    checked_out: Option<DocId>,
}

impl ExternalPostList {
    /// Wrap a source that has already been reset for its shard.
    pub fn new(source: SourceHandle, factor: f64) -> Self {
        let (estimates, maxweight) = source.with(|s| {
            (
                Estimates::new(s.termfreq_min(), s.termfreq_est(), s.termfreq_max()),
                s.maxweight(),
            )
        });
        ExternalPostList {
            source,
            factor,
            estimates,
            maxweight: if factor == 0.0 { 0.0 } else { maxweight * factor },
            started: false,
            checked_out: None,
        }
    }

    fn source_min(&self, w_min: f64) -> f64 {
        if self.factor > 0.0 { w_min / self.factor } else { 0.0 }
    }
}

impl PostingList for ExternalPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.maxweight
    }

    fn recalc_maxweight(&mut self) -> f64 {
        if self.factor != 0.0 {
            let current = self.source.with(|s| s.maxweight()) * self.factor;
            self.maxweight = self.maxweight.min(current);
        }
        self.maxweight
    }

    fn docid(&self) -> DocId {
        if let Some(did) = self.checked_out {
            return did;
        }
        if self.started { self.source.with(|s| s.docid()) } else { 0 }
    }

    fn at_end(&self) -> bool {
        self.checked_out.is_none() && self.started && self.source.with(|s| s.at_end())
    }

    fn weight(&self) -> Result<f64> {
        if self.factor == 0.0 {
            return Ok(0.0);
        }
        Ok(self.source.with(|s| s.weight())? * self.factor)
    }

    fn wdf(&self) -> TermCount {
        0
    }

    fn next(&mut self, w_min: f64) -> Result<()> {
        if let Some(did) = self.checked_out {
            return self.skip_to(did + 1, w_min);
        }
        self.started = true;
        let min = self.source_min(w_min);
        self.source.with_mut(|s| s.next(min))
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.checked_out.take().is_none()
            && self.started
            && (self.at_end() || self.docid() >= did)
        {
            return Ok(());
        }
        self.started = true;
        let min = self.source_min(w_min);
        self.source.with_mut(|s| s.skip_to(did, min))
    }

    fn check(&mut self, did: DocId, w_min: f64) -> Result<bool> {
        if self.checked_out.is_none() && self.started && !self.at_end() && self.docid() >= did {
            return Ok(self.docid() == did);
        }
        self.checked_out = None;
        self.started = true;
        let min = self.source_min(w_min);
        let matched = self.source.with_mut(|s| s.check(did, min))?;
        if !matched {
            self.checked_out = Some(did);
        }
        Ok(matched)
    }

    fn description(&self) -> String {
        self.source.with(|s| s.description())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::{Document, MemoryShard, Shard};
    use crate::postlist::PostList;
    use crate::postlist::test_support::docids;
    use crate::query::{FixedWeightPostingSource, ValueWeightPostingSource};
    use crate::util::sortable::sortable_serialise;

    fn shard() -> Arc<dyn Shard> {
        Arc::new(MemoryShard::from_documents((1..=4).map(|i| {
            Document::new()
                .with_term("x", 1)
                .with_value(0, sortable_serialise(f64::from(i)))
        })))
    }

    #[test]
    fn test_scaled_source() -> Result<()> {
        let shard = shard();
        let mut source = ValueWeightPostingSource::new(0);
        source.reset(&shard)?;
        let mut pl = PostList::External(ExternalPostList::new(SourceHandle::Owned(Box::new(source)), 2.0));
        assert_eq!(pl.maxweight(), 8.0);
        pl.next(0.0)?;
        assert_eq!(pl.docid(), 1);
        assert_eq!(pl.weight()?, 2.0);
        assert_eq!(docids(&mut pl), vec![2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_zero_factor_is_boolean() -> Result<()> {
        let shard = shard();
        let mut source = FixedWeightPostingSource::new(5.0);
        source.reset(&shard)?;
        let mut pl = PostList::External(ExternalPostList::new(SourceHandle::Owned(Box::new(source)), 0.0));
        assert_eq!(pl.maxweight(), 0.0);
        pl.next(0.0)?;
        assert_eq!(pl.weight()?, 0.0);
        Ok(())
    }
}
