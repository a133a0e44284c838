//! Posting lists: the compiled, iterable form of a query.
//!
//! Every node implements [`PostingList`]. Nodes are gathered into the
//! closed [`PostList`] enum so a compiled tree owns its children by value
//! and dispatch is a `match` rather than a vtable hop.
//!
//! Cursor protocol, shared by every node:
//!
//! - A list starts before its first document; [`PostingList::docid`]
//!   returns 0 until it has been moved.
//! - `next` and `skip_to` only move forward. `skip_to(did)` with `did` at or
//!   before the current position does nothing.
//! - `w_min` is a hint: documents whose weight from this list would be below
//!   it may be skipped. Passing 0 is always correct.
//! - After `check(did)` returns `false` the list is only guaranteed to
//!   support further `check`/`skip_to` calls with larger docids, and its
//!   `docid` may report any value up to `did`.

pub mod and;
pub mod andnot;
pub mod extra;
pub mod external;
pub mod leaf;
pub mod max;
pub mod merge;
pub mod or;
pub mod positional;
pub mod synonym;
pub mod value;
pub mod xor;

use crate::error::{LexmatchError, Result};
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::Estimates;

pub use and::AndPostList;
pub use andnot::AndNotPostList;
pub use external::{ExternalPostList, SourceHandle};
pub use extra::ExtraPostList;
pub use leaf::{EmptyPostList, LeafPostList};
pub use max::MaxPostList;
pub use merge::MergePostList;
pub use or::OrPostList;
pub use positional::{PositionalKind, PositionalPostList};
pub use synonym::SynonymPostList;
pub use value::ValueRangePostList;
pub use xor::XorPostList;

/// Cursor interface implemented by every posting list node.
pub trait PostingList {
    /// Bounds on the number of documents this list will return.
    fn estimates(&self) -> Estimates;

    /// Upper bound on [`Self::weight`] for the documents still to come.
    fn maxweight(&self) -> f64;

    /// Recompute the weight bound from the children, returning it. The
    /// result never exceeds the previous bound.
    fn recalc_maxweight(&mut self) -> f64;

    fn docid(&self) -> DocId;
    fn at_end(&self) -> bool;

    /// Weight of the current document.
    fn weight(&self) -> Result<f64>;

    /// Within-document frequency of the current document, summed over the
    /// matching leaves.
    fn wdf(&self) -> TermCount;

    fn next(&mut self, w_min: f64) -> Result<()> {
        let target = self.docid().saturating_add(1);
        self.skip_to(target, w_min)
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()>;

    /// Test whether `did` matches, positioning on it if so.
    fn check(&mut self, did: DocId, w_min: f64) -> Result<bool> {
        self.skip_to(did, w_min)?;
        Ok(!self.at_end() && self.docid() == did)
    }

    /// Positions of the current document, for positional filters.
    fn positions(&self) -> Result<Vec<TermPos>> {
        Err(LexmatchError::unimplemented(
            "NEAR and PHRASE only currently support leaf subqueries",
        ))
    }

    fn description(&self) -> String;
}

/// A node of a compiled query.
#[derive(Debug)]
pub enum PostList {
    Empty(EmptyPostList),
    Leaf(LeafPostList),
    And(AndPostList),
    Or(OrPostList),
    AndNot(AndNotPostList),
    Xor(XorPostList),
    Max(MaxPostList),
    Synonym(SynonymPostList),
    Positional(PositionalPostList),
    ValueRange(ValueRangePostList),
    External(ExternalPostList),
    Extra(ExtraPostList),
    Merge(MergePostList),
}

macro_rules! dispatch {
    ($self:expr, $pl:ident => $body:expr) => {
        match $self {
            PostList::Empty($pl) => $body,
            PostList::Leaf($pl) => $body,
            PostList::And($pl) => $body,
            PostList::Or($pl) => $body,
            PostList::AndNot($pl) => $body,
            PostList::Xor($pl) => $body,
            PostList::Max($pl) => $body,
            PostList::Synonym($pl) => $body,
            PostList::Positional($pl) => $body,
            PostList::ValueRange($pl) => $body,
            PostList::External($pl) => $body,
            PostList::Extra($pl) => $body,
            PostList::Merge($pl) => $body,
        }
    };
}

impl PostList {
    pub fn empty() -> Self {
        PostList::Empty(EmptyPostList)
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, PostList::Empty(_))
    }
}

impl PostingList for PostList {
    fn estimates(&self) -> Estimates {
        dispatch!(self, pl => pl.estimates())
    }

    fn maxweight(&self) -> f64 {
        dispatch!(self, pl => pl.maxweight())
    }

    fn recalc_maxweight(&mut self) -> f64 {
        dispatch!(self, pl => pl.recalc_maxweight())
    }

    fn docid(&self) -> DocId {
        dispatch!(self, pl => pl.docid())
    }

    fn at_end(&self) -> bool {
        dispatch!(self, pl => pl.at_end())
    }

    fn weight(&self) -> Result<f64> {
        dispatch!(self, pl => pl.weight())
    }

    fn wdf(&self) -> TermCount {
        dispatch!(self, pl => pl.wdf())
    }

    fn next(&mut self, w_min: f64) -> Result<()> {
        dispatch!(self, pl => pl.next(w_min))
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        dispatch!(self, pl => pl.skip_to(did, w_min))
    }

    fn check(&mut self, did: DocId, w_min: f64) -> Result<bool> {
        dispatch!(self, pl => pl.check(did, w_min))
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        dispatch!(self, pl => pl.positions())
    }

    fn description(&self) -> String {
        dispatch!(self, pl => pl.description())
    }
}

/// True if `pl` is positioned on `did`.
pub(crate) fn is_on(pl: &PostList, did: DocId) -> bool {
    !pl.at_end() && pl.docid() == did
}

/// Smallest current docid among lists not at their end.
pub(crate) fn min_docid<'a, I>(lists: I) -> Option<DocId>
where
    I: IntoIterator<Item = &'a PostList>,
{
    lists
        .into_iter()
        .filter(|pl| !pl.at_end())
        .map(|pl| pl.docid())
        .min()
}

/// Union of the positions of the listed children on `did`, sorted.
pub(crate) fn union_positions<'a, I>(lists: I, did: DocId) -> Result<Vec<TermPos>>
where
    I: IntoIterator<Item = &'a PostList>,
{
    let mut out = Vec::new();
    for pl in lists {
        if is_on(pl, did) {
            out.extend(pl.positions()?);
        }
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}
