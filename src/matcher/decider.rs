//! Per-document accept/reject callbacks.

use std::fmt;
use std::sync::Arc;

use crate::database::Database;
use crate::error::Result;
use crate::types::{DocId, TermCount, ValueSlot};

/// A document the matcher is about to accept, as seen by callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    db: &'a Database,
    docid: DocId,
}

impl<'a> Candidate<'a> {
    pub fn new(db: &'a Database, docid: DocId) -> Self {
        Candidate { db, docid }
    }

    pub fn docid(&self) -> DocId {
        self.docid
    }

    /// The value stored in `slot`, empty if there is none.
    pub fn value(&self, slot: ValueSlot) -> Result<String> {
        self.db.value(self.docid, slot)
    }

    pub fn doc_length(&self) -> Result<TermCount> {
        self.db.doc_length(self.docid)
    }

    /// Terms indexing the document with their wdf, sorted by term.
    pub fn term_list(&self) -> Result<Vec<(String, TermCount)>> {
        self.db.term_list(self.docid)
    }
}

/// Decides whether a matching document may appear in the results.
///
/// Rejected documents are not ranked and count as non-matches in the
/// reported bounds.
pub trait MatchDecider: Send + Sync {
    fn accept(&self, candidate: &Candidate<'_>) -> Result<bool>;
}

impl<F> MatchDecider for F
where
    F: Fn(&Candidate<'_>) -> Result<bool> + Send + Sync,
{
    fn accept(&self, candidate: &Candidate<'_>) -> Result<bool> {
        self(candidate)
    }
}

/// Accepts documents whose value in a slot equals a fixed string.
#[derive(Debug, Clone)]
pub struct ValueEqualsDecider {
    slot: ValueSlot,
    value: String,
}

impl ValueEqualsDecider {
    pub fn new<S: Into<String>>(slot: ValueSlot, value: S) -> Self {
        ValueEqualsDecider {
            slot,
            value: value.into(),
        }
    }
}

impl MatchDecider for ValueEqualsDecider {
    fn accept(&self, candidate: &Candidate<'_>) -> Result<bool> {
        Ok(candidate.value(self.slot)? == self.value)
    }
}

/// Applies several deciders in turn and accepts a document only if every
/// one of them does. Deciders after the first rejection are not called.
#[derive(Clone, Default)]
pub struct MultipleMatchDecider {
    deciders: Vec<Arc<dyn MatchDecider>>,
}

impl MultipleMatchDecider {
    pub fn new() -> Self {
        MultipleMatchDecider::default()
    }

    /// Add a decider to the end of the list.
    pub fn append(&mut self, decider: Arc<dyn MatchDecider>) {
        self.deciders.push(decider);
    }

    pub fn with(mut self, decider: Arc<dyn MatchDecider>) -> Self {
        self.append(decider);
        self
    }

    pub fn len(&self) -> usize {
        self.deciders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deciders.is_empty()
    }
}

impl fmt::Debug for MultipleMatchDecider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipleMatchDecider")
            .field("deciders", &self.deciders.len())
            .finish()
    }
}

impl MatchDecider for MultipleMatchDecider {
    fn accept(&self, candidate: &Candidate<'_>) -> Result<bool> {
        for decider in &self.deciders {
            if !decider.accept(candidate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
