//! Scalar aliases shared across the crate.

use serde::{Deserialize, Serialize};

/// Document identifier. Zero is never a valid docid.
pub type DocId = u32;

/// A count of documents.
pub type DocCount = u32;

/// A count of term occurrences (wdf, document length, wqf).
pub type TermCount = u32;

/// Sum of document lengths across a collection.
pub type TotalLength = u64;

/// A term position within a document.
pub type TermPos = u32;

/// Number identifying a per-document value slot.
pub type ValueSlot = u32;

/// Sentinel meaning "no value slot".
pub const BAD_VALUE_SLOT: ValueSlot = ValueSlot::MAX;

/// Document, relevant-document and occurrence frequencies of a term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFreqs {
    pub termfreq: DocCount,
    pub reltermfreq: DocCount,
    pub collfreq: u64,
}

impl TermFreqs {
    pub fn new(termfreq: DocCount, reltermfreq: DocCount, collfreq: u64) -> Self {
        TermFreqs {
            termfreq,
            reltermfreq,
            collfreq,
        }
    }
}

impl std::ops::AddAssign for TermFreqs {
    fn add_assign(&mut self, other: TermFreqs) {
        self.termfreq = self.termfreq.saturating_add(other.termfreq);
        self.reltermfreq = self.reltermfreq.saturating_add(other.reltermfreq);
        self.collfreq = self.collfreq.saturating_add(other.collfreq);
    }
}
