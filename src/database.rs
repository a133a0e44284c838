//! The storage boundary consumed by the matcher.
//!
//! A [`Database`] is an ordered list of shards. Each shard numbers its own
//! documents from 1; the combined docid space interleaves them, so local
//! docid `l` of shard `i` (of `n`) is global docid `(l - 1) * n + i + 1`.
//! With a single shard global and local docids coincide.

pub mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, DocId, TermCount, TermPos, TotalLength, ValueSlot};

pub use memory::{Document, MemoryShard, MemoryShardBuilder};

/// A cursor over the postings of one term in one shard.
///
/// Cursors start before the first posting; `next` must be called to reach
/// it. A cursor keeps whatever backend state it needs alive, so it stays
/// usable after the [`Database`] it was opened from is dropped.
pub trait TermPostings: Debug + Send {
    /// Current local docid. Only meaningful when positioned and not at end.
    fn docid(&self) -> DocId;
    /// Within-document frequency at the current posting.
    fn wdf(&self) -> TermCount;
    fn at_end(&self) -> bool;
    fn next(&mut self) -> Result<()>;
    /// Advance to the first posting with docid >= `did`.
    fn skip_to(&mut self, did: DocId) -> Result<()>;
    /// Number of documents in this list.
    fn termfreq(&self) -> DocCount;
}

/// A cursor over the documents holding a value in one slot.
pub trait ValueCursor: Debug + Send {
    fn docid(&self) -> DocId;
    fn value(&self) -> &str;
    fn at_end(&self) -> bool;
    fn next(&mut self) -> Result<()>;
    fn skip_to(&mut self, did: DocId) -> Result<()>;
    /// Position on `did` if it has a value, returning whether it does.
    ///
    /// After `false` the cursor is only guaranteed to support `skip_to` and
    /// `check` with larger docids.
    fn check(&mut self, did: DocId) -> Result<bool> {
        self.skip_to(did)?;
        Ok(!self.at_end() && self.docid() == did)
    }
}

/// One segment of a collection.
///
/// This is the narrow interface the matcher needs from storage; a real
/// engine would implement it over its on-disk format.
pub trait Shard: Debug + Send + Sync {
    fn doc_count(&self) -> Result<DocCount>;
    /// Highest docid in use.
    fn last_docid(&self) -> Result<DocId>;
    fn total_length(&self) -> Result<TotalLength>;
    /// (min, max) document length over non-empty documents.
    fn doclength_bounds(&self) -> Result<(TermCount, TermCount)>;
    /// (min, max) number of distinct terms per document.
    fn unique_terms_bounds(&self) -> Result<(TermCount, TermCount)>;
    fn has_positions(&self) -> bool;

    /// (termfreq, collection frequency) of a term. The empty term stands for
    /// every document.
    fn term_freqs(&self, term: &str) -> Result<(DocCount, u64)>;
    fn wdf_upper_bound(&self, term: &str) -> Result<TermCount>;
    fn postings(&self, term: &str) -> Result<Box<dyn TermPostings>>;
    fn positions(&self, did: DocId, term: &str) -> Result<Vec<TermPos>>;

    fn doc_length(&self, did: DocId) -> Result<TermCount>;
    fn unique_terms(&self, did: DocId) -> Result<TermCount>;
    /// Terms indexing a document with their wdf, sorted by term.
    fn term_list(&self, did: DocId) -> Result<Vec<(String, TermCount)>>;
    /// Highest wdf of any term in a document.
    fn wdf_doc_max(&self, did: DocId) -> Result<TermCount> {
        Ok(self.term_list(did)?.into_iter().map(|(_, wdf)| wdf).max().unwrap_or(0))
    }
    /// All terms starting with `prefix`, sorted.
    fn all_terms(&self, prefix: &str) -> Result<Vec<String>>;

    /// The value in `slot`, or the empty string if the document has none.
    fn value(&self, did: DocId, slot: ValueSlot) -> Result<String>;
    fn values(&self, slot: ValueSlot) -> Result<Box<dyn ValueCursor>>;
    /// Number of documents with a value in `slot`.
    fn value_freq(&self, slot: ValueSlot) -> Result<DocCount>;
    /// (lowest, highest) value stored in `slot`, if the backend tracks them.
    ///
    /// `Ok(None)` means "unknown" and callers must assume any value may
    /// occur. An `Unimplemented` error is passed through to the caller.
    fn value_bounds(&self, slot: ValueSlot) -> Result<Option<(String, String)>>;
}

/// A possibly sharded collection.
#[derive(Debug, Clone, Default)]
pub struct Database {
    shards: Vec<Arc<dyn Shard>>,
}

impl Database {
    pub fn new() -> Self {
        Database { shards: Vec::new() }
    }

    /// A database over one shard.
    pub fn single(shard: Arc<dyn Shard>) -> Self {
        Database {
            shards: vec![shard],
        }
    }

    pub fn add_shard(&mut self, shard: Arc<dyn Shard>) {
        self.shards.push(shard);
    }

    pub fn with_shard(mut self, shard: Arc<dyn Shard>) -> Self {
        self.add_shard(shard);
        self
    }

    pub fn shards(&self) -> &[Arc<dyn Shard>] {
        &self.shards
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn doc_count(&self) -> Result<DocCount> {
        let mut total: DocCount = 0;
        for shard in &self.shards {
            total = total.saturating_add(shard.doc_count()?);
        }
        Ok(total)
    }

    pub fn total_length(&self) -> Result<TotalLength> {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.total_length()?;
        }
        Ok(total)
    }

    pub fn average_length(&self) -> Result<f64> {
        let docs = self.doc_count()?;
        if docs == 0 {
            return Ok(0.0);
        }
        Ok(self.total_length()? as f64 / f64::from(docs))
    }

    /// Highest global docid that can be in use.
    pub fn last_docid(&self) -> Result<DocId> {
        let n = self.shards.len() as DocId;
        let mut last = 0;
        for (i, shard) in self.shards.iter().enumerate() {
            let local = shard.last_docid()?;
            if local > 0 {
                last = last.max(to_global(local, i, n));
            }
        }
        Ok(last)
    }

    pub fn doclength_bounds(&self) -> Result<(TermCount, TermCount)> {
        combine_bounds(&self.shards, |s| {
            Ok((s.doc_count()? > 0, s.doclength_bounds()?))
        })
    }

    pub fn unique_terms_bounds(&self) -> Result<(TermCount, TermCount)> {
        combine_bounds(&self.shards, |s| {
            Ok((s.doc_count()? > 0, s.unique_terms_bounds()?))
        })
    }

    /// True if at least one shard stores positions.
    pub fn has_positions(&self) -> bool {
        self.shards.iter().any(|s| s.has_positions())
    }

    pub fn term_freqs(&self, term: &str) -> Result<(DocCount, u64)> {
        let mut tf: DocCount = 0;
        let mut cf = 0u64;
        for shard in &self.shards {
            let (t, c) = shard.term_freqs(term)?;
            tf = tf.saturating_add(t);
            cf += c;
        }
        Ok((tf, cf))
    }

    pub fn termfreq(&self, term: &str) -> Result<DocCount> {
        Ok(self.term_freqs(term)?.0)
    }

    pub fn wdf_upper_bound(&self, term: &str) -> Result<TermCount> {
        let mut ub = 0;
        for shard in &self.shards {
            ub = ub.max(shard.wdf_upper_bound(term)?);
        }
        Ok(ub)
    }

    /// Merged, deduplicated list of terms with `prefix`.
    pub fn all_terms(&self, prefix: &str) -> Result<Vec<String>> {
        let mut terms = Vec::new();
        for shard in &self.shards {
            terms.extend(shard.all_terms(prefix)?);
        }
        terms.sort();
        terms.dedup();
        Ok(terms)
    }

    /// Map a global docid to (shard index, local docid).
    pub fn locate(&self, did: DocId) -> Result<(usize, DocId)> {
        if did == 0 {
            return Err(LexmatchError::invalid_argument("docid 0 is invalid"));
        }
        if self.shards.is_empty() {
            return Err(LexmatchError::invalid_argument(format!(
                "docid {did} not found: database has no shards"
            )));
        }
        let n = self.shards.len() as DocId;
        let (shard, local) = to_local(did, n);
        Ok((shard, local))
    }

    pub fn doc_length(&self, did: DocId) -> Result<TermCount> {
        let (i, local) = self.locate(did)?;
        self.shards[i].doc_length(local)
    }

    pub fn value(&self, did: DocId, slot: ValueSlot) -> Result<String> {
        let (i, local) = self.locate(did)?;
        self.shards[i].value(local, slot)
    }

    pub fn term_list(&self, did: DocId) -> Result<Vec<(String, TermCount)>> {
        let (i, local) = self.locate(did)?;
        self.shards[i].term_list(local)
    }

    /// The stored positions of `term` in global document `did`.
    pub fn positions(&self, did: DocId, term: &str) -> Result<Vec<TermPos>> {
        let (i, local) = self.locate(did)?;
        self.shards[i].positions(local, term)
    }
}

fn combine_bounds<F>(shards: &[Arc<dyn Shard>], mut f: F) -> Result<(TermCount, TermCount)>
where
    F: FnMut(&dyn Shard) -> Result<(bool, (TermCount, TermCount))>,
{
    let mut lo = TermCount::MAX;
    let mut hi = 0;
    let mut any = false;
    for shard in shards {
        let (non_empty, (l, h)) = f(shard.as_ref())?;
        if non_empty {
            any = true;
            lo = lo.min(l);
            hi = hi.max(h);
        }
    }
    Ok(if any { (lo, hi) } else { (0, 0) })
}

/// Global docid for local docid `local` of shard `shard` out of `n`.
pub fn to_global(local: DocId, shard: usize, n: DocId) -> DocId {
    (local - 1) * n + shard as DocId + 1
}

/// (shard, local docid) for a global docid.
pub fn to_local(did: DocId, n: DocId) -> (usize, DocId) {
    (((did - 1) % n) as usize, (did - 1) / n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docid_interleaving() {
        assert_eq!(to_global(1, 0, 3), 1);
        assert_eq!(to_global(1, 2, 3), 3);
        assert_eq!(to_global(2, 0, 3), 4);
        for did in 1..20 {
            let (s, l) = to_local(did, 3);
            assert_eq!(to_global(l, s, 3), did);
        }
    }

    #[test]
    fn test_sharded_stats() -> Result<()> {
        let a = MemoryShard::builder()
            .add_document(Document::new().with_term("x", 2).with_term("y", 1))
            .build();
        let b = MemoryShard::builder()
            .add_document(Document::new().with_term("x", 1))
            .add_document(Document::new().with_term("z", 4))
            .build();
        let db = Database::new()
            .with_shard(Arc::new(a))
            .with_shard(Arc::new(b));

        assert_eq!(db.doc_count()?, 3);
        assert_eq!(db.total_length()?, 8);
        assert_eq!(db.term_freqs("x")?, (2, 3));
        assert_eq!(db.wdf_upper_bound("z")?, 4);
        assert_eq!(db.doclength_bounds()?, (1, 4));
        assert_eq!(db.all_terms("")?, vec!["x", "y", "z"]);
        // Local doc 2 of shard 1 is global doc 4.
        assert_eq!(db.doc_length(4)?, 4);
        assert_eq!(db.last_docid()?, 4);
        assert!(db.locate(0).is_err());
        Ok(())
    }
}
