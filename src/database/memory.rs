//! In-memory shard backend.
//!
//! Used for tests, benchmarks and the CLI. Shards are built once through
//! [`MemoryShardBuilder`] and are immutable afterwards, apart from
//! [`MemoryShard::close`], which makes every later read (including reads
//! through cursors that are already open) fail with a backend error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::database::{Shard, TermPostings, ValueCursor};
use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, DocId, TermCount, TermPos, TotalLength, ValueSlot};

/// Occurrences of one term in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    #[serde(default)]
    pub wdf: TermCount,
    #[serde(default)]
    pub positions: Vec<TermPos>,
}

/// A document as handed to the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub terms: BTreeMap<String, TermEntry>,
    #[serde(default)]
    pub values: BTreeMap<ValueSlot, String>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Add `wdf_inc` occurrences of `term` without positional information.
    pub fn with_term<S: Into<String>>(mut self, term: S, wdf_inc: TermCount) -> Self {
        self.terms.entry(term.into()).or_default().wdf += wdf_inc;
        self
    }

    /// Add one occurrence of `term` at `pos`.
    pub fn with_posting<S: Into<String>>(mut self, term: S, pos: TermPos) -> Self {
        let entry = self.terms.entry(term.into()).or_default();
        entry.wdf += 1;
        if let Err(i) = entry.positions.binary_search(&pos) {
            entry.positions.insert(i, pos);
        }
        self
    }

    /// Index whitespace-separated words, numbering positions from 1.
    pub fn with_text(mut self, text: &str) -> Self {
        for (i, word) in text.split_whitespace().enumerate() {
            self = self.with_posting(word.to_lowercase(), i as TermPos + 1);
        }
        self
    }

    pub fn with_value<S: Into<String>>(mut self, slot: ValueSlot, value: S) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    /// Sum of wdf over all terms.
    pub fn length(&self) -> TermCount {
        self.terms.values().map(|e| e.wdf).sum()
    }
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<Option<Document>>,
    doc_count: DocCount,
    postings: BTreeMap<String, Arc<Vec<(DocId, TermCount)>>>,
    all_docs: Arc<Vec<(DocId, TermCount)>>,
    values: BTreeMap<ValueSlot, Arc<Vec<(DocId, String)>>>,
    total_length: TotalLength,
    positions: bool,
    closed: AtomicBool,
}

impl Inner {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(LexmatchError::backend("database has been closed"))
        } else {
            Ok(())
        }
    }

    fn doc(&self, did: DocId) -> Result<&Document> {
        self.check_open()?;
        did.checked_sub(1)
            .and_then(|i| self.docs.get(i as usize))
            .and_then(|d| d.as_ref())
            .ok_or_else(|| LexmatchError::invalid_argument(format!("document {did} not found")))
    }
}

/// An immutable shard held in memory.
#[derive(Debug, Clone)]
pub struct MemoryShard {
    inner: Arc<Inner>,
}

/// Builder for [`MemoryShard`].
#[derive(Debug)]
pub struct MemoryShardBuilder {
    docs: Vec<Option<Document>>,
    positions: bool,
}

impl MemoryShardBuilder {
    /// Whether the built shard reports positional data. Defaults to true.
    pub fn positions(mut self, positions: bool) -> Self {
        self.positions = positions;
        self
    }

    /// Append a document with the next docid.
    pub fn add_document(mut self, doc: Document) -> Self {
        self.docs.push(Some(doc));
        self
    }

    pub fn add_documents<I: IntoIterator<Item = Document>>(mut self, docs: I) -> Self {
        self.docs.extend(docs.into_iter().map(Some));
        self
    }

    /// Leave a gap in the docid sequence (a deleted document).
    pub fn skip_docid(mut self) -> Self {
        self.docs.push(None);
        self
    }

    pub fn build(self) -> MemoryShard {
        let mut postings: BTreeMap<String, Vec<(DocId, TermCount)>> = BTreeMap::new();
        let mut values: BTreeMap<ValueSlot, Vec<(DocId, String)>> = BTreeMap::new();
        let mut all_docs = Vec::new();
        let mut total_length = 0;
        let mut doc_count = 0;

        for (i, doc) in self.docs.iter().enumerate() {
            let Some(doc) = doc else { continue };
            let did = i as DocId + 1;
            doc_count += 1;
            let len = doc.length();
            total_length += TotalLength::from(len);
            all_docs.push((did, len));
            for (term, entry) in &doc.terms {
                postings.entry(term.clone()).or_default().push((did, entry.wdf));
            }
            for (slot, value) in &doc.values {
                if !value.is_empty() {
                    values.entry(*slot).or_default().push((did, value.clone()));
                }
            }
        }

        MemoryShard {
            inner: Arc::new(Inner {
                docs: self.docs,
                doc_count,
                postings: postings.into_iter().map(|(t, p)| (t, Arc::new(p))).collect(),
                all_docs: Arc::new(all_docs),
                values: values.into_iter().map(|(s, v)| (s, Arc::new(v))).collect(),
                total_length,
                positions: self.positions,
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl MemoryShard {
    pub fn builder() -> MemoryShardBuilder {
        MemoryShardBuilder {
            docs: Vec::new(),
            positions: true,
        }
    }

    pub fn from_documents<I: IntoIterator<Item = Document>>(docs: I) -> Self {
        Self::builder().add_documents(docs).build()
    }

    /// Make every subsequent read fail, including through open cursors.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    fn list(&self, term: &str) -> Arc<Vec<(DocId, TermCount)>> {
        if term.is_empty() {
            return Arc::clone(&self.inner.all_docs);
        }
        self.inner
            .postings
            .get(term)
            .map(Arc::clone)
            .unwrap_or_default()
    }
}

impl Shard for MemoryShard {
    fn doc_count(&self) -> Result<DocCount> {
        self.inner.check_open()?;
        Ok(self.inner.doc_count)
    }

    fn last_docid(&self) -> Result<DocId> {
        self.inner.check_open()?;
        Ok(self.inner.all_docs.last().map_or(0, |&(did, _)| did))
    }

    fn total_length(&self) -> Result<TotalLength> {
        self.inner.check_open()?;
        Ok(self.inner.total_length)
    }

    fn doclength_bounds(&self) -> Result<(TermCount, TermCount)> {
        self.inner.check_open()?;
        let lens = self.inner.all_docs.iter().map(|&(_, len)| len);
        let lo = lens.clone().filter(|&l| l > 0).min().unwrap_or(0);
        let hi = lens.max().unwrap_or(0);
        Ok((lo, hi))
    }

    fn unique_terms_bounds(&self) -> Result<(TermCount, TermCount)> {
        self.inner.check_open()?;
        let counts = self
            .inner
            .docs
            .iter()
            .flatten()
            .map(|d| d.terms.len() as TermCount);
        let lo = counts.clone().min().unwrap_or(0);
        let hi = counts.max().unwrap_or(0);
        Ok((lo, hi))
    }

    fn has_positions(&self) -> bool {
        self.inner.positions
    }

    fn term_freqs(&self, term: &str) -> Result<(DocCount, u64)> {
        self.inner.check_open()?;
        let list = self.list(term);
        let cf = list.iter().map(|&(_, wdf)| u64::from(wdf)).sum();
        Ok((list.len() as DocCount, cf))
    }

    fn wdf_upper_bound(&self, term: &str) -> Result<TermCount> {
        self.inner.check_open()?;
        Ok(self.list(term).iter().map(|&(_, wdf)| wdf).max().unwrap_or(0))
    }

    fn postings(&self, term: &str) -> Result<Box<dyn TermPostings>> {
        self.inner.check_open()?;
        Ok(Box::new(MemoryPostings {
            shard: Arc::clone(&self.inner),
            list: self.list(term),
            index: None,
        }))
    }

    fn positions(&self, did: DocId, term: &str) -> Result<Vec<TermPos>> {
        let doc = self.inner.doc(did)?;
        if !self.inner.positions {
            return Ok(Vec::new());
        }
        Ok(doc
            .terms
            .get(term)
            .map(|e| e.positions.clone())
            .unwrap_or_default())
    }

    fn doc_length(&self, did: DocId) -> Result<TermCount> {
        Ok(self.inner.doc(did)?.length())
    }

    fn unique_terms(&self, did: DocId) -> Result<TermCount> {
        Ok(self.inner.doc(did)?.terms.len() as TermCount)
    }

    fn term_list(&self, did: DocId) -> Result<Vec<(String, TermCount)>> {
        let doc = self.inner.doc(did)?;
        Ok(doc.terms.iter().map(|(t, e)| (t.clone(), e.wdf)).collect())
    }

    fn wdf_doc_max(&self, did: DocId) -> Result<TermCount> {
        let doc = self.inner.doc(did)?;
        Ok(doc.terms.values().map(|e| e.wdf).max().unwrap_or(0))
    }

    fn all_terms(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.check_open()?;
        Ok(self
            .inner
            .postings
            .range(prefix.to_string()..)
            .take_while(|(t, _)| t.starts_with(prefix))
            .map(|(t, _)| t.clone())
            .collect())
    }

    fn value(&self, did: DocId, slot: ValueSlot) -> Result<String> {
        let doc = self.inner.doc(did)?;
        Ok(doc.values.get(&slot).cloned().unwrap_or_default())
    }

    fn values(&self, slot: ValueSlot) -> Result<Box<dyn ValueCursor>> {
        self.inner.check_open()?;
        let list = self.inner.values.get(&slot).map(Arc::clone).unwrap_or_default();
        Ok(Box::new(MemoryValues {
            shard: Arc::clone(&self.inner),
            list,
            index: None,
        }))
    }

    fn value_freq(&self, slot: ValueSlot) -> Result<DocCount> {
        self.inner.check_open()?;
        Ok(self.inner.values.get(&slot).map_or(0, |v| v.len() as DocCount))
    }

    fn value_bounds(&self, slot: ValueSlot) -> Result<Option<(String, String)>> {
        self.inner.check_open()?;
        let Some(list) = self.inner.values.get(&slot) else {
            return Ok(Some((String::new(), String::new())));
        };
        let lo = list.iter().map(|(_, v)| v).min().cloned().unwrap_or_default();
        let hi = list.iter().map(|(_, v)| v).max().cloned().unwrap_or_default();
        Ok(Some((lo, hi)))
    }
}

/// Position within a sorted `(docid, payload)` list.
fn seek<T>(list: &[(DocId, T)], from: usize, did: DocId) -> usize {
    from + list[from..].partition_point(|(d, _)| *d < did)
}

#[derive(Debug)]
struct MemoryPostings {
    shard: Arc<Inner>,
    list: Arc<Vec<(DocId, TermCount)>>,
    index: Option<usize>,
}

impl TermPostings for MemoryPostings {
    fn docid(&self) -> DocId {
        self.index
            .and_then(|i| self.list.get(i))
            .map_or(0, |&(did, _)| did)
    }

    fn wdf(&self) -> TermCount {
        self.index
            .and_then(|i| self.list.get(i))
            .map_or(0, |&(_, wdf)| wdf)
    }

    fn at_end(&self) -> bool {
        self.index.is_some_and(|i| i >= self.list.len())
    }

    fn next(&mut self) -> Result<()> {
        self.shard.check_open()?;
        self.index = Some(self.index.map_or(0, |i| i + 1));
        Ok(())
    }

    fn skip_to(&mut self, did: DocId) -> Result<()> {
        self.shard.check_open()?;
        let from = self.index.unwrap_or(0).min(self.list.len());
        self.index = Some(seek(&self.list, from, did));
        Ok(())
    }

    fn termfreq(&self) -> DocCount {
        self.list.len() as DocCount
    }
}

#[derive(Debug)]
struct MemoryValues {
    shard: Arc<Inner>,
    list: Arc<Vec<(DocId, String)>>,
    index: Option<usize>,
}

impl ValueCursor for MemoryValues {
    fn docid(&self) -> DocId {
        self.index
            .and_then(|i| self.list.get(i))
            .map_or(0, |(did, _)| *did)
    }

    fn value(&self) -> &str {
        self.index
            .and_then(|i| self.list.get(i))
            .map_or("", |(_, v)| v.as_str())
    }

    fn at_end(&self) -> bool {
        self.index.is_some_and(|i| i >= self.list.len())
    }

    fn next(&mut self) -> Result<()> {
        self.shard.check_open()?;
        self.index = Some(self.index.map_or(0, |i| i + 1));
        Ok(())
    }

    fn skip_to(&mut self, did: DocId) -> Result<()> {
        self.shard.check_open()?;
        let from = self.index.unwrap_or(0).min(self.list.len());
        self.index = Some(seek(&self.list, from, did));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard() -> MemoryShard {
        MemoryShard::builder()
            .add_document(Document::new().with_text("the cat sat").with_value(0, "b"))
            .skip_docid()
            .add_document(Document::new().with_text("the dog the end").with_value(0, "a"))
            .build()
    }

    #[test]
    fn test_postings_cursor() -> Result<()> {
        let s = shard();
        let mut p = s.postings("the")?;
        assert!(!p.at_end());
        p.next()?;
        assert_eq!((p.docid(), p.wdf()), (1, 1));
        p.next()?;
        assert_eq!((p.docid(), p.wdf()), (3, 2));
        p.next()?;
        assert!(p.at_end());

        let mut p = s.postings("the")?;
        p.skip_to(2)?;
        assert_eq!(p.docid(), 3);
        Ok(())
    }

    #[test]
    fn test_statistics() -> Result<()> {
        let s = shard();
        assert_eq!(s.doc_count()?, 2);
        assert_eq!(s.last_docid()?, 3);
        assert_eq!(s.total_length()?, 7);
        assert_eq!(s.term_freqs("the")?, (2, 3));
        assert_eq!(s.term_freqs("")?, (2, 7));
        assert_eq!(s.positions(3, "the")?, vec![1, 3]);
        assert_eq!(s.all_terms("d")?, vec!["dog"]);
        assert_eq!(s.value_bounds(0)?, Some(("a".to_string(), "b".to_string())));
        Ok(())
    }

    #[test]
    fn test_closed_shard_fails_open_cursor() -> Result<()> {
        let s = shard();
        let mut p = s.postings("cat")?;
        s.close();
        assert!(matches!(p.next(), Err(LexmatchError::Backend(_))));
        assert!(s.doc_count().is_err());
        Ok(())
    }

    #[test]
    fn test_cursor_outlives_shard_handle() -> Result<()> {
        let mut p = {
            let s = shard();
            s.postings("dog")?
        };
        p.next()?;
        assert_eq!(p.docid(), 3);
        Ok(())
    }
}
