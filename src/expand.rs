//! Query expansion from a relevance set.
//!
//! Candidates are the terms indexing the relevant documents. Each is scored
//! with an [`ExpandWeight`] from statistics gathered over those documents,
//! filtered, and the best are returned as an [`ESet`].

pub mod eset;
pub mod weight;

use std::collections::BTreeSet;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, DocId, TermCount};

pub use eset::{ESet, ESetItem};
pub use weight::{ExpandStats, ExpandWeight};

/// Documents the caller has marked as relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RSet {
    docids: BTreeSet<DocId>,
}

impl RSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, did: DocId) -> Result<()> {
        if did == 0 {
            return Err(LexmatchError::invalid_argument("Docid 0 not valid"));
        }
        self.docids.insert(did);
        Ok(())
    }

    pub fn remove_document(&mut self, did: DocId) -> Result<()> {
        if did == 0 {
            return Err(LexmatchError::invalid_argument("Docid 0 not valid"));
        }
        self.docids.remove(&did);
        Ok(())
    }

    pub fn contains(&self, did: DocId) -> bool {
        self.docids.contains(&did)
    }

    pub fn len(&self) -> usize {
        self.docids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docids.is_empty()
    }

    /// Docids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docids.iter().copied()
    }
}

impl FromIterator<DocId> for RSet {
    /// Builds a set, skipping the invalid docid 0.
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        RSet {
            docids: iter.into_iter().filter(|&d| d != 0).collect(),
        }
    }
}

/// Decides whether a term may be suggested.
pub trait ExpandDecider: Send + Sync {
    fn accept(&self, term: &str) -> bool;
}

impl<F> ExpandDecider for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, term: &str) -> bool {
        self(term)
    }
}

/// Accepts only terms starting with a prefix.
#[derive(Debug, Clone)]
pub struct PrefixExpandDecider {
    prefix: String,
}

impl PrefixExpandDecider {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        PrefixExpandDecider { prefix: prefix.into() }
    }
}

impl ExpandDecider for PrefixExpandDecider {
    fn accept(&self, term: &str) -> bool {
        term.starts_with(&self.prefix)
    }
}

/// Rejects a fixed list of terms.
#[derive(Debug, Clone, Default)]
pub struct StopTermsExpandDecider {
    terms: AHashSet<String>,
}

impl StopTermsExpandDecider {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopTermsExpandDecider {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExpandDecider for StopTermsExpandDecider {
    fn accept(&self, term: &str) -> bool {
        !self.terms.contains(term)
    }
}

/// Options for an expansion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    /// `"trad"` or `"bo1"`.
    pub scheme: String,
    /// Parameter of the `trad` scheme.
    pub k: f64,
    /// Only terms weighing more than this are suggested.
    pub min_weight: f64,
    /// Allow terms already in the query.
    pub include_query_terms: bool,
    /// On a sharded database, look up each term's frequency across every
    /// shard instead of extrapolating from the shards holding relevant
    /// documents.
    pub use_exact_termfreq: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            scheme: "trad".to_string(),
            k: 1.0,
            min_weight: 0.0,
            include_query_terms: false,
            use_exact_termfreq: false,
        }
    }
}

impl ExpandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }

    pub fn with_include_query_terms(mut self, include: bool) -> Self {
        self.include_query_terms = include;
        self
    }

    pub fn with_use_exact_termfreq(mut self, exact: bool) -> Self {
        self.use_exact_termfreq = exact;
        self
    }

    /// The configured weighting scheme.
    pub fn weight(&self) -> Result<ExpandWeight> {
        ExpandWeight::from_name(&self.scheme, self.k)
    }
}

#[derive(Debug, Default)]
struct Candidate {
    stats: ExpandStats,
    /// Shards holding at least one relevant document with this term.
    shards: BTreeSet<usize>,
}

/// Builds an [`ESet`] from a relevance set.
pub struct Expander<'a> {
    db: &'a Database,
    options: &'a ExpandOptions,
    decider: Option<&'a dyn ExpandDecider>,
}

impl<'a> Expander<'a> {
    pub fn new(db: &'a Database, options: &'a ExpandOptions) -> Self {
        Expander {
            db,
            options,
            decider: None,
        }
    }

    pub fn with_decider(mut self, decider: Option<&'a dyn ExpandDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Suggest up to `maxitems` terms. `query_terms` are excluded unless
    /// the options include them.
    pub fn expand(&self, rset: &RSet, query_terms: &[String], maxitems: TermCount) -> Result<ESet> {
        let scheme = self.options.weight()?;
        if rset.is_empty() || maxitems == 0 {
            return Ok(ESet::default());
        }
        let avlen = self.db.average_length()?;
        let k = scheme.k();
        let rsize = rset.len() as DocCount;

        let mut candidates: AHashMap<String, Candidate> = AHashMap::new();
        for did in rset.iter() {
            let (shard, _) = self.db.locate(did)?;
            let doclen = self.db.doc_length(did)?;
            for (term, wdf) in self.db.term_list(did)? {
                let candidate = candidates.entry(term).or_default();
                candidate.stats.accumulate(wdf, doclen, k, avlen);
                candidate.shards.insert(shard);
            }
        }

        let excluded: AHashSet<&str> = if self.options.include_query_terms {
            AHashSet::new()
        } else {
            query_terms.iter().map(String::as_str).collect()
        };

        let mut items = Vec::new();
        for (term, mut candidate) in candidates {
            if excluded.contains(term.as_str()) {
                continue;
            }
            if let Some(decider) = self.decider {
                if !decider.accept(&term) {
                    continue;
                }
            }
            candidate.stats.rsize = rsize;
            self.fill_frequencies(&term, &mut candidate)?;
            let weight = scheme.weight(&candidate.stats);
            if weight > self.options.min_weight {
                items.push(ESetItem { term, weight });
            }
        }

        let ebound = items.len() as TermCount;
        items.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.term.cmp(&b.term)));
        items.truncate(maxitems as usize);
        log::debug!(
            "expanded {} relevant documents: {} of {} candidate terms kept ({})",
            rsize,
            items.len(),
            ebound,
            scheme.name()
        );
        Ok(ESet { items, ebound })
    }

    fn fill_frequencies(&self, term: &str, candidate: &mut Candidate) -> Result<()> {
        let stats = &mut candidate.stats;
        let all_seen = candidate.shards.len() == self.db.shard_count();
        if self.options.use_exact_termfreq || all_seen {
            let (termfreq, collfreq) = self.db.term_freqs(term)?;
            stats.dbsize = self.db.doc_count()?;
            stats.termfreq = termfreq;
            stats.collection_freq = collfreq;
            return Ok(());
        }
        // Extrapolate from the shards holding relevant documents.
        let mut sub_size: DocCount = 0;
        let mut sub_tf: DocCount = 0;
        let mut sub_cf: u64 = 0;
        for &i in &candidate.shards {
            let Some(shard) = self.db.shards().get(i) else {
                continue;
            };
            let (tf, cf) = shard.term_freqs(term)?;
            sub_size += shard.doc_count()?;
            sub_tf += tf;
            sub_cf += cf;
        }
        let dbsize = self.db.doc_count()?;
        let ratio = if sub_size > 0 {
            f64::from(dbsize) / f64::from(sub_size)
        } else {
            1.0
        };
        stats.dbsize = dbsize;
        stats.termfreq = ((f64::from(sub_tf) * ratio).round() as DocCount)
            .max(stats.rtermfreq)
            .min(dbsize);
        stats.collection_freq = ((sub_cf as f64 * ratio).round() as u64).max(stats.rcollection_freq);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::{Document, MemoryShard};

    fn db() -> Database {
        let texts = [
            "rust compiler borrow checker",
            "rust borrow lifetimes",
            "python interpreter",
            "rust cargo crates",
            "java virtual machine",
            "python packages",
        ];
        Database::single(Arc::new(MemoryShard::from_documents(
            texts.iter().map(|t| Document::new().with_text(t)),
        )))
    }

    #[test]
    fn test_rset_rejects_docid_zero() {
        let mut rset = RSet::new();
        assert!(matches!(rset.add_document(0), Err(LexmatchError::InvalidArgument(_))));
        assert!(rset.add_document(3).is_ok());
        assert!(rset.contains(3));
        assert_eq!(rset.len(), 1);
        let collected: RSet = [0, 2, 2, 1].into_iter().collect();
        assert_eq!(collected.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_expand_suggests_shared_terms() -> Result<()> {
        let db = db();
        let rset: RSet = [1, 2].into_iter().collect();
        let options = ExpandOptions::default();
        let eset = Expander::new(&db, &options).expand(&rset, &["rust".to_string()], 3)?;
        assert_eq!(eset.size(), 3);
        assert_eq!(eset.get(0).map(|i| i.term.as_str()), Some("borrow"));
        assert!(!eset.terms().contains(&"rust"));
        assert!(eset.ebound() >= eset.size() as u32);
        let weights: Vec<f64> = eset.iter().map(|i| i.weight).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        Ok(())
    }

    #[test]
    fn test_include_query_terms_and_decider() -> Result<()> {
        let db = db();
        let rset: RSet = [1, 2].into_iter().collect();
        let options = ExpandOptions::default().with_include_query_terms(true);
        let eset = Expander::new(&db, &options).expand(&rset, &["rust".to_string()], 10)?;
        assert!(eset.terms().contains(&"rust"));

        let decider = PrefixExpandDecider::new("b");
        let eset = Expander::new(&db, &options)
            .with_decider(Some(&decider))
            .expand(&rset, &[], 10)?;
        assert_eq!(eset.terms(), vec!["borrow"]);
        Ok(())
    }

    #[test]
    fn test_unknown_scheme_is_an_argument_error() {
        let db = db();
        let rset: RSet = [1].into_iter().collect();
        let options = ExpandOptions::default().with_scheme("nonsense");
        let err = Expander::new(&db, &options).expand(&rset, &[], 10);
        assert!(matches!(err, Err(LexmatchError::InvalidArgument(_))));
    }

    #[test]
    fn test_bo1_ranks_borrow_first() -> Result<()> {
        let db = db();
        let rset: RSet = [1, 2].into_iter().collect();
        let options = ExpandOptions::default().with_scheme("bo1");
        let eset = Expander::new(&db, &options).expand(&rset, &["rust".to_string()], 1)?;
        assert_eq!(eset.terms(), vec!["borrow"]);
        Ok(())
    }
}
