//! The caller-facing search session.
//!
//! An [`Enquire`] holds a database, a query and the settings for running
//! it. Each call to [`Enquire::evaluate`] compiles a fresh posting-list
//! tree with fresh weight objects, so repeated calls are independent and
//! give identical results.

use std::sync::Arc;

use ahash::AHashSet;

use crate::compiler::QueryCompiler;
use crate::database::Database;
use crate::error::Result;
use crate::expand::{ESet, ExpandDecider, ExpandOptions, Expander, RSet};
use crate::matcher::{MatchDecider, MatchOptions, Matcher, SharedSpy};
use crate::mset::MSet;
use crate::query::Query;
use crate::types::{DocCount, DocId, TermCount};
use crate::weight::{BM25Weight, Weight};

/// Runs queries and expansions against one database.
pub struct Enquire {
    db: Database,
    query: Query,
    weight: Box<dyn Weight>,
    options: MatchOptions,
    decider: Option<Arc<dyn MatchDecider>>,
    spies: Vec<SharedSpy>,
    expand_options: ExpandOptions,
    expand_decider: Option<Arc<dyn ExpandDecider>>,
}

impl Enquire {
    /// A session with an empty query and BM25 weighting.
    pub fn new(db: Database) -> Self {
        Enquire {
            db,
            query: Query::new(),
            weight: Box::new(BM25Weight::default()),
            options: MatchOptions::default(),
            decider: None,
            spies: Vec::new(),
            expand_options: ExpandOptions::default(),
            expand_decider: None,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn set_query(&mut self, query: Query) {
        self.query = query;
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn set_weighting_scheme(&mut self, weight: Box<dyn Weight>) {
        self.weight = weight;
    }

    pub fn weighting_scheme(&self) -> &dyn Weight {
        self.weight.as_ref()
    }

    pub fn set_options(&mut self, options: MatchOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut MatchOptions {
        &mut self.options
    }

    pub fn set_match_decider(&mut self, decider: Option<Arc<dyn MatchDecider>>) {
        self.decider = decider;
    }

    /// Add a spy. Spies see candidates in the order they were added.
    pub fn add_match_spy(&mut self, spy: SharedSpy) {
        self.spies.push(spy);
    }

    pub fn clear_match_spies(&mut self) {
        self.spies.clear();
    }

    pub fn set_expand_options(&mut self, options: ExpandOptions) {
        self.expand_options = options;
    }

    pub fn set_expand_decider(&mut self, decider: Option<Arc<dyn ExpandDecider>>) {
        self.expand_decider = decider;
    }

    /// Run the query, returning up to `maxitems` results from rank
    /// `first`. `rset` feeds relevance statistics into weights that use
    /// them.
    pub fn evaluate(&self, first: DocCount, maxitems: DocCount, rset: Option<&RSet>) -> Result<MSet> {
        log::debug!("evaluating {} (first {first}, maxitems {maxitems})", self.query.description());
        let compiled = QueryCompiler::new(&self.db, self.weight.as_ref(), rset, &self.query)?.compile(&self.query)?;
        Matcher::new(&self.db, &self.options)
            .with_decider(self.decider.as_deref())
            .with_spies(&self.spies)
            .run(compiled, first, maxitems)
    }

    /// Suggest up to `maxitems` terms to add to the query, given documents
    /// known to be relevant.
    pub fn expand(&self, rset: &RSet, maxitems: TermCount) -> Result<ESet> {
        let query_terms = self.query.terms();
        Expander::new(&self.db, &self.expand_options)
            .with_decider(self.expand_decider.as_deref())
            .expand(rset, &query_terms, maxitems)
    }

    /// The distinct terms of the query, in the order they first appear.
    pub fn query_terms(&self) -> Vec<String> {
        self.query.terms()
    }

    /// Query terms with their collection frequencies.
    pub fn query_term_freqs(&self) -> Result<Vec<(String, DocCount)>> {
        self.query
            .terms()
            .into_iter()
            .map(|term| {
                let tf = self.db.termfreq(&term)?;
                Ok((term, tf))
            })
            .collect()
    }

    /// The query terms indexing document `did`, in query order.
    pub fn matching_terms(&self, did: DocId) -> Result<Vec<String>> {
        let indexed: AHashSet<String> = self.db.term_list(did)?.into_iter().map(|(t, _)| t).collect();
        Ok(self
            .query
            .terms()
            .into_iter()
            .filter(|t| indexed.contains(t))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::database::{Document, MemoryShard};
    use crate::matcher::ValueCountMatchSpy;

    fn enquire() -> Enquire {
        let texts = ["red fish", "blue fish", "red apple", "green fish fish"];
        let docs = texts.iter().map(|t| {
            let colour = t.split_whitespace().next().unwrap_or_default();
            Document::new().with_text(t).with_value(0, colour)
        });
        Enquire::new(Database::single(Arc::new(MemoryShard::from_documents(docs))))
    }

    #[test]
    fn test_evaluate_and_matching_terms() -> Result<()> {
        let mut enquire = enquire();
        enquire.set_query(Query::or(Query::term("red"), Query::term("fish")));
        let mset = enquire.evaluate(0, 10, None)?;
        assert_eq!(mset.size(), 4);
        assert_eq!(mset.get(0).map(|i| i.docid), Some(1));
        assert_eq!(enquire.query_terms(), vec!["red".to_string(), "fish".to_string()]);
        assert_eq!(enquire.matching_terms(1)?, vec!["red".to_string(), "fish".to_string()]);
        assert_eq!(enquire.matching_terms(3)?, vec!["red".to_string()]);
        assert_eq!(enquire.query_term_freqs()?, vec![("red".to_string(), 2), ("fish".to_string(), 3)]);
        Ok(())
    }

    #[test]
    fn test_repeat_evaluation_is_identical() -> Result<()> {
        let mut enquire = enquire();
        enquire.set_query(Query::term("fish"));
        let a = enquire.evaluate(0, 10, None)?;
        let b = enquire.evaluate(0, 10, None)?;
        assert_eq!(a.items(), b.items());
        assert_eq!(a.bounds(), b.bounds());
        Ok(())
    }

    #[test]
    fn test_spy_and_expand() -> Result<()> {
        let mut enquire = enquire();
        enquire.set_query(Query::term("fish"));
        let spy = Arc::new(Mutex::new(ValueCountMatchSpy::new(0)));
        enquire.add_match_spy(spy.clone());
        enquire.evaluate(0, 10, None)?;
        assert_eq!(spy.lock().total(), 3);

        let rset: RSet = [1, 3].into_iter().collect();
        let eset = enquire.expand(&rset, 5)?;
        assert_eq!(eset.get(0).map(|i| i.term.as_str()), Some("red"));
        assert!(!eset.terms().contains(&"fish"));
        Ok(())
    }
}
