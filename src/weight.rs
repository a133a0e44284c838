//! Weighting schemes.
//!
//! A [`Weight`] turns collection and document statistics into a score
//! contribution. The caller supplies one prototype; for every weighted leaf
//! the compiler clones it and calls [`Weight::init`] with that leaf's
//! statistics. One extra clone, initialised with term-less statistics and a
//! factor of 0, supplies the per-document term-independent part
//! ([`Weight::sumextra`]); it is initialised even for queries without any
//! weighted term.

pub mod bm25;
pub mod dfr;
pub mod lm;
pub mod simple;
pub mod tfidf;
pub mod trad;

use std::fmt::Debug;

use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, TermCount, TotalLength};

pub use bm25::{BM25PlusWeight, BM25Weight};
pub use dfr::{
    BB2Weight, DLHWeight, DPHWeight, IfB2Weight, InL2Weight, IneB2Weight, PL2PlusWeight, PL2Weight,
};
pub use lm::{LM2StageWeight, LMAbsDiscountWeight, LMDirichletWeight, LMJMWeight};
pub use simple::{BoolWeight, CoordWeight, DiceCoeffWeight};
pub use tfidf::TfIdfWeight;
pub use trad::TradWeight;

/// Statistics available to a weight when it is initialised.
///
/// The term-specific fields are zero for the term-independent clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightStats {
    /// Number of documents in the collection.
    pub collection_size: DocCount,
    /// Number of documents in the relevance set.
    pub rset_size: DocCount,
    pub total_length: TotalLength,
    pub average_length: f64,
    pub doclength_lower_bound: TermCount,
    pub doclength_upper_bound: TermCount,
    pub unique_terms_lower_bound: TermCount,
    pub unique_terms_upper_bound: TermCount,
    /// Sum of wqf over every leaf of the query.
    pub query_length: TermCount,

    /// Within-query frequency of this term.
    pub wqf: TermCount,
    pub termfreq: DocCount,
    pub reltermfreq: DocCount,
    pub collection_freq: u64,
    pub wdf_upper_bound: TermCount,
}

/// A weighting scheme.
///
/// Implementations must return finite, non-negative values from every
/// method, including for degenerate statistics (a term in every document, a
/// zero-length document, a one-document collection). `maxpart` must bound
/// `sumpart` from above for every wdf/doclen the statistics allow, and
/// `maxextra` likewise bounds `sumextra`; the matcher relies on both to skip
/// documents that cannot make the result set.
pub trait Weight: Debug + Send + Sync {
    /// Short scheme name, as used in parameter strings ("bm25", "tfidf").
    fn name(&self) -> &'static str;

    /// Parameters in the form accepted by the scheme's parameter parser.
    fn parameters(&self) -> String;

    fn clone_box(&self) -> Box<dyn Weight>;

    /// Prepare for scoring with `stats`. `factor` scales every value this
    /// object returns; a factor of 0 marks the term-independent clone.
    fn init(&mut self, stats: &WeightStats, factor: f64);

    /// Contribution of a matching term to a document. `wdf_doc_max` is the
    /// highest wdf of any term in the document; it is only looked up for
    /// schemes whose [`Weight::needs_wdf_doc_max`] is true and is 0 otherwise.
    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        uniqterms: TermCount,
        wdf_doc_max: TermCount,
    ) -> f64;

    /// Upper bound on `sumpart`.
    fn maxpart(&self) -> f64;

    /// Term-independent per-document contribution.
    fn sumextra(&self, _doclen: TermCount, _uniqterms: TermCount) -> f64 {
        0.0
    }

    /// Upper bound on `sumextra`.
    fn maxextra(&self) -> f64 {
        0.0
    }

    /// True if [`Weight::sumpart`] uses the document's maximum wdf.
    fn needs_wdf_doc_max(&self) -> bool {
        false
    }

    /// True if this scheme never assigns any weight.
    fn is_bool(&self) -> bool {
        false
    }

    /// Description including parameters, e.g. `bm25 1 0 1 0.5 0.5`.
    fn description(&self) -> String {
        let params = self.parameters();
        if params.is_empty() {
            self.name().to_string()
        } else {
            format!("{} {}", self.name(), params)
        }
    }
}

impl Clone for Box<dyn Weight> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Replace NaN and infinities with 0 and clamp negatives to 0.
pub(crate) fn sanitise(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Split a parameter string into at most `max` numbers.
///
/// Errors name the scheme and the offending parameter, matching the
/// diagnostic style of the parameter parser for each weight.
pub(crate) fn parse_numbers(scheme: &str, params: &str, names: &[&str]) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (i, token) in params.split_whitespace().enumerate() {
        let Some(name) = names.get(i) else {
            return Err(LexmatchError::invalid_argument(format!(
                "Extra data after parameters: '{scheme}'"
            )));
        };
        let value: f64 = token.parse().map_err(|_| {
            LexmatchError::invalid_argument(format!("Parameter {name} is invalid: '{scheme}'"))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// The value of parameter `i`, or `default` if it was not supplied.
pub(crate) fn param_or(values: &[f64], i: usize, default: f64) -> f64 {
    values.get(i).copied().unwrap_or(default)
}

/// `w * log2(1 + c * avlen / len)`, the second wdf normalisation.
pub(crate) fn wdfn_h2(wdf: f64, c_avlen: f64, len: f64) -> f64 {
    if len <= 0.0 {
        return wdf;
    }
    wdf * (1.0 + c_avlen / len).log2()
}
