//! Unigram language-model weighting.
//!
//! Each scheme scores `log` of a smoothed document model relative to the
//! collection model. Terms with no occurrences in the collection, or a
//! collection with no text at all, get a multiplier of 0.

use crate::error::Result;
use crate::types::{TermCount, TotalLength};
use crate::weight::{Weight, WeightStats, param_or, parse_numbers, sanitise};

/// `total_length / collection_freq`, or `None` when either is 0.
fn collection_ratio(stats: &WeightStats) -> Option<f64> {
    let total: TotalLength = stats.total_length;
    if total == 0 || stats.collection_freq == 0 {
        return None;
    }
    Some(total as f64 / stats.collection_freq as f64)
}

/// Jelinek-Mercer smoothing.
///
/// A `lambda` outside (0, 1) selects a value from the query length: 0.1
/// for short queries rising to 0.7 for long ones.
#[derive(Debug, Clone, Default)]
pub struct LMJMWeight {
    lambda: f64,
    factor: f64,
    multiplier: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl LMJMWeight {
    pub fn new(lambda: f64) -> Self {
        LMJMWeight {
            lambda,
            ..LMJMWeight::default()
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("lmjm", params, &["lambda"])?;
        Ok(LMJMWeight::new(param_or(&v, 0, 0.0)))
    }
}

impl Weight for LMJMWeight {
    fn name(&self) -> &'static str {
        "lmjm"
    }

    fn parameters(&self) -> String {
        self.lambda.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.factor = factor * f64::from(stats.wqf);
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        let Some(ratio) = collection_ratio(stats) else {
            self.multiplier = 0.0;
            return;
        };
        let mut lambda = self.lambda;
        if lambda <= 0.0 || lambda >= 1.0 {
            let qlen = stats.query_length;
            lambda = if qlen <= 2 {
                0.1
            } else if qlen < 8 {
                f64::from(qlen - 1) * 0.1
            } else {
                0.7
            };
        }
        self.multiplier = (1.0 - lambda) * ratio / lambda;
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if doclen == 0 {
            return 0.0;
        }
        let w = self.multiplier * f64::from(wdf) / f64::from(doclen);
        sanitise(self.factor * w.ln_1p())
    }

    fn maxpart(&self) -> f64 {
        let mut w = self.multiplier;
        if self.wdf_upper_bound < self.doclength_lower_bound {
            w *= f64::from(self.wdf_upper_bound) / f64::from(self.doclength_lower_bound);
        }
        sanitise(self.factor * w.ln_1p())
    }
}

/// Dirichlet smoothing, with an optional `delta` lower bound on the
/// contribution of any matching term.
#[derive(Debug, Clone)]
pub struct LMDirichletWeight {
    mu: f64,
    delta: f64,
    factor: f64,
    multiplier: f64,
    extra_offset: f64,
    query_length: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl Default for LMDirichletWeight {
    fn default() -> Self {
        LMDirichletWeight::new(2000.0, 0.05)
    }
}

impl LMDirichletWeight {
    pub fn new(mu: f64, delta: f64) -> Self {
        LMDirichletWeight {
            mu: mu.max(0.0),
            delta: delta.max(0.0),
            factor: 0.0,
            multiplier: 0.0,
            extra_offset: 0.0,
            query_length: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("lmdirichlet", params, &["mu", "delta"])?;
        Ok(LMDirichletWeight::new(
            param_or(&v, 0, 2000.0),
            param_or(&v, 1, 0.05),
        ))
    }
}

impl Weight for LMDirichletWeight {
    fn name(&self) -> &'static str {
        "lmdirichlet"
    }

    fn parameters(&self) -> String {
        format!("{} {}", self.mu, self.delta)
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.factor = factor * f64::from(stats.wqf);
        self.query_length = f64::from(stats.query_length);
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        self.extra_offset =
            self.query_length * (f64::from(stats.doclength_upper_bound) + self.mu).ln();
        if self.factor == 0.0 {
            return;
        }
        let Some(ratio) = collection_ratio(stats) else {
            self.multiplier = 0.0;
            return;
        };
        self.multiplier = ratio / self.mu;
        if self.delta != 0.0 {
            self.factor *= (self.delta * self.multiplier).ln_1p();
        }
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        _doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        sanitise(self.factor * (f64::from(wdf) * self.multiplier).ln_1p())
    }

    fn maxpart(&self) -> f64 {
        sanitise(self.factor * (f64::from(self.wdf_upper_bound) * self.multiplier).ln_1p())
    }

    fn sumextra(&self, doclen: TermCount, _uniqterms: TermCount) -> f64 {
        sanitise(self.extra_offset - self.query_length * (f64::from(doclen) + self.mu).ln())
    }

    fn maxextra(&self) -> f64 {
        let doclen_min = f64::from(self.doclength_lower_bound);
        sanitise(self.extra_offset - self.query_length * (doclen_min + self.mu).ln())
    }
}

/// Absolute discount smoothing.
#[derive(Debug, Clone)]
pub struct LMAbsDiscountWeight {
    delta: f64,
    factor: f64,
    multiplier: f64,
    extra_offset: f64,
    query_length: f64,
    wdf_upper_bound: TermCount,
}

impl Default for LMAbsDiscountWeight {
    fn default() -> Self {
        LMAbsDiscountWeight::new(0.7)
    }
}

impl LMAbsDiscountWeight {
    pub fn new(delta: f64) -> Self {
        LMAbsDiscountWeight {
            delta: delta.max(0.0),
            factor: 0.0,
            multiplier: 0.0,
            extra_offset: 0.0,
            query_length: 0.0,
            wdf_upper_bound: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("lmabsdiscount", params, &["delta"])?;
        Ok(LMAbsDiscountWeight::new(param_or(&v, 0, 0.7)))
    }
}

impl Weight for LMAbsDiscountWeight {
    fn name(&self) -> &'static str {
        "lmabsdiscount"
    }

    fn parameters(&self) -> String {
        self.delta.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.factor = factor * f64::from(stats.wqf);
        self.query_length = f64::from(stats.query_length);
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.extra_offset = self.query_length * f64::from(stats.doclength_upper_bound.max(1)).ln();
        self.multiplier = match collection_ratio(stats) {
            Some(ratio) if self.delta > 0.0 => ratio / self.delta,
            _ => 0.0,
        };
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        _doclen: TermCount,
        uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        let x = (f64::from(wdf) - self.delta) / f64::from(uniqterms.max(1)) * self.multiplier;
        sanitise(self.factor * x.ln_1p())
    }

    fn maxpart(&self) -> f64 {
        // Every matching document has at least one distinct term.
        let x = (f64::from(self.wdf_upper_bound) - self.delta) * self.multiplier;
        sanitise(self.factor * x.ln_1p())
    }

    fn sumextra(&self, doclen: TermCount, uniqterms: TermCount) -> f64 {
        if doclen == 0 || uniqterms == 0 {
            return 0.0;
        }
        let ratio = f64::from(uniqterms) / f64::from(doclen);
        sanitise(self.extra_offset + self.query_length * ratio.ln())
    }

    fn maxextra(&self) -> f64 {
        sanitise(self.extra_offset)
    }
}

/// Two-stage smoothing: Dirichlet prior followed by Jelinek-Mercer
/// interpolation.
#[derive(Debug, Clone)]
pub struct LM2StageWeight {
    lambda: f64,
    mu: f64,
    factor: f64,
    multiplier: f64,
    extra_offset: f64,
    query_length: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl Default for LM2StageWeight {
    fn default() -> Self {
        LM2StageWeight::new(0.7, 2000.0)
    }
}

impl LM2StageWeight {
    /// `lambda` is clamped into [0, 1] and `mu` to be non-negative.
    pub fn new(lambda: f64, mu: f64) -> Self {
        LM2StageWeight {
            lambda: lambda.clamp(0.0, 1.0),
            mu: mu.max(0.0),
            factor: 0.0,
            multiplier: 0.0,
            extra_offset: 0.0,
            query_length: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("lm2stage", params, &["lambda", "mu"])?;
        Ok(LM2StageWeight::new(
            param_or(&v, 0, 0.7),
            param_or(&v, 1, 2000.0),
        ))
    }

    fn length_ratio(&self, doclen: f64) -> f64 {
        (self.lambda * doclen + self.mu) / (doclen + self.mu)
    }
}

impl Weight for LM2StageWeight {
    fn name(&self) -> &'static str {
        "lm2stage"
    }

    fn parameters(&self) -> String {
        format!("{} {}", self.lambda, self.mu)
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.factor = factor * f64::from(stats.wqf);
        self.query_length = f64::from(stats.query_length);
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        let doclen_max = f64::from(stats.doclength_upper_bound);
        self.extra_offset = -self.length_ratio(doclen_max).ln() * self.query_length;
        self.multiplier = match collection_ratio(stats) {
            Some(ratio) => (1.0 - self.lambda) * ratio,
            None => 0.0,
        };
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        let denom = self.lambda * f64::from(doclen) + self.mu;
        if denom <= 0.0 {
            return 0.0;
        }
        let x = f64::from(wdf) / denom * self.multiplier;
        sanitise(self.factor * x.ln_1p())
    }

    fn maxpart(&self) -> f64 {
        let len = f64::from(self.doclength_lower_bound.max(self.wdf_upper_bound));
        let denom = self.lambda * len + self.mu;
        if denom <= 0.0 {
            return 0.0;
        }
        let x = f64::from(self.wdf_upper_bound) / denom * self.multiplier;
        sanitise(self.factor * x.ln_1p())
    }

    fn sumextra(&self, doclen: TermCount, _uniqterms: TermCount) -> f64 {
        sanitise(self.extra_offset + self.query_length * self.length_ratio(f64::from(doclen)).ln())
    }

    fn maxextra(&self) -> f64 {
        let doclen = f64::from(self.doclength_lower_bound);
        sanitise(self.extra_offset + self.query_length * self.length_ratio(doclen).ln())
    }
}
