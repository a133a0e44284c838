//! Okapi BM25 and BM25+.

use crate::error::Result;
use crate::types::TermCount;
use crate::weight::{Weight, WeightStats, param_or, parse_numbers, sanitise};

const BM25_PARAMS: &[&str] = &["k1", "k2", "k3", "b", "min_normlen"];
const BM25PLUS_PARAMS: &[&str] = &["k1", "k2", "k3", "b", "min_normlen", "delta"];

/// Robertson-Sparck Jones weight, with relevance information if there is any.
fn rsj_weight(stats: &WeightStats) -> f64 {
    let n = f64::from(stats.collection_size);
    let tf = f64::from(stats.termfreq);
    if stats.rset_size == 0 {
        return (n - tf + 0.5) / (tf + 0.5);
    }
    let r_total = f64::from(stats.rset_size);
    let r = f64::from(stats.reltermfreq);
    // Documents outside the relevance set, plus this term's relevant ones.
    let q = n - (r_total - r);
    (r + 0.5) * (q - tf + 0.5) / ((r_total - r + 0.5) * (tf - r + 0.5))
}

fn inverse_average_length(stats: &WeightStats) -> f64 {
    if stats.average_length > 0.0 {
        1.0 / stats.average_length
    } else {
        0.0
    }
}

/// Okapi BM25 weighting.
///
/// Parameters are clamped rather than rejected: negative `k1`, `k2`, `k3`
/// and `min_normlen` become 0 and `b` is forced into [0, 1].
#[derive(Debug, Clone)]
pub struct BM25Weight {
    k1: f64,
    k2: f64,
    k3: f64,
    b: f64,
    min_normlen: f64,

    termweight: f64,
    len_factor: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
    query_length: TermCount,
}

impl Default for BM25Weight {
    fn default() -> Self {
        BM25Weight::new(1.0, 0.0, 1.0, 0.5, 0.5)
    }
}

impl BM25Weight {
    pub fn new(k1: f64, k2: f64, k3: f64, b: f64, min_normlen: f64) -> Self {
        BM25Weight {
            k1: k1.max(0.0),
            k2: k2.max(0.0),
            k3: k3.max(0.0),
            b: b.clamp(0.0, 1.0),
            min_normlen: min_normlen.max(0.0),
            termweight: 0.0,
            len_factor: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
            query_length: 0,
        }
    }

    /// Parse `"k1 k2 k3 b min_normlen"`; missing trailing values default.
    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("bm25", params, BM25_PARAMS)?;
        Ok(BM25Weight::new(
            param_or(&v, 0, 1.0),
            param_or(&v, 1, 0.0),
            param_or(&v, 2, 1.0),
            param_or(&v, 3, 0.5),
            param_or(&v, 4, 0.5),
        ))
    }

    fn normlen(&self, len: TermCount) -> f64 {
        (f64::from(len) * self.len_factor).max(self.min_normlen)
    }
}

impl Weight for BM25Weight {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn parameters(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.k1, self.k2, self.k3, self.b, self.min_normlen
        )
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        self.query_length = stats.query_length;
        self.len_factor = if self.k2 == 0.0 && (self.b == 0.0 || self.k1 == 0.0) {
            0.0
        } else {
            inverse_average_length(stats)
        };

        if factor == 0.0 {
            self.termweight = 0.0;
            return;
        }

        let mut tw = rsj_weight(stats).max(0.0);
        if tw < 2.0 {
            tw = tw * 0.5 + 1.0;
        }
        let mut termweight = tw.ln() * factor;
        if self.k3 != 0.0 {
            let wqf = f64::from(stats.wqf);
            termweight *= (self.k3 + 1.0) * wqf / (self.k3 + wqf);
        }
        self.termweight = sanitise(termweight * (self.k1 + 1.0));
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || self.termweight == 0.0 {
            return 0.0;
        }
        let wdf = f64::from(wdf);
        let denom = self.k1 * (self.normlen(doclen) * self.b + (1.0 - self.b)) + wdf;
        sanitise(self.termweight * (wdf / denom))
    }

    fn maxpart(&self) -> f64 {
        if self.wdf_upper_bound == 0 || self.termweight == 0.0 {
            return 0.0;
        }
        let wdf_max = f64::from(self.wdf_upper_bound);
        let mut denom = self.k1;
        if self.k1 != 0.0 && self.b != 0.0 {
            let normlen_lb = self.normlen(self.wdf_upper_bound.max(self.doclength_lower_bound));
            denom *= normlen_lb * self.b + (1.0 - self.b);
        }
        denom += wdf_max;
        sanitise(self.termweight * (wdf_max / denom))
    }

    fn sumextra(&self, doclen: TermCount, _uniqterms: TermCount) -> f64 {
        if self.k2 == 0.0 {
            return 0.0;
        }
        let num = 2.0 * self.k2 * f64::from(self.query_length);
        sanitise(num / (1.0 + self.normlen(doclen)))
    }

    fn maxextra(&self) -> f64 {
        if self.k2 == 0.0 {
            return 0.0;
        }
        let num = 2.0 * self.k2 * f64::from(self.query_length);
        sanitise(num / (1.0 + self.normlen(self.doclength_lower_bound)))
    }
}

/// BM25+ weighting: BM25 with a lower bound `delta` on the normalised wdf
/// contribution, so long documents are not over-penalised.
#[derive(Debug, Clone)]
pub struct BM25PlusWeight {
    k1: f64,
    k2: f64,
    k3: f64,
    b: f64,
    min_normlen: f64,
    delta: f64,

    termweight: f64,
    len_factor: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
    query_length: TermCount,
}

impl Default for BM25PlusWeight {
    fn default() -> Self {
        BM25PlusWeight::new(1.0, 0.0, 1.0, 0.5, 0.5, 1.0)
    }
}

impl BM25PlusWeight {
    pub fn new(k1: f64, k2: f64, k3: f64, b: f64, min_normlen: f64, delta: f64) -> Self {
        BM25PlusWeight {
            k1: k1.max(0.0),
            k2: k2.max(0.0),
            k3: k3.max(0.0),
            b: b.clamp(0.0, 1.0),
            min_normlen: min_normlen.max(0.0),
            delta: delta.max(0.0),
            termweight: 0.0,
            len_factor: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
            query_length: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("bm25+", params, BM25PLUS_PARAMS)?;
        Ok(BM25PlusWeight::new(
            param_or(&v, 0, 1.0),
            param_or(&v, 1, 0.0),
            param_or(&v, 2, 1.0),
            param_or(&v, 3, 0.5),
            param_or(&v, 4, 0.5),
            param_or(&v, 5, 1.0),
        ))
    }

    fn normlen(&self, len: TermCount) -> f64 {
        (f64::from(len) * self.len_factor).max(self.min_normlen)
    }

    fn part(&self, wdf: f64, normlen: f64) -> f64 {
        let denom = self.k1 * (normlen * self.b + (1.0 - self.b)) + wdf;
        let tf_part = if denom > 0.0 {
            (self.k1 + 1.0) * wdf / denom
        } else {
            0.0
        };
        sanitise(self.termweight * (tf_part + self.delta))
    }
}

impl Weight for BM25PlusWeight {
    fn name(&self) -> &'static str {
        "bm25+"
    }

    fn parameters(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.k1, self.k2, self.k3, self.b, self.min_normlen, self.delta
        )
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        self.query_length = stats.query_length;
        self.len_factor = if self.k2 == 0.0 && (self.b == 0.0 || self.k1 == 0.0) {
            0.0
        } else {
            inverse_average_length(stats)
        };

        if factor == 0.0 {
            self.termweight = 0.0;
            return;
        }

        let tw = if stats.rset_size != 0 {
            rsj_weight(stats)
        } else {
            f64::from(stats.collection_size + 1) / f64::from(stats.termfreq.max(1))
        };
        let mut termweight = sanitise(tw.ln()) * factor;
        if self.k3 != 0.0 {
            let wqf = f64::from(stats.wqf);
            termweight *= (self.k3 + 1.0) * wqf / (self.k3 + wqf);
        }
        self.termweight = sanitise(termweight);
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 {
            return 0.0;
        }
        self.part(f64::from(wdf), self.normlen(doclen))
    }

    fn maxpart(&self) -> f64 {
        if self.wdf_upper_bound == 0 {
            return 0.0;
        }
        let normlen_lb = self.normlen(self.wdf_upper_bound.max(self.doclength_lower_bound));
        self.part(f64::from(self.wdf_upper_bound), normlen_lb)
    }

    fn sumextra(&self, doclen: TermCount, _uniqterms: TermCount) -> f64 {
        if self.k2 == 0.0 {
            return 0.0;
        }
        let num = 2.0 * self.k2 * f64::from(self.query_length);
        sanitise(num / (1.0 + self.normlen(doclen)))
    }

    fn maxextra(&self) -> f64 {
        if self.k2 == 0.0 {
            return 0.0;
        }
        let num = 2.0 * self.k2 * f64::from(self.query_length);
        sanitise(num / (1.0 + self.normlen(self.doclength_lower_bound)))
    }
}
