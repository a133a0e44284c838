//! The traditional probabilistic weighting formula.

use crate::error::Result;
use crate::types::TermCount;
use crate::weight::{Weight, WeightStats, param_or, parse_numbers, sanitise};

/// Traditional probabilistic weighting.
///
/// `TradWeight::new(k)` ranks exactly like `BM25Weight::new(k, 0, 0, 1, 0)`
/// but its weights are `k + 1` times smaller.
#[derive(Debug, Clone)]
pub struct TradWeight {
    k: f64,
    termweight: f64,
    len_factor: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl Default for TradWeight {
    fn default() -> Self {
        TradWeight::new(1.0)
    }
}

impl TradWeight {
    /// Negative `k` is treated as 0.
    pub fn new(k: f64) -> Self {
        TradWeight {
            k: k.max(0.0),
            termweight: 0.0,
            len_factor: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("trad", params, &["k"])?;
        Ok(TradWeight::new(param_or(&v, 0, 1.0)))
    }

    fn part(&self, wdf: f64, len: f64) -> f64 {
        let denom = len * self.len_factor + wdf;
        if denom <= 0.0 {
            return 0.0;
        }
        sanitise(self.termweight * (wdf / denom))
    }
}

impl Weight for TradWeight {
    fn name(&self) -> &'static str {
        "trad"
    }

    fn parameters(&self) -> String {
        self.k.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        self.len_factor = if stats.average_length > 0.0 {
            self.k / stats.average_length
        } else {
            0.0
        };
        if factor == 0.0 {
            self.termweight = 0.0;
            return;
        }

        let n = f64::from(stats.collection_size);
        let tf = f64::from(stats.termfreq);
        let mut tw = if stats.rset_size != 0 {
            let r_total = f64::from(stats.rset_size);
            let r = f64::from(stats.reltermfreq);
            (r + 0.5) * (n - r_total + r - tf + 0.5)
                / ((r_total - r + 0.5) * (tf - r + 0.5))
        } else {
            (n - tf + 0.5) / (tf + 0.5)
        };
        tw = tw.max(0.0);
        if tw < 2.0 {
            tw = tw * 0.5 + 1.0;
        }
        self.termweight = sanitise(tw.ln() * factor);
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
        self.part(f64::from(wdf), f64::from(doclen))
    }

    fn maxpart(&self) -> f64 {
        if self.wdf_upper_bound == 0 {
            return 0.0;
        }
        let len_lb = self.wdf_upper_bound.max(self.doclength_lower_bound);
        self.part(f64::from(self.wdf_upper_bound), f64::from(len_lb))
    }
}
