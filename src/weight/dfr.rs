//! Divergence-from-randomness weighting schemes.
//!
//! All schemes here normalise wdf with
//! `wdfn = wdf * log2(1 + c * avlen / doclen)`, which grows with wdf and
//! shrinks with document length, so an upper bound on wdfn comes from the
//! largest wdf in the shortest document that can hold it.

use std::f64::consts::{LOG2_E, PI};

use crate::error::{LexmatchError, Result};
use crate::types::TermCount;
use crate::weight::{Weight, WeightStats, param_or, parse_numbers, sanitise, wdfn_h2};

fn check_c(scheme: &str, c: f64) -> Result<f64> {
    if c.is_nan() || c <= 0.0 {
        return Err(LexmatchError::invalid_argument(format!(
            "Parameter c is invalid: '{scheme}'"
        )));
    }
    Ok(c)
}

fn parse_c(scheme: &str, params: &str) -> Result<f64> {
    let v = parse_numbers(scheme, params, &["c"])?;
    check_c(scheme, param_or(&v, 0, 1.0))
}

/// Document-length bounds and wdf normalisation shared by the schemes.
#[derive(Debug, Clone, Default)]
struct Normaliser {
    c_avlen: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
    doclength_upper_bound: TermCount,
}

impl Normaliser {
    fn init(&mut self, c: f64, stats: &WeightStats) {
        self.c_avlen = c * stats.average_length;
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        self.doclength_upper_bound = stats.doclength_upper_bound;
    }

    fn wdfn(&self, wdf: TermCount, doclen: TermCount) -> f64 {
        wdfn_h2(f64::from(wdf), self.c_avlen, f64::from(doclen.max(wdf)))
    }

    /// Largest possible wdfn.
    fn upper(&self) -> f64 {
        let len = self.wdf_upper_bound.max(self.doclength_lower_bound);
        self.wdfn(self.wdf_upper_bound, len)
    }

    /// Smallest possible wdfn for a matching document.
    fn lower(&self) -> f64 {
        let len = self.doclength_upper_bound.max(self.wdf_upper_bound);
        self.wdfn(1, len)
    }
}

/// InL2: inverse document frequency with Laplace after-effect.
#[derive(Debug, Clone)]
pub struct InL2Weight {
    c: f64,
    norm: Normaliser,
    factor: f64,
}

impl Default for InL2Weight {
    fn default() -> Self {
        InL2Weight {
            c: 1.0,
            norm: Normaliser::default(),
            factor: 0.0,
        }
    }
}

impl InL2Weight {
    pub fn new(c: f64) -> Result<Self> {
        Ok(InL2Weight {
            c: check_c("inl2", c)?,
            ..InL2Weight::default()
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        InL2Weight::new(parse_c("inl2", params)?)
    }

    fn part(&self, wdfn: f64) -> f64 {
        sanitise(self.factor * wdfn / (wdfn + 1.0))
    }
}

impl Weight for InL2Weight {
    fn name(&self) -> &'static str {
        "inl2"
    }

    fn parameters(&self) -> String {
        self.c.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.norm.init(self.c, stats);
        if factor == 0.0 || stats.termfreq == 0 {
            self.factor = 0.0;
            return;
        }
        let n = f64::from(stats.collection_size);
        let tf = f64::from(stats.termfreq);
        let idf = ((n + 1.0) / (tf + 0.5)).log2();
        self.factor = sanitise(f64::from(stats.wqf) * factor * idf);
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
        self.part(self.norm.wdfn(wdf, doclen))
    }

    fn maxpart(&self) -> f64 {
        if self.norm.wdf_upper_bound == 0 {
            return 0.0;
        }
        self.part(self.norm.upper())
    }
}

/// IfB2: inverse term frequency with Bernoulli after-effect.
#[derive(Debug, Clone)]
pub struct IfB2Weight {
    c: f64,
    norm: Normaliser,
    factor: f64,
}

impl Default for IfB2Weight {
    fn default() -> Self {
        IfB2Weight {
            c: 1.0,
            norm: Normaliser::default(),
            factor: 0.0,
        }
    }
}

impl IfB2Weight {
    pub fn new(c: f64) -> Result<Self> {
        Ok(IfB2Weight {
            c: check_c("ifb2", c)?,
            ..IfB2Weight::default()
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        IfB2Weight::new(parse_c("ifb2", params)?)
    }
}

/// `idf * (F + 1) / termfreq`, the wdf-independent part of the B2 schemes.
fn b2_factor(stats: &WeightStats, idf: f64) -> f64 {
    let f = stats.collection_freq as f64;
    let tf = f64::from(stats.termfreq.max(1));
    idf * (f + 1.0) / tf
}

impl Weight for IfB2Weight {
    fn name(&self) -> &'static str {
        "ifb2"
    }

    fn parameters(&self) -> String {
        self.c.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.norm.init(self.c, stats);
        if factor == 0.0 || stats.termfreq == 0 {
            self.factor = 0.0;
            return;
        }
        let n = f64::from(stats.collection_size);
        let f = stats.collection_freq as f64;
        let idf = ((n + 1.0) / (f + 0.5)).log2();
        self.factor = sanitise(f64::from(stats.wqf) * factor * b2_factor(stats, idf));
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
        let wdfn = self.norm.wdfn(wdf, doclen);
        sanitise(self.factor * wdfn / (wdfn + 1.0))
    }

    fn maxpart(&self) -> f64 {
        if self.norm.wdf_upper_bound == 0 {
            return 0.0;
        }
        let wdfn = self.norm.upper();
        sanitise(self.factor * wdfn / (wdfn + 1.0))
    }
}

/// IneB2: expected inverse document frequency with Bernoulli after-effect.
#[derive(Debug, Clone)]
pub struct IneB2Weight {
    c: f64,
    norm: Normaliser,
    factor: f64,
}

impl Default for IneB2Weight {
    fn default() -> Self {
        IneB2Weight {
            c: 1.0,
            norm: Normaliser::default(),
            factor: 0.0,
        }
    }
}

impl IneB2Weight {
    pub fn new(c: f64) -> Result<Self> {
        Ok(IneB2Weight {
            c: check_c("ineb2", c)?,
            ..IneB2Weight::default()
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        IneB2Weight::new(parse_c("ineb2", params)?)
    }
}

impl Weight for IneB2Weight {
    fn name(&self) -> &'static str {
        "ineb2"
    }

    fn parameters(&self) -> String {
        self.c.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.norm.init(self.c, stats);
        if factor == 0.0 || stats.termfreq == 0 || stats.collection_size == 0 {
            self.factor = 0.0;
            return;
        }
        let n = f64::from(stats.collection_size);
        let f = stats.collection_freq as f64;
        let expected = n * (1.0 - ((n - 1.0) / n).powf(f));
        let idf = ((n + 1.0) / (expected + 0.5)).log2();
        self.factor = sanitise(f64::from(stats.wqf) * factor * b2_factor(stats, idf));
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
        let wdfn = self.norm.wdfn(wdf, doclen);
        sanitise(self.factor * wdfn / (wdfn + 1.0))
    }

    fn maxpart(&self) -> f64 {
        if self.norm.wdf_upper_bound == 0 {
            return 0.0;
        }
        let wdfn = self.norm.upper();
        sanitise(self.factor * wdfn / (wdfn + 1.0))
    }
}

/// Stirling approximation term used by BB2; decreasing in `m`.
fn stirling(n: f64, m: f64) -> f64 {
    let m = m.max(0.5);
    (m + 0.5) * (n / m).log2() + (n - m) * n.log2()
}

/// BB2: Bose-Einstein randomness model with Bernoulli after-effect.
#[derive(Debug, Clone)]
pub struct BB2Weight {
    c: f64,
    norm: Normaliser,
    factor: f64,
    n: f64,
    f: f64,
    tf: f64,
}

impl Default for BB2Weight {
    fn default() -> Self {
        BB2Weight {
            c: 1.0,
            norm: Normaliser::default(),
            factor: 0.0,
            n: 0.0,
            f: 0.0,
            tf: 1.0,
        }
    }
}

impl BB2Weight {
    pub fn new(c: f64) -> Result<Self> {
        Ok(BB2Weight {
            c: check_c("bb2", c)?,
            ..BB2Weight::default()
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        BB2Weight::new(parse_c("bb2", params)?)
    }

    fn clamp_wdfn(&self, wdfn: f64) -> f64 {
        wdfn.min(self.f - 1.0).max(0.0)
    }

    fn b(&self, t: f64) -> f64 {
        (self.f + 1.0) / (self.tf * (t + 1.0))
    }

    fn constant(&self) -> f64 {
        -(self.n - 1.0).max(1.0).log2() - LOG2_E
    }

    /// The Bose-Einstein information content with `t1` in the first
    /// Stirling term and `t2` in the second.
    fn bracket(&self, t1: f64, t2: f64) -> f64 {
        let n = self.n;
        let f = self.f;
        self.constant() + stirling(n + f - 1.0, (n + f - t1 - 2.0).max(1.0))
            - stirling(f, f - t2)
    }
}

impl Weight for BB2Weight {
    fn name(&self) -> &'static str {
        "bb2"
    }

    fn parameters(&self) -> String {
        self.c.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.norm.init(self.c, stats);
        self.n = f64::from(stats.collection_size);
        self.f = stats.collection_freq as f64;
        self.tf = f64::from(stats.termfreq.max(1));
        self.factor = if factor == 0.0 || stats.termfreq == 0 || stats.collection_freq == 0 {
            0.0
        } else {
            f64::from(stats.wqf) * factor
        };
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || self.factor == 0.0 {
            return 0.0;
        }
        let t = self.clamp_wdfn(self.norm.wdfn(wdf, doclen));
        sanitise(self.factor * self.b(t) * self.bracket(t, t))
    }

    fn maxpart(&self) -> f64 {
        if self.norm.wdf_upper_bound == 0 || self.factor == 0.0 {
            return 0.0;
        }
        let lo = self.clamp_wdfn(self.norm.lower());
        let hi = self.clamp_wdfn(self.norm.upper());
        // B shrinks as wdfn grows; the first Stirling term grows with it and
        // the second one (subtracted) grows too, so bound each separately.
        sanitise(self.factor * self.b(lo) * self.bracket(hi, lo))
    }
}

/// PL2: Poisson randomness model with Laplace after-effect.
#[derive(Debug, Clone)]
pub struct PL2Weight {
    c: f64,
    norm: Normaliser,
    factor: f64,
    p1: f64,
    p2: f64,
}

impl Default for PL2Weight {
    fn default() -> Self {
        PL2Weight {
            c: 1.0,
            norm: Normaliser::default(),
            factor: 0.0,
            p1: 0.0,
            p2: 0.0,
        }
    }
}

impl PL2Weight {
    pub fn new(c: f64) -> Result<Self> {
        Ok(PL2Weight {
            c: check_c("pl2", c)?,
            ..PL2Weight::default()
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        PL2Weight::new(parse_c("pl2", params)?)
    }

    /// Unscaled weight for a normalised wdf `t > 0`.
    fn raw(&self, t: f64) -> f64 {
        (self.p1 + (t + 0.5) * t.log2() - self.p2 * t) / (t + 1.0)
    }

    /// Unscaled upper bound on [`Self::raw`] over the wdfn range, or `None`
    /// when no document can get a weight.
    fn bound(&self) -> Option<f64> {
        if self.norm.wdf_upper_bound == 0 || self.factor == 0.0 {
            return None;
        }
        let lo = self.norm.lower();
        let hi = self.norm.upper();
        let p2_part = if self.p2 >= 0.0 {
            -self.p2 * lo / (lo + 1.0)
        } else {
            -self.p2 * hi / (hi + 1.0)
        };
        Some(self.p1 / (lo + 1.0) + hi.log2().max(0.0) + p2_part)
    }
}

impl Weight for PL2Weight {
    fn name(&self) -> &'static str {
        "pl2"
    }

    fn parameters(&self) -> String {
        self.c.to_string()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.norm.init(self.c, stats);
        if factor == 0.0 || stats.collection_freq == 0 || stats.collection_size == 0 {
            self.factor = 0.0;
            return;
        }
        let mean = stats.collection_freq as f64 / f64::from(stats.collection_size);
        self.p1 = mean * LOG2_E + 0.5 * (2.0 * PI).log2();
        self.p2 = mean.log2() + LOG2_E;
        self.factor = f64::from(stats.wqf) * factor;
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || self.factor == 0.0 {
            return 0.0;
        }
        let t = self.norm.wdfn(wdf, doclen);
        if t <= 0.0 {
            return 0.0;
        }
        sanitise(self.factor * self.raw(t))
    }

    fn maxpart(&self) -> f64 {
        self.bound().map_or(0.0, |bound| sanitise(self.factor * bound))
    }
}

/// DPH: a parameter-free hypergeometric model.
#[derive(Debug, Clone, Default)]
pub struct DPHWeight {
    factor: f64,
    log_constant: f64,
    wdf_upper_bound: TermCount,
}

impl DPHWeight {
    pub fn new() -> Self {
        DPHWeight::default()
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        parse_numbers("dph", params, &[])?;
        Ok(DPHWeight::new())
    }
}

impl Weight for DPHWeight {
    fn name(&self) -> &'static str {
        "dph"
    }

    fn parameters(&self) -> String {
        String::new()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.wdf_upper_bound = stats.wdf_upper_bound;
        if factor == 0.0 || stats.collection_freq == 0 {
            self.factor = 0.0;
            return;
        }
        self.log_constant = stats.total_length as f64 / stats.collection_freq as f64;
        self.factor = f64::from(stats.wqf) * factor;
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || wdf >= doclen || self.factor == 0.0 {
            return 0.0;
        }
        let wdf = f64::from(wdf);
        let f = wdf / f64::from(doclen);
        let norm = (1.0 - f) * (1.0 - f) / (wdf + 1.0);
        let wt = norm
            * (wdf * (f * self.log_constant).log2() + 0.5 * (2.0 * PI * wdf * (1.0 - f)).log2());
        sanitise(self.factor * wt)
    }

    fn maxpart(&self) -> f64 {
        if self.wdf_upper_bound == 0 || self.factor == 0.0 {
            return 0.0;
        }
        let wdf_max = f64::from(self.wdf_upper_bound);
        let bound = self.log_constant.max(1.0).log2()
            + (0.25 * (2.0 * PI * wdf_max).log2()).max(0.0);
        sanitise(self.factor * bound)
    }
}

/// PL2+: PL2 with a lower bound on the contribution of any matching term,
/// the PL2 formula evaluated at a normalised wdf of `delta`.
#[derive(Debug, Clone)]
pub struct PL2PlusWeight {
    c: f64,
    delta: f64,
    pl2: PL2Weight,
    dw: f64,
}

impl Default for PL2PlusWeight {
    fn default() -> Self {
        PL2PlusWeight {
            c: 1.0,
            delta: 0.8,
            pl2: PL2Weight::default(),
            dw: 0.0,
        }
    }
}

impl PL2PlusWeight {
    pub fn new(c: f64, delta: f64) -> Result<Self> {
        let c = check_c("pl2+", c)?;
        if delta.is_nan() || delta <= 0.0 {
            return Err(LexmatchError::invalid_argument(
                "Parameter delta is invalid: 'pl2+'",
            ));
        }
        Ok(PL2PlusWeight {
            c,
            delta,
            pl2: PL2Weight::new(c)?,
            dw: 0.0,
        })
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let v = parse_numbers("pl2+", params, &["c", "delta"])?;
        PL2PlusWeight::new(param_or(&v, 0, 1.0), param_or(&v, 1, 0.8))
    }
}

impl Weight for PL2PlusWeight {
    fn name(&self) -> &'static str {
        "pl2+"
    }

    fn parameters(&self) -> String {
        format!("{} {}", self.c, self.delta)
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.pl2.init(stats, factor);
        self.dw = if self.pl2.factor == 0.0 {
            0.0
        } else {
            self.pl2.raw(self.delta)
        };
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || self.pl2.factor == 0.0 {
            return 0.0;
        }
        let t = self.pl2.norm.wdfn(wdf, doclen);
        if t <= 0.0 {
            return 0.0;
        }
        sanitise(self.pl2.factor * (self.pl2.raw(t) + self.dw))
    }

    fn maxpart(&self) -> f64 {
        match self.pl2.bound() {
            Some(bound) => sanitise(self.pl2.factor * (bound + self.dw)),
            None => 0.0,
        }
    }
}

/// DLH: a parameter-free hypergeometric model with Laplace normalisation.
#[derive(Debug, Clone, Default)]
pub struct DLHWeight {
    factor: f64,
    log_constant: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl DLHWeight {
    pub fn new() -> Self {
        DLHWeight::default()
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        parse_numbers("dlh", params, &[])?;
        Ok(DLHWeight::new())
    }
}

impl Weight for DLHWeight {
    fn name(&self) -> &'static str {
        "dlh"
    }

    fn parameters(&self) -> String {
        String::new()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        if factor == 0.0 || stats.collection_freq == 0 {
            self.factor = 0.0;
            return;
        }
        self.log_constant = stats.total_length as f64 / stats.collection_freq as f64;
        self.factor = f64::from(stats.wqf) * factor;
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 || wdf >= doclen || self.factor == 0.0 {
            return 0.0;
        }
        let len = f64::from(doclen);
        let wdf = f64::from(wdf);
        let f = wdf / len;
        let wt = wdf * (f * self.log_constant).log2()
            + (len - wdf) * (1.0 - f).log2()
            + 0.5 * (2.0 * PI * wdf * (1.0 - f)).log2();
        sanitise(self.factor * wt / (wdf + 0.5))
    }

    fn maxpart(&self) -> f64 {
        if self.wdf_upper_bound == 0 || self.factor == 0.0 {
            return 0.0;
        }
        // wdf / doclen is below 1 and at most wdf_max / doclen_min; the
        // (len - wdf) term is never positive; the last term divided by
        // (wdf + 0.5) is largest at wdf = 1.
        let ratio = if self.doclength_lower_bound == 0 {
            1.0
        } else {
            (f64::from(self.wdf_upper_bound) / f64::from(self.doclength_lower_bound)).min(1.0)
        };
        let bound = (ratio * self.log_constant).log2().max(0.0) + (2.0 * PI).log2() / 3.0;
        sanitise(self.factor * bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::test_support::{assert_bounded, term_stats};

    fn schemes() -> Vec<Box<dyn Weight>> {
        vec![
            Box::new(InL2Weight::default()),
            Box::new(IfB2Weight::default()),
            Box::new(IneB2Weight::default()),
            Box::new(BB2Weight::default()),
            Box::new(PL2Weight::default()),
            Box::new(DPHWeight::default()),
            Box::new(DLHWeight::default()),
            Box::new(PL2PlusWeight::default()),
        ]
    }

    #[test]
    fn test_bounded_and_finite() {
        let cases = [
            term_stats(100, 10, 30, 20.0),
            term_stats(6, 6, 20, 10.0),
            term_stats(1, 1, 3, 3.0),
            term_stats(50, 2, 2, 12.0),
        ];
        for proto in schemes() {
            for stats in &cases {
                let mut w = proto.clone();
                w.init(stats, 1.0);
                assert!(w.sumpart(1, 0, 0, 1).is_finite(), "{}", w.name());
                assert_bounded(w.as_ref(), stats);
            }
        }
    }

    #[test]
    fn test_rare_terms_score_higher() {
        for proto in schemes() {
            let mut rare = proto.clone();
            rare.init(&term_stats(1000, 5, 8, 100.0), 1.0);
            let mut common = proto.clone();
            common.init(&term_stats(1000, 500, 800, 100.0), 1.0);
            assert!(
                rare.sumpart(2, 100, 50, 2) > common.sumpart(2, 100, 50, 2),
                "{}",
                proto.name()
            );
        }
    }

    #[test]
    fn test_factor_zero() {
        for proto in schemes() {
            let mut w = proto.clone();
            w.init(&term_stats(100, 10, 30, 20.0), 0.0);
            assert_eq!(w.sumpart(3, 20, 5, 3), 0.0);
            assert_eq!(w.maxpart(), 0.0);
            assert_eq!(w.sumextra(20, 5), 0.0);
        }
    }

    #[test]
    fn test_parameter_c() -> Result<()> {
        assert!(InL2Weight::new(0.0).is_err());
        assert!(PL2Weight::from_parameters("-1").is_err());
        assert_eq!(BB2Weight::from_parameters("2")?.description(), "bb2 2");
        assert_eq!(DPHWeight::from_parameters("")?.description(), "dph");
        assert!(DPHWeight::from_parameters("1").is_err());
        assert_eq!(DLHWeight::from_parameters("")?.description(), "dlh");
        assert_eq!(PL2PlusWeight::from_parameters("")?.description(), "pl2+ 1 0.8");
        assert_eq!(PL2PlusWeight::from_parameters("2 1.5")?.parameters(), "2 1.5");
        assert!(PL2PlusWeight::new(1.0, 0.0).is_err());
        assert!(PL2PlusWeight::from_parameters("1 x").is_err());
        Ok(())
    }

    #[test]
    fn test_dlh_value() {
        // total length 250, collection frequency 4.
        let stats = term_stats(10, 2, 4, 25.0);
        let mut w = DLHWeight::new();
        w.init(&stats, 1.0);
        let f: f64 = 2.0 / 20.0;
        let expected = (2.0 * (f * 62.5).log2()
            + 18.0 * (1.0 - f).log2()
            + 0.5 * (2.0 * PI * 2.0 * (1.0 - f)).log2())
            / 2.5;
        assert!((w.sumpart(2, 20, 10, 2) - expected).abs() < 1e-12);
        assert!(w.maxpart() >= expected);
        // A document made only of the term gets nothing.
        assert_eq!(w.sumpart(20, 20, 1, 20), 0.0);
    }

    #[test]
    fn test_pl2plus_adds_delta_contribution() -> Result<()> {
        let stats = term_stats(100, 10, 30, 20.0);
        let mut plain = PL2Weight::default();
        plain.init(&stats, 1.0);
        let mut plus = PL2PlusWeight::default();
        plus.init(&stats, 1.0);

        let mean: f64 = 30.0 / 100.0;
        let p1 = mean * LOG2_E + 0.5 * (2.0 * PI).log2();
        let p2 = mean.log2() + LOG2_E;
        let delta: f64 = 0.8;
        let dw = (p1 + (delta + 0.5) * delta.log2() - p2 * delta) / (delta + 1.0);
        assert!(dw > 0.0);

        let (p, q) = (plain.sumpart(3, 20, 5, 3), plus.sumpart(3, 20, 5, 3));
        assert!(p > 0.0);
        assert!((q - (p + dw)).abs() < 1e-12, "{q} vs {p} + {dw}");
        assert!(plus.maxpart() >= q);

        let mut bigger = PL2PlusWeight::new(1.0, 1.5)?;
        bigger.init(&stats, 1.0);
        assert_ne!(bigger.sumpart(3, 20, 5, 3), q);
        Ok(())
    }
}
