//! Term weights used when ranking expansion candidates.

use serde::{Deserialize, Serialize};

use crate::error::{LexmatchError, Result};
use crate::types::{DocCount, TermCount};

/// Statistics for one candidate term, collected over the relevance set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandStats {
    /// Documents in the part of the collection `termfreq` covers.
    pub dbsize: DocCount,
    pub termfreq: DocCount,
    pub collection_freq: u64,
    /// Documents in the relevance set.
    pub rsize: DocCount,
    /// Relevant documents containing the term.
    pub rtermfreq: DocCount,
    /// Occurrences of the term in the relevant documents.
    pub rcollection_freq: u64,
    /// Sum of the normalised wdf contributions of the relevant documents.
    pub multiplier: f64,
}

impl ExpandStats {
    /// Add one relevant document containing the term.
    pub fn accumulate(&mut self, wdf: TermCount, doclen: TermCount, k: f64, avlen: f64) {
        // Boolean terms have no wdf but should still count.
        let wdf = f64::from(wdf.max(1));
        self.rtermfreq += 1;
        self.rcollection_freq += wdf as u64;
        let len = if avlen > 0.0 { f64::from(doclen) / avlen } else { 1.0 };
        let denom = k * len + wdf;
        if denom > 0.0 {
            self.multiplier += (k + 1.0) * wdf / denom;
        }
    }
}

/// An expansion weighting formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ExpandWeight {
    /// The traditional probabilistic formula with parameter `k`.
    Trad { k: f64 },
    /// Bose-Einstein divergence from randomness.
    Bo1,
}

impl Default for ExpandWeight {
    fn default() -> Self {
        ExpandWeight::Trad { k: 1.0 }
    }
}

impl ExpandWeight {
    /// Select a scheme by name. `k` only applies to `trad`.
    pub fn from_name(name: &str, k: f64) -> Result<Self> {
        match name {
            "" | "trad" => {
                if !(k >= 0.0) {
                    return Err(LexmatchError::invalid_argument(format!(
                        "expand k must be non-negative, got {k}"
                    )));
                }
                Ok(ExpandWeight::Trad { k })
            }
            "bo1" => Ok(ExpandWeight::Bo1),
            _ => Err(LexmatchError::invalid_argument(format!(
                "Invalid name for query expansion scheme: '{name}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExpandWeight::Trad { .. } => "trad",
            ExpandWeight::Bo1 => "bo1",
        }
    }

    /// The `k` used when accumulating the wdf multiplier.
    pub fn k(&self) -> f64 {
        match self {
            ExpandWeight::Trad { k } => *k,
            ExpandWeight::Bo1 => 0.0,
        }
    }

    pub fn weight(&self, stats: &ExpandStats) -> f64 {
        let w = match self {
            ExpandWeight::Trad { .. } => trad(stats),
            ExpandWeight::Bo1 => bo1(stats),
        };
        if w.is_finite() { w } else { 0.0 }
    }
}

fn trad(s: &ExpandStats) -> f64 {
    let r = f64::from(s.rtermfreq);
    let big_r = f64::from(s.rsize);
    let n = f64::from(s.termfreq);
    let big_n = f64::from(s.dbsize);
    let num = (r + 0.5) * (big_n - big_r - n + r + 0.5).max(0.5);
    let den = (big_r - r + 0.5).max(0.5) * (n - r + 0.5).max(0.5);
    let mut tw = num / den;
    if tw < 2.0 {
        tw = tw * 0.5 + 1.0;
    }
    s.multiplier * tw.ln()
}

fn bo1(s: &ExpandStats) -> f64 {
    if s.dbsize == 0 || s.collection_freq == 0 {
        return 0.0;
    }
    let mean = s.collection_freq as f64 / f64::from(s.dbsize);
    s.rcollection_freq as f64 * ((1.0 + mean) / mean).log2() + (1.0 + mean).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(rtermfreq: DocCount, termfreq: DocCount) -> ExpandStats {
        let mut s = ExpandStats {
            dbsize: 100,
            termfreq,
            collection_freq: u64::from(termfreq) * 2,
            rsize: 5,
            ..ExpandStats::default()
        };
        for _ in 0..rtermfreq {
            s.accumulate(2, 10, 1.0, 10.0);
        }
        s
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ExpandWeight::from_name("trad", 1.0).ok(), Some(ExpandWeight::Trad { k: 1.0 }));
        assert_eq!(ExpandWeight::from_name("bo1", 1.0).ok(), Some(ExpandWeight::Bo1));
        assert!(matches!(
            ExpandWeight::from_name("foo", 1.0),
            Err(LexmatchError::InvalidArgument(_))
        ));
        assert!(ExpandWeight::from_name("trad", -1.0).is_err());
    }

    #[test]
    fn test_more_relevant_occurrences_weigh_more() {
        for scheme in [ExpandWeight::default(), ExpandWeight::Bo1] {
            let few = scheme.weight(&stats(1, 10));
            let many = scheme.weight(&stats(4, 10));
            assert!(few > 0.0, "{}", scheme.name());
            assert!(many > few, "{}", scheme.name());
        }
        let rare = ExpandWeight::default().weight(&stats(3, 5));
        let common = ExpandWeight::default().weight(&stats(3, 60));
        assert!(rare > common);
    }

    #[test]
    fn test_degenerate_stats_are_finite() {
        let s = ExpandStats {
            dbsize: 1,
            termfreq: 1,
            collection_freq: 1,
            rsize: 1,
            rtermfreq: 1,
            rcollection_freq: 1,
            multiplier: 1.0,
        };
        assert!(ExpandWeight::default().weight(&s).is_finite());
        assert!(ExpandWeight::Bo1.weight(&s).is_finite());
        assert_eq!(ExpandWeight::Bo1.weight(&ExpandStats::default()), 0.0);
    }
}
