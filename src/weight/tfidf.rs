//! TF-IDF weighting with selectable normalisations.

use std::fmt;

use crate::error::{LexmatchError, Result};
use crate::types::TermCount;
use crate::weight::{Weight, WeightStats, sanitise};

/// How the within-document frequency is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdfNorm {
    None,
    Boolean,
    Square,
    Log,
    Pivoted,
    LogAverage,
    AugLog,
    Sqrt,
    AugAverage,
    /// wdf over the document's highest wdf.
    Max,
    /// `0.5 + 0.5 * wdf / wdf_doc_max`.
    Aug,
}

/// How the inverse document frequency is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdfNorm {
    None,
    Tfidf,
    Square,
    Freq,
    Prob,
    Pivoted,
    GlobalFreq,
    LogGlobalFreq,
    IncrementedGlobalFreq,
    SqrtGlobalFreq,
}

const WDF_NAMES: &[(&str, WdfNorm)] = &[
    ("NONE", WdfNorm::None),
    ("BOOLEAN", WdfNorm::Boolean),
    ("SQUARE", WdfNorm::Square),
    ("LOG", WdfNorm::Log),
    ("PIVOTED", WdfNorm::Pivoted),
    ("LOG_AVERAGE", WdfNorm::LogAverage),
    ("AUG_LOG", WdfNorm::AugLog),
    ("SQRT", WdfNorm::Sqrt),
    ("AUG_AVERAGE", WdfNorm::AugAverage),
    ("MAX", WdfNorm::Max),
    ("AUG", WdfNorm::Aug),
];

const IDF_NAMES: &[(&str, IdfNorm)] = &[
    ("NONE", IdfNorm::None),
    ("TFIDF", IdfNorm::Tfidf),
    ("SQUARE", IdfNorm::Square),
    ("FREQ", IdfNorm::Freq),
    ("PROB", IdfNorm::Prob),
    ("PIVOTED", IdfNorm::Pivoted),
    ("GLOBAL_FREQ", IdfNorm::GlobalFreq),
    ("LOG_GLOBAL_FREQ", IdfNorm::LogGlobalFreq),
    ("INCREMENTED_GLOBAL_FREQ", IdfNorm::IncrementedGlobalFreq),
    ("SQRT_GLOBAL_FREQ", IdfNorm::SqrtGlobalFreq),
];

impl fmt::Display for WdfNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = WDF_NAMES
            .iter()
            .find(|(_, n)| n == self)
            .map_or("NONE", |(s, _)| *s);
        f.write_str(name)
    }
}

impl fmt::Display for IdfNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = IDF_NAMES
            .iter()
            .find(|(_, n)| n == self)
            .map_or("NONE", |(s, _)| *s);
        f.write_str(name)
    }
}

fn decode_code(code: &str) -> Result<(WdfNorm, IdfNorm)> {
    let invalid = || LexmatchError::invalid_argument("Normalization string is invalid");
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != 3 {
        return Err(invalid());
    }
    let wdf = match chars[0] {
        'b' => WdfNorm::Boolean,
        's' => WdfNorm::Square,
        'l' => WdfNorm::Log,
        'P' => WdfNorm::Pivoted,
        'L' => WdfNorm::LogAverage,
        'n' => WdfNorm::None,
        'm' => WdfNorm::Max,
        'a' => WdfNorm::Aug,
        _ => return Err(invalid()),
    };
    let idf = match chars[1] {
        'n' => IdfNorm::None,
        's' => IdfNorm::Square,
        'f' => IdfNorm::Freq,
        'P' => IdfNorm::Pivoted,
        'p' => IdfNorm::Prob,
        't' => IdfNorm::Tfidf,
        _ => return Err(invalid()),
    };
    if chars[2] != 'n' {
        return Err(invalid());
    }
    Ok((wdf, idf))
}

/// TF-IDF weighting.
///
/// The normalisation is chosen with a three letter SMART-style code: wdf
/// normalisation, idf normalisation, then weight normalisation (which must
/// be `n`). The default code is `ntn`: raw wdf times `ln(N / termfreq)`.
///
/// Normalisations that can yield negative weights (`p` when a term occurs
/// in more than half the documents) are clamped to 0.
#[derive(Debug, Clone)]
pub struct TfIdfWeight {
    wdf_norm: WdfNorm,
    idf_norm: IdfNorm,
    slope: f64,
    delta: f64,

    idfn: f64,
    wqf_factor: f64,
    average_length: f64,
    wdf_upper_bound: TermCount,
    doclength_lower_bound: TermCount,
}

impl Default for TfIdfWeight {
    fn default() -> Self {
        TfIdfWeight::from_norms(WdfNorm::None, IdfNorm::Tfidf, 0.2, 1.0)
    }
}

impl TfIdfWeight {
    pub fn new(code: &str) -> Result<Self> {
        TfIdfWeight::with_pivot(code, 0.2, 1.0)
    }

    /// A weight with explicit pivoted-normalisation parameters.
    pub fn with_pivot(code: &str, slope: f64, delta: f64) -> Result<Self> {
        let (wdf, idf) = decode_code(code)?;
        check_pivot(slope, delta)?;
        Ok(TfIdfWeight::from_norms(wdf, idf, slope, delta))
    }

    fn from_norms(wdf_norm: WdfNorm, idf_norm: IdfNorm, slope: f64, delta: f64) -> Self {
        TfIdfWeight {
            wdf_norm,
            idf_norm,
            slope,
            delta,
            idfn: 0.0,
            wqf_factor: 0.0,
            average_length: 0.0,
            wdf_upper_bound: 0,
            doclength_lower_bound: 0,
        }
    }

    /// Parse either a three letter code (`"ltn"`) or three keywords
    /// (`"LOG TFIDF NONE"`), optionally followed by slope and delta.
    pub fn from_parameters(params: &str) -> Result<Self> {
        let tokens: Vec<&str> = params.split_whitespace().collect();
        let is_keyword = |t: &str| WDF_NAMES.iter().any(|(n, _)| *n == t);
        let (wdf, idf, rest) = match tokens.as_slice() {
            [] => return Ok(TfIdfWeight::default()),
            [wdf, idf, wt, rest @ ..] if is_keyword(*wdf) => {
                let wdf = WDF_NAMES
                    .iter()
                    .find(|(n, _)| n == wdf)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| param_error("Parameter 1 (wdf_normalisation) is invalid"))?;
                let idf = IDF_NAMES
                    .iter()
                    .find(|(n, _)| n == idf)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| param_error("Parameter 2 (idf_normalisation) is invalid"))?;
                if *wt != "NONE" {
                    return Err(param_error("Parameter 3 (wt_normalisation) is invalid"));
                }
                (wdf, idf, rest)
            }
            [code, rest @ ..] => {
                let (wdf, idf) = decode_code(code)?;
                (wdf, idf, rest)
            }
        };
        if rest.len() > 2 {
            return Err(param_error("Extra data after wt_normalisation"));
        }
        let mut numbers = [0.2, 1.0];
        for (slot, token) in numbers.iter_mut().zip(rest) {
            *slot = token
                .parse()
                .map_err(|_| param_error("Parameter slope or delta is invalid"))?;
        }
        check_pivot(numbers[0], numbers[1])?;
        Ok(TfIdfWeight::from_norms(wdf, idf, numbers[0], numbers[1]))
    }

    pub fn wdf_norm(&self) -> WdfNorm {
        self.wdf_norm
    }

    pub fn idf_norm(&self) -> IdfNorm {
        self.idf_norm
    }

    fn wdfn(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        uniqterms: TermCount,
        wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 {
            return 0.0;
        }
        let w = f64::from(wdf);
        let avg_wdf = || {
            if doclen == 0 || uniqterms == 0 {
                1.0
            } else {
                f64::from(doclen) / f64::from(uniqterms)
            }
        };
        match self.wdf_norm {
            WdfNorm::None => w,
            WdfNorm::Boolean => 1.0,
            WdfNorm::Square => w * w,
            WdfNorm::Log => 1.0 + w.ln(),
            WdfNorm::Pivoted => {
                let normlen = if self.average_length > 0.0 {
                    f64::from(doclen) / self.average_length
                } else {
                    1.0
                };
                let norm_factor = 1.0 / (1.0 - self.slope + self.slope * normlen);
                (1.0 + (1.0 + w.ln()).ln()) * norm_factor + self.delta
            }
            WdfNorm::LogAverage => (1.0 + w.ln()) / (1.0 + avg_wdf().ln()),
            WdfNorm::AugLog => 0.2 + 0.8 * (1.0 + w).ln(),
            WdfNorm::Sqrt => (w - 0.5).sqrt() + 1.0,
            WdfNorm::AugAverage => 0.9 + 0.1 * (w / avg_wdf()),
            WdfNorm::Max | WdfNorm::Aug if wdf_doc_max == 0 => 0.0,
            WdfNorm::Max => w / f64::from(wdf_doc_max),
            WdfNorm::Aug => 0.5 + 0.5 * (w / f64::from(wdf_doc_max)),
        }
    }

    fn idfn(&self, stats: &WeightStats) -> f64 {
        let n = f64::from(stats.collection_size);
        let tf = f64::from(stats.termfreq.max(1));
        let cf = stats.collection_freq as f64;
        match self.idf_norm {
            IdfNorm::None => 1.0,
            IdfNorm::Tfidf => (n / tf).ln(),
            IdfNorm::Square => {
                let x = (n / tf).ln();
                x * x
            }
            IdfNorm::Freq => 1.0 / tf,
            IdfNorm::Prob => {
                if n <= tf {
                    0.0
                } else {
                    ((n - tf) / tf).ln()
                }
            }
            IdfNorm::Pivoted => ((n + 1.0) / tf).ln(),
            IdfNorm::GlobalFreq => cf / tf,
            IdfNorm::LogGlobalFreq => (cf / tf + 1.0).ln(),
            IdfNorm::IncrementedGlobalFreq => cf / tf + 1.0,
            IdfNorm::SqrtGlobalFreq => (cf / tf - 0.9).max(0.0).sqrt(),
        }
    }
}

fn param_error(message: &str) -> LexmatchError {
    LexmatchError::invalid_argument(format!("{message}: 'tfidf'"))
}

fn check_pivot(slope: f64, delta: f64) -> Result<()> {
    if slope.is_nan() || slope <= 0.0 {
        return Err(LexmatchError::invalid_argument("Parameter slope is invalid"));
    }
    if delta.is_nan() || delta <= 0.0 {
        return Err(LexmatchError::invalid_argument("Parameter delta is invalid"));
    }
    Ok(())
}

impl Weight for TfIdfWeight {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn parameters(&self) -> String {
        format!(
            "{} {} NONE {} {}",
            self.wdf_norm, self.idf_norm, self.slope, self.delta
        )
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.average_length = stats.average_length;
        self.wdf_upper_bound = stats.wdf_upper_bound;
        self.doclength_lower_bound = stats.doclength_lower_bound;
        if factor == 0.0 {
            // No term-independent component.
            self.wqf_factor = 0.0;
            return;
        }
        self.wqf_factor = f64::from(stats.wqf) * factor;
        self.idfn = self.idfn(stats);
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        doclen: TermCount,
        uniqterms: TermCount,
        wdf_doc_max: TermCount,
    ) -> f64 {
        sanitise(self.wdfn(wdf, doclen, uniqterms, wdf_doc_max) * self.idfn * self.wqf_factor)
    }

    fn maxpart(&self) -> f64 {
        let wdf_max = self.wdf_upper_bound;
        let len_min = self.doclength_lower_bound;
        // A term's wdf never exceeds the document's highest wdf.
        sanitise(self.wdfn(wdf_max, len_min, len_min, wdf_max) * self.idfn * self.wqf_factor)
    }

    fn needs_wdf_doc_max(&self) -> bool {
        matches!(self.wdf_norm, WdfNorm::Max | WdfNorm::Aug)
    }
}
