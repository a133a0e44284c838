//! Weighting schemes that ignore term statistics.

use crate::error::Result;
use crate::types::TermCount;
use crate::weight::{Weight, WeightStats, parse_numbers, sanitise};

/// Gives every document a weight of 0; the result order is by docid.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolWeight;

impl BoolWeight {
    pub fn new() -> Self {
        BoolWeight
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        parse_numbers("bool", params, &[])?;
        Ok(BoolWeight)
    }
}

impl Weight for BoolWeight {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn parameters(&self) -> String {
        String::new()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(*self)
    }

    fn init(&mut self, _stats: &WeightStats, _factor: f64) {}

    fn sumpart(
        &self,
        _wdf: TermCount,
        _doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        0.0
    }

    fn maxpart(&self) -> f64 {
        0.0
    }

    fn is_bool(&self) -> bool {
        true
    }
}

/// Counts matching subqueries: each one contributes its scale factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordWeight {
    factor: f64,
}

impl CoordWeight {
    pub fn new() -> Self {
        CoordWeight::default()
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        parse_numbers("coord", params, &[])?;
        Ok(CoordWeight::default())
    }
}

impl Weight for CoordWeight {
    fn name(&self) -> &'static str {
        "coord"
    }

    fn parameters(&self) -> String {
        String::new()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(*self)
    }

    fn init(&mut self, _stats: &WeightStats, factor: f64) {
        self.factor = factor.max(0.0);
    }

    fn sumpart(
        &self,
        _wdf: TermCount,
        _doclen: TermCount,
        _uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        self.factor
    }

    fn maxpart(&self) -> f64 {
        self.factor
    }
}

/// Dice coefficient between the query and the document's set of terms:
/// each matching term adds `2 * wqf / (query_length + uniqterms)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiceCoeffWeight {
    factor: f64,
    query_length: TermCount,
    unique_terms_lower_bound: TermCount,
}

impl DiceCoeffWeight {
    pub fn new() -> Self {
        DiceCoeffWeight::default()
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        parse_numbers("dicecoeff", params, &[])?;
        Ok(DiceCoeffWeight::default())
    }

    fn part(&self, uniqterms: TermCount) -> f64 {
        let denom = f64::from(self.query_length) + f64::from(uniqterms);
        if denom > 0.0 { self.factor * 2.0 / denom } else { 0.0 }
    }
}

impl Weight for DiceCoeffWeight {
    fn name(&self) -> &'static str {
        "dicecoeff"
    }

    fn parameters(&self) -> String {
        String::new()
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(*self)
    }

    fn init(&mut self, stats: &WeightStats, factor: f64) {
        self.query_length = stats.query_length;
        self.unique_terms_lower_bound = stats.unique_terms_lower_bound.max(1);
        self.factor = if factor > 0.0 {
            f64::from(stats.wqf) * factor
        } else {
            0.0
        };
    }

    fn sumpart(
        &self,
        wdf: TermCount,
        _doclen: TermCount,
        uniqterms: TermCount,
        _wdf_doc_max: TermCount,
    ) -> f64 {
        if wdf == 0 {
            return 0.0;
        }
        sanitise(self.part(uniqterms.max(1)))
    }

    fn maxpart(&self) -> f64 {
        sanitise(self.part(self.unique_terms_lower_bound))
    }
}
