//! Named factories for weights, posting sources and match spies.
//!
//! Serialised queries and the CLI refer to these objects by name plus a
//! parameter string. A [`Registry`] is an ordinary value built by the
//! caller and passed to the code that needs it; [`Registry::new`] comes
//! with every built-in implementation registered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{LexmatchError, Result};
use crate::matcher::{MatchSpy, TermCountMatchSpy, ValueCountMatchSpy};
use crate::query::{
    DecreasingValueWeightPostingSource, FixedWeightPostingSource, LatLongDistancePostingSource,
    PostingSource, ValueMapPostingSource, ValueWeightPostingSource,
};
use crate::weight::{
    BB2Weight, BM25PlusWeight, BM25Weight, BoolWeight, CoordWeight, DLHWeight, DPHWeight,
    DiceCoeffWeight, IfB2Weight, InL2Weight, IneB2Weight, LM2StageWeight, LMAbsDiscountWeight,
    LMDirichletWeight, LMJMWeight, PL2PlusWeight, PL2Weight, TfIdfWeight, TradWeight, Weight,
};

pub type WeightFactory = Arc<dyn Fn(&str) -> Result<Box<dyn Weight>> + Send + Sync>;
pub type SourceFactory = Arc<dyn Fn(&str) -> Result<Box<dyn PostingSource>> + Send + Sync>;
pub type SpyFactory = Arc<dyn Fn(&str) -> Result<Box<dyn MatchSpy>> + Send + Sync>;

/// Lookup tables from names to factories.
#[derive(Clone, Default)]
pub struct Registry {
    weights: BTreeMap<String, WeightFactory>,
    sources: BTreeMap<String, SourceFactory>,
    spies: BTreeMap<String, SpyFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("weights", &self.weights.keys().collect::<Vec<_>>())
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("spies", &self.spies.keys().collect::<Vec<_>>())
            .finish()
    }
}

macro_rules! weight_factory {
    ($ty:ty) => {
        Arc::new(|params: &str| -> Result<Box<dyn Weight>> { Ok(Box::new(<$ty>::from_parameters(params)?)) })
    };
}

macro_rules! source_factory {
    ($ty:ty) => {
        Arc::new(|params: &str| -> Result<Box<dyn PostingSource>> {
            Ok(Box::new(<$ty>::from_parameters(params)?))
        })
    };
}

impl Registry {
    /// A registry holding every built-in weight, source and spy.
    pub fn new() -> Self {
        let mut registry = Registry::empty();

        registry.register_weight("bm25", weight_factory!(BM25Weight));
        registry.register_weight("bm25+", weight_factory!(BM25PlusWeight));
        registry.register_weight("trad", weight_factory!(TradWeight));
        registry.register_weight("tfidf", weight_factory!(TfIdfWeight));
        registry.register_weight("inl2", weight_factory!(InL2Weight));
        registry.register_weight("ifb2", weight_factory!(IfB2Weight));
        registry.register_weight("ineb2", weight_factory!(IneB2Weight));
        registry.register_weight("bb2", weight_factory!(BB2Weight));
        registry.register_weight("pl2", weight_factory!(PL2Weight));
        registry.register_weight("pl2+", weight_factory!(PL2PlusWeight));
        registry.register_weight("dph", weight_factory!(DPHWeight));
        registry.register_weight("dlh", weight_factory!(DLHWeight));
        registry.register_weight("lmjm", weight_factory!(LMJMWeight));
        registry.register_weight("lmdirichlet", weight_factory!(LMDirichletWeight));
        registry.register_weight("lmabsdiscount", weight_factory!(LMAbsDiscountWeight));
        registry.register_weight("lm2stage", weight_factory!(LM2StageWeight));
        registry.register_weight("bool", weight_factory!(BoolWeight));
        registry.register_weight("coord", weight_factory!(CoordWeight));
        registry.register_weight("dicecoeff", weight_factory!(DiceCoeffWeight));

        registry.register_posting_source("value_weight", source_factory!(ValueWeightPostingSource));
        registry.register_posting_source("value_map", source_factory!(ValueMapPostingSource));
        registry.register_posting_source("fixed_weight", source_factory!(FixedWeightPostingSource));
        registry.register_posting_source(
            "decreasing_value_weight",
            source_factory!(DecreasingValueWeightPostingSource),
        );
        registry.register_posting_source(
            "latlong_distance",
            source_factory!(LatLongDistancePostingSource),
        );

        registry.register_match_spy(
            "value_count",
            Arc::new(|params: &str| -> Result<Box<dyn MatchSpy>> {
                Ok(Box::new(ValueCountMatchSpy::from_parameters(params)?))
            }),
        );
        registry.register_match_spy(
            "term_count",
            Arc::new(|params: &str| -> Result<Box<dyn MatchSpy>> {
                Ok(Box::new(TermCountMatchSpy::from_parameters(params)?))
            }),
        );

        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Registry::default()
    }

    /// Register a weighting scheme, replacing any existing entry.
    pub fn register_weight(&mut self, name: &str, factory: WeightFactory) {
        self.weights.insert(name.to_string(), factory);
    }

    pub fn register_posting_source(&mut self, name: &str, factory: SourceFactory) {
        self.sources.insert(name.to_string(), factory);
    }

    pub fn register_match_spy(&mut self, name: &str, factory: SpyFactory) {
        self.spies.insert(name.to_string(), factory);
    }

    /// Build the weight called `name` from its parameter string.
    pub fn weight(&self, name: &str, params: &str) -> Result<Box<dyn Weight>> {
        let factory = self.weights.get(name).ok_or_else(|| {
            LexmatchError::serialisation(format!("Weight object {name} not registered"))
        })?;
        factory(params)
    }

    /// Build a weight from a scheme string such as `"bm25 1 0 1 0.5 0.5"`.
    pub fn weight_from_scheme(&self, scheme: &str) -> Result<Box<dyn Weight>> {
        let scheme = scheme.trim();
        let (name, params) = scheme.split_once(char::is_whitespace).unwrap_or((scheme, ""));
        if name.is_empty() {
            return Err(LexmatchError::invalid_argument("empty weighting scheme"));
        }
        self.weight(name, params.trim())
    }

    pub fn posting_source(&self, name: &str, params: &str) -> Result<Box<dyn PostingSource>> {
        let factory = self.sources.get(name).ok_or_else(|| {
            LexmatchError::serialisation(format!("PostingSource {name} not registered"))
        })?;
        factory(params)
    }

    pub fn match_spy(&self, name: &str, params: &str) -> Result<Box<dyn MatchSpy>> {
        let factory = self.spies.get(name).ok_or_else(|| {
            LexmatchError::serialisation(format!("MatchSpy {name} not registered"))
        })?;
        factory(params)
    }

    pub fn weight_names(&self) -> Vec<&str> {
        self.weights.keys().map(String::as_str).collect()
    }

    pub fn posting_source_names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn match_spy_names(&self) -> Vec<&str> {
        self.spies.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_weights_round_trip_names() -> Result<()> {
        let registry = Registry::new();
        for name in registry.weight_names() {
            let w = registry.weight(name, "")?;
            assert_eq!(w.name(), name);
            let again = registry.weight(name, &w.parameters())?;
            assert_eq!(again.description(), w.description());
        }
        Ok(())
    }

    #[test]
    fn test_weight_from_scheme() -> Result<()> {
        let registry = Registry::new();
        let w = registry.weight_from_scheme("bm25 1 0 1 0.5 0.5")?;
        assert_eq!(w.name(), "bm25");
        assert_eq!(registry.weight_from_scheme("  tfidf ntn ")?.name(), "tfidf");
        assert!(matches!(
            registry.weight_from_scheme("nosuch"),
            Err(LexmatchError::Serialisation(_))
        ));
        assert!(registry.weight_from_scheme("").is_err());
        for scheme in ["dlh", "pl2+ 1 0.8", "dicecoeff"] {
            let w = registry.weight_from_scheme(scheme)?;
            assert_eq!(w.description(), scheme);
        }
        Ok(())
    }

    #[test]
    fn test_sources_and_spies() -> Result<()> {
        let registry = Registry::new();
        assert_eq!(registry.posting_source("fixed_weight", "2.5")?.name(), "fixed_weight");
        assert_eq!(registry.match_spy("value_count", "3")?.name(), "value_count");
        assert_eq!(registry.match_spy("term_count", "XC A")?.name(), "term_count");
        let centre = r#"{"slot":1,"centre":[{"latitude":51.5,"longitude":0.1}]}"#;
        let source = registry.posting_source("latlong_distance", centre)?;
        assert_eq!(source.name(), "latlong_distance");
        assert!(registry.posting_source("latlong_distance", r#"{"slot":1,"centre":[]}"#).is_err());
        assert!(registry.posting_source("nosuch", "").is_err());
        assert!(Registry::empty().posting_source("fixed_weight", "1").is_err());
        Ok(())
    }

    #[test]
    fn test_registration_replaces() -> Result<()> {
        let mut registry = Registry::new();
        registry.register_weight("bm25", weight_factory!(BoolWeight));
        assert_eq!(registry.weight("bm25", "")?.name(), "bool");
        assert_eq!(registry.weight_names().len(), Registry::new().weight_names().len());
        Ok(())
    }
}
