//! The query tree.
//!
//! A [`Query`] is an immutable, cheaply clonable value. Constructors
//! normalise as they build: operators over no subqueries match nothing,
//! single-subquery operators collapse to that subquery, and `MatchNothing`
//! and `MatchAll` operands are folded where the operator makes the result
//! obvious. Anything that can be rejected up front (negative scale
//! factors, misplaced numeric parameters) is rejected here rather than
//! when the query is run.
//!
//! # Examples
//!
//! ```
//! use lexmatch::query::{Op, Query};
//!
//! let q = Query::combine(Op::And, [Query::term("word"), Query::term("this")]);
//! assert_eq!(q.description(), "Query((word AND this))");
//!
//! // Empty operators match nothing.
//! assert!(Query::combine(Op::Or, []).is_empty());
//! ```

pub mod geospatial;
pub mod source;
pub mod wildcard;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{LexmatchError, Result};
use crate::registry::Registry;
use crate::types::{TermCount, TermPos, ValueSlot};

pub use geospatial::{
    GreatCircleMetric, LatLongCoord, LatLongCoords, LatLongDistancePostingSource,
};
pub use source::{
    DecreasingValueWeightPostingSource, FixedWeightPostingSource, PostingSource,
    ValueMapPostingSource, ValueWeightPostingSource,
};
pub use wildcard::{Combiner, Pattern, WildcardLimit, WildcardOptions};

/// A posting source shared between a query and the evaluations using it.
pub type SharedSource = Arc<Mutex<Box<dyn PostingSource>>>;

/// N-ary query operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Op {
    /// Documents matching every subquery; weights add.
    And,
    /// Documents matching any subquery; weights of the matching ones add.
    Or,
    /// The first subquery minus documents matching any other.
    AndNot,
    /// Documents matching an odd number of subqueries.
    Xor,
    /// The first subquery, with weight added from any others that match.
    AndMaybe,
    /// Like `And`, but only the first subquery contributes weight.
    Filter,
    /// All subqueries within a window of positions, in any order.
    Near,
    /// All subqueries within a window of positions, in order.
    Phrase,
    /// `Or` over the subqueries with the highest possible weights.
    EliteSet,
    /// `Or`, weighted as if the subqueries were one term.
    Synonym,
    /// `Or`, weighted by the best matching subquery.
    Max,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::And => "AND",
            Op::Or => "OR",
            Op::AndNot => "AND_NOT",
            Op::Xor => "XOR",
            Op::AndMaybe => "AND_MAYBE",
            Op::Filter => "FILTER",
            Op::Near => "NEAR",
            Op::Phrase => "PHRASE",
            Op::EliteSet => "ELITE_SET",
            Op::Synonym => "SYNONYM",
            Op::Max => "MAX",
        }
    }

    /// Whether the operator takes a numeric parameter.
    pub fn takes_parameter(self) -> bool {
        matches!(self, Op::Near | Op::Phrase | Op::EliteSet)
    }

    /// Operators whose result is a union of their subqueries.
    pub fn is_or_like(self) -> bool {
        matches!(self, Op::Or | Op::Xor | Op::EliteSet | Op::Synonym | Op::Max)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the query tree.
#[derive(Debug)]
pub enum QueryNode {
    Term {
        term: String,
        wqf: TermCount,
        pos: TermPos,
    },
    MatchAll,
    Source(SharedSource),
    Composite {
        op: Op,
        subqueries: Vec<Query>,
        parameter: u32,
    },
    Scale {
        factor: f64,
        subquery: Query,
    },
    ValueRange {
        slot: ValueSlot,
        begin: String,
        end: String,
    },
    ValueGe {
        slot: ValueSlot,
        limit: String,
    },
    ValueLe {
        slot: ValueSlot,
        limit: String,
    },
    Wildcard {
        pattern: Pattern,
        options: WildcardOptions,
    },
}

/// An immutable query. The default value matches nothing.
#[derive(Debug, Clone, Default)]
pub struct Query {
    node: Option<Arc<QueryNode>>,
}

impl Query {
    /// The empty query, which matches nothing.
    pub fn new() -> Self {
        Query::default()
    }

    pub fn match_nothing() -> Self {
        Query::default()
    }

    pub fn match_all() -> Self {
        Query::from_node(QueryNode::MatchAll)
    }

    /// A single term with wqf 1. The empty term matches every document.
    pub fn term<S: Into<String>>(term: S) -> Self {
        Query::term_with(term, 1, 0)
    }

    /// A term with explicit within-query frequency and query position.
    pub fn term_with<S: Into<String>>(term: S, wqf: TermCount, pos: TermPos) -> Self {
        let term = term.into();
        if term.is_empty() {
            return Query::match_all();
        }
        Query::from_node(QueryNode::Term { term, wqf, pos })
    }

    pub fn source(source: Box<dyn PostingSource>) -> Self {
        Query::shared_source(Arc::new(Mutex::new(source)))
    }

    /// A source the caller keeps a handle to. A source that supports
    /// [`PostingSource::clone_box`] is copied for every leaf, so only an
    /// uncloneable one is driven through this handle.
    pub fn shared_source(source: SharedSource) -> Self {
        Query::from_node(QueryNode::Source(source))
    }

    /// Combine subqueries with an operator taking no parameter (or its
    /// default parameter).
    pub fn combine<I>(op: Op, subqueries: I) -> Self
    where
        I: IntoIterator<Item = Query>,
    {
        Query::build_composite(op, subqueries.into_iter().collect(), 0)
    }

    /// Combine subqueries with a numeric parameter: the window for `Near`
    /// and `Phrase`, the set size for `EliteSet`. Zero selects the default.
    pub fn with_parameter<I>(op: Op, subqueries: I, parameter: u32) -> Result<Self>
    where
        I: IntoIterator<Item = Query>,
    {
        if parameter != 0 && !op.takes_parameter() {
            return Err(LexmatchError::invalid_argument(format!(
                "{op} does not take a parameter"
            )));
        }
        Ok(Query::build_composite(
            op,
            subqueries.into_iter().collect(),
            parameter,
        ))
    }

    pub fn and(a: Query, b: Query) -> Self {
        Query::combine(Op::And, [a, b])
    }

    pub fn or(a: Query, b: Query) -> Self {
        Query::combine(Op::Or, [a, b])
    }

    pub fn and_not(a: Query, b: Query) -> Self {
        Query::combine(Op::AndNot, [a, b])
    }

    pub fn and_maybe(a: Query, b: Query) -> Self {
        Query::combine(Op::AndMaybe, [a, b])
    }

    pub fn filter(a: Query, b: Query) -> Self {
        Query::combine(Op::Filter, [a, b])
    }

    /// Multiply the weights of `subquery` by `factor`.
    ///
    /// A factor of 0 keeps the matching documents but gives them no weight
    /// and avoids computing any. Negative factors are rejected.
    pub fn scale(factor: f64, subquery: Query) -> Result<Self> {
        if factor.is_nan() || factor < 0.0 {
            return Err(LexmatchError::invalid_argument(
                "OP_SCALE_WEIGHT requires factor >= 0",
            ));
        }
        let Some(node) = subquery.node.as_deref() else {
            return Ok(subquery);
        };
        if factor == 1.0 {
            return Ok(subquery);
        }
        match node {
            // Value filters carry no weight to scale.
            QueryNode::ValueRange { .. } | QueryNode::ValueGe { .. } | QueryNode::ValueLe { .. } => {
                Ok(subquery)
            }
            QueryNode::Scale {
                factor: inner,
                subquery: inner_query,
            } => Ok(Query::from_node(QueryNode::Scale {
                factor: factor * inner,
                subquery: inner_query.clone(),
            })),
            _ => Ok(Query::from_node(QueryNode::Scale { factor, subquery })),
        }
    }

    /// Documents whose value in `slot` lies in `[begin, end]`.
    pub fn value_range<S: Into<String>, T: Into<String>>(slot: ValueSlot, begin: S, end: T) -> Self {
        let begin = begin.into();
        let end = end.into();
        if begin.is_empty() {
            return Query::value_le(slot, end);
        }
        if begin > end {
            return Query::match_nothing();
        }
        Query::from_node(QueryNode::ValueRange { slot, begin, end })
    }

    /// Documents whose value in `slot` is at least `limit`.
    pub fn value_ge<S: Into<String>>(slot: ValueSlot, limit: S) -> Self {
        let limit = limit.into();
        if limit.is_empty() {
            return Query::match_all();
        }
        Query::from_node(QueryNode::ValueGe { slot, limit })
    }

    /// Documents with a value in `slot` that is at most `limit`.
    pub fn value_le<S: Into<String>>(slot: ValueSlot, limit: S) -> Self {
        Query::from_node(QueryNode::ValueLe {
            slot,
            limit: limit.into(),
        })
    }

    /// Terms matching a wildcard pattern, combined per `options`.
    pub fn wildcard<S: Into<String>>(pattern: S, options: WildcardOptions) -> Self {
        let pattern = Pattern::Wildcard {
            pattern: pattern.into(),
        };
        if pattern.matches_everything() {
            return Query::match_all();
        }
        Query::from_node(QueryNode::Wildcard { pattern, options })
    }

    /// Terms within `max_distance` edits of `target` whose first
    /// `fixed_prefix_len` characters match it exactly.
    pub fn edit_distance<S: Into<String>>(
        target: S,
        max_distance: u32,
        fixed_prefix_len: u32,
        options: WildcardOptions,
    ) -> Self {
        Query::from_node(QueryNode::Wildcard {
            pattern: Pattern::EditDistance {
                target: target.into(),
                max_distance,
                fixed_prefix_len,
            },
            options,
        })
    }

    fn from_node(node: QueryNode) -> Self {
        Query {
            node: Some(Arc::new(node)),
        }
    }

    fn build_composite(op: Op, subqueries: Vec<Query>, parameter: u32) -> Self {
        let mut subs = Vec::with_capacity(subqueries.len());
        match op {
            Op::And | Op::Near | Op::Phrase => {
                if subqueries.iter().any(Query::is_empty) {
                    return Query::match_nothing();
                }
                if op == Op::And && subqueries.iter().all(Query::is_match_all) {
                    return Query::match_all();
                }
                for q in subqueries {
                    // MatchAll adds nothing to an AND with other operands.
                    if op == Op::And && q.is_match_all() {
                        continue;
                    }
                    subs.push(q);
                }
            }
            Op::Filter => {
                if subqueries.iter().any(Query::is_empty) {
                    return Query::match_nothing();
                }
                for (i, q) in subqueries.into_iter().enumerate() {
                    if i > 0 && q.is_match_all() {
                        continue;
                    }
                    subs.push(q);
                }
            }
            Op::AndNot | Op::AndMaybe => {
                let mut iter = subqueries.into_iter();
                let Some(left) = iter.next() else {
                    return Query::match_nothing();
                };
                if left.is_empty() {
                    return Query::match_nothing();
                }
                subs.push(left);
                for q in iter {
                    if q.is_empty() {
                        continue;
                    }
                    if op == Op::AndNot && q.is_match_all() {
                        return Query::match_nothing();
                    }
                    subs.push(q);
                }
            }
            Op::Xor => {
                for q in subqueries.into_iter().filter(|q| !q.is_empty()) {
                    // The same subquery twice cancels out.
                    if let Some(i) = subs.iter().position(|s: &Query| s.same_object(&q)) {
                        subs.remove(i);
                    } else {
                        subs.push(q);
                    }
                }
            }
            Op::Or | Op::EliteSet | Op::Synonym | Op::Max => {
                subs.extend(subqueries.into_iter().filter(|q| !q.is_empty()));
            }
        }

        match subs.len() {
            0 => Query::match_nothing(),
            1 => subs.pop().unwrap_or_default(),
            _ => {
                Query::from_node(QueryNode::Composite {
                    op,
                    subqueries: subs,
                    parameter,
                })
            }
        }
    }

    /// The root node, or `None` for the empty query.
    pub fn node(&self) -> Option<&QueryNode> {
        self.node.as_deref()
    }

    /// True for the empty query (which matches nothing).
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self.node(), Some(QueryNode::MatchAll))
    }

    /// Whether both handles refer to the same query object.
    pub fn same_object(&self, other: &Query) -> bool {
        match (&self.node, &other.node) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Distinct terms in the query, in the order they first appear.
    pub fn terms(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.visit_terms(&mut |term, _| {
            if !out.iter().any(|t| t == term) {
                out.push(term.to_string());
            }
        });
        out
    }

    /// Sum of wqf over all term leaves. Each wildcard counts once.
    pub fn query_length(&self) -> TermCount {
        let mut len: TermCount = 0;
        self.visit_terms(&mut |_, wqf| len = len.saturating_add(wqf));
        len + self.count_wildcards()
    }

    fn visit_terms(&self, f: &mut dyn FnMut(&str, TermCount)) {
        match self.node() {
            Some(QueryNode::Term { term, wqf, .. }) => f(term, *wqf),
            Some(QueryNode::Composite { subqueries, .. }) => {
                for q in subqueries {
                    q.visit_terms(f);
                }
            }
            Some(QueryNode::Scale { subquery, .. }) => subquery.visit_terms(f),
            _ => {}
        }
    }

    fn count_wildcards(&self) -> TermCount {
        match self.node() {
            Some(QueryNode::Wildcard { .. }) => 1,
            Some(QueryNode::Composite { subqueries, .. }) => {
                subqueries.iter().map(Query::count_wildcards).sum()
            }
            Some(QueryNode::Scale { subquery, .. }) => subquery.count_wildcards(),
            _ => 0,
        }
    }

    /// A human-readable rendering, e.g. `Query((a OR b))`.
    pub fn description(&self) -> String {
        format!("Query({})", self.describe())
    }

    fn describe(&self) -> String {
        let Some(node) = self.node() else {
            return String::new();
        };
        match node {
            QueryNode::Term { term, wqf, pos } => {
                let mut s = term.clone();
                if *wqf != 1 {
                    s.push_str(&format!("#{wqf}"));
                }
                if *pos != 0 {
                    s.push_str(&format!("@{pos}"));
                }
                s
            }
            QueryNode::MatchAll => "<alldocuments>".to_string(),
            QueryNode::Source(source) => source.lock().description(),
            QueryNode::Composite {
                op,
                subqueries,
                parameter,
            } => {
                let sep = if op.takes_parameter() && *parameter != 0 {
                    format!(" {op} {parameter} ")
                } else {
                    format!(" {op} ")
                };
                let parts: Vec<String> = subqueries.iter().map(Query::describe).collect();
                format!("({})", parts.join(&sep))
            }
            QueryNode::Scale { factor, subquery } => {
                format!("{factor} * {}", subquery.describe())
            }
            QueryNode::ValueRange { slot, begin, end } => {
                format!("VALUE_RANGE {slot} {begin} {end}")
            }
            QueryNode::ValueGe { slot, limit } => format!("VALUE_GE {slot} {limit}"),
            QueryNode::ValueLe { slot, limit } => format!("VALUE_LE {slot} {limit}"),
            QueryNode::Wildcard { pattern, options } => {
                let combiner = match options.combiner {
                    Combiner::Synonym => "SYNONYM",
                    Combiner::Max => "MAX",
                    Combiner::Or => "OR",
                };
                match pattern {
                    Pattern::Wildcard { pattern } => format!("WILDCARD {combiner} {pattern}"),
                    Pattern::EditDistance {
                        target,
                        max_distance,
                        ..
                    } => format!("EDIT_DISTANCE {combiner} ~{max_distance} {target}"),
                }
            }
        }
    }

    /// A serialisable description of this query.
    ///
    /// Fails for posting sources that have no registry name.
    pub fn to_description(&self) -> Result<QueryDescription> {
        let Some(node) = self.node() else {
            return Ok(QueryDescription::MatchNothing);
        };
        Ok(match node {
            QueryNode::Term { term, wqf, pos } => QueryDescription::Term {
                term: term.clone(),
                wqf: *wqf,
                pos: *pos,
            },
            QueryNode::MatchAll => QueryDescription::MatchAll,
            QueryNode::Source(source) => {
                let source = source.lock();
                if source.name().is_empty() {
                    return Err(LexmatchError::serialisation(format!(
                        "{} has no registered name",
                        source.description()
                    )));
                }
                QueryDescription::Source {
                    name: source.name().to_string(),
                    parameters: source.parameters(),
                }
            }
            QueryNode::Composite {
                op,
                subqueries,
                parameter,
            } => QueryDescription::Op {
                op: *op,
                subqueries: subqueries
                    .iter()
                    .map(Query::to_description)
                    .collect::<Result<_>>()?,
                parameter: *parameter,
            },
            QueryNode::Scale { factor, subquery } => QueryDescription::Scale {
                factor: *factor,
                subquery: Box::new(subquery.to_description()?),
            },
            QueryNode::ValueRange { slot, begin, end } => QueryDescription::ValueRange {
                slot: *slot,
                begin: begin.clone(),
                end: end.clone(),
            },
            QueryNode::ValueGe { slot, limit } => QueryDescription::ValueGe {
                slot: *slot,
                limit: limit.clone(),
            },
            QueryNode::ValueLe { slot, limit } => QueryDescription::ValueLe {
                slot: *slot,
                limit: limit.clone(),
            },
            QueryNode::Wildcard { pattern, options } => QueryDescription::Wildcard {
                pattern: pattern.clone(),
                options: *options,
            },
        })
    }

    /// Rebuild a query, creating posting sources through `registry`.
    pub fn from_description(desc: &QueryDescription, registry: &Registry) -> Result<Self> {
        Ok(match desc {
            QueryDescription::MatchNothing => Query::match_nothing(),
            QueryDescription::MatchAll => Query::match_all(),
            QueryDescription::Term { term, wqf, pos } => Query::term_with(term.clone(), *wqf, *pos),
            QueryDescription::Op {
                op,
                subqueries,
                parameter,
            } => {
                let subs = subqueries
                    .iter()
                    .map(|d| Query::from_description(d, registry))
                    .collect::<Result<Vec<_>>>()?;
                Query::with_parameter(*op, subs, *parameter)?
            }
            QueryDescription::Scale { factor, subquery } => {
                Query::scale(*factor, Query::from_description(subquery, registry)?)?
            }
            QueryDescription::ValueRange { slot, begin, end } => {
                Query::value_range(*slot, begin.clone(), end.clone())
            }
            QueryDescription::ValueGe { slot, limit } => Query::value_ge(*slot, limit.clone()),
            QueryDescription::ValueLe { slot, limit } => Query::value_le(*slot, limit.clone()),
            QueryDescription::Wildcard { pattern, options } => match pattern {
                Pattern::Wildcard { pattern } => Query::wildcard(pattern.clone(), *options),
                Pattern::EditDistance {
                    target,
                    max_distance,
                    fixed_prefix_len,
                } => Query::edit_distance(target.clone(), *max_distance, *fixed_prefix_len, *options),
            },
            QueryDescription::Source { name, parameters } => {
                Query::source(registry.posting_source(name, parameters)?)
            }
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_description()?)?)
    }

    pub fn from_json(json: &str, registry: &Registry) -> Result<Self> {
        let desc: QueryDescription = serde_json::from_str(json)?;
        Query::from_description(&desc, registry)
    }
}

impl From<&str> for Query {
    fn from(term: &str) -> Self {
        Query::term(term)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

fn default_wqf() -> TermCount {
    1
}

/// Serialisable form of a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryDescription {
    MatchNothing,
    MatchAll,
    Term {
        term: String,
        #[serde(default = "default_wqf")]
        wqf: TermCount,
        #[serde(default)]
        pos: TermPos,
    },
    Op {
        op: Op,
        subqueries: Vec<QueryDescription>,
        #[serde(default)]
        parameter: u32,
    },
    Scale {
        factor: f64,
        subquery: Box<QueryDescription>,
    },
    ValueRange {
        slot: ValueSlot,
        begin: String,
        end: String,
    },
    ValueGe {
        slot: ValueSlot,
        limit: String,
    },
    ValueLe {
        slot: ValueSlot,
        limit: String,
    },
    Wildcard {
        pattern: Pattern,
        #[serde(default)]
        options: WildcardOptions,
    },
    Source {
        name: String,
        #[serde(default)]
        parameters: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Query {
        Query::term(s)
    }

    #[test]
    fn test_empty_operators_match_nothing() {
        for op in [Op::And, Op::Or, Op::Xor, Op::Synonym, Op::EliteSet, Op::AndNot] {
            assert!(Query::combine(op, []).is_empty(), "{op}");
        }
        assert_eq!(Query::new().description(), "Query()");
    }

    #[test]
    fn test_single_subquery_collapses() {
        for op in [Op::And, Op::Or, Op::Synonym, Op::Phrase, Op::EliteSet, Op::Max] {
            let q = Query::combine(op, [t("word")]);
            assert_eq!(q.description(), "Query(word)");
        }
        let q = Query::combine(Op::Or, [t("word"), Query::new()]);
        assert_eq!(q.description(), "Query(word)");
    }

    #[test]
    fn test_match_nothing_and_all_folding() {
        assert!(Query::and(t("a"), Query::new()).is_empty());
        assert!(Query::and(Query::match_all(), Query::match_all()).is_match_all());
        assert_eq!(Query::and(t("a"), Query::match_all()).description(), "Query(a)");
        assert!(Query::and_not(t("a"), Query::match_all()).is_empty());
        assert_eq!(Query::and_not(t("a"), Query::new()).description(), "Query(a)");
        assert!(Query::and_maybe(Query::new(), t("b")).is_empty());
        assert_eq!(Query::filter(t("a"), Query::match_all()).description(), "Query(a)");
    }

    #[test]
    fn test_xor_of_same_object_is_empty() {
        let q = t("a");
        assert!(Query::combine(Op::Xor, [q.clone(), q.clone()]).is_empty());
        // Equal but distinct objects are kept.
        let q2 = Query::combine(Op::Xor, [t("a"), t("a")]);
        assert!(!q2.is_empty());
        assert_eq!(Query::combine(Op::Xor, [q.clone(), t("b"), q]).description(), "Query(b)");
    }

    #[test]
    fn test_and_keeps_duplicates() {
        let q = t("a");
        let and = Query::and(q.clone(), q);
        assert_eq!(and.description(), "Query((a AND a))");
        assert_eq!(and.query_length(), 2);
    }

    #[test]
    fn test_scale_weight() -> Result<()> {
        assert!(Query::scale(-1.0, t("a")).is_err());
        assert_eq!(Query::scale(1.0, t("a"))?.description(), "Query(a)");
        assert_eq!(Query::scale(0.0, t("a"))?.description(), "Query(0 * a)");
        let nested = Query::scale(2.0, Query::scale(1.5, t("a"))?)?;
        assert_eq!(nested.description(), "Query(3 * a)");
        let range = Query::value_range(1, "a", "b");
        assert_eq!(Query::scale(2.0, range)?.description(), "Query(VALUE_RANGE 1 a b)");
        assert!(Query::scale(3.0, Query::new())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_value_constructors() {
        assert!(Query::value_ge(0, "").is_match_all());
        assert!(Query::value_range(0, "b", "a").is_empty());
        assert_eq!(Query::value_range(0, "", "m").description(), "Query(VALUE_LE 0 m)");
    }

    #[test]
    fn test_parameters() -> Result<()> {
        assert!(Query::with_parameter(Op::And, [t("a"), t("b")], 3).is_err());
        let q = Query::with_parameter(Op::Near, [t("a"), t("b")], 3)?;
        assert_eq!(q.description(), "Query((a NEAR 3 b))");
        Ok(())
    }

    #[test]
    fn test_wildcard_everything() {
        assert!(Query::wildcard("*", WildcardOptions::new()).is_match_all());
        assert!(Query::wildcard("", WildcardOptions::new()).is_match_all());
        assert_eq!(
            Query::wildcard("th", WildcardOptions::new()).description(),
            "Query(WILDCARD SYNONYM th)"
        );
    }

    #[test]
    fn test_terms_and_length() {
        let q = Query::combine(
            Op::Or,
            [Query::term_with("a", 2, 1), t("b"), Query::term_with("a", 1, 3)],
        );
        assert_eq!(q.terms(), vec!["a", "b"]);
        assert_eq!(q.query_length(), 4);
        assert_eq!(Query::term_with("a", 2, 1).description(), "Query(a#2@1)");
    }

    #[test]
    fn test_json_round_trip() -> Result<()> {
        let registry = Registry::new();
        let q = Query::with_parameter(
            Op::Phrase,
            [t("new"), t("york"), Query::wildcard("ci", WildcardOptions::new().with_max_expansion(5))],
            0,
        )?;
        let q = Query::and_not(Query::scale(2.0, q)?, Query::value_ge(3, "x"));
        let again = Query::from_json(&q.to_json()?, &registry)?;
        assert_eq!(again.description(), q.description());
        Ok(())
    }
}
