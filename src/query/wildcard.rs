//! Term expansion for `WILDCARD` and `EDIT_DISTANCE` queries.
//!
//! A wildcard without `*` or `?` matches every term starting with the
//! pattern. With them it is an anchored glob: `*` matches any run of
//! characters and `?` exactly one. Expansion happens per shard while
//! compiling, so a capped expansion may pick different terms on
//! different shards.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::database::Shard;
use crate::error::{LexmatchError, Result};
use crate::util::levenshtein::EditDistanceMatcher;

/// What to do when more terms match than `max_expansion` allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardLimit {
    /// Fail the query with a wildcard expansion error.
    #[default]
    Error,
    /// Keep the first terms in sort order.
    First,
    /// Keep the terms with the highest termfreq.
    MostFrequent,
}

/// How the expanded terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combiner {
    /// Weight the terms as one virtual term.
    #[default]
    Synonym,
    /// Weight each document by its best matching term.
    Max,
    /// Sum the weights of the matching terms.
    Or,
}

/// Expansion limits for wildcard-like queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WildcardOptions {
    /// Maximum number of terms to expand to; 0 means no limit.
    pub max_expansion: u32,
    pub limit: WildcardLimit,
    pub combiner: Combiner,
}

impl WildcardOptions {
    pub fn new() -> Self {
        WildcardOptions::default()
    }

    pub fn with_max_expansion(mut self, max_expansion: u32) -> Self {
        self.max_expansion = max_expansion;
        self
    }

    pub fn with_limit(mut self, limit: WildcardLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_combiner(mut self, combiner: Combiner) -> Self {
        self.combiner = combiner;
        self
    }
}

/// The kind of pattern being expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Wildcard {
        pattern: String,
    },
    EditDistance {
        target: String,
        max_distance: u32,
        fixed_prefix_len: u32,
    },
}

impl Pattern {
    /// True for patterns that match every term.
    pub fn matches_everything(&self) -> bool {
        match self {
            Pattern::Wildcard { pattern } => pattern.chars().all(|c| c == '*'),
            Pattern::EditDistance { .. } => false,
        }
    }

    fn label(&self) -> String {
        match self {
            Pattern::Wildcard { pattern } if is_glob(pattern) => pattern.clone(),
            Pattern::Wildcard { pattern } => format!("{pattern}*"),
            Pattern::EditDistance {
                target,
                max_distance,
                ..
            } => format!("{target}~{max_distance}"),
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Compiled test for candidate terms.
#[derive(Debug)]
pub struct TermMatcher {
    prefix: String,
    glob: Option<Regex>,
    edit: Option<EditDistanceMatcher>,
}

impl TermMatcher {
    pub fn new(pattern: &Pattern) -> Result<Self> {
        match pattern {
            Pattern::Wildcard { pattern } if is_glob(pattern) => {
                let prefix: String = pattern.chars().take_while(|c| !matches!(c, '*' | '?')).collect();
                let mut re = String::from("^");
                for c in pattern.chars() {
                    match c {
                        '*' => re.push_str(".*"),
                        '?' => re.push('.'),
                        c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
                    }
                }
                re.push('$');
                let glob = Regex::new(&re).map_err(|e| {
                    LexmatchError::invalid_argument(format!("bad wildcard pattern {pattern}: {e}"))
                })?;
                Ok(TermMatcher {
                    prefix,
                    glob: Some(glob),
                    edit: None,
                })
            }
            Pattern::Wildcard { pattern } => Ok(TermMatcher {
                prefix: pattern.clone(),
                glob: None,
                edit: None,
            }),
            Pattern::EditDistance {
                target,
                max_distance,
                fixed_prefix_len,
            } => {
                let edit = EditDistanceMatcher::new(
                    target,
                    *max_distance as usize,
                    *fixed_prefix_len as usize,
                );
                Ok(TermMatcher {
                    prefix: edit.prefix().to_string(),
                    glob: None,
                    edit: Some(edit),
                })
            }
        }
    }

    /// Every matching term starts with this.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, term: &str) -> bool {
        if !term.starts_with(&self.prefix) {
            return false;
        }
        if let Some(glob) = &self.glob {
            return glob.is_match(term);
        }
        if let Some(edit) = &self.edit {
            return edit.is_match(term);
        }
        true
    }
}

/// Expand `pattern` against the terms of one shard, applying `options`.
///
/// The result is sorted by term.
pub fn expand_terms(
    shard: &dyn Shard,
    pattern: &Pattern,
    options: &WildcardOptions,
) -> Result<Vec<String>> {
    let matcher = TermMatcher::new(pattern)?;
    let mut terms: Vec<String> = shard
        .all_terms(matcher.prefix())?
        .into_iter()
        .filter(|t| matcher.matches(t))
        .collect();

    let max = options.max_expansion as usize;
    if max == 0 || terms.len() <= max {
        return Ok(terms);
    }
    match options.limit {
        WildcardLimit::Error => Err(LexmatchError::wildcard(format!(
            "Wildcard {} expands to more than {} terms",
            pattern.label(),
            max
        ))),
        WildcardLimit::First => {
            terms.truncate(max);
            Ok(terms)
        }
        WildcardLimit::MostFrequent => {
            let mut by_freq = Vec::with_capacity(terms.len());
            for term in terms {
                let (tf, _) = shard.term_freqs(&term)?;
                by_freq.push((tf, term));
            }
            by_freq.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            by_freq.truncate(max);
            let mut terms: Vec<String> = by_freq.into_iter().map(|(_, t)| t).collect();
            terms.sort();
            Ok(terms)
        }
    }
}
