//! # lexmatch
//!
//! A ranked retrieval engine over inverted indexes.
//!
//! ## Features
//!
//! - Boolean, positional, wildcard and weighted query trees
//! - Probabilistic, divergence-from-randomness and language-model weights
//! - Top-k matching with pruning, sorting, collapsing and cutoffs
//! - Match-count bounds that stay honest when matching stops early
//! - Relevance feedback and query expansion
//! - Sharded in-memory databases

pub mod cli;
pub mod compiler;
pub mod database;
pub mod enquire;
pub mod error;
pub mod expand;
pub mod matcher;
pub mod mset;
pub mod postlist;
pub mod query;
pub mod registry;
pub mod types;
pub mod util;
pub mod weight;

pub mod prelude {
    pub use crate::database::{Database, Document, MemoryShard, Shard};
    pub use crate::enquire::Enquire;
    pub use crate::error::{LexmatchError, Result};
    pub use crate::expand::{ESet, ExpandOptions, RSet};
    pub use crate::matcher::{MatchDecider, MatchOptions, MatchSpy, SortBy, ValueCountMatchSpy};
    pub use crate::mset::{MSet, MSetItem, MatchBounds};
    pub use crate::query::{Op, Query};
    pub use crate::registry::Registry;
    pub use crate::types::{DocCount, DocId, TermCount, ValueSlot};
    pub use crate::weight::{BM25Weight, Weight};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
