//! Shared helpers used across lexmatch components.

pub mod estimate;
pub mod levenshtein;
pub mod sortable;
