//! Command line argument parsing for the lexmatch CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::query::Op;

/// lexmatch - run ranked queries and query expansion over a JSON corpus
#[derive(Parser, Debug, Clone)]
#[command(name = "lexmatch")]
#[command(about = "Run ranked queries and query expansion over a JSON corpus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct LexmatchArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug, 4=trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl LexmatchArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a query and print the ranked matches
    Search(SearchArgs),

    /// Suggest expansion terms from relevant documents
    Expand(ExpandArgs),

    /// Show corpus statistics
    Stats(StatsArgs),

    /// Print a query's description and JSON form
    Describe(DescribeArgs),
}

/// How a query is given on the command line.
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Query terms, combined with --op
    #[arg(value_name = "TERMS")]
    pub terms: Vec<String>,

    /// Operator joining the terms
    #[arg(long, default_value = "or")]
    pub op: CliOp,

    /// Window for near/phrase, or set size for elite-set
    #[arg(long)]
    pub window: Option<u32>,

    /// A serialised query (JSON), used instead of the terms
    #[arg(long, value_name = "JSON", conflicts_with = "terms")]
    pub query_json: Option<String>,
}

/// Corpus file options shared by the commands that read one.
#[derive(Parser, Debug, Clone)]
pub struct CorpusArgs {
    /// Corpus file: a JSON array of documents or one document per line
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Split the corpus round-robin into this many shards
    #[arg(long, default_value = "1")]
    pub shards: usize,

    /// Don't store term positions
    #[arg(long)]
    pub no_positions: bool,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Weighting scheme and parameters, e.g. "bm25 1 0 1 0.5 0.5"
    #[arg(short = 'w', long, default_value = "bm25")]
    pub weight: String,

    /// Rank of the first result to return
    #[arg(short, long, default_value = "0")]
    pub offset: u32,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Sort by the value in this slot instead of by relevance
    #[arg(long, value_name = "SLOT")]
    pub sort_value: Option<u32>,

    /// Sort values in descending order
    #[arg(long)]
    pub reverse: bool,

    /// Collapse on the value in this slot
    #[arg(long, value_name = "SLOT")]
    pub collapse: Option<u32>,

    /// Documents kept per collapse key
    #[arg(long, default_value = "1")]
    pub collapse_max: u32,

    /// Minimum percentage score
    #[arg(long, default_value = "0")]
    pub percent_cutoff: u32,

    /// Minimum weight
    #[arg(long, default_value = "0")]
    pub weight_cutoff: f64,

    /// Examine at least this many matches
    #[arg(long, default_value = "0")]
    pub check_at_least: u32,

    /// Stop matching after this many seconds
    #[arg(long, default_value = "0")]
    pub time_limit: f64,

    /// Count the values of this slot over all matches
    #[arg(long, value_name = "SLOT")]
    pub facet: Option<u32>,
}

/// Arguments for query expansion
#[derive(Parser, Debug, Clone)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Relevant docids, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub rset: Vec<u32>,

    /// Expansion scheme: trad or bo1
    #[arg(long, default_value = "trad")]
    pub scheme: String,

    /// Parameter k of the trad scheme
    #[arg(long, default_value = "1.0")]
    pub k: f64,

    /// Maximum number of terms to suggest
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Allow terms already in the query
    #[arg(long)]
    pub include_query_terms: bool,

    /// Use exact term frequencies across shards
    #[arg(long)]
    pub exact_termfreq: bool,
}

/// Arguments for corpus statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

/// Arguments for describing a query
#[derive(Parser, Debug, Clone)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

/// Query operators selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliOp {
    And,
    Or,
    AndNot,
    Xor,
    AndMaybe,
    Filter,
    Near,
    Phrase,
    EliteSet,
    Synonym,
    Max,
}

impl From<CliOp> for Op {
    fn from(op: CliOp) -> Op {
        match op {
            CliOp::And => Op::And,
            CliOp::Or => Op::Or,
            CliOp::AndNot => Op::AndNot,
            CliOp::Xor => Op::Xor,
            CliOp::AndMaybe => Op::AndMaybe,
            CliOp::Filter => Op::Filter,
            CliOp::Near => Op::Near,
            CliOp::Phrase => Op::Phrase,
            CliOp::EliteSet => Op::EliteSet,
            CliOp::Synonym => Op::Synonym,
            CliOp::Max => Op::Max,
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = LexmatchArgs::try_parse_from([
            "lexmatch",
            "search",
            "corpus.json",
            "red",
            "fish",
            "--op",
            "and",
            "--limit",
            "20",
            "--collapse",
            "2",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 3);
        if let Command::Search(search) = args.command {
            assert_eq!(search.corpus.corpus, PathBuf::from("corpus.json"));
            assert_eq!(search.query.terms, vec!["red", "fish"]);
            assert_eq!(search.query.op, CliOp::And);
            assert_eq!(search.limit, 20);
            assert_eq!(search.collapse, Some(2));
            assert_eq!(search.weight, "bm25");
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_expand_command() {
        let args = LexmatchArgs::try_parse_from([
            "lexmatch",
            "expand",
            "corpus.json",
            "--rset",
            "1,3",
            "--scheme",
            "bo1",
        ])
        .unwrap();

        if let Command::Expand(expand) = args.command {
            assert_eq!(expand.rset, vec![1, 3]);
            assert_eq!(expand.scheme, "bo1");
            assert!(expand.query.terms.is_empty());
        } else {
            panic!("Expected Expand command");
        }
        assert!(LexmatchArgs::try_parse_from(["lexmatch", "expand", "corpus.json"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let args = LexmatchArgs::try_parse_from(["lexmatch", "stats", "c.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);
        let args = LexmatchArgs::try_parse_from(["lexmatch", "-q", "-vvv", "stats", "c.json"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_op_conversion() {
        assert_eq!(Op::from(CliOp::EliteSet), Op::EliteSet);
        assert_eq!(Op::from(CliOp::AndNot), Op::AndNot);
    }
}
