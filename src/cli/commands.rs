//! Command implementations for the lexmatch CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::database::{Database, Document, MemoryShard};
use crate::enquire::Enquire;
use crate::error::{LexmatchError, Result};
use crate::expand::{ExpandOptions, RSet};
use crate::matcher::{MatchOptions, ValueCountMatchSpy};
use crate::query::Query;
use crate::registry::Registry;
use crate::types::{TermCount, ValueSlot};

/// One document of a corpus file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CorpusDocument {
    /// Free text, split into lowercase words with positions.
    pub text: Option<String>,
    /// Extra terms and their wdf.
    pub terms: BTreeMap<String, TermCount>,
    pub values: BTreeMap<ValueSlot, String>,
}

impl CorpusDocument {
    fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(text) = &self.text {
            doc = doc.with_text(text);
        }
        for (term, wdf) in self.terms {
            doc = doc.with_term(term, wdf);
        }
        for (slot, value) in self.values {
            doc = doc.with_value(slot, value);
        }
        doc
    }
}

/// Read a corpus file: either a JSON array or one JSON document per line.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusDocument>> {
    let content = fs::read_to_string(path)?;
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&content)?);
    }
    let mut docs = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(line).map_err(|e| {
            LexmatchError::invalid_argument(format!("line {}: {e}", line_num + 1))
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

/// Load a corpus into a database. Document `i` (from 0) gets docid `i + 1`
/// whatever the shard count.
pub fn load_database(args: &CorpusArgs) -> Result<Database> {
    if args.shards == 0 {
        return Err(LexmatchError::invalid_argument("--shards must be at least 1"));
    }
    let docs = read_corpus(&args.corpus)?;
    let mut per_shard: Vec<Vec<Document>> = (0..args.shards).map(|_| Vec::new()).collect();
    for (i, doc) in docs.into_iter().enumerate() {
        per_shard[i % args.shards].push(doc.into_document());
    }
    let mut db = Database::new();
    for docs in per_shard {
        let shard = MemoryShard::builder()
            .positions(!args.no_positions)
            .add_documents(docs)
            .build();
        db.add_shard(Arc::new(shard));
    }
    log::info!(
        "loaded {} documents into {} shard(s) from {}",
        db.doc_count()?,
        db.shard_count(),
        args.corpus.display()
    );
    Ok(db)
}

/// Build the query described by the arguments.
pub fn build_query(args: &QueryArgs, registry: &Registry) -> Result<Query> {
    if let Some(json) = &args.query_json {
        return Query::from_json(json, registry);
    }
    let terms = args.terms.iter().map(|t| Query::term(t.to_lowercase()));
    match args.window {
        Some(window) => Query::with_parameter(args.op.into(), terms, window),
        None => Ok(Query::combine(args.op.into(), terms)),
    }
}

/// Execute a CLI command.
pub fn execute_command(args: LexmatchArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => {
            let results = run_search(search_args)?;
            output_result("Search results", &results, &args)
        }
        Command::Expand(expand_args) => {
            let results = run_expand(expand_args)?;
            output_result("Expansion terms", &results, &args)
        }
        Command::Stats(stats_args) => {
            let stats = run_stats(stats_args)?;
            output_result("Corpus statistics", &stats, &args)
        }
        Command::Describe(describe_args) => {
            let description = run_describe(describe_args)?;
            output_result("Query", &description, &args)
        }
    }
}

fn match_options(args: &SearchArgs) -> MatchOptions {
    let mut options = MatchOptions::new()
        .with_cutoff(args.percent_cutoff, args.weight_cutoff)
        .with_check_at_least(args.check_at_least)
        .with_time_limit(args.time_limit);
    if let Some(slot) = args.sort_value {
        options = options.with_sort_by_value(slot, args.reverse);
    }
    if let Some(slot) = args.collapse {
        options = options.with_collapse_key(slot, args.collapse_max);
    }
    options
}

/// Run a search and collect its results.
pub fn run_search(args: &SearchArgs) -> Result<SearchResults> {
    let registry = Registry::new();
    let db = load_database(&args.corpus)?;
    let query = build_query(&args.query, &registry)?;
    let mut enquire = Enquire::new(db);
    enquire.set_weighting_scheme(registry.weight_from_scheme(&args.weight)?);
    enquire.set_options(match_options(args));
    enquire.set_query(query);
    let spy = args.facet.map(|slot| Arc::new(Mutex::new(ValueCountMatchSpy::new(slot))));
    if let Some(spy) = &spy {
        enquire.add_match_spy(spy.clone());
    }

    let start = Instant::now();
    let mset = enquire.evaluate(args.offset, args.limit, None)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut hits = Vec::with_capacity(mset.size());
    for item in mset.iter() {
        hits.push(Hit {
            rank: item.rank,
            docid: item.docid,
            weight: item.weight,
            percent: mset.convert_to_percent(item.weight),
            collapse_count: item.collapse_count,
            matching_terms: enquire.matching_terms(item.docid)?,
        });
    }
    Ok(SearchResults {
        query: enquire.query().description(),
        weighting: enquire.weighting_scheme().description(),
        matches_lower_bound: mset.matches_lower_bound(),
        matches_estimated: mset.matches_estimated(),
        matches_upper_bound: mset.matches_upper_bound(),
        max_possible: mset.max_possible(),
        max_attained: mset.max_attained(),
        hits,
        facets: spy.map(|spy| spy.lock().top_values(10)),
        duration_ms,
    })
}

/// Run an expansion and collect its results.
pub fn run_expand(args: &ExpandArgs) -> Result<ExpandResults> {
    let registry = Registry::new();
    let db = load_database(&args.corpus)?;
    let mut rset = RSet::new();
    for &did in &args.rset {
        rset.add_document(did)?;
    }
    let mut enquire = Enquire::new(db);
    enquire.set_query(build_query(&args.query, &registry)?);
    enquire.set_expand_options(
        ExpandOptions::new()
            .with_scheme(args.scheme.clone())
            .with_k(args.k)
            .with_include_query_terms(args.include_query_terms)
            .with_use_exact_termfreq(args.exact_termfreq),
    );
    let eset = enquire.expand(&rset, args.limit)?;
    Ok(ExpandResults {
        ebound: eset.ebound(),
        terms: eset
            .iter()
            .map(|item| TermWeight {
                term: item.term.clone(),
                weight: item.weight,
            })
            .collect(),
    })
}

/// Collect corpus statistics.
pub fn run_stats(args: &StatsArgs) -> Result<CorpusStats> {
    let db = load_database(&args.corpus)?;
    let (min_length, max_length) = db.doclength_bounds()?;
    Ok(CorpusStats {
        documents: db.doc_count()?,
        shards: db.shard_count(),
        total_length: db.total_length()?,
        average_length: db.average_length()?,
        min_length,
        max_length,
        distinct_terms: db.all_terms("")?.len(),
        has_positions: db.has_positions(),
    })
}

/// Describe a query without running it.
pub fn run_describe(args: &DescribeArgs) -> Result<QueryOutput> {
    let registry = Registry::new();
    let query = build_query(&args.query, &registry)?;
    Ok(QueryOutput {
        description: query.description(),
        json: query.to_json()?,
        terms: query.terms(),
    })
}
