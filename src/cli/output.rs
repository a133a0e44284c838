//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{LexmatchArgs, OutputFormat};
use crate::error::Result;
use crate::types::{DocCount, DocId, TermCount, TotalLength};

/// A ranked match.
#[derive(Debug, Serialize, Deserialize)]
pub struct Hit {
    pub rank: DocCount,
    pub docid: DocId,
    pub weight: f64,
    pub percent: u32,
    pub collapse_count: DocCount,
    pub matching_terms: Vec<String>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub weighting: String,
    pub matches_lower_bound: DocCount,
    pub matches_estimated: DocCount,
    pub matches_upper_bound: DocCount,
    pub max_possible: f64,
    pub max_attained: f64,
    pub hits: Vec<Hit>,
    pub facets: Option<Vec<(String, DocCount)>>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Result structure for query expansion.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpandResults {
    pub ebound: TermCount,
    pub terms: Vec<TermWeight>,
}

/// Corpus statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusStats {
    pub documents: DocCount,
    pub shards: usize,
    pub total_length: TotalLength,
    pub average_length: f64,
    pub min_length: TermCount,
    pub max_length: TermCount,
    pub distinct_terms: usize,
    pub has_positions: bool,
}

/// A query in both of its printable forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryOutput {
    pub description: String,
    pub json: String,
    pub terms: Vec<String>,
}

/// Printing in human-readable form.
pub trait HumanOutput {
    fn render(&self) -> String;
}

impl HumanOutput for SearchResults {
    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Query: {}\n", self.query));
        out.push_str(&format!("Weighting: {}\n", self.weighting));
        out.push_str(&format!(
            "Matches: {} (between {} and {}), max weight {:.4}\n",
            self.matches_estimated, self.matches_lower_bound, self.matches_upper_bound, self.max_possible
        ));
        for hit in &self.hits {
            out.push_str(&format!(
                "{:>4}. doc {:<6} {:>3}%  {:.6}",
                hit.rank + 1,
                hit.docid,
                hit.percent,
                hit.weight
            ));
            if hit.collapse_count > 0 {
                out.push_str(&format!("  (+{} collapsed)", hit.collapse_count));
            }
            if !hit.matching_terms.is_empty() {
                out.push_str(&format!("  [{}]", hit.matching_terms.join(" ")));
            }
            out.push('\n');
        }
        if let Some(facets) = &self.facets {
            out.push_str("Facets:\n");
            for (value, count) in facets {
                out.push_str(&format!("  {value}: {count}\n"));
            }
        }
        out.push_str(&format!("Time: {} ms\n", self.duration_ms));
        out
    }
}

impl HumanOutput for ExpandResults {
    fn render(&self) -> String {
        let mut out = String::new();
        for (i, t) in self.terms.iter().enumerate() {
            out.push_str(&format!("{:>4}. {:<20} {:.6}\n", i + 1, t.term, t.weight));
        }
        out.push_str(&format!("{} candidate terms\n", self.ebound));
        out
    }
}

impl HumanOutput for CorpusStats {
    fn render(&self) -> String {
        format!(
            "Documents: {}\nShards: {}\nTotal length: {}\nAverage length: {:.3}\nLength range: {}..{}\nDistinct terms: {}\nPositions: {}\n",
            self.documents,
            self.shards,
            self.total_length,
            self.average_length,
            self.min_length,
            self.max_length,
            self.distinct_terms,
            if self.has_positions { "yes" } else { "no" }
        )
    }
}

impl HumanOutput for QueryOutput {
    fn render(&self) -> String {
        format!("{}\n{}\n", self.description, self.json)
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(message: &str, result: &T, args: &LexmatchArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            print!("{}", result.render());
            Ok(())
        }
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            println!("{json}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_rendering() {
        let results = SearchResults {
            query: "Query(red)".to_string(),
            weighting: "bm25".to_string(),
            matches_lower_bound: 1,
            matches_estimated: 1,
            matches_upper_bound: 1,
            max_possible: 2.0,
            max_attained: 1.0,
            hits: vec![Hit {
                rank: 0,
                docid: 3,
                weight: 1.0,
                percent: 50,
                collapse_count: 2,
                matching_terms: vec!["red".to_string()],
            }],
            facets: Some(vec![("a".to_string(), 1)]),
            duration_ms: 0,
        };
        let text = results.render();
        assert!(text.contains("doc 3"));
        assert!(text.contains("50%"));
        assert!(text.contains("(+2 collapsed)"));
        assert!(text.contains("  a: 1"));
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["hits"][0]["docid"], 3);
    }
}
