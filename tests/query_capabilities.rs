//! Wildcards, positional operators, sharding and backend failures.

use std::sync::Arc;

use lexmatch::matcher::Candidate;
use lexmatch::prelude::*;
use lexmatch::query::{PostingSource, ValueWeightPostingSource, WildcardLimit, WildcardOptions};
use lexmatch::util::sortable::sortable_serialise;

fn db_from_texts(texts: &[&str]) -> Database {
    let docs = texts.iter().map(|t| Document::new().with_text(t));
    Database::single(Arc::new(MemoryShard::from_documents(docs)))
}

fn run(db: &Database, query: Query) -> Result<MSet> {
    let mut enquire = Enquire::new(db.clone());
    enquire.set_query(query);
    enquire.evaluate(0, 100, None)
}

#[test]
fn test_wildcard_expansion_limit() -> Result<()> {
    let db = db_from_texts(&[
        "this is the thing",
        "that was then",
        "there though",
        "these thumbs",
        "though it rained",
        "nothing here",
    ]);

    let strict = WildcardOptions::new()
        .with_max_expansion(6)
        .with_limit(WildcardLimit::Error);
    let err = run(&db, Query::wildcard("th", strict)).unwrap_err();
    assert!(matches!(err, LexmatchError::WildcardExpansion(_)), "{err}");

    let one = WildcardOptions::new()
        .with_max_expansion(1)
        .with_limit(WildcardLimit::Error);
    let wildcard = run(&db, Query::wildcard("thou", one))?;
    let synonym = run(&db, Query::combine(Op::Synonym, [Query::term("though")]))?;
    assert_eq!(wildcard.docids(), synonym.docids());
    for (w, s) in wildcard.iter().zip(synonym.iter()) {
        assert!((w.weight - s.weight).abs() < 1e-12);
    }

    // The truncating policies never fail.
    for limit in [WildcardLimit::First, WildcardLimit::MostFrequent] {
        let options = WildcardOptions::new().with_max_expansion(2).with_limit(limit);
        let mset = run(&db, Query::wildcard("th", options))?;
        assert!(!mset.is_empty());
    }
    Ok(())
}

#[test]
fn test_phrase_with_alternatives() -> Result<()> {
    let db = db_from_texts(&["red fish", "blue fish", "fish red", "red blue fish"]);
    let phrase = Query::combine(
        Op::Phrase,
        [Query::or(Query::term("red"), Query::term("blue")), Query::term("fish")],
    );
    let mut docids = run(&db, phrase)?.docids();
    docids.sort();
    assert_eq!(docids, vec![1, 2, 4]);
    Ok(())
}

#[test]
fn test_nested_positional_is_unimplemented() {
    let db = db_from_texts(&["a b c", "c b a"]);
    let nested = Query::combine(
        Op::Phrase,
        [Query::and(Query::term("a"), Query::term("b")), Query::term("c")],
    );
    assert!(matches!(run(&db, nested), Err(LexmatchError::Unimplemented(_))));

    let near_in_near = Query::combine(
        Op::Near,
        [Query::combine(Op::Near, [Query::term("a"), Query::term("b")]), Query::term("c")],
    );
    assert!(matches!(run(&db, near_in_near), Err(LexmatchError::Unimplemented(_))));
}

#[test]
fn test_phrase_degrades_per_shard() -> Result<()> {
    let with_positions = MemoryShard::builder()
        .add_document(Document::new().with_text("a b"))
        .add_document(Document::new().with_text("a x b"))
        .build();
    let without_positions = MemoryShard::builder()
        .positions(false)
        .add_document(Document::new().with_text("a x b"))
        .add_document(Document::new().with_text("b a"))
        .build();
    let db = Database::new()
        .with_shard(Arc::new(with_positions))
        .with_shard(Arc::new(without_positions));
    assert!(db.has_positions());
    assert!(!db.shards()[1].has_positions());

    let phrase = Query::combine(Op::Phrase, [Query::term("a"), Query::term("b")]);
    let mut docids = run(&db, phrase)?.docids();
    docids.sort();
    // Doc 3 is "a x b" in the positional shard, so it fails the phrase.
    assert_eq!(docids, vec![1, 2, 4]);
    Ok(())
}

fn values_db(shards: usize) -> Database {
    let values = [3.0, 9.0, 1.0, 7.0, 5.0];
    let mut per_shard: Vec<Vec<Document>> = (0..shards).map(|_| Vec::new()).collect();
    for (i, v) in values.iter().enumerate() {
        per_shard[i % shards].push(Document::new().with_term("x", 1).with_value(0, sortable_serialise(*v)));
    }
    let mut db = Database::new();
    for docs in per_shard {
        db.add_shard(Arc::new(MemoryShard::from_documents(docs)));
    }
    db
}

/// Matches every other document and can't be copied.
#[derive(Debug, Default)]
struct EveryOtherSource {
    did: DocId,
    last: DocId,
}

impl PostingSource for EveryOtherSource {
    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.did = 0;
        self.last = shard.last_docid()?;
        Ok(())
    }

    fn termfreq_min(&self) -> DocCount {
        self.last.div_ceil(2)
    }

    fn termfreq_est(&self) -> DocCount {
        self.last.div_ceil(2)
    }

    fn termfreq_max(&self) -> DocCount {
        self.last.div_ceil(2)
    }

    fn next(&mut self, _min_wt: f64) -> Result<()> {
        self.did = if self.did == 0 { 1 } else { self.did + 2 };
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.did > self.last
    }

    fn docid(&self) -> DocId {
        self.did
    }
}

#[test]
fn test_uncloneable_source_needs_single_shard() -> Result<()> {
    let single = run(&values_db(1), Query::source(Box::new(EveryOtherSource::default())))?;
    assert_eq!(single.docids(), vec![1, 3, 5]);

    let err = run(&values_db(2), Query::source(Box::new(EveryOtherSource::default()))).unwrap_err();
    assert!(matches!(err, LexmatchError::InvalidOperation(_)), "{err}");
    Ok(())
}

#[test]
fn test_cloneable_source_over_shards() -> Result<()> {
    for shards in [1, 2, 3] {
        let mset = run(&values_db(shards), Query::source(Box::new(ValueWeightPostingSource::new(0))))?;
        assert_eq!(mset.docids(), vec![2, 4, 5, 1, 3], "{shards} shards");
        assert_eq!(mset.items()[0].weight, 9.0);
    }
    Ok(())
}

#[test]
fn test_sharding_preserves_term_results() -> Result<()> {
    let texts = ["red fish", "blue fish", "red apple", "green fish fish", "red red", "fish"];
    let docs: Vec<Document> = texts.iter().map(|t| Document::new().with_text(t)).collect();
    let single = Database::single(Arc::new(MemoryShard::from_documents(docs.clone())));
    let mut sharded = Database::new();
    for offset in 0..3 {
        let shard_docs = docs.iter().skip(offset).step_by(3).cloned();
        sharded.add_shard(Arc::new(MemoryShard::from_documents(shard_docs)));
    }

    let query = Query::or(Query::term("red"), Query::term("fish"));
    let a = run(&single, query.clone())?;
    let b = run(&sharded, query)?;
    assert_eq!(a.docids(), b.docids());
    assert_eq!(a.bounds(), b.bounds());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x.weight - y.weight).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn test_closed_backend_propagates() {
    let shard = Arc::new(MemoryShard::from_documents(
        ["fish", "fish fish", "red fish"].iter().map(|t| Document::new().with_text(t)),
    ));
    let db = Database::single(shard.clone());

    // Closing while matching fails the next posting-list read.
    let closer = shard.clone();
    let mut enquire = Enquire::new(db.clone());
    enquire.set_query(Query::term("fish"));
    enquire.set_match_decider(Some(Arc::new(move |_: &Candidate<'_>| -> Result<bool> {
        closer.close();
        Ok(true)
    })));
    let err = enquire.evaluate(0, 10, None).unwrap_err();
    assert!(matches!(err, LexmatchError::Backend(_)), "{err}");

    // And once closed, nothing can be compiled.
    assert!(matches!(run(&db, Query::term("fish")), Err(LexmatchError::Backend(_))));
}
