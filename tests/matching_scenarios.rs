//! End-to-end matching over small synthetic collections.

use std::sync::Arc;

use lexmatch::prelude::*;
use lexmatch::util::sortable::sortable_serialise;
use lexmatch::weight::TfIdfWeight;

/// Six documents averaging 370 terms. "this" is in all of them, "word" in
/// docs 2 (wdf 4) and 4 (wdf 1).
fn word_collection() -> Database {
    let lengths: [TermCount; 6] = [401, 301, 380, 372, 390, 376];
    let docs = lengths.iter().enumerate().map(|(i, &len)| {
        let did = i + 1;
        let word_wdf = match did {
            2 => 4,
            4 => 1,
            _ => 0,
        };
        let mut doc = Document::new().with_term("this", 1);
        if word_wdf > 0 {
            doc = doc.with_term("word", word_wdf);
        }
        doc.with_term(format!("filler{did}"), len - 1 - word_wdf)
    });
    Database::single(Arc::new(MemoryShard::from_documents(docs)))
}

fn fruit_collection() -> Database {
    let texts = [
        "apple banana cherry",
        "apple apple",
        "banana cherry cherry",
        "apple cherry",
        "banana",
        "cherry apple banana apple",
        "date",
        "apple date",
    ];
    let docs = texts.iter().enumerate().map(|(i, t)| {
        Document::new()
            .with_text(t)
            .with_value(0, sortable_serialise(i as f64))
            .with_value(1, ["red", "green", "red", "blue", "", "green", "red", "red"][i])
    });
    Database::single(Arc::new(MemoryShard::from_documents(docs)))
}

fn run(db: &Database, query: Query, first: DocCount, maxitems: DocCount) -> Result<MSet> {
    let mut enquire = Enquire::new(db.clone());
    enquire.set_query(query);
    enquire.evaluate(first, maxitems, None)
}

#[test]
fn test_bm25_reference_collection() -> Result<()> {
    let db = word_collection();
    assert_eq!(db.total_length()?, 2220);
    assert_eq!(db.average_length()?, 370.0);

    let mut enquire = Enquire::new(db);
    enquire.set_weighting_scheme(Box::new(BM25Weight::new(1.0, 0.0, 1.0, 0.5, 0.5)));
    enquire.set_query(Query::term("word"));
    let mset = enquire.evaluate(0, 10, None)?;

    assert_eq!(mset.docids(), vec![2, 4]);
    assert!((mset.items()[0].weight - 1.04648168717725).abs() < 1e-12);
    assert!((mset.items()[1].weight - 0.640987686595914).abs() < 1e-12);
    assert_eq!(mset.bounds(), MatchBounds { lower: 2, estimated: 2, upper: 2 });
    assert_eq!(mset.termfreq("word")?, 2);
    assert_eq!(mset.termfreq("this")?, 0);
    assert!(matches!(mset.termfreq(""), Err(LexmatchError::NoSuchTerm(_))));
    Ok(())
}

#[test]
fn test_empty_queries_give_zero_bounds() -> Result<()> {
    let db = fruit_collection();
    for query in [Query::new(), Query::combine(Op::Or, [])] {
        let mset = run(&db, query, 0, 10)?;
        assert!(mset.is_empty());
        assert_eq!(mset.bounds(), MatchBounds::default());
        assert_eq!(mset.uncollapsed_bounds(), MatchBounds::default());
    }
    Ok(())
}

#[test]
fn test_zero_maxitems_keeps_statistics() -> Result<()> {
    let db = fruit_collection();
    let full = run(&db, Query::term("apple"), 0, 10)?;
    let none = run(&db, Query::term("apple"), 0, 0)?;
    assert!(none.is_empty());
    assert!(none.max_possible() > 0.0);
    assert_eq!(none.max_possible(), full.max_possible());
    assert_eq!(none.bounds(), full.bounds());
    assert_eq!(none.uncollapsed_bounds(), full.uncollapsed_bounds());
    Ok(())
}

#[test]
fn test_evaluation_is_deterministic() -> Result<()> {
    let db = fruit_collection();
    let query = Query::and_maybe(Query::term("apple"), Query::or(Query::term("cherry"), Query::term("date")));
    let a = run(&db, query.clone(), 0, 3)?;
    let b = run(&db, query, 0, 3)?;
    assert_eq!(a.items(), b.items());
    assert_eq!(a.bounds(), b.bounds());
    assert_eq!(a.max_possible(), b.max_possible());
    Ok(())
}

#[test]
fn test_scale_weight() -> Result<()> {
    let db = fruit_collection();
    let base = Query::or(Query::term("apple"), Query::term("banana"));
    let plain = run(&db, base.clone(), 0, 10)?;

    let scaled = run(&db, Query::scale(2.5, base.clone())?, 0, 10)?;
    assert_eq!(scaled.docids(), plain.docids());
    for (s, p) in scaled.iter().zip(plain.iter()) {
        assert!((s.weight - 2.5 * p.weight).abs() < 1e-12);
    }

    let zero = run(&db, Query::scale(0.0, base)?, 0, 10)?;
    assert!(zero.iter().all(|item| item.weight == 0.0));
    let mut expected = plain.docids();
    expected.sort();
    assert_eq!(zero.docids(), expected);

    assert!(matches!(
        Query::scale(-1.0, Query::term("apple")),
        Err(LexmatchError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_single_synonym_weighs_like_or() -> Result<()> {
    let db = fruit_collection();
    for term in ["apple", "banana", "date", "missing"] {
        let synonym = run(&db, Query::combine(Op::Synonym, [Query::term(term)]), 0, 10)?;
        let or = run(&db, Query::combine(Op::Or, [Query::term(term)]), 0, 10)?;
        assert_eq!(synonym.items(), or.items(), "{term}");
    }
    Ok(())
}

#[test]
fn test_elite_set_covering_all_is_or() -> Result<()> {
    let db = fruit_collection();
    let terms = || ["apple", "cherry", "date"].map(Query::term);
    let or = run(&db, Query::combine(Op::Or, terms()), 0, 10)?;
    for n in [3, 4, 10] {
        let elite = run(&db, Query::with_parameter(Op::EliteSet, terms(), n)?, 0, 10)?;
        assert_eq!(elite.items(), or.items());
        for term in ["apple", "cherry", "date"] {
            assert_eq!(elite.termfreq(term)?, or.termfreq(term)?);
            assert_eq!(elite.termweight(term)?, or.termweight(term)?);
        }
    }
    Ok(())
}

#[test]
fn test_collapse_keeps_min_of_count_and_max() -> Result<()> {
    let db = fruit_collection();
    let everything = Query::match_all();
    for collapse_max in [1, 2, 3] {
        let mut enquire = Enquire::new(db.clone());
        enquire.set_query(everything.clone());
        enquire.set_options(MatchOptions::new().with_collapse_key(1, collapse_max));
        let mset = enquire.evaluate(0, 100, None)?;
        for (key, n) in [("red", 4), ("green", 2), ("blue", 1)] {
            let survivors = mset.iter().filter(|item| item.collapse_key == key).count() as u32;
            assert_eq!(survivors, n.min(collapse_max), "{key} with collapse_max {collapse_max}");
        }
        // The document without a value is never collapsed.
        assert!(mset.docids().contains(&5));
    }
    Ok(())
}

#[test]
fn test_sorting_and_offsets() -> Result<()> {
    let db = fruit_collection();
    let mut enquire = Enquire::new(db);
    enquire.set_query(Query::term("apple"));
    enquire.set_options(MatchOptions::new().with_sort_by_value(0, true));
    let all = enquire.evaluate(0, 10, None)?;
    assert_eq!(all.docids(), vec![8, 6, 4, 2, 1]);

    let page = enquire.evaluate(2, 2, None)?;
    assert_eq!(page.docids(), vec![4, 2]);
    assert_eq!(page.items()[0].rank, 2);
    assert_eq!(page.bounds(), all.bounds());
    Ok(())
}

#[test]
fn test_tfidf_max_wdf_uses_document_statistics() -> Result<()> {
    // "fish" has wdf 2 in both; the highest wdf is 4 in doc 1 and 2 in doc 2.
    let docs = [
        Document::new().with_term("fish", 2).with_term("salt", 4),
        Document::new().with_term("fish", 2).with_term("pepper", 1),
        Document::new().with_term("pepper", 3),
    ];
    let db = Database::single(Arc::new(MemoryShard::from_documents(docs)));
    let mut enquire = Enquire::new(db);
    enquire.set_query(Query::term("fish"));
    enquire.set_weighting_scheme(Box::new(TfIdfWeight::new("mnn")?));
    let mset = enquire.evaluate(0, 10, None)?;
    assert_eq!(mset.docids(), vec![2, 1]);
    assert_eq!(mset.items()[0].weight, 1.0);
    assert_eq!(mset.items()[1].weight, 0.5);
    Ok(())
}
