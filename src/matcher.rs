//! Drives a compiled query and builds the result set.
//!
//! The matcher pulls documents from the root of the compiled tree in docid
//! order, keeping the best `first + maxitems` in a [`ProtoMSet`]. Once that
//! set is full and relevance is the primary ordering, the weight of its
//! worst member becomes a minimum that is passed down as the `w_min` hint,
//! letting the tree skip documents that could not make the cut. Skipping
//! is what makes the match-count bounds inexact, so the matcher tracks
//! whether it ever pruned and derives the bounds accordingly.

pub mod decider;
pub mod options;
pub mod protomset;
pub mod sort;
pub mod spy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::compiler::Compiled;
use crate::database::Database;
use crate::error::{LexmatchError, Result};
use crate::mset::{MSet, MSetItem, MatchBounds};
use crate::postlist::PostingList;
use crate::types::DocCount;
use crate::util::estimate::{Estimates, round_estimate};

pub use decider::{Candidate, MatchDecider, MultipleMatchDecider, ValueEqualsDecider};
pub use options::{DocidOrder, MatchOptions, SortBy};
pub use protomset::{CollapseOutcome, Collapser, ProtoMSet};
pub use sort::{ItemOrder, KeyMaker, MultiValueKeyMaker};
pub use spy::{MatchSpy, TermCountMatchSpy, ValueCountMatchSpy};

/// A spy shared between the caller and the matcher.
pub type SharedSpy = Arc<Mutex<dyn MatchSpy>>;

/// Counters gathered while scanning.
#[derive(Debug, Default)]
struct Scan {
    /// Documents the tree returned.
    seen: DocCount,
    /// Documents dropped by a cutoff or the decider.
    rejected: DocCount,
    /// Whether documents may have been skipped without being seen.
    pruned: bool,
    timed_out: bool,
    max_attained: f64,
}

impl Scan {
    fn matched(&self) -> DocCount {
        self.seen - self.rejected
    }

    fn exact(&self) -> bool {
        !self.pruned && !self.timed_out
    }
}

/// One evaluation of a compiled query.
pub struct Matcher<'a> {
    db: &'a Database,
    options: &'a MatchOptions,
    decider: Option<&'a dyn MatchDecider>,
    spies: &'a [SharedSpy],
}

impl<'a> Matcher<'a> {
    pub fn new(db: &'a Database, options: &'a MatchOptions) -> Self {
        Matcher {
            db,
            options,
            decider: None,
            spies: &[],
        }
    }

    pub fn with_decider(mut self, decider: Option<&'a dyn MatchDecider>) -> Self {
        self.decider = decider;
        self
    }

    pub fn with_spies(mut self, spies: &'a [SharedSpy]) -> Self {
        self.spies = spies;
        self
    }

    /// Weight below which a document is dropped outright.
    fn cutoff(&self, max_possible: f64) -> f64 {
        let mut cutoff = self.options.weight_cutoff;
        if self.options.percent_cutoff > 0 {
            let pct = f64::from(self.options.percent_cutoff) / 100.0 - f64::EPSILON;
            cutoff = cutoff.max(max_possible * pct);
        }
        cutoff
    }

    fn sort_key(&self, candidate: &Candidate<'_>) -> Result<Vec<u8>> {
        let sort_by = self.options.sort_by;
        if sort_by.uses_value() {
            return Ok(candidate.value(self.options.sort_slot)?.into_bytes());
        }
        if sort_by.uses_key() {
            let Some(maker) = &self.options.key_maker else {
                return Err(LexmatchError::invalid_argument("sorting by key needs a KeyMaker"));
            };
            return maker.key(candidate);
        }
        Ok(Vec::new())
    }

    /// Run the compiled query, returning `maxitems` results starting at
    /// rank `first`.
    pub fn run(&self, compiled: Compiled, first: DocCount, maxitems: DocCount) -> Result<MSet> {
        self.options.validate()?;
        let sort_by = self.options.sort_by;
        if self.options.percent_cutoff > 0 && !sort_by.relevance_primary() {
            return Err(LexmatchError::unimplemented(
                "percent cutoff isn't supported when sorting by value or key",
            ));
        }

        let Compiled {
            mut root, term_info, ..
        } = compiled;
        let est0 = root.estimates();
        let max_possible = root.maxweight();
        let cutoff = self.cutoff(max_possible);
        let order = ItemOrder::new(self.options);
        let capacity = first.saturating_add(maxitems) as usize;
        if capacity == 0 {
            log::debug!("no items requested, scanning for bounds only");
        }
        let mut proto = ProtoMSet::new(order, capacity);
        let mut collapser = self
            .options
            .collapse_slot
            .map(|_| Collapser::new(order, self.options.collapse_max));
        let deadline = (self.options.time_limit > 0.0)
            .then(|| Instant::now() + Duration::from_secs_f64(self.options.time_limit));

        let mut scan = Scan::default();
        let mut root_max = max_possible;
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::debug!("time limit reached after {} documents", scan.seen);
                scan.timed_out = true;
                break;
            }

            let may_prune = sort_by.relevance_primary()
                && proto.is_full()
                && scan.seen >= self.options.check_at_least;
            let threshold = if may_prune { proto.min_weight() } else { 0.0 };
            if may_prune
                && (root_max < threshold || (root_max <= threshold && order.later_docids_lose_ties()))
            {
                log::trace!("stopping early: max weight {root_max} below {threshold}");
                scan.pruned = true;
                break;
            }
            if cutoff > 0.0 && root_max < cutoff {
                break;
            }
            if threshold > cutoff {
                scan.pruned = true;
            }

            root.next(threshold.max(cutoff))?;
            if root.at_end() {
                break;
            }
            scan.seen += 1;
            let did = root.docid();
            let weight = root.weight()?;
            if weight < cutoff {
                scan.rejected += 1;
                continue;
            }
            let candidate = Candidate::new(self.db, did);
            if let Some(decider) = self.decider {
                if !decider.accept(&candidate)? {
                    scan.rejected += 1;
                    continue;
                }
            }
            for spy in self.spies {
                spy.lock().observe(&candidate, weight)?;
            }
            scan.max_attained = scan.max_attained.max(weight);

            let below = may_prune && weight < threshold;
            if below && collapser.is_none() {
                continue;
            }
            let collapse_key = match self.options.collapse_slot {
                Some(slot) => candidate.value(slot)?,
                None => String::new(),
            };
            let item = MSetItem::new(did, weight, self.sort_key(&candidate)?, collapse_key);
            let admit = match collapser.as_mut().map(|c| c.process(&item)) {
                Some(CollapseOutcome::Rejected) => false,
                Some(CollapseOutcome::Kept(Some(displaced))) => {
                    proto.remove(displaced);
                    true
                }
                _ => true,
            };
            if admit && !below && proto.push(item) {
                root_max = root.recalc_maxweight();
            }
        }

        let uncollapsed = self.bounds(&scan, est0, cutoff);
        let collapsed = match &collapser {
            Some(c) => collapsed_bounds(&scan, uncollapsed, c.collapsed_out()),
            None => uncollapsed,
        };
        log::debug!(
            "matched {}..{}..{} (collapsed {}..{}..{}), seen {}, exact {}",
            uncollapsed.lower,
            uncollapsed.estimated,
            uncollapsed.upper,
            collapsed.lower,
            collapsed.estimated,
            collapsed.upper,
            scan.seen,
            scan.exact()
        );

        let mut items = proto.finish(first as usize);
        for (i, item) in items.iter_mut().enumerate() {
            item.rank = first + i as DocCount;
            if let Some(c) = &collapser {
                if !item.collapse_key.is_empty() {
                    item.collapse_count = c.dropped_for(&item.collapse_key);
                }
            }
        }

        Ok(MSet {
            first,
            items,
            bounds: collapsed,
            uncollapsed,
            max_possible,
            max_attained: scan.max_attained,
            term_info,
        })
    }

    fn bounds(&self, scan: &Scan, est0: Estimates, cutoff: f64) -> MatchBounds {
        let matched = scan.matched();
        if scan.exact() {
            return MatchBounds {
                lower: matched,
                estimated: matched,
                upper: matched,
            };
        }
        let mut lower = matched;
        if self.decider.is_none() && cutoff <= 0.0 {
            lower = lower.max(est0.min);
        }
        let upper = est0.max.saturating_sub(scan.rejected).max(lower);
        let estimated = scale(est0.est, matched, scan.seen).clamp(lower, upper);
        MatchBounds {
            lower,
            estimated: round_estimate(lower, upper, estimated),
            upper,
        }
    }
}

/// Bounds after collapsing, given the uncollapsed ones and how many seen
/// documents collapsing removed.
fn collapsed_bounds(scan: &Scan, uncollapsed: MatchBounds, collapsed_out: DocCount) -> MatchBounds {
    let matched = scan.matched();
    let lower = matched - collapsed_out;
    if scan.exact() {
        return MatchBounds {
            lower,
            estimated: lower,
            upper: lower,
        };
    }
    let upper = uncollapsed.upper.saturating_sub(collapsed_out).max(lower);
    let estimated = scale(uncollapsed.estimated, lower, matched).clamp(lower, upper);
    MatchBounds {
        lower,
        estimated: round_estimate(lower, upper, estimated).min(uncollapsed.estimated),
        upper,
    }
}

/// `value * num / den`, rounded; `value` when `den` is 0.
fn scale(value: DocCount, num: DocCount, den: DocCount) -> DocCount {
    if den == 0 {
        return value;
    }
    (f64::from(value) * f64::from(num) / f64::from(den)).round() as DocCount
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compiler::QueryCompiler;
    use crate::database::{Document, MemoryShard};
    use crate::query::Query;
    use crate::util::sortable::sortable_serialise;
    use crate::types::DocId;
    use crate::weight::{BM25Weight, BoolWeight, Weight};

    fn ranked(mset: &MSet) -> Vec<DocId> {
        mset.iter().map(|item| item.docid).collect()
    }

    fn db() -> Database {
        let texts = [
            "apple banana",
            "apple apple cherry",
            "banana cherry",
            "apple",
            "cherry cherry cherry apple",
            "banana",
        ];
        let docs = texts.iter().enumerate().map(|(i, t)| {
            Document::new()
                .with_text(t)
                .with_value(0, sortable_serialise(i as f64))
                .with_value(1, if i % 2 == 0 { "even" } else { "odd" })
        });
        Database::single(Arc::new(MemoryShard::from_documents(docs)))
    }

    fn run(db: &Database, weight: &dyn Weight, query: &Query, options: &MatchOptions, first: u32, max: u32) -> Result<MSet> {
        let compiled = QueryCompiler::new(db, weight, None, query)?.compile(query)?;
        Matcher::new(db, options).run(compiled, first, max)
    }

    fn run_decided(
        db: &Database,
        decider: &dyn MatchDecider,
        query: &Query,
        options: &MatchOptions,
        max: u32,
    ) -> Result<MSet> {
        let weight = BM25Weight::default();
        let compiled = QueryCompiler::new(db, &weight, None, query)?.compile(query)?;
        Matcher::new(db, options).with_decider(Some(decider)).run(compiled, 0, max)
    }

    fn assert_ordered(b: MatchBounds) {
        assert!(b.lower <= b.estimated && b.estimated <= b.upper, "{b:?}");
    }

    #[test]
    fn test_ranked_and_exact() -> Result<()> {
        let db = db();
        let options = MatchOptions::default();
        let mset = run(&db, &BM25Weight::default(), &Query::term("apple"), &options, 0, 10)?;
        assert_eq!(mset.size(), 4);
        assert_eq!(mset.matches_lower_bound(), 4);
        assert_eq!(mset.matches_upper_bound(), 4);
        assert_eq!(mset.matches_estimated(), 4);
        assert_eq!(mset.get(0).map(|i| i.docid), Some(2));
        let ranks: Vec<u32> = mset.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        let weights: Vec<f64> = mset.iter().map(|i| i.weight).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        Ok(())
    }

    #[test]
    fn test_first_offsets_ranks() -> Result<()> {
        let db = db();
        let options = MatchOptions::default();
        let q = Query::term("apple");
        let all = run(&db, &BM25Weight::default(), &q, &options, 0, 10)?;
        let tail = run(&db, &BM25Weight::default(), &q, &options, 2, 10)?;
        assert_eq!(ranked(&tail), ranked(&all)[2..].to_vec());
        assert_eq!(tail.get(0).map(|i| i.rank), Some(2));
        Ok(())
    }

    #[test]
    fn test_sort_by_value_descending() -> Result<()> {
        let db = db();
        let options = MatchOptions::new().with_sort_by_value(0, true);
        let mset = run(&db, &BM25Weight::default(), &Query::term("cherry"), &options, 0, 10)?;
        assert_eq!(ranked(&mset), vec![5, 3, 2]);
        Ok(())
    }

    #[test]
    fn test_percent_cutoff_with_value_sort_is_unimplemented() {
        let db = db();
        let options = MatchOptions::new().with_sort_by_value(0, false).with_cutoff(50, 0.0);
        let err = run(&db, &BM25Weight::default(), &Query::term("apple"), &options, 0, 10);
        assert!(matches!(err, Err(LexmatchError::Unimplemented(_))));
    }

    #[test]
    fn test_weight_cutoff_and_decider() -> Result<()> {
        let db = db();
        let q = Query::term("apple");
        let all = run(&db, &BM25Weight::default(), &q, &MatchOptions::default(), 0, 10)?;
        let cut = all.get(1).map_or(0.0, |i| i.weight);
        let options = MatchOptions::new().with_cutoff(0, cut);
        let mset = run(&db, &BM25Weight::default(), &q, &options, 0, 10)?;
        assert_eq!(ranked(&mset), ranked(&all)[..2].to_vec());
        assert_eq!(mset.matches_upper_bound(), 2);

        let odd = ValueEqualsDecider::new(1, "odd");
        let compiled = QueryCompiler::new(&db, &BM25Weight::default(), None, &q)?.compile(&q)?;
        let options = MatchOptions::default();
        let mset = Matcher::new(&db, &options)
            .with_decider(Some(&odd))
            .run(compiled, 0, 10)?;
        assert_eq!(mset.matches_estimated(), 2);
        assert!(mset.iter().all(|i| i.docid % 2 == 0));
        Ok(())
    }

    #[test]
    fn test_collapse_keeps_best_per_key() -> Result<()> {
        let db = db();
        let options = MatchOptions::new().with_collapse_key(1, 1);
        let mset = run(&db, &BM25Weight::default(), &Query::term("apple"), &options, 0, 10)?;
        assert_eq!(mset.size(), 2);
        assert_eq!(mset.uncollapsed_matches_lower_bound(), 4);
        assert_eq!(mset.matches_lower_bound(), 2);
        assert_eq!(mset.matches_upper_bound(), 2);
        assert!(mset.iter().all(|i| i.collapse_count == 1));
        Ok(())
    }

    #[test]
    fn test_spy_sees_candidates() -> Result<()> {
        let db = db();
        let spy = Arc::new(Mutex::new(ValueCountMatchSpy::new(1)));
        let spies: Vec<SharedSpy> = vec![spy.clone()];
        let q = Query::term("banana");
        let compiled = QueryCompiler::new(&db, &BoolWeight::new(), None, &q)?.compile(&q)?;
        let options = MatchOptions::default();
        Matcher::new(&db, &options).with_spies(&spies).run(compiled, 0, 1)?;
        let spy = spy.lock();
        assert!(spy.total() >= 1);
        assert!(spy.count("even") >= 1);
        Ok(())
    }

    #[test]
    fn test_pruned_bounds_stay_ordered() -> Result<()> {
        let db = db();
        let q = Query::or(Query::term("apple"), Query::term("cherry"));
        let mset = run(&db, &BM25Weight::default(), &q, &MatchOptions::default(), 0, 1)?;
        assert_eq!(mset.size(), 1);
        let b = mset.bounds();
        assert!(b.lower <= b.estimated && b.estimated <= b.upper);
        assert!(b.lower >= 1 && b.upper <= 6);
        let full = run(&db, &BM25Weight::default(), &q, &MatchOptions::default(), 0, 10)?;
        assert_eq!(ranked(&mset)[0], ranked(&full)[0]);
        Ok(())
    }

    #[test]
    fn test_time_limit_stops_the_scan() -> Result<()> {
        let db = db();
        let slow = |_: &Candidate<'_>| -> Result<bool> {
            std::thread::sleep(Duration::from_millis(30));
            Ok(true)
        };
        let q = Query::term("apple");
        let options = MatchOptions::new().with_time_limit(0.01);
        let mset = run_decided(&db, &slow, &q, &options, 10)?;
        assert!(mset.size() < 4, "{:?}", ranked(&mset));
        assert_ordered(mset.bounds());
        assert_eq!(mset.matches_lower_bound(), mset.size() as DocCount);
        assert_eq!(mset.matches_upper_bound(), 4);

        let unlimited = run_decided(&db, &slow, &q, &MatchOptions::default(), 10)?;
        assert_eq!(unlimited.size(), 4);
        Ok(())
    }

    #[test]
    fn test_percent_cutoff_drops_weak_documents() -> Result<()> {
        let db = db();
        let q = Query::term("apple");
        let weight = BM25Weight::default();
        let all = run(&db, &weight, &q, &MatchOptions::default(), 0, 10)?;
        let second = all.get(1).map_or(0.0, |i| i.weight);
        let pct = (100.0 * second / all.max_possible()).floor() as u32;
        assert!(pct > 0 && pct < 100, "{pct}");

        let options = MatchOptions::new().with_cutoff(pct, 0.0);
        let mset = run(&db, &weight, &q, &options, 0, 10)?;
        let floor = all.max_possible() * (f64::from(pct) / 100.0 - f64::EPSILON);
        let expected: Vec<DocId> = all.iter().filter(|i| i.weight >= floor).map(|i| i.docid).collect();
        assert!(expected.len() >= 2 && expected.len() < all.size(), "{expected:?}");
        assert_eq!(ranked(&mset), expected);
        assert_eq!(mset.matches_lower_bound(), expected.len() as DocCount);
        assert_eq!(mset.matches_upper_bound(), expected.len() as DocCount);
        Ok(())
    }

    #[test]
    fn test_descending_docid_order_breaks_ties() -> Result<()> {
        let db = db();
        let q = Query::term("apple");
        let weight = BoolWeight::new();
        let ascending = run(&db, &weight, &q, &MatchOptions::default(), 0, 10)?;
        assert_eq!(ranked(&ascending), vec![1, 2, 4, 5]);

        let options = MatchOptions::new().with_docid_order(DocidOrder::Descending);
        let descending = run(&db, &weight, &q, &options, 0, 10)?;
        assert_eq!(ranked(&descending), vec![5, 4, 2, 1]);
        // A short page must not stop at the first equal-weight documents.
        let page = run(&db, &weight, &q, &options, 0, 2)?;
        assert_eq!(ranked(&page), vec![5, 4]);
        assert_ordered(page.bounds());
        Ok(())
    }

    #[test]
    fn test_relevance_then_value() -> Result<()> {
        let db = db();
        // Equal weights fall back to the value in slot 0.
        let options = MatchOptions::new().with_sort_by_relevance_then_value(0, true);
        let mset = run(&db, &BoolWeight::new(), &Query::term("banana"), &options, 0, 10)?;
        assert_eq!(ranked(&mset), vec![6, 3, 1]);
        let options = MatchOptions::new().with_sort_by_relevance_then_value(0, false);
        let mset = run(&db, &BoolWeight::new(), &Query::term("banana"), &options, 0, 10)?;
        assert_eq!(ranked(&mset), vec![1, 3, 6]);

        // Distinct weights win over the value.
        let mset = run(&db, &BM25Weight::default(), &Query::term("cherry"), &options, 0, 10)?;
        assert_eq!(ranked(&mset), vec![5, 3, 2]);
        let weights: Vec<f64> = mset.iter().map(|i| i.weight).collect();
        assert!(weights.windows(2).all(|w| w[0] > w[1]), "{weights:?}");
        Ok(())
    }

    #[test]
    fn test_decider_bounds_while_pruning() -> Result<()> {
        let db = db();
        let even = ValueEqualsDecider::new(1, "even");
        let q = Query::or(Query::term("apple"), Query::term("cherry"));

        let exact = run_decided(&db, &even, &q, &MatchOptions::default(), 10)?;
        assert_eq!(ranked(&exact).len(), 3);
        assert_eq!(exact.matches_lower_bound(), 3);
        assert_eq!(exact.matches_upper_bound(), 3);

        // The OR alone guarantees 4 matches, but the decider may reject
        // any of them, so that can't become the lower bound.
        let page = run_decided(&db, &even, &q, &MatchOptions::default(), 1)?;
        assert_eq!(page.size(), 1);
        assert_eq!(ranked(&page)[0], ranked(&exact)[0]);
        assert_ordered(page.bounds());
        assert!(page.matches_lower_bound() >= 1);
        assert!(page.matches_lower_bound() <= 3, "{:?}", page.bounds());
        assert!(page.matches_upper_bound() >= 3, "{:?}", page.bounds());
        assert!(page.matches_upper_bound() <= 6, "{:?}", page.bounds());
        Ok(())
    }
}
