//! `NEAR` and `PHRASE` filters.

use crate::error::Result;
use crate::postlist::{AndPostList, PostList, PostingList};
use crate::types::{DocId, TermCount, TermPos};
use crate::util::estimate::{Estimates, positional_estimates};

/// Which positional constraint to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionalKind {
    /// Distinct positions, in any order, spanning fewer than `window`.
    Near,
    /// Increasing positions in subquery order, spanning fewer than
    /// `window`.
    Phrase,
}

/// An `AND` whose candidates are accepted only if the children's positions
/// satisfy the window constraint.
#[derive(Debug)]
pub struct PositionalPostList {
    kind: PositionalKind,
    window: TermPos,
    and: AndPostList,
    estimates: Estimates,
}

impl PositionalPostList {
    pub fn new(kind: PositionalKind, window: TermPos, and: AndPostList) -> Self {
        let divisor = match kind {
            PositionalKind::Near => 2,
            PositionalKind::Phrase => 3,
        };
        let estimates = positional_estimates(and.estimates(), divisor);
        PositionalPostList {
            kind,
            window,
            and,
            estimates,
        }
    }

    fn accept(&self) -> Result<bool> {
        let mut lists = Vec::new();
        for child in self.and.children_in_order() {
            let positions = child.positions()?;
            if positions.is_empty() {
                return Ok(false);
            }
            lists.push(positions);
        }
        Ok(match self.kind {
            PositionalKind::Phrase => phrase_match(&lists, self.window),
            PositionalKind::Near => near_match(&lists, self.window),
        })
    }

    fn find_from(&mut self, mut target: DocId, w_min: f64) -> Result<()> {
        loop {
            self.and.skip_to(target, w_min)?;
            if self.and.at_end() || self.accept()? {
                return Ok(());
            }
            target = self.and.docid() + 1;
        }
    }
}

/// Positions `p0 < p1 < ...` taken from each list in turn with
/// `p_last - p0 < window`.
fn phrase_match(lists: &[Vec<TermPos>], window: TermPos) -> bool {
    let Some((first, rest)) = lists.split_first() else {
        return false;
    };
    // From a given start, taking the earliest position after the previous
    // one in each list leaves the most room for the rest.
    first.iter().any(|&p0| {
        let limit = p0.saturating_add(window);
        let mut prev = p0;
        rest.iter().all(|list| match list.get(list.partition_point(|&p| p <= prev)) {
            Some(&p) if p < limit => {
                prev = p;
                true
            }
            _ => false,
        })
    })
}

/// One distinct position from each list, all within a span of fewer than
/// `window` positions.
///
/// Slides a window over the merged occurrences. Only a window holding an
/// occurrence of every list can match, and only then is the assignment of
/// distinct positions checked.
fn near_match(lists: &[Vec<TermPos>], window: TermPos) -> bool {
    let n = lists.len();
    if n == 0 || window == 0 {
        return false;
    }
    let mut merged: Vec<(TermPos, usize)> = lists
        .iter()
        .enumerate()
        .flat_map(|(i, list)| list.iter().map(move |&p| (p, i)))
        .collect();
    merged.sort_unstable();
    merged.dedup();

    let mut counts = vec![0usize; n];
    let mut covered = 0;
    let (mut lo, mut hi) = (0, 0);
    while lo < merged.len() {
        let start = merged[lo].0;
        let limit = start.saturating_add(window);
        while hi < merged.len() && merged[hi].0 < limit {
            let list = merged[hi].1;
            counts[list] += 1;
            if counts[list] == 1 {
                covered += 1;
            }
            hi += 1;
        }
        if covered == n && distinct_positions(&merged[lo..hi], n) {
            return true;
        }
        while lo < hi && merged[lo].0 == start {
            let list = merged[lo].1;
            counts[list] -= 1;
            if counts[list] == 0 {
                covered -= 1;
            }
            lo += 1;
        }
    }
    false
}

/// Whether every one of `lists` can take a different position from
/// `entries`, which are sorted `(position, list)` pairs.
fn distinct_positions(entries: &[(TermPos, usize)], lists: usize) -> bool {
    let mut slots: Vec<TermPos> = entries.iter().map(|&(p, _)| p).collect();
    slots.dedup();
    if slots.len() < lists {
        return false;
    }
    let mut options = vec![Vec::new(); lists];
    for &(p, list) in entries {
        options[list].push(slots.partition_point(|&s| s < p));
    }
    let mut owner = vec![None; slots.len()];
    (0..lists).all(|list| {
        let mut seen = vec![false; slots.len()];
        augment(list, &options, &mut owner, &mut seen)
    })
}

/// Find `list` a slot, moving earlier owners along augmenting paths.
fn augment(list: usize, options: &[Vec<usize>], owner: &mut [Option<usize>], seen: &mut [bool]) -> bool {
    for &slot in &options[list] {
        if seen[slot] {
            continue;
        }
        seen[slot] = true;
        let current = owner[slot];
        let free = match current {
            None => true,
            Some(other) => augment(other, options, owner, seen),
        };
        if free {
            owner[slot] = Some(list);
            return true;
        }
    }
    false
}

impl PostingList for PositionalPostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        self.and.maxweight()
    }

    fn recalc_maxweight(&mut self) -> f64 {
        self.and.recalc_maxweight()
    }

    fn docid(&self) -> DocId {
        self.and.docid()
    }

    fn at_end(&self) -> bool {
        self.and.at_end()
    }

    fn weight(&self) -> Result<f64> {
        self.and.weight()
    }

    fn wdf(&self) -> TermCount {
        self.and.wdf()
    }

    fn skip_to(&mut self, did: DocId, w_min: f64) -> Result<()> {
        if self.and.at_end() || did <= self.and.docid() {
            return Ok(());
        }
        self.find_from(did, w_min)
    }

    fn positions(&self) -> Result<Vec<TermPos>> {
        self.and.positions()
    }

    fn description(&self) -> String {
        let op = match self.kind {
            PositionalKind::Near => "NEAR",
            PositionalKind::Phrase => "PHRASE",
        };
        let parts: Vec<String> = self
            .and
            .children_in_order()
            .iter()
            .map(|pl| pl.description())
            .collect();
        format!("({})", parts.join(&format!(" {op} {} ", self.window)))
    }
}
