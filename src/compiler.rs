//! Query compilation: builds one posting-list tree per shard.
//!
//! Compilation is where statistics meet structure. Collection statistics
//! are gathered once across every shard, so a document scores the same
//! whether or not the collection is sharded; the tree itself is built per
//! shard because term presence, wildcard expansions and elite-set choices
//! are shard-local.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::database::{Database, Shard};
use crate::error::{LexmatchError, Result};
use crate::expand::RSet;
use crate::mset::TermInfo;
use crate::postlist::{
    AndNotPostList, AndPostList, ExternalPostList, ExtraPostList, LeafPostList, MaxPostList,
    MergePostList, OrPostList, PositionalKind, PositionalPostList, PostList, PostingList,
    SourceHandle, SynonymPostList, ValueRangePostList, XorPostList,
};
use crate::query::wildcard::expand_terms;
use crate::query::{Combiner, Op, Pattern, Query, QueryNode, SharedSource, WildcardOptions};
use crate::types::{DocCount, TermCount, TermFreqs, TermPos, TotalLength, ValueSlot};
use crate::util::estimate::Estimates;
use crate::weight::{Weight, WeightStats};

/// Default size of an `ELITE_SET`.
pub const DEFAULT_ELITE_SET_SIZE: u32 = 10;

/// Statistics shared by every weight in one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub collection_size: DocCount,
    pub rset_size: DocCount,
    pub total_length: TotalLength,
    pub average_length: f64,
    pub doclength_bounds: (TermCount, TermCount),
    pub unique_terms_bounds: (TermCount, TermCount),
    pub query_length: TermCount,
    terms: AHashMap<String, (TermFreqs, TermCount)>,
    rset_terms: AHashMap<String, DocCount>,
}

impl Stats {
    /// Gather collection statistics, counting term occurrences in the
    /// relevance set if one is given.
    pub fn gather(db: &Database, rset: Option<&RSet>, query_length: TermCount) -> Result<Self> {
        let mut rset_terms: AHashMap<String, DocCount> = AHashMap::new();
        let mut rset_size = 0;
        if let Some(rset) = rset {
            for did in rset.iter() {
                for (term, _) in db.term_list(did)? {
                    *rset_terms.entry(term).or_default() += 1;
                }
                rset_size += 1;
            }
        }
        Ok(Stats {
            collection_size: db.doc_count()?,
            rset_size,
            total_length: db.total_length()?,
            average_length: db.average_length()?,
            doclength_bounds: db.doclength_bounds()?,
            unique_terms_bounds: db.unique_terms_bounds()?,
            query_length,
            terms: AHashMap::new(),
            rset_terms,
        })
    }

    /// Global frequencies and wdf upper bound of `term`, cached.
    pub fn term(&mut self, db: &Database, term: &str) -> Result<(TermFreqs, TermCount)> {
        if let Some(found) = self.terms.get(term) {
            return Ok(*found);
        }
        let (termfreq, collfreq) = db.term_freqs(term)?;
        let reltermfreq = self.rset_terms.get(term).copied().unwrap_or(0);
        let wdf_ub = db.wdf_upper_bound(term)?;
        let entry = (TermFreqs::new(termfreq, reltermfreq, collfreq), wdf_ub);
        self.terms.insert(term.to_string(), entry);
        Ok(entry)
    }

    /// Statistics with no term-specific part.
    pub fn base_weight_stats(&self) -> WeightStats {
        WeightStats {
            collection_size: self.collection_size,
            rset_size: self.rset_size,
            total_length: self.total_length,
            average_length: self.average_length,
            doclength_lower_bound: self.doclength_bounds.0,
            doclength_upper_bound: self.doclength_bounds.1,
            unique_terms_lower_bound: self.unique_terms_bounds.0,
            unique_terms_upper_bound: self.unique_terms_bounds.1,
            query_length: self.query_length,
            ..WeightStats::default()
        }
    }

    pub fn term_weight_stats(&self, freqs: TermFreqs, wqf: TermCount, wdf_ub: TermCount) -> WeightStats {
        WeightStats {
            wqf,
            termfreq: freqs.termfreq,
            reltermfreq: freqs.reltermfreq,
            collection_freq: freqs.collfreq,
            wdf_upper_bound: wdf_ub,
            ..self.base_weight_stats()
        }
    }
}

/// The output of compilation.
#[derive(Debug)]
pub struct Compiled {
    pub root: PostList,
    /// Per-term statistics for the terms the query used.
    pub term_info: AHashMap<String, TermInfo>,
    pub stats: Stats,
}

/// Compiles a query against a database with a weighting scheme.
#[derive(Debug)]
pub struct QueryCompiler<'a> {
    db: &'a Database,
    proto: &'a dyn Weight,
    stats: Stats,
    term_info: AHashMap<String, TermInfo>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(db: &'a Database, proto: &'a dyn Weight, rset: Option<&RSet>, query: &Query) -> Result<Self> {
        let stats = Stats::gather(db, rset, query.query_length())?;
        Ok(QueryCompiler {
            db,
            proto,
            stats,
            term_info: AHashMap::new(),
        })
    }

    pub fn compile(mut self, query: &Query) -> Result<Compiled> {
        for term in query.terms() {
            let (freqs, _) = self.stats.term(self.db, &term)?;
            self.term_info.entry(term).or_insert(TermInfo {
                termfreq: freqs.termfreq,
                ..TermInfo::default()
            });
        }

        let factor = if self.proto.is_bool() { 0.0 } else { 1.0 };
        let shards: Vec<Arc<dyn Shard>> = self.db.shards().to_vec();
        let shard_count = shards.len();
        let mut roots = Vec::with_capacity(shard_count);
        for (index, shard) in shards.into_iter().enumerate() {
            let db_size = shard.doc_count()?;
            let mut sc = ShardCompiler {
                owner: &mut self,
                shard: shard.clone(),
                shard_count,
                db_size,
                shared_sources: AHashSet::new(),
            };
            let root = sc.compile(query, factor)?;
            let root = self.add_extra(shard, root, factor * root_scale(query));
            log::trace!("shard {index}: {}", root.description());
            roots.push(root);
        }

        let root = match roots.len() {
            0 => PostList::empty(),
            1 => roots.pop().unwrap_or_else(PostList::empty),
            _ => PostList::Merge(MergePostList::new(roots)),
        };
        Ok(Compiled {
            root,
            term_info: self.term_info,
            stats: self.stats,
        })
    }

    /// Wrap a shard root so the term-independent weight, scaled by
    /// `scale`, is added.
    fn add_extra(&self, shard: Arc<dyn Shard>, root: PostList, scale: f64) -> PostList {
        if root.is_empty_list() || self.proto.is_bool() || scale == 0.0 {
            return root;
        }
        let mut extra = self.proto.clone_box();
        extra.init(&self.stats.base_weight_stats(), 0.0);
        if extra.maxextra() > 0.0 {
            PostList::Extra(ExtraPostList::new(shard, root, extra, scale))
        } else {
            root
        }
    }
}

struct ShardCompiler<'c, 'a> {
    owner: &'c mut QueryCompiler<'a>,
    shard: Arc<dyn Shard>,
    shard_count: usize,
    db_size: DocCount,
    /// Uncloneable sources already driving a leaf of this tree.
    shared_sources: AHashSet<usize>,
}

/// Pending OR operand ordered so the heap pops the rarest first.
struct Pending {
    est: DocCount,
    seq: usize,
    pl: PostList,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.est, other.seq).cmp(&(self.est, self.seq))
    }
}

impl ShardCompiler<'_, '_> {
    fn compile(&mut self, query: &Query, factor: f64) -> Result<PostList> {
        let Some(node) = query.node() else {
            return Ok(PostList::empty());
        };
        match node {
            QueryNode::Term { term, wqf, .. } => self.leaf(term, *wqf, factor),
            QueryNode::MatchAll => self.all_docs(),
            QueryNode::Source(source) => self.source(source, factor),
            QueryNode::Composite {
                op,
                subqueries,
                parameter,
            } => self.composite(*op, subqueries, *parameter, factor),
            QueryNode::Scale {
                factor: scale,
                subquery,
            } => self.compile(subquery, factor * scale),
            QueryNode::ValueRange { slot, begin, end } => self.value_range(*slot, Some(begin), Some(end)),
            QueryNode::ValueGe { slot, limit } => self.value_range(*slot, Some(limit), None),
            QueryNode::ValueLe { slot, limit } => self.value_range(*slot, None, Some(limit)),
            QueryNode::Wildcard { pattern, options } => self.wildcard(pattern, options, factor),
        }
    }

    /// Every use of a source gets its own cursor when the source can be
    /// copied. Otherwise the query's instance drives the leaf, which is only
    /// possible once per tree on a single shard.
    fn source(&mut self, source: &SharedSource, factor: f64) -> Result<PostList> {
        let cloned = source.lock().clone_box();
        let handle = match cloned {
            Some(mut clone) => {
                clone.reset(&self.shard)?;
                SourceHandle::Owned(clone)
            }
            None if self.shard_count > 1 => {
                return Err(LexmatchError::invalid_operation(format!(
                    "{} doesn't support clone(), required for databases with multiple shards",
                    source.lock().description()
                )));
            }
            None => {
                if !self.shared_sources.insert(Arc::as_ptr(source) as usize) {
                    return Err(LexmatchError::invalid_operation(format!(
                        "{} doesn't support clone(), required to use it more than once in a query",
                        source.lock().description()
                    )));
                }
                source.lock().reset(&self.shard)?;
                SourceHandle::Shared(source.clone())
            }
        };
        Ok(PostList::External(ExternalPostList::new(handle, factor)))
    }

    fn weight_for(&mut self, term: &str, wqf: TermCount, factor: f64) -> Result<Option<Box<dyn Weight>>> {
        let (freqs, wdf_ub) = self.owner.stats.term(self.owner.db, term)?;
        let info = self.owner.term_info.entry(term.to_string()).or_default();
        info.termfreq = freqs.termfreq;
        if factor == 0.0 || self.owner.proto.is_bool() {
            return Ok(None);
        }
        let mut weight = self.owner.proto.clone_box();
        weight.init(&self.owner.stats.term_weight_stats(freqs, wqf, wdf_ub), factor);
        info.maxweight = info.maxweight.max(weight.maxpart());
        Ok(Some(weight))
    }

    fn leaf(&mut self, term: &str, wqf: TermCount, factor: f64) -> Result<PostList> {
        let weight = self.weight_for(term, wqf, factor)?;
        let pl = LeafPostList::open(self.shard.clone(), term, weight)?;
        if pl.estimates().max == 0 {
            return Ok(PostList::empty());
        }
        Ok(PostList::Leaf(pl))
    }

    fn all_docs(&mut self) -> Result<PostList> {
        let pl = LeafPostList::open(self.shard.clone(), "", None)?;
        Ok(PostList::Leaf(pl))
    }

    fn compile_all(&mut self, subqueries: &[Query], factor: f64) -> Result<Vec<PostList>> {
        subqueries.iter().map(|q| self.compile(q, factor)).collect()
    }

    fn composite(&mut self, op: Op, subqueries: &[Query], parameter: u32, factor: f64) -> Result<PostList> {
        match op {
            Op::And => {
                let children = self.compile_all(subqueries, factor)?;
                Ok(self.and(children))
            }
            Op::Filter => {
                let mut children = Vec::with_capacity(subqueries.len());
                for (i, q) in subqueries.iter().enumerate() {
                    children.push(self.compile(q, if i == 0 { factor } else { 0.0 })?);
                }
                Ok(self.and(children))
            }
            Op::Or => {
                let children = self.compile_all(subqueries, factor)?;
                Ok(self.or(children))
            }
            Op::AndNot => {
                let Some((first, rest)) = subqueries.split_first() else {
                    return Ok(PostList::empty());
                };
                let left = self.compile(first, factor)?;
                if left.is_empty_list() {
                    return Ok(left);
                }
                let rights = self.compile_all(rest, 0.0)?;
                let right = self.or(rights);
                if right.is_empty_list() {
                    return Ok(left);
                }
                Ok(PostList::AndNot(AndNotPostList::new(left, right, self.db_size)))
            }
            Op::AndMaybe => {
                let Some((first, rest)) = subqueries.split_first() else {
                    return Ok(PostList::empty());
                };
                let left = self.compile(first, factor)?;
                if left.is_empty_list() {
                    return Ok(left);
                }
                if factor == 0.0 {
                    // The optional side could only add weight, and there is none.
                    return Ok(left);
                }
                let rights = self.compile_all(rest, factor)?;
                let right = self.or(rights);
                if right.is_empty_list() || right.maxweight() == 0.0 {
                    return Ok(left);
                }
                Ok(PostList::Or(OrPostList::and_maybe(left, right)))
            }
            Op::Xor => {
                let children: Vec<PostList> = self
                    .compile_all(subqueries, factor)?
                    .into_iter()
                    .filter(|pl| !pl.is_empty_list())
                    .collect();
                Ok(match children.len() {
                    0 => PostList::empty(),
                    1 => children.into_iter().next().unwrap_or_else(PostList::empty),
                    _ => PostList::Xor(XorPostList::new(children, self.db_size)),
                })
            }
            Op::Max => {
                let children = self.compile_all(subqueries, factor)?;
                Ok(self.max(children))
            }
            Op::Synonym => self.synonym(subqueries, factor),
            Op::EliteSet => self.elite_set(subqueries, parameter, factor),
            Op::Near | Op::Phrase => self.positional(op, subqueries, parameter, factor),
        }
    }

    fn and(&self, children: Vec<PostList>) -> PostList {
        if children.is_empty() || children.iter().any(PostList::is_empty_list) {
            return PostList::empty();
        }
        if children.len() == 1 {
            return children.into_iter().next().unwrap_or_else(PostList::empty);
        }
        PostList::And(AndPostList::new(children, self.db_size))
    }

    /// Build a binary OR tree, pairing the two rarest operands first.
    fn or(&self, children: Vec<PostList>) -> PostList {
        let mut heap: BinaryHeap<Pending> = children
            .into_iter()
            .filter(|pl| !pl.is_empty_list())
            .enumerate()
            .map(|(seq, pl)| Pending {
                est: pl.estimates().est,
                seq,
                pl,
            })
            .collect();
        let mut seq = heap.len();
        loop {
            let Some(a) = heap.pop() else {
                return PostList::empty();
            };
            let Some(b) = heap.pop() else {
                return a.pl;
            };
            let pl = PostList::Or(OrPostList::new(b.pl, a.pl, self.db_size));
            heap.push(Pending {
                est: pl.estimates().est,
                seq,
                pl,
            });
            seq += 1;
        }
    }

    fn max(&self, children: Vec<PostList>) -> PostList {
        let mut children: Vec<PostList> = children.into_iter().filter(|pl| !pl.is_empty_list()).collect();
        match children.len() {
            0 => PostList::empty(),
            1 => children.pop().unwrap_or_else(PostList::empty),
            _ => PostList::Max(MaxPostList::new(children, self.db_size)),
        }
    }

    /// Global statistics of a set of terms treated as one.
    fn combined_stats(&mut self, terms: &[String]) -> Result<(TermFreqs, TermCount)> {
        let n = f64::from(self.owner.stats.collection_size);
        let r = f64::from(self.owner.stats.rset_size);
        let mut miss_tf = 1.0;
        let mut miss_rtf = 1.0;
        let mut max_tf = 0;
        let mut max_rtf = 0;
        let mut collfreq = 0u64;
        let mut wdf_ub: TermCount = 0;
        for term in terms {
            let (freqs, ub) = self.owner.stats.term(self.owner.db, term)?;
            if n > 0.0 {
                miss_tf *= 1.0 - f64::from(freqs.termfreq) / n;
            }
            if r > 0.0 {
                miss_rtf *= 1.0 - f64::from(freqs.reltermfreq) / r;
            }
            max_tf = max_tf.max(freqs.termfreq);
            max_rtf = max_rtf.max(freqs.reltermfreq);
            collfreq = collfreq.saturating_add(freqs.collfreq);
            wdf_ub = wdf_ub.saturating_add(ub);
        }
        let termfreq = ((n * (1.0 - miss_tf)).round() as DocCount)
            .max(max_tf)
            .min(self.owner.stats.collection_size);
        let reltermfreq = ((r * (1.0 - miss_rtf)).round() as DocCount)
            .max(max_rtf)
            .min(self.owner.stats.rset_size);
        let doclen_ub = self.owner.stats.doclength_bounds.1;
        if doclen_ub > 0 {
            wdf_ub = wdf_ub.min(doclen_ub);
        }
        Ok((TermFreqs::new(termfreq, reltermfreq, collfreq), wdf_ub))
    }

    /// Terms under `query`, with wildcards expanded on this shard.
    fn collect_terms(&self, query: &Query, out: &mut Vec<String>) -> Result<()> {
        match query.node() {
            Some(QueryNode::Term { term, .. }) => out.push(term.clone()),
            Some(QueryNode::MatchAll) => out.push(String::new()),
            Some(QueryNode::Composite { subqueries, .. }) => {
                for q in subqueries {
                    self.collect_terms(q, out)?;
                }
            }
            Some(QueryNode::Scale { subquery, .. }) => self.collect_terms(subquery, out)?,
            Some(QueryNode::Wildcard { pattern, options }) => {
                out.extend(expand_terms(self.shard.as_ref(), pattern, options)?);
            }
            _ => {}
        }
        Ok(())
    }

    fn synonym(&mut self, subqueries: &[Query], factor: f64) -> Result<PostList> {
        let children = self.compile_all(subqueries, 0.0)?;
        let inner = self.or(children);
        if inner.is_empty_list() || factor == 0.0 || self.owner.proto.is_bool() {
            return Ok(inner);
        }
        let mut terms = Vec::new();
        for q in subqueries {
            self.collect_terms(q, &mut terms)?;
        }
        let (freqs, wdf_ub) = self.combined_stats(&terms)?;
        let wqf = subqueries
            .iter()
            .map(Query::query_length)
            .max()
            .unwrap_or(1)
            .max(1);
        let mut weight = self.owner.proto.clone_box();
        weight.init(&self.owner.stats.term_weight_stats(freqs, wqf, wdf_ub), factor);
        Ok(PostList::Synonym(SynonymPostList::new(self.shard.clone(), inner, weight)))
    }

    fn elite_set(&mut self, subqueries: &[Query], parameter: u32, factor: f64) -> Result<PostList> {
        let size = if parameter == 0 { DEFAULT_ELITE_SET_SIZE } else { parameter } as usize;
        let children: Vec<PostList> = self
            .compile_all(subqueries, factor)?
            .into_iter()
            .filter(|pl| !pl.is_empty_list())
            .collect();
        if children.len() <= size {
            return Ok(self.or(children));
        }
        let mut ranked: Vec<(usize, f64)> = children.iter().map(|pl| pl.maxweight()).enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut keep = vec![false; children.len()];
        for &(i, _) in ranked.iter().take(size) {
            keep[i] = true;
        }
        log::debug!(
            "ELITE_SET: keeping {size} of {} subqueries on this shard",
            children.len()
        );
        let chosen = children
            .into_iter()
            .zip(keep)
            .filter_map(|(pl, k)| k.then_some(pl))
            .collect();
        Ok(self.or(chosen))
    }

    fn positional(&mut self, op: Op, subqueries: &[Query], parameter: u32, factor: f64) -> Result<PostList> {
        for q in subqueries {
            if !is_positional_operand(q) {
                return Err(LexmatchError::unimplemented(
                    "NEAR and PHRASE only currently support leaf subqueries",
                ));
            }
        }
        let children = self.compile_all(subqueries, factor)?;
        if children.iter().any(PostList::is_empty_list) {
            return Ok(PostList::empty());
        }
        if !self.shard.has_positions() {
            log::debug!("{op}: shard has no positional data, matching as AND");
            return Ok(self.and(children));
        }
        let window = if parameter == 0 {
            subqueries.len() as TermPos
        } else {
            parameter
        };
        let kind = match op {
            Op::Near => PositionalKind::Near,
            _ => PositionalKind::Phrase,
        };
        let and = AndPostList::new(children, self.db_size);
        Ok(PostList::Positional(PositionalPostList::new(kind, window, and)))
    }

    fn value_range(&mut self, slot: ValueSlot, begin: Option<&String>, end: Option<&String>) -> Result<PostList> {
        let freq = self.shard.value_freq(slot)?;
        if freq == 0 {
            return Ok(PostList::empty());
        }
        let mut estimates = Estimates::new(0, freq / 2, freq);
        if let Some((lo, hi)) = self.shard.value_bounds(slot)? {
            let below = end.is_some_and(|e| e.as_str() < lo.as_str());
            let above = begin.is_some_and(|b| b.as_str() > hi.as_str());
            if below || above {
                return Ok(PostList::empty());
            }
            let covers_lo = begin.is_none_or(|b| b.as_str() <= lo.as_str());
            let covers_hi = end.is_none_or(|e| e.as_str() >= hi.as_str());
            if covers_lo && covers_hi {
                if freq == self.db_size {
                    return self.all_docs();
                }
                estimates = Estimates::exact(freq);
            }
        }
        let cursor = self.shard.values(slot)?;
        Ok(PostList::ValueRange(ValueRangePostList::new(
            slot,
            cursor,
            begin.cloned(),
            end.cloned(),
            estimates,
        )))
    }

    fn wildcard(&mut self, pattern: &Pattern, options: &WildcardOptions, factor: f64) -> Result<PostList> {
        let terms = expand_terms(self.shard.as_ref(), pattern, options)?;
        log::debug!("wildcard {pattern:?} expanded to {} terms", terms.len());
        if terms.is_empty() {
            return Ok(PostList::empty());
        }
        match options.combiner {
            Combiner::Synonym if factor != 0.0 && !self.owner.proto.is_bool() => {
                let mut children = Vec::with_capacity(terms.len());
                for term in &terms {
                    children.push(self.leaf(term, 1, 0.0)?);
                }
                let inner = self.or(children);
                if inner.is_empty_list() {
                    return Ok(inner);
                }
                let (freqs, wdf_ub) = self.combined_stats(&terms)?;
                let mut weight = self.owner.proto.clone_box();
                weight.init(&self.owner.stats.term_weight_stats(freqs, 1, wdf_ub), factor);
                Ok(PostList::Synonym(SynonymPostList::new(self.shard.clone(), inner, weight)))
            }
            Combiner::Max => {
                let mut children = Vec::with_capacity(terms.len());
                for term in &terms {
                    children.push(self.leaf(term, 1, factor)?);
                }
                Ok(self.max(children))
            }
            _ => {
                let mut children = Vec::with_capacity(terms.len());
                for term in &terms {
                    children.push(self.leaf(term, 1, factor)?);
                }
                Ok(self.or(children))
            }
        }
    }
}

/// Product of the scale factors wrapping the whole query.
fn root_scale(query: &Query) -> f64 {
    match query.node() {
        Some(QueryNode::Scale { factor, subquery }) => *factor * root_scale(subquery),
        _ => 1.0,
    }
}

/// Operands `NEAR`/`PHRASE` can take positions from: terms, and unions of
/// terms.
fn is_positional_operand(query: &Query) -> bool {
    match query.node() {
        None => true,
        Some(QueryNode::Term { .. } | QueryNode::Wildcard { .. }) => true,
        Some(QueryNode::Scale { subquery, .. }) => is_positional_operand(subquery),
        Some(QueryNode::Composite { op, subqueries, .. }) => {
            matches!(op, Op::Or | Op::Synonym | Op::Max | Op::EliteSet)
                && subqueries.iter().all(is_positional_operand)
        }
        _ => false,
    }
}
