//! Value range filters.

use crate::database::ValueCursor;
use crate::error::Result;
use crate::postlist::PostingList;
use crate::types::{DocId, TermCount, ValueSlot};
use crate::util::estimate::Estimates;

/// Documents whose value in a slot lies within optional inclusive bounds.
/// Never weighted.
#[derive(Debug)]
pub struct ValueRangePostList {
    slot: ValueSlot,
    cursor: Box<dyn ValueCursor>,
    begin: Option<String>,
    end: Option<String>,
    estimates: Estimates,
    started: bool,
}

impl ValueRangePostList {
    pub fn new(
        slot: ValueSlot,
        cursor: Box<dyn ValueCursor>,
        begin: Option<String>,
        end: Option<String>,
        estimates: Estimates,
    ) -> Self {
        ValueRangePostList {
            slot,
            cursor,
            begin,
            end,
            estimates,
            started: false,
        }
    }

    fn in_range(&self, value: &str) -> bool {
        self.begin.as_deref().is_none_or(|b| value >= b) && self.end.as_deref().is_none_or(|e| value <= e)
    }

    fn settle(&mut self) -> Result<()> {
        while !self.cursor.at_end() && !self.in_range(self.cursor.value()) {
            self.cursor.next()?;
        }
        Ok(())
    }
}

impl PostingList for ValueRangePostList {
    fn estimates(&self) -> Estimates {
        self.estimates
    }

    fn maxweight(&self) -> f64 {
        0.0
    }

    fn recalc_maxweight(&mut self) -> f64 {
        0.0
    }

    fn docid(&self) -> DocId {
        if self.started { self.cursor.docid() } else { 0 }
    }

    fn at_end(&self) -> bool {
        self.started && self.cursor.at_end()
    }

    fn weight(&self) -> Result<f64> {
        Ok(0.0)
    }

    fn wdf(&self) -> TermCount {
        0
    }

    fn next(&mut self, _w_min: f64) -> Result<()> {
        self.started = true;
        self.cursor.next()?;
        self.settle()
    }

    fn skip_to(&mut self, did: DocId, _w_min: f64) -> Result<()> {
        if self.started && (self.cursor.at_end() || self.cursor.docid() >= did) {
            return Ok(());
        }
        self.started = true;
        self.cursor.skip_to(did)?;
        self.settle()
    }

    fn check(&mut self, did: DocId, _w_min: f64) -> Result<bool> {
        self.started = true;
        if !self.cursor.check(did)? {
            return Ok(false);
        }
        Ok(self.in_range(self.cursor.value()))
    }

    fn description(&self) -> String {
        match (&self.begin, &self.end) {
            (Some(b), Some(e)) => format!("ValueRange({} {b} {e})", self.slot),
            (Some(b), None) => format!("ValueGe({} {b})", self.slot),
            (None, Some(e)) => format!("ValueLe({} {e})", self.slot),
            (None, None) => format!("ValueSet({})", self.slot),
        }
    }
}
