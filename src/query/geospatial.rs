//! Weighting documents by their distance from a point on the earth.
//!
//! Locations are stored in a value slot as text: `"lat,long"` in decimal
//! degrees, with several locations separated by `;`. The distance between
//! two sets of locations is the smallest pairwise distance.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::Shard;
use crate::error::{LexmatchError, Result};
use crate::query::source::{PostingSource, SlotCursor, parse_params, to_params};
use crate::types::{DocCount, DocId, ValueSlot};

/// Quadratic mean radius of the earth, in metres.
pub const EARTH_RADIUS: f64 = 6_372_797.6;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLongCoord {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLongCoord {
    /// Latitude must lie in [-90, 90]; longitude is normalised into
    /// [0, 360).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LexmatchError::invalid_argument(format!(
                "Latitude {latitude} out of range"
            )));
        }
        if !longitude.is_finite() {
            return Err(LexmatchError::invalid_argument(format!(
                "Longitude {longitude} is not finite"
            )));
        }
        Ok(LatLongCoord {
            latitude,
            longitude: longitude.rem_euclid(360.0),
        })
    }

    /// Parse `"lat,long"`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || LexmatchError::invalid_argument(format!("bad coordinate '{text}'"));
        let (lat, long) = text.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let long: f64 = long.trim().parse().map_err(|_| invalid())?;
        LatLongCoord::new(lat, long)
    }
}

impl fmt::Display for LatLongCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A set of locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatLongCoords(Vec<LatLongCoord>);

impl LatLongCoords {
    pub fn new() -> Self {
        LatLongCoords::default()
    }

    pub fn with(mut self, coord: LatLongCoord) -> Self {
        self.0.push(coord);
        self
    }

    pub fn push(&mut self, coord: LatLongCoord) {
        self.0.push(coord);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LatLongCoord> {
        self.0.iter()
    }

    /// Parse `;`-separated coordinates, as stored in a value slot.
    pub fn parse(text: &str) -> Result<Self> {
        text.split(';')
            .filter(|part| !part.trim().is_empty())
            .map(LatLongCoord::parse)
            .collect::<Result<Vec<_>>>()
            .map(LatLongCoords)
    }

    /// The form [`LatLongCoords::parse`] reads.
    pub fn serialise(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(LatLongCoord::to_string).collect();
        parts.join(";")
    }
}

impl From<LatLongCoord> for LatLongCoords {
    fn from(coord: LatLongCoord) -> Self {
        LatLongCoords(vec![coord])
    }
}

/// Great-circle distance on a sphere, by the haversine formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreatCircleMetric {
    radius: f64,
}

impl Default for GreatCircleMetric {
    fn default() -> Self {
        GreatCircleMetric {
            radius: EARTH_RADIUS,
        }
    }
}

impl GreatCircleMetric {
    /// A metric on a sphere of `radius` metres.
    pub fn with_radius(radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(LexmatchError::invalid_argument("radius must be positive"));
        }
        Ok(GreatCircleMetric { radius })
    }

    /// Distance in metres between two points.
    pub fn distance(&self, a: &LatLongCoord, b: &LatLongCoord) -> f64 {
        let lat_a = a.latitude.to_radians();
        let lat_b = b.latitude.to_radians();
        let half_dlat = (lat_b - lat_a) / 2.0;
        let half_dlong = (b.longitude - a.longitude).to_radians() / 2.0;
        let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlong.sin().powi(2);
        2.0 * self.radius * h.sqrt().min(1.0).asin()
    }

    /// Smallest pairwise distance between two non-empty sets.
    pub fn min_distance(&self, a: &LatLongCoords, b: &LatLongCoords) -> Result<f64> {
        if a.is_empty() || b.is_empty() {
            return Err(LexmatchError::invalid_argument(
                "empty coordinate list passed to metric",
            ));
        }
        let mut best = f64::INFINITY;
        for x in a.iter() {
            for y in b.iter() {
                best = best.min(self.distance(x, y));
            }
        }
        Ok(best)
    }
}

fn default_k1() -> f64 {
    1000.0
}

fn default_k2() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatLongParams {
    slot: ValueSlot,
    centre: LatLongCoords,
    #[serde(default)]
    metric: GreatCircleMetric,
    /// 0 means unlimited.
    #[serde(default)]
    max_range: f64,
    #[serde(default = "default_k1")]
    k1: f64,
    #[serde(default = "default_k2")]
    k2: f64,
}

/// Matches documents with a location in a slot, weighted by their distance
/// `d` (in metres) from a centre as `k1 * (d + k1)^-k2`.
///
/// With the defaults (k1 = 1000, k2 = 1) a document at the centre weighs
/// 1, one 1km away 0.5 and one 3km away 0.25. Documents beyond
/// `max_range`, when it is non-zero, are not returned.
#[derive(Debug)]
pub struct LatLongDistancePostingSource {
    params: LatLongParams,
    values: SlotCursor,
    dist: f64,
}

impl LatLongDistancePostingSource {
    pub fn new<C: Into<LatLongCoords>>(slot: ValueSlot, centre: C) -> Result<Self> {
        let centre = centre.into();
        if centre.is_empty() {
            return Err(LexmatchError::invalid_argument("centre has no coordinates"));
        }
        Ok(LatLongDistancePostingSource::from_params(LatLongParams {
            slot,
            centre,
            metric: GreatCircleMetric::default(),
            max_range: 0.0,
            k1: default_k1(),
            k2: default_k2(),
        }))
    }

    fn from_params(params: LatLongParams) -> Self {
        LatLongDistancePostingSource {
            params,
            values: SlotCursor::default(),
            dist: 0.0,
        }
    }

    pub fn from_parameters(params: &str) -> Result<Self> {
        let p: LatLongParams = parse_params(params)?;
        let source = LatLongDistancePostingSource::new(p.slot, p.centre)?
            .with_metric(p.metric)
            .with_max_range(p.max_range)?;
        source.with_k(p.k1, p.k2)
    }

    pub fn with_metric(mut self, metric: GreatCircleMetric) -> Self {
        self.params.metric = metric;
        self
    }

    pub fn with_max_range(mut self, max_range: f64) -> Result<Self> {
        if max_range.is_nan() || max_range < 0.0 {
            return Err(LexmatchError::invalid_argument("max_range must be >= 0"));
        }
        self.params.max_range = max_range;
        Ok(self)
    }

    pub fn with_k(mut self, k1: f64, k2: f64) -> Result<Self> {
        if !(k1 > 0.0 && k1.is_finite()) {
            return Err(LexmatchError::invalid_argument("k1 parameter must be > 0"));
        }
        if !(k2 > 0.0 && k2.is_finite()) {
            return Err(LexmatchError::invalid_argument("k2 parameter must be > 0"));
        }
        self.params.k1 = k1;
        self.params.k2 = k2;
        Ok(self)
    }

    /// Distance of the current document from the centre.
    pub fn distance(&self) -> f64 {
        self.dist
    }

    fn weight_at(&self, dist: f64) -> f64 {
        self.params.k1 * (dist + self.params.k1).powf(-self.params.k2)
    }

    fn in_range(&self) -> bool {
        self.params.max_range == 0.0 || self.dist <= self.params.max_range
    }

    /// Move forward from the current position to the first document in
    /// range.
    fn settle(&mut self) -> Result<()> {
        while !self.values.at_end() {
            let coords = LatLongCoords::parse(self.values.value())?;
            self.dist = self.params.metric.min_distance(&self.params.centre, &coords)?;
            if self.in_range() {
                return Ok(());
            }
            self.values.next()?;
        }
        Ok(())
    }
}

impl PostingSource for LatLongDistancePostingSource {
    fn name(&self) -> &str {
        "latlong_distance"
    }

    fn parameters(&self) -> String {
        to_params(&self.params)
    }

    fn clone_box(&self) -> Option<Box<dyn PostingSource>> {
        Some(Box::new(LatLongDistancePostingSource::from_params(
            self.params.clone(),
        )))
    }

    fn reset(&mut self, shard: &Arc<dyn Shard>) -> Result<()> {
        self.values.reset(shard, self.params.slot)?;
        self.dist = 0.0;
        Ok(())
    }

    fn termfreq_min(&self) -> DocCount {
        if self.params.max_range == 0.0 {
            self.values.value_freq
        } else {
            0
        }
    }

    fn termfreq_est(&self) -> DocCount {
        if self.params.max_range == 0.0 {
            self.values.value_freq
        } else {
            self.values.value_freq / 2
        }
    }

    fn termfreq_max(&self) -> DocCount {
        self.values.value_freq
    }

    fn maxweight(&self) -> f64 {
        self.weight_at(0.0)
    }

    fn next(&mut self, _min_wt: f64) -> Result<()> {
        self.values.next()?;
        self.settle()
    }

    fn skip_to(&mut self, did: DocId, _min_wt: f64) -> Result<()> {
        if self.values.started && !self.values.at_end() && self.values.docid() >= did {
            return Ok(());
        }
        self.values.skip_to(did)?;
        self.settle()
    }

    fn at_end(&self) -> bool {
        self.values.started && self.values.at_end()
    }

    fn docid(&self) -> DocId {
        self.values.docid()
    }

    fn weight(&self) -> Result<f64> {
        Ok(self.weight_at(self.dist))
    }

    fn description(&self) -> String {
        format!(
            "LatLongDistancePostingSource(slot={}, centre={})",
            self.params.slot,
            self.params.centre.serialise()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Document, MemoryShard};

    fn coord(lat: f64, long: f64) -> LatLongCoord {
        match LatLongCoord::new(lat, long) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn test_coordinates() -> Result<()> {
        assert_eq!(LatLongCoord::parse(" 10.5 , -1 ")?, coord(10.5, 359.0));
        assert!(LatLongCoord::parse("91,0").is_err());
        assert!(LatLongCoord::parse("10").is_err());
        assert!(LatLongCoord::new(0.0, f64::NAN).is_err());

        let coords = LatLongCoords::parse("1,2;3,4")?;
        assert_eq!(coords.len(), 2);
        assert_eq!(LatLongCoords::parse(&coords.serialise())?, coords);
        assert!(LatLongCoords::parse("").map(|c| c.is_empty())?);
        Ok(())
    }

    #[test]
    fn test_great_circle_distance() -> Result<()> {
        let metric = GreatCircleMetric::default();
        let one_degree = EARTH_RADIUS * 1f64.to_radians();
        let d = metric.distance(&coord(0.0, 0.0), &coord(0.0, 1.0));
        assert!((d - one_degree).abs() < 1e-6, "{d}");
        // Crossing the antimeridian.
        let d = metric.distance(&coord(0.0, 179.5), &coord(0.0, -179.5));
        assert!((d - one_degree).abs() < 1e-6, "{d}");
        assert_eq!(metric.distance(&coord(12.0, 34.0), &coord(12.0, 34.0)), 0.0);

        let near = LatLongCoords::new().with(coord(45.0, 45.0)).with(coord(0.0, 1.0));
        let centre = LatLongCoords::from(coord(0.0, 0.0));
        assert!((metric.min_distance(&centre, &near)? - one_degree).abs() < 1e-6);
        assert!(metric.min_distance(&centre, &LatLongCoords::new()).is_err());
        assert!(GreatCircleMetric::with_radius(0.0).is_err());
        Ok(())
    }

    fn located_shard() -> Arc<dyn Shard> {
        let locations = [Some("0,0"), Some("0,0.01"), None, Some("10,10"), Some("45,45;0,0.005")];
        Arc::new(MemoryShard::from_documents(locations.iter().map(|loc| {
            let doc = Document::new().with_term("place", 1);
            match loc {
                Some(loc) => doc.with_value(2, *loc),
                None => doc,
            }
        })))
    }

    fn drain(source: &mut dyn PostingSource) -> Result<Vec<(DocId, f64)>> {
        let mut out = Vec::new();
        source.next(0.0)?;
        while !source.at_end() {
            out.push((source.docid(), source.weight()?));
            source.next(0.0)?;
        }
        Ok(out)
    }

    #[test]
    fn test_distance_weights_within_range() -> Result<()> {
        let one_degree = EARTH_RADIUS * 1f64.to_radians();
        let mut source =
            LatLongDistancePostingSource::new(2, coord(0.0, 0.0))?.with_max_range(2000.0)?;
        source.reset(&located_shard())?;
        assert_eq!(source.maxweight(), 1.0);
        assert_eq!((source.termfreq_min(), source.termfreq_max()), (0, 4));

        let got = drain(&mut source)?;
        let docids: Vec<DocId> = got.iter().map(|(d, _)| *d).collect();
        assert_eq!(docids, vec![1, 2, 5]);
        assert_eq!(got[0].1, 1.0);
        let expected = |d: f64| 1000.0 / (d + 1000.0);
        assert!((got[1].1 - expected(one_degree * 0.01)).abs() < 1e-9);
        assert!((got[2].1 - expected(one_degree * 0.005)).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_unlimited_range_and_parameters() -> Result<()> {
        let source = LatLongDistancePostingSource::new(2, coord(0.0, 0.0))?.with_k(500.0, 2.0)?;
        let mut again = LatLongDistancePostingSource::from_parameters(&source.parameters())?;
        assert_eq!(again.parameters(), source.parameters());
        again.reset(&located_shard())?;
        assert_eq!(again.termfreq_min(), 4);
        // k1^(1 - k2)
        assert!((again.maxweight() - 1.0 / 500.0).abs() < 1e-15);
        assert_eq!(drain(&mut again)?.len(), 4);

        assert!(again.check(3, 0.0).map(|hit| !hit)?);
        assert!(LatLongDistancePostingSource::new(2, LatLongCoords::new()).is_err());
        assert!(source.with_k(0.0, 1.0).is_err());
        Ok(())
    }
}
