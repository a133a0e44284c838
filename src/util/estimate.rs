//! Match-count estimate arithmetic.
//!
//! Posting lists combine the (min, est, max) document-count bounds of their
//! children with the functions here. Every result keeps `min <= est <= max`
//! and never exceeds the collection size.

use serde::{Deserialize, Serialize};

use crate::types::DocCount;

/// Lower, estimated and upper bounds on a number of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimates {
    pub min: DocCount,
    pub est: DocCount,
    pub max: DocCount,
}

impl Estimates {
    pub fn new(min: DocCount, est: DocCount, max: DocCount) -> Self {
        Estimates { min, est, max }.clamped()
    }

    /// Bounds that are all equal to `n`.
    pub fn exact(n: DocCount) -> Self {
        Estimates {
            min: n,
            est: n,
            max: n,
        }
    }

    /// Force `min <= est <= max`.
    pub fn clamped(mut self) -> Self {
        if self.min > self.max {
            self.min = self.max;
        }
        self.est = self.est.clamp(self.min, self.max);
        self
    }
}

fn to_count(value: f64) -> DocCount {
    if value <= 0.0 {
        0
    } else if value >= DocCount::MAX as f64 {
        DocCount::MAX
    } else {
        (value + 0.5) as DocCount
    }
}

/// Intersection of independent sets.
pub fn and_estimates(parts: &[Estimates], db_size: DocCount) -> Estimates {
    let Some((first, rest)) = parts.split_first() else {
        return Estimates::default();
    };
    if db_size == 0 {
        return Estimates::default();
    }
    let n = u64::from(db_size);
    let mut min = u64::from(first.min);
    let mut max = first.max;
    let mut est = f64::from(first.est);
    let scale = 1.0 / f64::from(db_size);
    for r in rest {
        // Two sets of sizes a and b out of n overlap in at least a + b - n.
        min = (min + u64::from(r.min)).saturating_sub(n);
        max = max.min(r.max);
        est = est * f64::from(r.est) * scale;
    }
    Estimates::new(min as DocCount, to_count(est), max)
}

/// Left minus right.
pub fn and_not_estimates(l: Estimates, r: Estimates, db_size: DocCount) -> Estimates {
    if db_size == 0 {
        return Estimates::default();
    }
    let min = l.min.saturating_sub(r.max);
    let max = l.max.min(db_size.saturating_sub(r.min));
    let est = f64::from(l.est) * f64::from(db_size.saturating_sub(r.est)) / f64::from(db_size);
    Estimates::new(min, to_count(est), max)
}

/// Union of independent sets.
pub fn or_estimates(parts: &[Estimates], db_size: DocCount) -> Estimates {
    let Some((first, rest)) = parts.split_first() else {
        return Estimates::default();
    };
    if db_size == 0 {
        return Estimates::default();
    }
    let scale = 1.0 / f64::from(db_size);
    let mut min = first.min;
    let mut max = first.max;
    let mut p = f64::from(first.est) * scale;
    for r in rest {
        min = min.max(r.min);
        max = max.saturating_add(r.max).min(db_size);
        let p_i = f64::from(r.est) * scale;
        p += p_i - p * p_i;
    }
    Estimates::new(min, to_count(p * f64::from(db_size)), max)
}

/// Documents in an odd number of the sets.
pub fn xor_estimates(parts: &[Estimates], db_size: DocCount) -> Estimates {
    let Some((first, rest)) = parts.split_first() else {
        return Estimates::default();
    };
    if db_size == 0 {
        return Estimates::default();
    }
    let scale = 1.0 / f64::from(db_size);
    let mut all_exact = first.min == first.max;
    let mut max_sum = u64::from(first.max);
    let mut p = f64::from(first.est) * scale;
    for r in rest {
        max_sum += u64::from(r.max);
        all_exact &= r.min == r.max;
        let p_i = f64::from(r.est) * scale;
        p += p_i - 2.0 * p * p_i;
    }

    let n = u64::from(db_size);
    let max = if max_sum > n {
        // With exact counts the parity of the result is fixed.
        if all_exact && (max_sum & 1) != (n & 1) {
            n - 1
        } else {
            n
        }
    } else {
        max_sum
    };

    let mut min = 0u64;
    for r in parts {
        let rest = max_sum - u64::from(r.max);
        if u64::from(r.min) > rest {
            min = min.max(u64::from(r.min) - rest);
        }
    }
    if all_exact && min == 0 {
        min = max_sum & 1;
    }

    Estimates::new(min as DocCount, to_count(p * f64::from(db_size)), max as DocCount)
}

/// Positional filter: anything from none to all of the candidates.
pub fn positional_estimates(candidates: Estimates, divisor: DocCount) -> Estimates {
    Estimates::new(0, candidates.est / divisor.max(1), candidates.max)
}

/// Round `estimate` to a few significant figures relative to the spread of
/// `[lower, upper]`.
///
/// Estimates whose uncertainty is 10 or less are returned unchanged, so a
/// raw estimate like 6 is never shortened. Otherwise the value is rounded
/// to two significant figures of the smaller of the spread and the estimate
/// itself, nudged back inside the bounds if rounding crossed one of them.
pub fn round_estimate(lower: DocCount, upper: DocCount, estimate: DocCount) -> DocCount {
    let scale = (upper - lower.min(upper)).min(estimate);
    if scale <= 10 {
        return estimate;
    }

    let digits = f64::from(scale).log10().floor() as i32 - 1;
    let r = 10u64.pow(digits.max(0) as u32);
    let est = u64::from(estimate);
    let mut result = (est + r / 2) / r * r;

    if result < u64::from(lower) {
        result += r;
    } else if result > u64::from(upper) {
        result = result.saturating_sub(r);
    }
    result.clamp(u64::from(lower), u64::from(upper.max(lower))) as DocCount
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_estimates() {
        let parts = [Estimates::exact(6), Estimates::exact(2)];
        let e = and_estimates(&parts, 6);
        assert_eq!(e, Estimates::exact(2));

        let parts = [Estimates::new(0, 50, 100), Estimates::new(0, 50, 100)];
        let e = and_estimates(&parts, 100);
        assert_eq!(e.min, 0);
        assert_eq!(e.est, 25);
        assert_eq!(e.max, 100);
    }

    #[test]
    fn test_and_overlap_lower_bound() {
        let parts = [Estimates::exact(80), Estimates::exact(70)];
        let e = and_estimates(&parts, 100);
        assert_eq!(e.min, 50);
        assert_eq!(e.max, 70);
    }

    #[test]
    fn test_or_estimates() {
        let parts = [Estimates::exact(60), Estimates::exact(70)];
        let e = or_estimates(&parts, 100);
        assert_eq!(e.min, 70);
        assert_eq!(e.max, 100);
        assert_eq!(e.est, 88);
    }

    #[test]
    fn test_and_not_estimates() {
        let e = and_not_estimates(Estimates::exact(10), Estimates::exact(4), 20);
        assert_eq!(e.min, 6);
        assert_eq!(e.max, 10);
        assert_eq!(e.est, 8);
    }

    #[test]
    fn test_xor_estimates_parity() {
        let parts = [Estimates::exact(3), Estimates::exact(1)];
        let e = xor_estimates(&parts, 10);
        assert_eq!(e.max, 4);
        assert_eq!(e.min, 2);

        // Two sets of 3 in 4 documents overlap in 2 or 3, so XOR is 0 or 2.
        let parts = [Estimates::exact(3), Estimates::exact(3)];
        let e = xor_estimates(&parts, 4);
        assert_eq!(e.min, 0);
        assert_eq!(e.max, 4);
    }

    #[test]
    fn test_round_estimate_small_spread() {
        assert_eq!(round_estimate(6, 6, 6), 6);
        assert_eq!(round_estimate(0, 8, 6), 6);
        assert_eq!(round_estimate(0, 1000, 7), 7);
    }

    #[test]
    fn test_round_estimate_stays_in_bounds() {
        assert_eq!(round_estimate(0, 1000, 467), 470);
        assert_eq!(round_estimate(0, 100_000, 12_345), 12_000);
        let r = round_estimate(1_001, 1_049, 1_046);
        assert!((1_001..=1_049).contains(&r));
        assert_eq!(round_estimate(10, 20, 15), 15);
    }
}
