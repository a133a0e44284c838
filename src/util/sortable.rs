//! Order-preserving text encoding of numbers for value slots.
//!
//! Values are compared as strings, so numbers stored for range filtering
//! or sorting need an encoding whose byte order matches numeric order.
//! [`sortable_serialise`] maps an `f64` to 16 lowercase hex digits with
//! that property.

/// Encode `value` so that string comparison matches numeric comparison.
///
/// NaN encodes like 0.
pub fn sortable_serialise(value: f64) -> String {
    let value = if value.is_nan() { 0.0 } else { value };
    // -0.0 and 0.0 must encode identically.
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    let key = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
    format!("{key:016x}")
}

/// Decode a value written by [`sortable_serialise`].
///
/// Plain decimal text is accepted as well; anything else decodes to 0.
pub fn sortable_unserialise(value: &str) -> f64 {
    if value.len() == 16 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(key) = u64::from_str_radix(value, 16) {
            let bits = if key >> 63 == 1 { key & !(1 << 63) } else { !key };
            return f64::from_bits(bits);
        }
    }
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let values = [-1e10, -3.5, -0.0, 0.0, 1e-9, 2.0, 17.25, 1e300];
        for pair in values.windows(2) {
            let a = sortable_serialise(pair[0]);
            let b = sortable_serialise(pair[1]);
            assert!(a <= b, "{} !<= {}", pair[0], pair[1]);
        }
        assert_eq!(sortable_serialise(-0.0), sortable_serialise(0.0));
    }

    #[test]
    fn test_decode() {
        for v in [-42.5, 0.0, 3.25, 1e12] {
            assert_eq!(sortable_unserialise(&sortable_serialise(v)), v);
        }
        assert_eq!(sortable_unserialise("12.5"), 12.5);
        assert_eq!(sortable_unserialise("n/a"), 0.0);
    }
}
