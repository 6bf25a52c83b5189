//! TF-IDF similarity and one-byte norm encoding.
//!
//! score(q, d) = coord(q, d) * query_norm(q) *
//!     sum over t in q of tf(t in d) * idf(t)^2 * boost(t) * norm(t.field, d)

use std::sync::LazyLock;

/// Decoded value of every possible norm byte.
static NORM_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| std::array::from_fn(|b| byte_to_float(b as u8)));

/// Encode a norm into a byte with a 3-bit mantissa and 5-bit exponent.
/// Precision is coarse; values round down. Zero and negatives map to 0.
pub fn encode_norm(value: f32) -> u8 {
    let bits = value.to_bits() as i32;
    let small = bits >> (24 - 3);
    let zero_exp = (63 - 15) << 3;
    if small <= zero_exp {
        return if bits <= 0 { 0 } else { 1 };
    }
    if small >= zero_exp + 0x100 {
        return 255;
    }
    (small - zero_exp) as u8
}

/// Decode a norm byte written by [`encode_norm`].
pub fn decode_norm(byte: u8) -> f32 {
    NORM_TABLE[byte as usize]
}

fn byte_to_float(byte: u8) -> f32 {
    if byte == 0 {
        return 0.0;
    }
    let mut bits = (byte as u32) << (24 - 3);
    bits += (63 - 15) << 24;
    f32::from_bits(bits)
}

/// The classic vector space similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Similarity;

impl Similarity {
    /// Length normalization for a field with `num_terms` tokens.
    pub fn length_norm(&self, num_terms: u32) -> f32 {
        if num_terms == 0 {
            1.0
        } else {
            1.0 / (num_terms as f32).sqrt()
        }
    }

    /// Normalizes a query so scores of different queries are comparable.
    pub fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        if sum_of_squared_weights <= 0.0 {
            1.0
        } else {
            1.0 / sum_of_squared_weights.sqrt()
        }
    }

    pub fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    /// Weight of a sloppy phrase match `distance` positions off.
    pub fn sloppy_freq(&self, distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    pub fn idf(&self, doc_freq: u64, num_docs: u64) -> f32 {
        ((num_docs as f64 / (doc_freq as f64 + 1.0)).ln() + 1.0) as f32
    }

    /// Fraction of the query's clauses a document matched.
    pub fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        if max_overlap == 0 {
            1.0
        } else {
            overlap as f32 / max_overlap as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_encoding() {
        assert_eq!(encode_norm(1.0), 124);
        assert_eq!(decode_norm(124), 1.0);
        assert_eq!(encode_norm(0.0), 0);
        assert_eq!(decode_norm(0), 0.0);
        assert_eq!(encode_norm(f32::MAX), 255);
        assert_eq!(encode_norm(1e-20), 1);

        let half = decode_norm(encode_norm(0.5));
        assert_eq!(half, 0.5);
        let third = decode_norm(encode_norm(1.0 / 3.0));
        assert!(third <= 1.0 / 3.0 && third > 0.25);
    }

    #[test]
    fn test_similarity() {
        let sim = Similarity;
        assert_eq!(sim.tf(4.0), 2.0);
        assert_eq!(sim.length_norm(4), 0.5);
        assert_eq!(sim.coord(1, 2), 0.5);
        assert!((sim.idf(1, 2) - 1.0).abs() < 1e-6);
        assert!(sim.idf(1, 100) > sim.idf(10, 100));
        assert_eq!(sim.query_norm(4.0), 0.5);
    }
}
