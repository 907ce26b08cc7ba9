//! Bucket keys: value-range prefixes of the IEEE-754 bit pattern.

use std::fmt;

use rankdb_common::{Error, Result};

/// Identifies a bucket of a field: every value stored in it shares the top
/// `32 - variable_bits` bits of its `f32` bit pattern, equal to `prefix`.
///
/// The derived ordering sorts by `variable_bits` first, so iterating a sorted
/// collection of keys visits the most specific (narrowest) buckets first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub variable_bits: u8,
    pub prefix: u32,
}

impl BucketKey {
    /// Maximum number of variable bits; such a bucket spans every `f32`.
    pub const MAX_VARIABLE_BITS: u8 = 32;

    /// Key of the bucket with `variable_bits` variable bits that `value` belongs to.
    pub fn for_value(value: f32, variable_bits: u8) -> BucketKey {
        debug_assert!(variable_bits <= Self::MAX_VARIABLE_BITS);
        BucketKey {
            variable_bits,
            prefix: ((value.to_bits() as u64) >> variable_bits) as u32,
        }
    }

    pub fn fixed_bits(&self) -> u8 {
        Self::MAX_VARIABLE_BITS - self.variable_bits
    }

    /// Returns `true` if `value` falls into this bucket.
    pub fn contains(&self, value: f32) -> bool {
        BucketKey::for_value(value, self.variable_bits) == *self
    }

    /// The low `variable_bits` bits of `value`, stored per entry.
    pub fn remainder(&self, value: f32) -> u32 {
        (value.to_bits() as u64 & self.remainder_mask()) as u32
    }

    /// Rebuilds a value of this bucket from its stored remainder.
    pub fn value(&self, remainder: u32) -> f32 {
        let bits = ((self.prefix as u64) << self.variable_bits)
            | (remainder as u64 & self.remainder_mask());
        f32::from_bits(bits as u32)
    }

    fn remainder_mask(&self) -> u64 {
        (1u64 << self.variable_bits) - 1
    }

    /// File name of the bucket: the number of fixed bits and the prefix in hex.
    pub fn file_name(&self) -> String {
        format!("{:02}-{:08x}", self.fixed_bits(), self.prefix)
    }

    pub fn parse_file_name(name: &str) -> Result<BucketKey> {
        let malformed = || Error::corrupted("bucket file name", name.to_string());
        let (fixed, prefix) = name.split_once('-').ok_or_else(malformed)?;
        let fixed = fixed.parse::<u8>().map_err(|_| malformed())?;
        if fixed > Self::MAX_VARIABLE_BITS || prefix.len() != 8 {
            return Err(malformed());
        }
        let prefix = u32::from_str_radix(prefix, 16).map_err(|_| malformed())?;
        let variable_bits = Self::MAX_VARIABLE_BITS - fixed;
        if (prefix as u64) >> fixed != 0 {
            return Err(malformed());
        }
        Ok(BucketKey {
            variable_bits,
            prefix,
        })
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_for_value() {
        let key = BucketKey::for_value(2.0, 23);
        // sign + exponent of 2.0
        assert_eq!(key.prefix, 0x80);
        assert_eq!(key.fixed_bits(), 9);
        assert!(key.contains(3.5));
        assert!(!key.contains(4.0));
        assert_eq!(key.remainder(2.0), 0);
        assert_eq!(key.remainder(3.0), 0x40_0000);
        assert_eq!(key.value(key.remainder(3.0)), 3.0);
        assert_eq!(key.value(key.remainder(2.75)), 2.75);
    }

    #[test]
    fn test_extreme_widths() {
        let all = BucketKey::for_value(-123.25, 32);
        assert_eq!(all.prefix, 0);
        assert_eq!(all.value(all.remainder(-123.25)), -123.25);

        let exact = BucketKey::for_value(0.1, 0);
        assert_eq!(exact.remainder(0.1), 0);
        assert_eq!(exact.value(0), 0.1);
    }

    #[test]
    fn test_file_name_round_trip() {
        let key = BucketKey::for_value(-1.5, 19);
        assert_eq!(key.file_name(), format!("13-{:08x}", (-1.5f32).to_bits() >> 19));
        assert_eq!(BucketKey::parse_file_name(&key.file_name()).unwrap(), key);
        assert!(BucketKey::parse_file_name("meta.json").is_err());
        assert!(BucketKey::parse_file_name("09-ffffffff").is_err());
        assert!(BucketKey::parse_file_name("33-00000000").is_err());
    }

    #[test]
    fn test_most_specific_sorts_first() {
        let coarse = BucketKey::for_value(1.0, 23);
        let fine = BucketKey::for_value(1.0, 19);
        assert!(fine < coarse);
    }
}
