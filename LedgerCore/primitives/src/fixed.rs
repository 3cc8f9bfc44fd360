//! Unsigned fixed-point amounts with 8 implied decimals.
//!
//! Token supplies and storage pricing are expressed as `Ufix64`. The raw
//! representation is a `u64` scaled by 10^8, so all arithmetic is exact
//! and deterministic.

use core::fmt;
use core::str::FromStr;

/// Number of implied decimal places.
const DECIMALS: u32 = 8;
/// Scale factor (10^8).
const SCALE: u64 = 100_000_000;

/// Unsigned 64-bit fixed-point number with 8 implied decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ufix64(u64);

/// Parse failure for [`Ufix64`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseUfix64Error {
    #[error("empty or malformed fixed-point literal")]
    Malformed,
    #[error("more than 8 fractional digits")]
    TooManyDecimals,
    #[error("value out of range")]
    Overflow,
}

impl Ufix64 {
    /// Zero.
    pub const ZERO: Ufix64 = Ufix64(0);

    /// Construct from the raw scaled representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Construct from a whole-unit integer value.
    pub fn from_integer(units: u64) -> Result<Self, ParseUfix64Error> {
        units
            .checked_mul(SCALE)
            .map(Self)
            .ok_or(ParseUfix64Error::Overflow)
    }

    /// The raw scaled representation.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl FromStr for Ufix64 {
    type Err = ParseUfix64Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseUfix64Error::Malformed);
        }
        if frac_part.len() > DECIMALS as usize {
            return Err(ParseUfix64Error::TooManyDecimals);
        }

        let int_value: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| ParseUfix64Error::Malformed)?
        };

        let frac_value: u64 = if frac_part.is_empty() {
            0
        } else {
            let digits: u64 = frac_part.parse().map_err(|_| ParseUfix64Error::Malformed)?;
            digits * 10u64.pow(DECIMALS - frac_part.len() as u32)
        };

        int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Ufix64)
            .ok_or(ParseUfix64Error::Overflow)
    }
}

impl fmt::Display for Ufix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int_part = self.0 / SCALE;
        let frac_part = self.0 % SCALE;
        let frac = format!("{frac_part:08}");
        let trimmed = frac.trim_end_matches('0');
        if trimmed.is_empty() {
            write!(f, "{int_part}.0")
        } else {
            write!(f, "{int_part}.{trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!("1000000000.0".parse::<Ufix64>().unwrap().raw(), 1_000_000_000 * SCALE);
        assert_eq!("0.00000001".parse::<Ufix64>().unwrap().raw(), 1);
        assert_eq!("12.5".parse::<Ufix64>().unwrap().raw(), 12 * SCALE + 50_000_000);
        assert_eq!("7".parse::<Ufix64>().unwrap().raw(), 7 * SCALE);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Ufix64>(), Err(ParseUfix64Error::Malformed));
        assert_eq!(".".parse::<Ufix64>(), Err(ParseUfix64Error::Malformed));
        assert_eq!("1.2.3".parse::<Ufix64>(), Err(ParseUfix64Error::Malformed));
        assert_eq!("-1.0".parse::<Ufix64>(), Err(ParseUfix64Error::Malformed));
        assert_eq!(
            "0.000000001".parse::<Ufix64>(),
            Err(ParseUfix64Error::TooManyDecimals)
        );
        assert_eq!(
            "999999999999.0".parse::<Ufix64>(),
            Err(ParseUfix64Error::Overflow)
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["1000000000.0", "0.00000001", "12.5", "0.0"] {
            let v: Ufix64 = s.parse().unwrap();
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn test_arithmetic() {
        let a = Ufix64::from_integer(3).unwrap();
        let b = Ufix64::from_integer(1).unwrap();
        assert_eq!(a.checked_sub(b), Some(Ufix64::from_integer(2).unwrap()));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(
            a.saturating_add(b),
            Ufix64::from_integer(4).unwrap()
        );
    }
}
