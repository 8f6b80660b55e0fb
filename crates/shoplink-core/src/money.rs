//! # Money Module
//!
//! Provides the `Money` type for catalog prices and the conversion from the
//! marketplace's decimal price strings into integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Marketplace sends:  "19.99"                                           │
//! │  f64 parse × 100:    1998.9999999999998  ❌ truncates to 1998           │
//! │                                                                         │
//! │  OUR SOLUTION: parse the decimal digits directly                        │
//! │    "19.99"  → 19 × 100 + 99        = 1999 cents                        │
//! │    "19.995" → 1999, third digit 5  = 2000 cents (half away from zero)  │
//! │                                                                         │
//! │  Only exotic spellings ("1.5e2") fall back to f64 + round-to-cent.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shoplink_core::money::Money;
//!
//! assert_eq!(Money::parse_amount("199.00").unwrap().cents(), 19900);
//! assert_eq!(Money::parse_amount("99.99").unwrap().cents(), 9999);
//! assert!(Money::parse_amount("abc").is_none());
//! assert!(Money::parse_amount("").is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Price Unit
// =============================================================================

/// Unit a marketplace reports its price amounts in.
///
/// A bare integer such as `"199"` is ambiguous on the wire: it could mean
/// 199.00 or 1.99. Only a provider declared as `Minor` makes it unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    /// Amounts are decimal major units (`"199"` = 199.00).
    #[default]
    Major,
    /// Pure-integer amounts are already minor units (`"199"` = 1.99).
    Minor,
}

impl std::str::FromStr for PriceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(PriceUnit::Major),
            "minor" | "cents" => Ok(PriceUnit::Minor),
            other => Err(format!("unknown price unit: {}", other)),
        }
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Currency is carried next to the amount (see `CatalogEntry::currency`);
/// the marketplace only ever reports one currency per listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parses a marketplace price amount into cents.
    ///
    /// ## Rules
    /// - Amounts are decimal strings in major units: `"199"` and `"199.00"`
    ///   are both 19900 cents.
    /// - Plain decimals are parsed digit by digit and rounded half away from
    ///   zero at the cent.
    /// - Anything else goes through `f64` and is rounded to the nearest cent.
    /// - Empty, non-numeric, NaN and infinite inputs yield `None`.
    ///
    /// Zero and negative amounts parse successfully; deciding whether they
    /// are acceptable is the reconciler's job, not the parser's.
    ///
    /// ```rust
    /// use shoplink_core::money::Money;
    ///
    /// assert_eq!(Money::parse_amount("0").unwrap().cents(), 0);
    /// assert_eq!(Money::parse_amount("-5.5").unwrap().cents(), -550);
    /// assert_eq!(Money::parse_amount("1.5e2").unwrap().cents(), 15000);
    /// assert!(Money::parse_amount("NaN").is_none());
    /// ```
    pub fn parse_amount(raw: &str) -> Option<Money> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(cents) = parse_plain_decimal(raw) {
            return Some(Money(cents));
        }

        let value: f64 = raw.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > i64::MAX as f64 || cents < i64::MIN as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Parses a price amount reported in the given unit.
    ///
    /// A pure-integer string is taken as cents directly only when the unit
    /// is `Minor`. Every other spelling, and every amount in `Major`, goes
    /// through [`Money::parse_amount`].
    ///
    /// ```rust
    /// use shoplink_core::money::{Money, PriceUnit};
    ///
    /// assert_eq!(Money::parse_price("199", PriceUnit::Minor).unwrap().cents(), 199);
    /// assert_eq!(Money::parse_price("199", PriceUnit::Major).unwrap().cents(), 19900);
    /// assert_eq!(Money::parse_price("1.99", PriceUnit::Minor).unwrap().cents(), 199);
    /// ```
    pub fn parse_price(raw: &str, unit: PriceUnit) -> Option<Money> {
        if unit == PriceUnit::Minor {
            if let Some(cents) = parse_plain_integer(raw.trim()) {
                return Some(Money(cents));
            }
        }
        Money::parse_amount(raw)
    }
}

/// Exact parse of `[+-]digits`.
fn parse_plain_integer(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Exact parse of `[+-]digits[.digits]` into cents.
///
/// Returns `None` for anything that is not a plain decimal (exponents,
/// thousands separators, currency symbols) or that overflows `i64`.
fn parse_plain_decimal(raw: &str) -> Option<i64> {
    let (negative, unsigned) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let mut cents: i64 = 0;
    for digit in int_part.bytes() {
        cents = cents.checked_mul(10)?.checked_add((digit - b'0') as i64)?;
    }
    cents = cents.checked_mul(100)?;

    let mut frac = frac_part.bytes().map(|b| (b - b'0') as i64);
    let tenths = frac.next().unwrap_or(0);
    let hundredths = frac.next().unwrap_or(0);
    cents = cents.checked_add(tenths * 10 + hundredths)?;

    if frac.next().unwrap_or(0) >= 5 {
        cents = cents.checked_add(1)?;
    }

    Some(if negative { -cents } else { cents })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `major.minor` without a currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
