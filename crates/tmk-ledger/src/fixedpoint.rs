//! Fixed-point numeric types.
//!
//! Every amount the ledger touches is a scaled integer. Binary floats never
//! appear, so repeated buy/sell cycles cannot drift.
//!
//! | type         | repr   | scale | meaning                              |
//! |--------------|--------|-------|--------------------------------------|
//! | [`Qty`]      | `i64`  | 1e-6  | item units (fractional trading)      |
//! | [`Micros`]   | `i64`  | 1e-6  | tokens: unit prices, gain/loss       |
//! | [`Notional`] | `i128` | 1e-12 | exact `Qty × Micros` product         |
//! | [`Percent`]  | `i64`  | 1e-6  | percentage points (50% = 50_000_000) |
//!
//! None of the types implement `From<i64>`: callers must say which scale a
//! raw integer is in (`Qty::new`, `Micros::new`, `Qty::from_units`, ...).
//!
//! Conversions that lose precision (`Notional` to `Micros`, ratios to
//! `Percent`) round half away from zero.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Raw units per whole item.
pub const QTY_SCALE: i64 = 1_000_000;

/// Raw micros per whole token.
pub const MICROS_SCALE: i64 = 1_000_000;

const SCALE_DIGITS: usize = 6;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Errors produced when parsing a decimal string into a fixed-point value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFixedError {
    /// The input was empty after trimming.
    Empty,
    /// The input is not a plain decimal number.
    Invalid { raw: String },
    /// More than six fractional digits (would require rounding).
    TooManyDecimalPlaces { raw: String },
    /// The value does not fit the target representation.
    OutOfRange { raw: String },
}

impl fmt::Display for ParseFixedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "decimal value is empty"),
            Self::Invalid { raw } => write!(f, "not a decimal number: '{raw}'"),
            Self::TooManyDecimalPlaces { raw } => {
                write!(f, "more than 6 decimal places: '{raw}'")
            }
            Self::OutOfRange { raw } => write!(f, "decimal value out of range: '{raw}'"),
        }
    }
}

impl std::error::Error for ParseFixedError {}

/// How [`parse_scaled`] treats digits past the sixth decimal place.
#[derive(Copy, Clone, PartialEq, Eq)]
enum ExcessDigits {
    Reject,
    /// Round half away from zero.
    Round,
}

/// Parse a decimal string into an integer at 1e-6 scale.
///
/// Accepts an optional sign and an optional fractional part. Rejects
/// exponents and separators. Never goes through a float.
fn parse_scaled(s: &str, excess: ExcessDigits) -> Result<i64, ParseFixedError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseFixedError::Empty);
    }
    let invalid = || ParseFixedError::Invalid { raw: s.to_string() };

    let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    let (frac_part, round_up) = if frac_part.len() > SCALE_DIGITS {
        if excess == ExcessDigits::Reject {
            return Err(ParseFixedError::TooManyDecimalPlaces { raw: s.to_string() });
        }
        let (kept, dropped) = frac_part.split_at(SCALE_DIGITS);
        (kept, dropped.as_bytes()[0] >= b'5')
    } else {
        (frac_part, false)
    };

    let out_of_range = || ParseFixedError::OutOfRange { raw: s.to_string() };
    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| out_of_range())?
    };
    let frac_val: i64 = format!("{frac_part:0<width$}", width = SCALE_DIGITS)
        .parse()
        .map_err(|_| invalid())?;

    let magnitude = int_val
        .checked_mul(1_000_000)
        .and_then(|v| v.checked_add(frac_val))
        .and_then(|v| v.checked_add(i64::from(round_up)))
        .ok_or_else(out_of_range)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Render an integer at 1e-6 scale, trimming trailing fractional zeros.
fn fmt_trimmed(raw: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let whole = abs / 1_000_000;
    let frac = abs % 1_000_000;
    if frac == 0 {
        write!(f, "{sign}{whole}")
    } else {
        let frac = format!("{frac:06}");
        write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}

/// Integer division rounding half away from zero. `d` must be positive.
pub(crate) fn div_round(n: i128, d: i128) -> i128 {
    debug_assert!(d > 0);
    let q = n / d;
    let r = n % d;
    if r.unsigned_abs() * 2 >= d.unsigned_abs() {
        q + n.signum()
    } else {
        q
    }
}

fn clamp_i64(x: i128) -> i64 {
    x.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// ---------------------------------------------------------------------------
// Qty
// ---------------------------------------------------------------------------

/// A quantity of items at 1e-6 scale.
///
/// `Qty::from_units(3)` is three whole items; `Qty::new(2_500_000)` is 2.5.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qty(i64);

impl Qty {
    pub const ZERO: Qty = Qty(0);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Qty(raw)
    }

    /// Whole items. Saturates instead of overflowing.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Qty(units.saturating_mul(QTY_SCALE))
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, ParseFixedError> {
        parse_scaled(s, ExcessDigits::Reject).map(Qty)
    }

    /// Like [`Qty::parse`], but rounds past six decimals instead of failing.
    pub fn parse_rounded(s: &str) -> Result<Self, ParseFixedError> {
        parse_scaled(s, ExcessDigits::Round).map(Qty)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn saturating_add(self, rhs: Qty) -> Qty {
        Qty(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Qty) -> Qty {
        Qty(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Qty {
    type Output = Qty;
    #[inline]
    fn add(self, rhs: Qty) -> Qty {
        Qty(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Qty;
    #[inline]
    fn sub(self, rhs: Qty) -> Qty {
        Qty(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Qty {
    fn sum<I: Iterator<Item = Qty>>(iter: I) -> Qty {
        iter.fold(Qty::ZERO, Qty::saturating_add)
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_trimmed(self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Micros
// ---------------------------------------------------------------------------

/// A token amount at 1e-6 scale (micros).
///
/// 1 token = `Micros(1_000_000)`. Used for unit prices and for realized
/// amounts once they leave the ledger's exact accumulators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Micros(i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    /// Whole tokens. Saturates instead of overflowing.
    #[inline]
    pub const fn from_tokens(tokens: i64) -> Self {
        Micros(tokens.saturating_mul(MICROS_SCALE))
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, ParseFixedError> {
        parse_scaled(s, ExcessDigits::Reject).map(Micros)
    }

    /// Like [`Micros::parse`], but rounds past six decimals instead of failing.
    pub fn parse_rounded(s: &str) -> Result<Self, ParseFixedError> {
        parse_scaled(s, ExcessDigits::Round).map(Micros)
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1_000_000;
        let frac = (self.0 % 1_000_000).abs();
        // -0.25 truncates to whole == 0 and would lose its sign.
        if self.0 < 0 && whole == 0 {
            write!(f, "-{whole}.{frac:06}")
        } else {
            write!(f, "{whole}.{frac:06}")
        }
    }
}

// ---------------------------------------------------------------------------
// Notional
// ---------------------------------------------------------------------------

/// Exact `quantity × unit price` at 1e-12 scale.
///
/// The ledger accumulates cost basis, proceeds and gain/loss as `Notional`
/// so that no rounding happens until a value is read out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Notional(i128);

impl Notional {
    pub const ZERO: Notional = Notional(0);

    #[inline]
    pub const fn new(raw: i128) -> Self {
        Notional(raw)
    }

    #[inline]
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// `qty × price`. Cannot overflow: both factors are `i64`.
    #[inline]
    pub fn of(qty: Qty, price: Micros) -> Notional {
        Notional(qty.0 as i128 * price.0 as i128)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn saturating_add(self, rhs: Notional) -> Notional {
        Notional(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Notional) -> Notional {
        Notional(self.0.saturating_sub(rhs.0))
    }

    /// Round to micros (half away from zero), clamping at the `i64` range.
    pub fn to_micros(self) -> Micros {
        Micros(clamp_i64(div_round(self.0, MICROS_SCALE as i128)))
    }

    /// `self / base × 100`, or zero when `base` is not positive.
    pub fn percent_of(self, base: Notional) -> Percent {
        if base.0 <= 0 {
            return Percent::ZERO;
        }
        const HUNDRED_MICROS: i128 = 100 * 1_000_000;
        let scaled = match self.0.checked_mul(HUNDRED_MICROS) {
            Some(n) => div_round(n, base.0),
            // Only reachable for astronomically large gains; lose the
            // fractional digits rather than overflow.
            None => div_round(self.0, base.0).saturating_mul(HUNDRED_MICROS),
        };
        Percent(clamp_i64(scaled))
    }
}

impl Add for Notional {
    type Output = Notional;
    #[inline]
    fn add(self, rhs: Notional) -> Notional {
        self.saturating_add(rhs)
    }
}

impl Sub for Notional {
    type Output = Notional;
    #[inline]
    fn sub(self, rhs: Notional) -> Notional {
        self.saturating_sub(rhs)
    }
}

impl AddAssign for Notional {
    #[inline]
    fn add_assign(&mut self, rhs: Notional) {
        *self = self.saturating_add(rhs);
    }
}

// ---------------------------------------------------------------------------
// Percent
// ---------------------------------------------------------------------------

/// Percentage points at 1e-6 scale. `Percent::new(12_500_000)` is 12.5%.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Percent(raw)
    }

    /// Whole percentage points.
    #[inline]
    pub const fn from_points(points: i64) -> Self {
        Percent(points.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_trimmed(self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(Qty::parse("3").unwrap(), Qty::from_units(3));
        assert_eq!(Qty::parse("2.5").unwrap(), Qty::new(2_500_000));
        assert_eq!(Qty::parse(".25").unwrap(), Qty::new(250_000));
        assert_eq!(Micros::parse("  10.01 ").unwrap(), Micros::new(10_010_000));
        assert_eq!(Micros::parse("-0.5").unwrap(), Micros::new(-500_000));
        assert_eq!(Micros::parse("+7.").unwrap(), Micros::from_tokens(7));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Qty::parse(""), Err(ParseFixedError::Empty));
        assert!(matches!(Qty::parse("abc"), Err(ParseFixedError::Invalid { .. })));
        assert!(matches!(Qty::parse("1e3"), Err(ParseFixedError::Invalid { .. })));
        assert!(matches!(Qty::parse("1.2.3"), Err(ParseFixedError::Invalid { .. })));
        assert!(matches!(Qty::parse("."), Err(ParseFixedError::Invalid { .. })));
        assert!(matches!(Qty::parse("-"), Err(ParseFixedError::Invalid { .. })));
        assert!(matches!(
            Micros::parse("0.1234567"),
            Err(ParseFixedError::TooManyDecimalPlaces { .. })
        ));
        assert!(matches!(
            Micros::parse("99999999999999999999"),
            Err(ParseFixedError::OutOfRange { .. })
        ));
    }

    #[test]
    fn parse_rounded_rounds_excess_digits_half_away_from_zero() {
        assert_eq!(Micros::parse_rounded("10.1234567").unwrap(), Micros::new(10_123_457));
        assert_eq!(Micros::parse_rounded("10.1234564").unwrap(), Micros::new(10_123_456));
        assert_eq!(Micros::parse_rounded("-0.0000005").unwrap(), Micros::new(-1));
        assert_eq!(Qty::parse_rounded("0.9999995").unwrap(), Qty::from_units(1));
        // At or under six decimals both parsers agree.
        assert_eq!(Qty::parse_rounded("2.5"), Qty::parse("2.5"));
        assert!(matches!(Qty::parse_rounded("abc"), Err(ParseFixedError::Invalid { .. })));
    }

    #[test]
    fn notional_is_exact_product() {
        // 0.01 units at 0.000001 tokens: 1e-8 tokens, representable exactly.
        let n = Notional::of(Qty::new(10_000), Micros::new(1));
        assert_eq!(n.raw(), 10_000);
    }

    #[test]
    fn notional_to_micros_rounds_half_away_from_zero() {
        assert_eq!(Notional::new(1_500_000).to_micros(), Micros::new(2));
        assert_eq!(Notional::new(1_499_999).to_micros(), Micros::new(1));
        assert_eq!(Notional::new(-1_500_000).to_micros(), Micros::new(-2));
        assert_eq!(Notional::new(-1_499_999).to_micros(), Micros::new(-1));
    }

    #[test]
    fn percent_of_zero_base_is_zero() {
        let gain = Notional::of(Qty::from_units(1), Micros::from_tokens(5));
        assert_eq!(gain.percent_of(Notional::ZERO), Percent::ZERO);
        assert_eq!(gain.percent_of(Notional::new(-1)), Percent::ZERO);
    }

    #[test]
    fn percent_of_exact_ratio() {
        let gain = Notional::of(Qty::from_units(1), Micros::from_tokens(10));
        let cost = Notional::of(Qty::from_units(1), Micros::from_tokens(20));
        assert_eq!(gain.percent_of(cost), Percent::from_points(50));
    }

    #[test]
    fn percent_of_repeating_ratio_rounds() {
        let gain = Notional::of(Qty::from_units(1), Micros::from_tokens(1));
        let cost = Notional::of(Qty::from_units(3), Micros::from_tokens(1));
        // 33.3333333...% -> 33.333333
        assert_eq!(gain.percent_of(cost), Percent::new(33_333_333));
        let loss = Notional::new(-gain.raw() * 2);
        // -66.666666...% -> -66.666667
        assert_eq!(loss.percent_of(cost), Percent::new(-66_666_667));
    }

    #[test]
    fn notional_saturates_instead_of_wrapping() {
        let big = Notional::new(i128::MAX);
        assert_eq!(big + Notional::new(1), big);
        assert_eq!(Notional::new(i128::MIN) - Notional::new(1), Notional::new(i128::MIN));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Qty::new(2_500_000).to_string(), "2.5");
        assert_eq!(Qty::from_units(3).to_string(), "3");
        assert_eq!(Qty::new(-10_000).to_string(), "-0.01");
        assert_eq!(Micros::new(1_500_000).to_string(), "1.500000");
        assert_eq!(Micros::new(-250_000).to_string(), "-0.250000");
        assert_eq!(Percent::new(50_000_000).to_string(), "50");
        assert_eq!(Percent::new(-12_500_000).to_string(), "-12.5");
    }

    #[test]
    fn qty_sum_saturates() {
        let total: Qty = [Qty::new(i64::MAX), Qty::new(1)].into_iter().sum();
        assert_eq!(total, Qty::new(i64::MAX));
    }
}
