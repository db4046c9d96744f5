//! Conversions between user-facing decimal strings and fixed-point token amounts.

use super::U256;

/// Parses a non-negative decimal string into a fixed-point integer with `decimals` places.
///
/// Accepts surrounding whitespace and a single `.`; either side of the dot may be empty,
/// not both. Signs and exponents are rejected. Fraction digits past `decimals` are
/// rounded half-up. Returns `None` on any malformed input or on overflow.
pub fn parse_units(value: &str, decimals: u32) -> Option<U256> {
    let value = value.trim();
    let (integer, fraction) = value.split_once('.').unwrap_or((value, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let width = decimals as usize;
    let (kept, round_up) = if fraction.len() > width {
        (&fraction[..width], fraction.as_bytes()[width] >= b'5')
    } else {
        (fraction, false)
    };

    let digits = format!("{integer}{kept:0<width$}");
    let digits = digits.trim_start_matches('0');
    let amount = if digits.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(digits, 10).ok()?
    };

    if round_up {
        amount.checked_add(U256::from(1u64))
    } else {
        Some(amount)
    }
}

/// True when `value` parses to a strictly positive amount.
pub fn is_positive(value: &str, decimals: u32) -> bool {
    parse_units(value, decimals).is_some_and(|v| !v.is_zero())
}

/// `10^n`. Wraps past 77.
pub fn exp10(n: u32) -> U256 {
    U256::from(10u64).pow(U256::from(n))
}

/// Renders a fixed-point amount with exactly `shown` fraction digits, rounding half-up.
pub fn format_units(amount: U256, decimals: u32, shown: u32) -> String {
    let (scaled, places) = if shown >= decimals {
        (amount, decimals)
    } else {
        let divisor = exp10(decimals - shown);
        let half = divisor / U256::from(2u64);
        (amount.saturating_add(half) / divisor, shown)
    };

    let unit = exp10(places);
    let integer = scaled / unit;
    let mut out = integer.to_string();
    if shown == 0 {
        return out;
    }

    let fraction = (scaled % unit).to_string();
    let width = places as usize;
    out.push('.');
    if width > 0 {
        out.push_str(&format!("{fraction:0>width$}"));
    }
    for _ in places..shown {
        out.push('0');
    }
    out
}
