//! Locale-aware amount extraction
//!
//! Chat users type amounts the Brazilian way (`1.234,56`), the English way
//! (`1,234.56`) or without grouping at all (`45,90`, `45.90`). The rules:
//!
//! - an optional sign and an optional `R$`, `US$`, `$` or `€` marker
//! - when both `,` and `.` appear, the last one is the decimal separator
//! - a separator that repeats is a thousands separator (`1.000.000`)
//! - a single separator followed by exactly three digits, after a 1-3 digit
//!   integer part that does not start with zero, is a thousands separator
//!   (`1.500` is 1500, `0,125` is 0.125)
//! - any other single separator is the decimal separator
//!
//! The parsed value keeps its sign and scale; rejecting zero, negatives and
//! excess precision is the validator's job.

use rust_decimal::Decimal;
use std::str::FromStr;

const MARKERS: [&str; 4] = ["us$", "r$", "$", "€"];

/// Whether the token is a bare currency marker such as `R$`
pub fn is_currency_marker(token: &str) -> bool {
    let lower = token.trim().to_lowercase();
    MARKERS.contains(&lower.as_str())
}

/// Parse a single chat token as an amount
///
/// Returns `None` when the token is not a number in any accepted layout.
pub fn parse_amount(token: &str) -> Option<Decimal> {
    let trimmed = token
        .trim()
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'));

    let (negative, rest) = strip_sign(trimmed);
    let rest = strip_marker(rest);
    let (negative, rest) = if negative {
        (true, rest)
    } else {
        strip_sign(rest)
    };
    let rest = rest.trim_start();

    let normalized = normalize_digits(rest)?;
    let value = Decimal::from_str(&normalized).ok()?;

    Some(if negative { -value } else { value })
}

fn strip_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

fn strip_marker(s: &str) -> &str {
    for marker in MARKERS {
        if s.len() >= marker.len()
            && s.is_char_boundary(marker.len())
            && s[..marker.len()].eq_ignore_ascii_case(marker)
        {
            return &s[marker.len()..];
        }
    }
    s
}

/// Rewrite digits and separators into a plain `1234.56` string
fn normalize_digits(s: &str) -> Option<String> {
    if s.is_empty() || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if !s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return None;
    }

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    match (commas, dots) {
        (0, 0) => Some(s.to_string()),
        (0, _) => single_separator(s, '.', dots),
        (_, 0) => single_separator(s, ',', commas),
        _ => {
            // Both present: the last one is decimal and must appear once
            let last = s.rfind([',', '.'])?;
            let decimal = s[last..].chars().next()?;
            let grouping = if decimal == ',' { '.' } else { ',' };
            if s.matches(decimal).count() != 1 {
                return None;
            }
            let (int_part, frac_part) = (&s[..last], &s[last + 1..]);
            let int_digits = ungroup(int_part, grouping)?;
            Some(format!("{int_digits}.{frac_part}"))
        }
    }
}

fn single_separator(s: &str, sep: char, count: usize) -> Option<String> {
    if count > 1 {
        return ungroup(s, sep);
    }

    let (int_part, frac_part) = s.split_once(sep)?;
    if frac_part.is_empty() {
        return None;
    }
    let is_grouping =
        frac_part.len() == 3 && (1..=3).contains(&int_part.len()) && !int_part.starts_with('0');
    if is_grouping {
        Some(format!("{int_part}{frac_part}"))
    } else {
        Some(format!("{int_part}.{frac_part}"))
    }
}

/// Strip thousands separators, checking the 3-digit grouping
fn ungroup(s: &str, sep: char) -> Option<String> {
    let mut groups = s.split(sep);
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut out = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}
