//! Date tokens: `dd/mm/yyyy`, `dd/mm/yy`, `dd/mm`, `yyyy-mm-dd`, `hoje`, `ontem`

use crate::types::category_key;
use chrono::{Datelike, NaiveDate};

/// Parse a chat token as a date relative to `today`
///
/// `dd/mm` takes the year of `today`. Impossible calendar dates are `None`.
pub fn parse_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let token = token
        .trim()
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'));

    match category_key(token).as_str() {
        "hoje" | "today" => return Some(today),
        "ontem" | "yesterday" => return today.pred_opt(),
        _ => {}
    }

    if token.contains('/') {
        let parts: Vec<&str> = token.split('/').collect();
        return match parts.as_slice() {
            [day, month] => ymd(&today.year().to_string(), month, day),
            [day, month, year] if year.len() == 4 => ymd(year, month, day),
            [day, month, year] if year.len() == 2 => ymd(&format!("20{year}"), month, day),
            _ => None,
        };
    }

    let parts: Vec<&str> = token.split('-').collect();
    match parts.as_slice() {
        [year, month, day] if year.len() == 4 => ymd(year, month, day),
        _ => None,
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    if [year, month, day]
        .iter()
        .any(|part| part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
