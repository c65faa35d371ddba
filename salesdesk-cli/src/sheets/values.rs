//! Lenient coercion of hand-typed cell values
//!
//! The sheets are maintained by sales staff: amounts arrive with currency
//! marks and thousands separators, dates in whatever format the author
//! liked, flags as booleans or the string "TRUE".

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::workbook::Cell;

static CURRENCY_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[¥$,\\]").expect("static regex"));

/// Parse a monetary amount. Numbers pass through; strings are stripped of
/// currency marks and separators first. Anything unparseable is 0.
pub fn parse_amount(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Bool(_) | Cell::Empty | Cell::DateTime(_) => 0.0,
        Cell::Text(s) => {
            let cleaned = CURRENCY_MARKS.replace_all(s, "");
            cleaned.trim().parse::<f64>().unwrap_or(0.0)
        }
    }
}

/// Truthiness the way the master sheets record it: a real boolean, or the
/// string TRUE in any casing.
pub fn is_truthy(cell: &Cell) -> bool {
    match cell {
        Cell::Bool(b) => *b,
        Cell::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a contract/payment date cell. Datetime cells use their date part;
/// text tries the formats seen in the wild. `None` for blank or
/// unparseable input.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            for fmt in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Some(d);
                }
            }
            for fmt in DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt.date());
                }
            }
            None
        }
        _ => None,
    }
}
