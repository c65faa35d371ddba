//! Fuzzy sheet and column resolution
//!
//! Tab names and headers are typed by hand and drift over time: stray
//! whitespace, casing, banner rows above the real header. Resolution is a
//! priority chain: exact match first, then containment, then a scored
//! fuzzy match as a last resort.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::workbook::{Sheet, Workbook};

/// Minimum skim score before a fuzzy header match is trusted.
const FUZZY_SCORE_FLOOR: i64 = 50;

/// Canonical form used for all fuzzy comparisons: trimmed, all internal
/// whitespace removed (including ideographic spaces), lowercased.
pub fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Whether `value` matches any entry of `list` after normalization.
pub fn matches_any(value: &str, list: &[String]) -> bool {
    let target = normalize(value);
    list.iter().any(|item| normalize(item) == target)
}

/// Find a sheet by name: exact first, then containment on
/// whitespace-stripped names.
pub fn find_sheet<'a>(workbook: &'a Workbook, name: &str) -> Option<&'a Sheet> {
    find_sheet_index(workbook, name).map(|i| &workbook.sheets[i])
}

pub fn find_sheet_index(workbook: &Workbook, name: &str) -> Option<usize> {
    if let Some(i) = workbook.sheets.iter().position(|s| s.name == name) {
        return Some(i);
    }
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }
    workbook
        .sheets
        .iter()
        .position(|s| normalize(&s.name).contains(&needle))
}

/// Resolve a column from an ordered candidate list. For each candidate:
/// exact header match wins, then a header containing the candidate. If no
/// candidate resolves, a final fuzzy pass takes the best-scoring header
/// above the floor. Earlier candidates always beat later ones.
pub fn find_column(headers: &[String], candidates: &[String]) -> Option<usize> {
    let trimmed: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
    for name in candidates {
        let name = name.trim();
        if let Some(i) = trimmed.iter().position(|h| *h == name) {
            return Some(i);
        }
        let needle = normalize(name);
        if let Some(i) = trimmed.iter().position(|h| normalize(h).contains(&needle)) {
            return Some(i);
        }
    }

    let matcher = SkimMatcherV2::default();
    let mut best: Option<(usize, i64)> = None;
    for name in candidates {
        for (i, header) in trimmed.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(score) = matcher.fuzzy_match(header, name.trim()) {
                if score >= FUZZY_SCORE_FLOOR && best.map(|(_, s)| score > s).unwrap_or(true) {
                    best = Some((i, score));
                }
            }
        }
    }
    best.map(|(i, _)| i)
}

/// A resolved header row and where the data below it starts (0-based).
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderProbe {
    pub headers: Vec<String>,
    pub data_start: usize,
}

/// Sheets carry their headers in row 1, or in row 2 under a banner row.
/// The id-column marker decides: if row 2 contains it, row 2 is the header.
pub fn probe_headers(sheet: &Sheet, id_marker: &str) -> HeaderProbe {
    let marker = normalize(id_marker);
    let row_text = |row: usize| -> Vec<String> {
        sheet.row(row).iter().map(|c| c.as_text()).collect()
    };

    let second = row_text(1);
    if !marker.is_empty() && normalize(&second.join("")).contains(&marker) {
        return HeaderProbe {
            headers: second,
            data_start: 2,
        };
    }
    HeaderProbe {
        headers: row_text(0),
        data_start: 1,
    }
}

/// Whether the first two rows of a sheet mention the id marker anywhere.
/// Used as a fallback to discover record tabs when none of the configured
/// names resolve.
pub fn has_id_marker(sheet: &Sheet, id_marker: &str) -> bool {
    let marker = normalize(id_marker);
    if marker.is_empty() {
        return false;
    }
    (0..2).any(|row| {
        let joined: String = sheet.row(row).iter().map(|c| c.as_text()).collect();
        normalize(&joined).contains(&marker)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::workbook::Cell;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    #[test]
    fn normalize_strips_all_whitespace() {
        assert_eq!(normalize("  Payment  Ledger "), "paymentledger");
        assert_eq!(normalize("Payment\u{3000}Ledger"), "paymentledger");
    }

    #[test]
    fn sheet_lookup_falls_back_to_containment() {
        let mut wb = Workbook::new();
        wb.push(Sheet::new("2025 Payment Ledger (v2)", 0));
        wb.push(Sheet::new("Notes", 1));
        assert_eq!(find_sheet_index(&wb, "Payment Ledger"), Some(0));
        assert_eq!(find_sheet_index(&wb, "Plan Master"), None);
    }

    #[test]
    fn exact_column_beats_containment_and_order_matters() {
        let headers: Vec<String> = ["No.", "Interview ID", "Old ID", "Name"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let candidates = vec!["Interview ID".to_string(), "ID".to_string()];
        assert_eq!(find_column(&headers, &candidates), Some(1));

        // With only the generic candidate, containment picks the first hit.
        let generic = vec!["ID".to_string()];
        assert_eq!(find_column(&headers, &generic), Some(1));
    }

    #[test]
    fn missing_column_is_none() {
        let headers: Vec<String> = ["Alpha", "Beta"].iter().map(|s| s.to_string()).collect();
        assert_eq!(find_column(&headers, &["Paid To Date".to_string()]), None);
    }

    #[test]
    fn header_probe_prefers_marked_second_row() {
        let rows = vec![
            text_row(&["Q2 Contracts", "", ""]),
            text_row(&["Interview ID", "Name", "Result"]),
            text_row(&["A-1", "North", "won"]),
        ];
        let sheet = Sheet::from_rows("Customer List", 0, rows);
        let probe = probe_headers(&sheet, "Interview ID");
        assert_eq!(probe.data_start, 2);
        assert_eq!(probe.headers[0], "Interview ID");
    }

    #[test]
    fn header_probe_defaults_to_first_row() {
        let rows = vec![
            text_row(&["Interview ID", "Name"]),
            text_row(&["A-1", "North"]),
        ];
        let sheet = Sheet::from_rows("Customer List", 0, rows);
        let probe = probe_headers(&sheet, "Interview ID");
        assert_eq!(probe.data_start, 1);
    }

    #[test]
    fn marker_scan_spots_record_tabs() {
        let sheet = Sheet::from_rows(
            "untitled",
            3,
            vec![text_row(&["", "interview id", ""]), text_row(&["A-1", "x", ""])],
        );
        assert!(has_id_marker(&sheet, "Interview ID"));
        assert!(!has_id_marker(&Sheet::new("empty", 4), "Interview ID"));
    }
}
