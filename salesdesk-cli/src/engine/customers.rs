//! Customer reconciliation
//!
//! Assembles the canonical customer view from whichever tabs hold records
//! this month. The same interview id can appear on several tabs; the first
//! sighting wins, later sightings may only fill in a status the first tab
//! did not know.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};

use crate::api::models::{Customer, PaymentCustomer};
use crate::sheets::resolve::{find_column, find_sheet, has_id_marker, matches_any, probe_headers};
use crate::sheets::workbook::{Sheet, Workbook};

use super::schema::SheetSchema;

/// Locator for a source row, stable enough for the front end to deep-link.
pub fn row_link(document_id: &str, gid: u32, row_1based: usize) -> String {
    format!("sheets://{document_id}/{gid}?row={row_1based}")
}

/// Resolve the id of a row: primary id column, falling back to the
/// secondary. Returns `None` for blank ids and stray header literals
/// repeated inside the data.
fn row_id(
    row: &[crate::sheets::workbook::Cell],
    col_id: Option<usize>,
    col_id2: Option<usize>,
    schema: &SheetSchema,
) -> Option<String> {
    let mut id = col_id.map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default());
    if id.as_deref().map(str::is_empty).unwrap_or(true) {
        id = col_id2.map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default());
    }
    let id = id.unwrap_or_default();
    if id.is_empty()
        || matches_any(&id, &schema.id_columns)
        || matches_any(&id, &schema.secondary_id_columns)
    {
        return None;
    }
    Some(id)
}

/// Tabs to reconcile: the configured names, plus an explicitly targeted
/// gid, plus (when nothing resolves) every tab that carries the id
/// marker in its first two rows.
fn record_sheets<'a>(
    workbook: &'a Workbook,
    schema: &SheetSchema,
    target_gid: Option<u32>,
) -> Vec<&'a Sheet> {
    let mut sheets: Vec<&Sheet> = Vec::new();
    let mut seen: HashSet<u32> = HashSet::new();

    for name in &schema.customer_sheets {
        if let Some(sheet) = find_sheet(workbook, name) {
            if seen.insert(sheet.gid) {
                sheets.push(sheet);
            }
        }
    }

    if let Some(gid) = target_gid {
        if let Some(sheet) = workbook.sheet_by_gid(gid) {
            if seen.insert(sheet.gid) {
                sheets.push(sheet);
            }
        }
    }

    if sheets.is_empty() {
        warn!("no customer tabs matched by name, scanning all tabs for the id marker");
        for sheet in &workbook.sheets {
            if has_id_marker(sheet, schema.id_marker()) && seen.insert(sheet.gid) {
                sheets.push(sheet);
            }
        }
    }

    sheets
}

/// Build the reconciled customer list, sorted by id.
pub fn reconcile_customers(
    workbook: &Workbook,
    schema: &SheetSchema,
    document_id: &str,
    target_gid: Option<u32>,
) -> Vec<Customer> {
    let sheets = record_sheets(workbook, schema, target_gid);
    debug!(
        "reconciling customers from tabs: {:?}",
        sheets.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
    );

    let mut customers: BTreeMap<String, Customer> = BTreeMap::new();

    for sheet in sheets {
        if sheet.row_count() <= 1 {
            continue;
        }

        let probe = probe_headers(sheet, schema.id_marker());
        let col_id = find_column(&probe.headers, &schema.id_columns);
        let col_id2 = find_column(&probe.headers, &schema.secondary_id_columns);
        let col_name = find_column(&probe.headers, &schema.name_columns);
        let col_status = find_column(&probe.headers, &schema.status_columns);
        debug!(
            "[{}] id:{:?} id2:{:?} name:{:?} status:{:?}",
            sheet.name, col_id, col_id2, col_name, col_status
        );

        if col_id.is_none() && col_id2.is_none() {
            continue;
        }

        for (idx, row) in sheet.rows().iter().enumerate().skip(probe.data_start) {
            let Some(id) = row_id(row, col_id, col_id2, schema) else {
                continue;
            };

            let status = col_status
                .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
                .unwrap_or_default();

            match customers.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    let name = col_name
                        .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "(unnamed)".to_string());
                    slot.insert(Customer {
                        id,
                        name,
                        link: row_link(document_id, sheet.gid, idx + 1),
                        status,
                        date: String::new(),
                    });
                }
                Entry::Occupied(mut slot) => {
                    // A later tab may know the outcome the first one
                    // did not.
                    let existing = slot.get_mut();
                    if existing.status.is_empty() && !status.is_empty() {
                        existing.status = status;
                    }
                }
            }
        }
    }

    if customers.is_empty() {
        warn!("customer reconciliation produced no records for document {document_id}");
    }

    customers.into_values().collect()
}

/// Build the payment customer list from the payment ledger: bottom-up so
/// the newest contract for an id wins, deduplicated, newest first.
pub fn reconcile_payment_customers(
    workbook: &Workbook,
    schema: &SheetSchema,
    document_id: &str,
) -> Vec<PaymentCustomer> {
    let Some(sheet) = find_sheet(workbook, &schema.payment_sheet) else {
        warn!("payment ledger tab not found in document {document_id}");
        return Vec::new();
    };

    let probe = probe_headers(sheet, schema.id_marker());
    let col_id = find_column(&probe.headers, &schema.id_columns);
    let col_id2 = find_column(&probe.headers, &schema.secondary_id_columns);
    let col_name = find_column(&probe.headers, &schema.contract_name_columns);

    if (col_id.is_none() && col_id2.is_none()) || col_name.is_none() {
        return Vec::new();
    }

    let mut customers = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    for idx in (probe.data_start..sheet.row_count()).rev() {
        let row = sheet.row(idx);
        let Some(id) = row_id(row, col_id, col_id2, schema) else {
            continue;
        };
        if !processed.insert(id.clone()) {
            continue;
        }

        let name = col_name
            .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "(unnamed)".to_string());

        customers.push(PaymentCustomer {
            id,
            customer_name: name,
            link: row_link(document_id, sheet.gid, idx + 1),
        });
    }

    customers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::workbook::Cell;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn schema() -> SheetSchema {
        SheetSchema::default()
    }

    fn customer_sheet(name: &str, gid: u32, rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet::from_rows(name, gid, rows)
    }

    #[test]
    fn first_tab_wins_and_status_enriches() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Customer List",
            0,
            vec![
                text_row(&["Interview ID", "Name", "Result"]),
                text_row(&["A-2", "South Co", ""]),
                text_row(&["A-1", "North Co", "won"]),
            ],
        ));
        wb.push(customer_sheet(
            "Interview Log",
            1,
            vec![
                text_row(&["Interview ID", "Name", "Result"]),
                text_row(&["A-2", "South Company Ltd", "lost"]),
            ],
        ));

        let customers = reconcile_customers(&wb, &schema(), "doc-1", None);
        assert_eq!(customers.len(), 2);

        // Sorted by id.
        assert_eq!(customers[0].id, "A-1");
        assert_eq!(customers[1].id, "A-2");

        // First sighting keeps its name; blank status was enriched.
        assert_eq!(customers[1].name, "South Co");
        assert_eq!(customers[1].status, "lost");
        assert_eq!(customers[1].link, "sheets://doc-1/0?row=2");
    }

    #[test]
    fn banner_rows_and_header_echoes_are_skipped() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Customer List",
            0,
            vec![
                text_row(&["Q2 export", "", ""]),
                text_row(&["Interview ID", "Name", "Result"]),
                text_row(&["A-1", "North Co", "won"]),
                text_row(&["Interview ID", "Name", "Result"]),
                text_row(&["", "", ""]),
            ],
        ));

        let customers = reconcile_customers(&wb, &schema(), "doc-1", None);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].id, "A-1");
        // Row link is 1-based and accounts for the banner row.
        assert_eq!(customers[0].link, "sheets://doc-1/0?row=3");
    }

    #[test]
    fn secondary_id_fills_gaps() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Customer List",
            0,
            vec![
                text_row(&["Interview ID", "Customer ID", "Name"]),
                text_row(&["", "C-9", "Fallback Co"]),
            ],
        ));

        let customers = reconcile_customers(&wb, &schema(), "doc-1", None);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].id, "C-9");
    }

    #[test]
    fn marker_scan_finds_unnamed_tabs() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Totally Renamed",
            7,
            vec![
                text_row(&["Interview ID", "Name"]),
                text_row(&["A-3", "Hidden Co"]),
            ],
        ));

        let customers = reconcile_customers(&wb, &schema(), "doc-1", None);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].id, "A-3");
    }

    #[test]
    fn target_gid_adds_a_tab() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Customer List",
            0,
            vec![
                text_row(&["Interview ID", "Name"]),
                text_row(&["A-1", "North Co"]),
            ],
        ));
        wb.push(customer_sheet(
            "Archive",
            5,
            vec![
                text_row(&["Interview ID", "Name"]),
                text_row(&["A-4", "Old Co"]),
            ],
        ));

        let with_target = reconcile_customers(&wb, &schema(), "doc-1", Some(5));
        assert_eq!(with_target.len(), 2);

        let without = reconcile_customers(&wb, &schema(), "doc-1", None);
        assert_eq!(without.len(), 1);
    }

    #[test]
    fn empty_reconciliation_is_an_empty_list() {
        let wb = Workbook::new();
        assert!(reconcile_customers(&wb, &schema(), "doc-1", None).is_empty());
    }

    #[test]
    fn payment_customers_dedupe_newest_first() {
        let mut wb = Workbook::new();
        wb.push(customer_sheet(
            "Payment Ledger",
            2,
            vec![
                text_row(&["Interview ID", "Contract Name"]),
                text_row(&["A-1", "North, first deal"]),
                text_row(&["A-2", "South deal"]),
                text_row(&["A-1", "North, renewal"]),
            ],
        ));

        let customers = reconcile_payment_customers(&wb, &schema(), "doc-1");
        assert_eq!(customers.len(), 2);
        // Bottom-up: the renewal row represents A-1.
        assert_eq!(customers[0].id, "A-1");
        assert_eq!(customers[0].customer_name, "North, renewal");
        assert_eq!(customers[0].link, "sheets://doc-1/2?row=4");
        assert_eq!(customers[1].id, "A-2");
    }

    #[test]
    fn missing_ledger_means_empty_payment_list() {
        let wb = Workbook::new();
        assert!(reconcile_payment_customers(&wb, &schema(), "doc-1").is_empty());
    }
}
