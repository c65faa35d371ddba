//! Overdue payment alerts
//!
//! A ledger row is overdue when its sale amount exceeds what has been
//! paid, unless the customer's current status says the contract is off
//! (cancellations, rejections). Every ledger row is its own contract,
//! so there is no dedupe here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

use crate::api::models::OverdueEntry;
use crate::sheets::resolve::{find_column, find_sheet, matches_any, probe_headers};
use crate::sheets::values::{parse_amount, parse_date};
use crate::sheets::workbook::{Cell, Workbook};

use super::schema::SheetSchema;

const UNKNOWN_DATE: &str = "----/--/--";

/// Compute the overdue list. `statuses` is the id → current status map
/// from the reconciled customer view; `now` is injected for testability.
pub fn overdue_entries(
    workbook: &Workbook,
    schema: &SheetSchema,
    statuses: &HashMap<String, String>,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<OverdueEntry> {
    let Some(sheet) = find_sheet(workbook, &schema.payment_sheet) else {
        warn!("payment ledger tab not found, no overdue entries");
        return Vec::new();
    };
    if sheet.row_count() <= 1 {
        return Vec::new();
    }

    let probe = probe_headers(sheet, schema.id_marker());
    let col_id = find_column(&probe.headers, &schema.id_columns);
    let col_id2 = find_column(&probe.headers, &schema.secondary_id_columns);
    let col_name = find_column(&probe.headers, &schema.contract_name_columns);
    let col_date = find_column(&probe.headers, &schema.contract_date_columns);
    let col_amount = find_column(&probe.headers, &schema.sale_amount_columns);
    let col_paid = find_column(&probe.headers, &schema.paid_amount_columns);
    debug!(
        "overdue columns id:{col_id:?} name:{col_name:?} date:{col_date:?} amount:{col_amount:?} paid:{col_paid:?}"
    );

    if col_id.is_none() && col_id2.is_none() {
        return Vec::new();
    }

    let today = now.with_timezone(&tz).date_naive();
    let mut overdue = Vec::new();

    for idx in (probe.data_start..sheet.row_count()).rev() {
        let row = sheet.row(idx);

        let mut id = col_id
            .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
            .unwrap_or_default();
        if id.is_empty() {
            if let Some(c) = col_id2 {
                id = row.get(c).map(|v| v.as_text()).unwrap_or_default();
            }
        }
        if id.is_empty()
            || matches_any(&id, &schema.id_columns)
            || matches_any(&id, &schema.secondary_id_columns)
        {
            continue;
        }

        // Contracts that were called off never become overdue.
        let status = statuses.get(&id).map(String::as_str).unwrap_or("");
        if matches_any(status, &schema.excluded_statuses) {
            continue;
        }

        let amount = col_amount
            .and_then(|c| row.get(c))
            .map(parse_amount)
            .unwrap_or(0.0);
        let paid = col_paid
            .and_then(|c| row.get(c))
            .map(parse_amount)
            .unwrap_or(0.0);
        if amount <= paid {
            continue;
        }

        let date_cell = col_date
            .and_then(|c| row.get(c))
            .cloned()
            .unwrap_or(Cell::Empty);

        let (contract_date, overdue_days) = if date_cell.is_empty() {
            // No date recorded yet: flag it, but with zero days elapsed.
            (UNKNOWN_DATE.to_string(), 0)
        } else {
            match parse_date(&date_cell) {
                Some(date) => {
                    let days = (today - date).num_days().max(0);
                    (date.format("%Y/%m/%d").to_string(), days)
                }
                // A date that cannot be read cannot be aged fairly.
                None => continue,
            }
        };

        let name = col_name
            .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "(unnamed)".to_string());

        overdue.push(OverdueEntry {
            id,
            customer_name: name,
            contract_date,
            overdue_days,
            unpaid_amount: amount - paid,
        });
    }

    // Freshest trouble first.
    overdue.sort_by_key(|e| e.overdue_days);
    overdue
}
