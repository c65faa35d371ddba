//! PIN authentication against the staff directory
//!
//! The directory is a fixed-shape tab in the auth master document:
//! column A staff name, column B an optional document URL, column C the
//! document id, column E the 4-digit PIN. Admins fill in whichever of
//! B/C they have handy, so the id falls back to parsing the URL.

use log::warn;

use crate::api::models::AuthResult;
use crate::sheets::resolve::find_sheet;
use crate::sheets::workbook::{Sheet, Workbook};

use super::schema::SheetSchema;

mod auth_cols {
    pub const STAFF_NAME: usize = 0;
    pub const DOCUMENT_URL: usize = 1;
    pub const DOCUMENT_ID: usize = 2;
    pub const PIN: usize = 4;
}

/// Pull a document id out of a sharing URL (`…/d/<id>/edit…`).
pub fn document_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/d/")?;
    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    if id.is_empty() { None } else { Some(id) }
}

fn row_document_id(row: &[crate::sheets::workbook::Cell]) -> Option<String> {
    let direct = row
        .get(auth_cols::DOCUMENT_ID)
        .map(|c| c.as_text())
        .unwrap_or_default();
    if !direct.is_empty() {
        return Some(direct);
    }
    let url = row
        .get(auth_cols::DOCUMENT_URL)
        .map(|c| c.as_text())
        .unwrap_or_default();
    document_id_from_url(&url)
}

fn directory<'a>(workbook: &'a Workbook, schema: &SheetSchema) -> Option<&'a Sheet> {
    let sheet = find_sheet(workbook, &schema.auth_sheet);
    if sheet.is_none() {
        warn!("staff directory tab not found");
    }
    sheet
}

/// Look up a PIN. `None` means no match; callers turn that into the
/// deliberately terse `PIN mismatch` envelope failure.
pub fn authenticate(workbook: &Workbook, schema: &SheetSchema, pin: &str) -> Option<AuthResult> {
    let sheet = directory(workbook, schema)?;
    let pin = pin.trim();
    if pin.is_empty() {
        return None;
    }

    for row in sheet.rows().iter().skip(1) {
        let row_pin = row
            .get(auth_cols::PIN)
            .map(|c| c.as_text())
            .unwrap_or_default();
        if row_pin != pin {
            continue;
        }
        let staff_name = row
            .get(auth_cols::STAFF_NAME)
            .map(|c| c.as_text())
            .unwrap_or_default();
        let document_id = row_document_id(row).unwrap_or_default();
        return Some(AuthResult {
            staff_name,
            document_id,
        });
    }
    None
}

/// Reverse lookup: which staff member owns this document.
pub fn staff_for_document(
    workbook: &Workbook,
    schema: &SheetSchema,
    document_id: &str,
) -> Option<String> {
    let sheet = directory(workbook, schema)?;
    for row in sheet.rows().iter().skip(1) {
        if row_document_id(row).as_deref() == Some(document_id) {
            return row.get(auth_cols::STAFF_NAME).map(|c| c.as_text());
        }
    }
    None
}
