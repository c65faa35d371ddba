//! Idempotent writes into the payment ledger
//!
//! Contract reports upsert by interview id; payment reports append into
//! the customer's next free payment slot. Cells are written individually,
//! never as whole-row blasts, so untouched cells keep their data-validation
//! rules and whatever the admins put there.

use crate::api::models::{PaymentForm, ReportForm};
use crate::sheets::workbook::{Cell, Sheet};

/// Ledger writes never touch the first two rows (banner + header).
const LEDGER_HEADER_ROWS: usize = 2;

/// Fixed ledger columns (0-based). The ledger's left block is a fixed
/// layout maintained by the admins, unlike the fuzzily-resolved read side.
mod ledger_cols {
    pub const INTERVIEW_ID: usize = 0;
    pub const CONTRACT_NAME: usize = 1;
    pub const ONBOARDING: usize = 2;
    pub const PAYMENT_METHOD: usize = 3;
    pub const CONTRACT_DATE: usize = 4;
    pub const SALE_AMOUNT: usize = 9;
    pub const NOTES: usize = 11;
}

/// Payment slots: 4-column groups starting at column M, 12 slots per row.
const SLOT_START: usize = 12;
const SLOT_STRIDE: usize = 4;
const SLOT_COUNT: usize = 12;

const ONBOARDING_MARK: &str = "yes";

/// Upsert a contract report. Returns the 0-based row written.
pub fn upsert_report(sheet: &mut Sheet, form: &ReportForm) -> usize {
    let row = match sheet.find_in_column(ledger_cols::INTERVIEW_ID, &form.interview_id) {
        Some(existing) => existing,
        None => sheet
            .first_empty_in_column(ledger_cols::INTERVIEW_ID, LEDGER_HEADER_ROWS)
            .unwrap_or_else(|| sheet.row_count()),
    }
    // Never land on the header rows, even on a malformed ledger.
    .max(LEDGER_HEADER_ROWS);

    sheet.set_cell(
        row,
        ledger_cols::INTERVIEW_ID,
        Cell::Text(form.interview_id.trim().to_string()),
    );
    sheet.set_cell(
        row,
        ledger_cols::CONTRACT_NAME,
        Cell::Text(form.contract_name.clone()),
    );
    if form.onboarding {
        sheet.set_cell(row, ledger_cols::ONBOARDING, Cell::Text(ONBOARDING_MARK.into()));
    }
    sheet.set_cell(
        row,
        ledger_cols::PAYMENT_METHOD,
        Cell::Text(form.payment_method.clone()),
    );
    sheet.set_cell(
        row,
        ledger_cols::CONTRACT_DATE,
        Cell::Text(form.contract_date.clone()),
    );
    sheet.set_cell(row, ledger_cols::SALE_AMOUNT, Cell::Number(form.sales_amount));
    if let Some(notes) = form.notes.as_deref() {
        let notes = notes.trim();
        if !notes.is_empty() {
            sheet.set_cell(row, ledger_cols::NOTES, Cell::Text(notes.to_string()));
        }
    }

    row
}

/// Why a payment could not be appended.
#[derive(Debug, PartialEq, Eq)]
pub enum PaymentError {
    UnknownCustomer,
    SlotsFull,
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::UnknownCustomer => {
                write!(f, "Customer (interview id) not found in the payment ledger.")
            }
            PaymentError::SlotsFull => {
                write!(f, "All payment slots are taken. Ask an administrator to extend the row.")
            }
        }
    }
}

/// Append a payment into the first free slot of the customer's row.
/// Returns the 0-based (row, slot) written.
pub fn append_payment(
    sheet: &mut Sheet,
    form: &PaymentForm,
) -> Result<(usize, usize), PaymentError> {
    let row = sheet
        .find_in_column(ledger_cols::INTERVIEW_ID, &form.customer_id)
        .ok_or(PaymentError::UnknownCustomer)?;

    for slot in 0..SLOT_COUNT {
        let col = SLOT_START + slot * SLOT_STRIDE;
        if sheet.cell(row, col).is_empty() {
            sheet.set_cell(row, col, Cell::Text(form.payment_date.clone()));
            sheet.set_cell(row, col + 1, Cell::Number(form.payment_amount));
            sheet.set_cell(row, col + 2, Cell::Text(form.payment_method.clone()));
            return Ok((row, slot));
        }
    }
    Err(PaymentError::SlotsFull)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(interview_id: &str) -> ReportForm {
        ReportForm {
            document_id: "doc-1".into(),
            interview_id: interview_id.into(),
            contract_name: "North Trading".into(),
            onboarding: false,
            payment_method: "Bank transfer".into(),
            contract_date: "2026/01/15".into(),
            sales_amount: 450_000.0,
            notes: None,
        }
    }

    fn payment(customer_id: &str) -> PaymentForm {
        PaymentForm {
            document_id: "doc-1".into(),
            customer_id: customer_id.into(),
            payment_date: "2026/02/01".into(),
            payment_amount: 100_000.0,
            payment_method: "Bank transfer".into(),
        }
    }

    fn ledger_with_rows(ids: &[&str]) -> Sheet {
        let mut sheet = Sheet::new("Payment Ledger", 0);
        sheet.set_cell(0, 0, Cell::from("Ledger"));
        sheet.set_cell(1, 0, Cell::from("Interview ID"));
        for (i, id) in ids.iter().enumerate() {
            sheet.set_cell(2 + i, 0, Cell::from(*id));
        }
        sheet
    }

    #[test]
    fn new_report_takes_first_gap_after_headers() {
        let mut sheet = ledger_with_rows(&["A-1", "", "A-3"]);
        let row = upsert_report(&mut sheet, &report("A-9"));
        assert_eq!(row, 3);
        assert_eq!(sheet.cell(3, 0).as_text(), "A-9");
        assert_eq!(sheet.cell(3, 9), &Cell::Number(450_000.0));
        // Onboarding off leaves the mark cell untouched.
        assert!(sheet.cell(3, 2).is_empty());
    }

    #[test]
    fn resubmitting_overwrites_the_same_row() {
        let mut sheet = ledger_with_rows(&["A-1", "A-2"]);
        let first = upsert_report(&mut sheet, &report("A-2"));

        let mut updated = report("A-2");
        updated.sales_amount = 999_000.0;
        updated.onboarding = true;
        let second = upsert_report(&mut sheet, &updated);

        assert_eq!(first, second);
        assert_eq!(second, 3);
        assert_eq!(sheet.cell(3, 9), &Cell::Number(999_000.0));
        assert_eq!(sheet.cell(3, 2).as_text(), "yes");
    }

    #[test]
    fn full_ledger_appends_at_the_end() {
        let mut sheet = ledger_with_rows(&["A-1", "A-2", "A-3"]);
        let row = upsert_report(&mut sheet, &report("A-9"));
        assert_eq!(row, 5);
    }

    #[test]
    fn writes_never_land_on_header_rows() {
        // Malformed ledger: completely empty.
        let mut sheet = Sheet::new("Payment Ledger", 0);
        let row = upsert_report(&mut sheet, &report("A-1"));
        assert_eq!(row, 2);
    }

    #[test]
    fn notes_are_trimmed_and_optional() {
        let mut sheet = ledger_with_rows(&[]);
        let mut form = report("A-1");
        form.notes = Some("  follow up in March  ".into());
        let row = upsert_report(&mut sheet, &form);
        assert_eq!(sheet.cell(row, 11).as_text(), "follow up in March");

        let mut form2 = report("A-2");
        form2.notes = Some("   ".into());
        let row2 = upsert_report(&mut sheet, &form2);
        assert!(sheet.cell(row2, 11).is_empty());
    }

    #[test]
    fn payment_goes_into_first_free_slot() {
        let mut sheet = ledger_with_rows(&["A-1"]);
        let (row, slot) = append_payment(&mut sheet, &payment("A-1")).unwrap();
        assert_eq!((row, slot), (2, 0));
        assert_eq!(sheet.cell(2, 12).as_text(), "2026/02/01");
        assert_eq!(sheet.cell(2, 13), &Cell::Number(100_000.0));
        assert_eq!(sheet.cell(2, 14).as_text(), "Bank transfer");

        // Second payment lands one slot over.
        let (_, slot2) = append_payment(&mut sheet, &payment("A-1")).unwrap();
        assert_eq!(slot2, 1);
        assert_eq!(sheet.cell(2, 16).as_text(), "2026/02/01");
    }

    #[test]
    fn unknown_customer_is_rejected() {
        let mut sheet = ledger_with_rows(&["A-1"]);
        assert_eq!(
            append_payment(&mut sheet, &payment("A-404")),
            Err(PaymentError::UnknownCustomer)
        );
    }

    #[test]
    fn thirteenth_payment_is_rejected() {
        let mut sheet = ledger_with_rows(&["A-1"]);
        for _ in 0..12 {
            append_payment(&mut sheet, &payment("A-1")).unwrap();
        }
        assert_eq!(
            append_payment(&mut sheet, &payment("A-1")),
            Err(PaymentError::SlotsFull)
        );
    }
}
