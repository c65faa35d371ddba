//! Sheet schema: where things live in the documents
//!
//! Tab names and header candidates for every view the engine assembles.
//! Candidate lists are ordered: earlier names are more specific and win.
//! All of it can be overridden from the `[schema]` section of the config
//! file, because every team's workbook drifts differently.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetSchema {
    /// Tabs that hold customer/interview records, in lookup order.
    pub customer_sheets: Vec<String>,
    /// The payment ledger tab (contracts + payment slots).
    pub payment_sheet: String,
    /// Plan master tab in the data master document.
    pub plan_sheet: String,
    /// Dropdown master tabs, in lookup order.
    pub dropdown_sheets: Vec<String>,
    /// Staff/PIN directory tab in the auth master document.
    pub auth_sheet: String,

    pub id_columns: Vec<String>,
    pub secondary_id_columns: Vec<String>,
    pub name_columns: Vec<String>,
    pub contract_name_columns: Vec<String>,
    pub status_columns: Vec<String>,
    pub contract_date_columns: Vec<String>,
    pub sale_amount_columns: Vec<String>,
    pub paid_amount_columns: Vec<String>,

    /// Statuses that take a contract out of the overdue computation
    /// (fuzzy-matched).
    pub excluded_statuses: Vec<String>,
}

impl SheetSchema {
    /// The marker header used to recognize record tabs and second-row
    /// headers.
    pub fn id_marker(&self) -> &str {
        self.id_columns.first().map(String::as_str).unwrap_or("ID")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self {
            customer_sheets: strings(&["Customer List", "Interview Log"]),
            payment_sheet: "Payment Ledger".to_string(),
            plan_sheet: "plan_master".to_string(),
            dropdown_sheets: strings(&["master_dropdown", "Dropdown"]),
            auth_sheet: "Staff Directory".to_string(),

            id_columns: strings(&["Interview ID", "ID"]),
            secondary_id_columns: strings(&["Customer ID", "CID"]),
            name_columns: strings(&["Nickname", "Name", "Full Name"]),
            contract_name_columns: strings(&["Contract Name", "Name"]),
            status_columns: strings(&["Result", "Status", "State", "Outcome"]),
            contract_date_columns: strings(&["Contract Date", "Date", "Signed Date"]),
            sale_amount_columns: strings(&["Gross Sales", "Sale Amount", "Contract Amount"]),
            paid_amount_columns: strings(&["Paid To Date", "Paid Amount", "Deposited"]),

            excluded_statuses: strings(&[
                "Cooling-off",
                "Cancelled before payment",
                "Rejected",
                "Cancelled",
                "Terminated before payment",
                "Declined before contract",
                "Not contracted",
                "Cancelled before interview",
            ]),
        }
    }
}
