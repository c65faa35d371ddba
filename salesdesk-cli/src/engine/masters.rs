//! Master data: plans and dropdown values
//!
//! Both live in the shared master document. Plans come from a proper
//! table; the dropdown masters are a single column some admin appends to.

use log::warn;

use crate::api::models::Plan;
use crate::sheets::resolve::find_sheet;
use crate::sheets::values::{is_truthy, parse_amount};
use crate::sheets::workbook::Workbook;

use super::schema::SheetSchema;

mod plan_cols {
    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const PRICE_GENERAL: usize = 2;
    pub const PRICE_BANK: usize = 3;
    pub const ACTIVE: usize = 5;
    pub const INSTALLMENT: usize = 6;
}

/// Dropdown values sit in column B, under a header row.
const DROPDOWN_COL: usize = 1;

/// Active plans from the plan master, in sheet order.
pub fn plan_list(workbook: &Workbook, schema: &SheetSchema) -> Vec<Plan> {
    let Some(sheet) = find_sheet(workbook, &schema.plan_sheet) else {
        warn!("plan master tab not found");
        return Vec::new();
    };

    let mut plans = Vec::new();
    for row in sheet.rows().iter().skip(1) {
        let active = row.get(plan_cols::ACTIVE).map(is_truthy).unwrap_or(false);
        if !active {
            continue;
        }
        let id = row
            .get(plan_cols::ID)
            .map(|c| c.as_text())
            .unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        plans.push(Plan {
            id,
            name: row
                .get(plan_cols::NAME)
                .map(|c| c.as_text())
                .unwrap_or_default(),
            price_general: row
                .get(plan_cols::PRICE_GENERAL)
                .map(parse_amount)
                .unwrap_or(0.0),
            price_bank: row
                .get(plan_cols::PRICE_BANK)
                .map(parse_amount)
                .unwrap_or(0.0),
            is_installment: row
                .get(plan_cols::INSTALLMENT)
                .map(is_truthy)
                .unwrap_or(false),
        });
    }
    plans
}

/// Payment method dropdown values, first matching master tab wins.
pub fn payment_methods(workbook: &Workbook, schema: &SheetSchema) -> Vec<String> {
    let Some(sheet) = schema
        .dropdown_sheets
        .iter()
        .find_map(|name| find_sheet(workbook, name))
    else {
        warn!("no dropdown master tab found");
        return Vec::new();
    };

    sheet
        .rows()
        .iter()
        .skip(1)
        .filter_map(|row| {
            let value = row.get(DROPDOWN_COL).map(|c| c.as_text())?;
            if value.is_empty() { None } else { Some(value) }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::workbook::{Cell, Sheet};

    #[test]
    fn only_active_plans_survive() {
        let rows = vec![
            vec![
                Cell::from("id"),
                Cell::from("name"),
                Cell::from("general"),
                Cell::from("bank"),
                Cell::from("memo"),
                Cell::from("active"),
                Cell::from("installment"),
            ],
            vec![
                Cell::from("P1"),
                Cell::from("Standard"),
                Cell::Number(450_000.0),
                Cell::Number(430_000.0),
                Cell::Empty,
                Cell::Bool(true),
                Cell::Bool(false),
            ],
            vec![
                Cell::from("P2"),
                Cell::from("Retired"),
                Cell::Number(300_000.0),
                Cell::Number(300_000.0),
                Cell::Empty,
                Cell::Bool(false),
                Cell::Bool(false),
            ],
            vec![
                Cell::from("P3"),
                Cell::from("Premium"),
                Cell::from("¥1,200,000"),
                Cell::from("¥1,150,000"),
                Cell::Empty,
                Cell::from("TRUE"),
                Cell::from("TRUE"),
            ],
        ];
        let mut wb = Workbook::new();
        wb.push(Sheet::from_rows("plan_master", 0, rows));

        let plans = plan_list(&wb, &SheetSchema::default());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, "P1");
        assert_eq!(plans[0].price_general, 450_000.0);
        assert!(!plans[0].is_installment);
        assert_eq!(plans[1].id, "P3");
        assert_eq!(plans[1].price_general, 1_200_000.0);
        assert!(plans[1].is_installment);
    }

    #[test]
    fn dropdown_values_come_from_column_b() {
        let rows = vec![
            vec![Cell::from("group"), Cell::from("method")],
            vec![Cell::from("card"), Cell::from("Credit card")],
            vec![Cell::from("bank"), Cell::from("Bank transfer")],
            vec![Cell::from("misc"), Cell::Text("  ".into())],
        ];
        let mut wb = Workbook::new();
        wb.push(Sheet::from_rows("master_dropdown", 0, rows));

        let methods = payment_methods(&wb, &SheetSchema::default());
        assert_eq!(methods, vec!["Credit card".to_string(), "Bank transfer".to_string()]);
    }

    #[test]
    fn dropdown_falls_back_to_secondary_tab_name() {
        let rows = vec![
            vec![Cell::from("group"), Cell::from("method")],
            vec![Cell::from("cash"), Cell::from("Cash")],
        ];
        let mut wb = Workbook::new();
        wb.push(Sheet::from_rows("Dropdown", 0, rows));

        let methods = payment_methods(&wb, &SheetSchema::default());
        assert_eq!(methods, vec!["Cash".to_string()]);
    }

    #[test]
    fn missing_masters_are_empty() {
        let wb = Workbook::new();
        assert!(plan_list(&wb, &SheetSchema::default()).is_empty());
        assert!(payment_methods(&wb, &SheetSchema::default()).is_empty());
    }
}
