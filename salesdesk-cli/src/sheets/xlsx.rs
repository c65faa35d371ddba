//! xlsx load/save for the workbook model
//!
//! Reads every sheet of a document through calamine, preserving sheet
//! order (the tab's position becomes its gid). Saves rewrite the whole
//! document through rust_xlsxwriter; writes go through the single-writer
//! gateway, so a full rewrite keeps the store conflict-free.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};

use super::workbook::{Cell, Sheet, Workbook};

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

/// Load a whole document from an xlsx file.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut source: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let names = source.sheet_names().to_vec();
    let mut workbook = Workbook::new();

    for (gid, name) in names.iter().enumerate() {
        let range = source
            .worksheet_range(name)
            .with_context(|| format!("Failed to read sheet: {name}"))?;

        // calamine ranges start at the first used cell; pad leading empty
        // rows/columns back in so grid positions stay absolute.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
        for source_row in range.rows() {
            let mut row = vec![Cell::Empty; start_col as usize];
            row.extend(source_row.iter().map(convert_cell));
            rows.push(row);
        }

        workbook.push(Sheet::from_rows(name.clone(), gid as u32, rows));
    }

    Ok(workbook)
}

/// Save a whole document to an xlsx file.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut out = rust_xlsxwriter::Workbook::new();

    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .with_context(|| format!("Invalid sheet name: {}", sheet.name))?;

        for (row_idx, row) in sheet.rows().iter().enumerate() {
            let row_num = row_idx as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                let col_num = col_idx as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col_num, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row_num, col_num, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col_num, *b)?;
                    }
                    Cell::DateTime(dt) => {
                        worksheet.write_string(
                            row_num,
                            col_num,
                            &dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                        )?;
                    }
                }
            }
        }
    }

    out.save(path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;

    Ok(())
}
