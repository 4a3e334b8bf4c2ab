//! Excel生成（共通ライブラリ）
//!
//! 全体シートには値を書き、グループ列ごとのシートには
//! 全体シートの同じセルを指す数式（`='全体'!C5`）を書く。
//! 数式には全体シートの値をキャッシュ結果として付ける。

use crate::error::Result;
use crate::types::{format_float, CellValue};
use crate::view::{CellRef, GroupedView, MasterTable};
use rust_xlsxwriter::utility::row_col_to_cell;
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use std::collections::HashSet;

/// セル参照を数式文字列にする
pub fn formula_for(cell: &CellRef) -> String {
    format!(
        "='{}'!{}",
        cell.sheet.replace('\'', "''"),
        row_col_to_cell(cell.row, cell.col)
    )
}

/// 数値セルとして書ける文字列か（正規形の文字列に戻るものだけ）
///
/// `"007"` や桁あふれする整数は文字列のまま残す。
pub fn numeric_cell(text: &str) -> Option<f64> {
    let number = text.parse::<f64>().ok()?;
    (number.is_finite() && format_float(number) == text).then_some(number)
}

/// 全体シート + グループシートのExcelをバッファに生成
pub fn generate_workbook_buffer(
    master: &MasterTable,
    views: &[GroupedView],
    master_sheet: &str,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(master_sheet)?;
    write_header(sheet, master.columns(), &header_format)?;
    for (r, row) in master.table().rows().iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            write_value(sheet, (r + 1) as u32, c as u16, value)?;
        }
    }

    let mut sheet_names: HashSet<&str> = HashSet::new();
    sheet_names.insert(master_sheet);

    for view in views {
        if !sheet_names.insert(view.sheet_name()) {
            tracing::warn!(sheet = view.sheet_name(), "シート名が重複するためスキップ");
            continue;
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(view.sheet_name())?;
        write_header(sheet, master.columns(), &header_format)?;

        for position in 0..view.len() {
            let Some(row) = view.row(position) else {
                continue;
            };
            for (c, value) in row.iter().enumerate() {
                let Some(cell) = view.cell_ref(position, c, master_sheet) else {
                    continue;
                };
                let formula = Formula::new(formula_for(&cell)).set_result(value.to_text());
                sheet.write_formula((position + 1) as u32, c as u16, formula)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_header(sheet: &mut Worksheet, columns: &[String], format: &Format) -> Result<()> {
    for (c, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name, format)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        CellValue::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        other => {
            let text = other.to_text();
            if let Some(number) = numeric_cell(&text) {
                sheet.write_number(row, col, number)?;
            } else if !text.is_empty() {
                sheet.write_string(row, col, &*text)?;
            }
        }
    }
    Ok(())
}
