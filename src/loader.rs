//! 入力Excelの読み込み
//!
//! 先頭シートの1行目をヘッダーとして `Table` に変換する。
//! 空のヘッダーセルは `Unnamed: <列番号>` になる。

use crate::error::{BomError, Result};
use bom_common::{CellValue, Table};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub type Workbook = Sheets<BufReader<File>>;

pub fn open(path: &Path) -> Result<Workbook> {
    if !path.exists() {
        return Err(BomError::FileNotFound(path.display().to_string()));
    }
    open_workbook_auto(path).map_err(|e| source_error(path, e))
}

/// 先頭シートを読み込む
pub fn read_table(path: &Path) -> Result<Table> {
    let range = first_sheet(path)?;
    let table = range_to_table(&range);
    tracing::debug!(
        file = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "入力読み込み"
    );
    Ok(table)
}

/// 先頭シートのヘッダー行だけを返す（種別判定用）
pub fn read_headers(path: &Path) -> Result<Vec<String>> {
    let range = first_sheet(path)?;
    Ok(headers(&range))
}

fn first_sheet(path: &Path) -> Result<Range<Data>> {
    let mut workbook = open(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| BomError::SourceRead {
            path: path.display().to_string(),
            message: "シートがありません".into(),
        })?;

    workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| source_error(path, e))
}

fn source_error(path: &Path, err: impl std::fmt::Display) -> BomError {
    BomError::SourceRead {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// 1行目（シートの絶対座標で0行目）をヘッダーにする
pub fn range_to_table(range: &Range<Data>) -> Table {
    let columns = headers(range);
    let Some((end_row, _)) = range.end() else {
        return Table::new(columns);
    };

    let rows: Vec<Vec<CellValue>> = (1..=end_row)
        .map(|r| {
            (0..columns.len() as u32)
                .map(|c| range.get_value((r, c)).map(data_to_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    Table::from_rows(columns, rows)
}

/// ヘッダー行（空セルは `Unnamed: <列番号>`）
pub fn headers(range: &Range<Data>) -> Vec<String> {
    let Some((_, end_col)) = range.end() else {
        return Vec::new();
    };

    (0..=end_col)
        .map(|c| {
            let name = range
                .get_value((0, c))
                .map(|d| data_to_cell(d).to_text().trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                format!("Unnamed: {}", c)
            } else {
                name
            }
        })
        .collect()
}

/// calamineのセル値を変換（エラー値は空白扱い）
pub fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}
