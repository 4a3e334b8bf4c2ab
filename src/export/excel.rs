//! Excel出力と読み戻し
//!
//! 出力は `weld_export_<YYYYmmdd_HHMMSS>.xlsx`。検証時は最新の出力を読み、
//! グループシートの数式参照を全体表へ解決してから `ViewRows` として渡す。

use crate::error::{BomError, Result};
use crate::export::reference::parse_reference;
use crate::loader::{self, data_to_cell};
use bom_common::export::excel_core::generate_workbook_buffer;
use bom_common::{GroupedView, MasterTable, ViewRows};
use calamine::{Data, Range, Reader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub const EXPORT_PREFIX: &str = "weld_export_";

/// 全体シート + グループシートを書き出す
pub fn write_export(
    master: &MasterTable,
    views: &[GroupedView],
    output_dir: &Path,
    master_sheet: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = output_dir.join(format!("{}{}.xlsx", EXPORT_PREFIX, timestamp));

    let buffer = generate_workbook_buffer(master, views, master_sheet)
        .map_err(|e| BomError::ExcelGeneration(e.to_string()))?;
    std::fs::write(&path, buffer)?;

    Ok(path)
}

fn is_export_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|name| name.starts_with(EXPORT_PREFIX) && name.ends_with(".xlsx"))
}

/// 出力フォルダ直下で更新日時が最新のエクスポート
pub fn latest_export(output_dir: &Path) -> Result<PathBuf> {
    let not_found = || BomError::ExportNotFound(output_dir.display().to_string());
    if !output_dir.is_dir() {
        return Err(not_found());
    }

    WalkDir::new(output_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_export_file(e.path()))
        .map(|e| {
            let modified = e
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, e.into_path())
        })
        .max()
        .map(|(_, path)| path)
        .ok_or_else(not_found)
}

/// 読み戻したグループシート（セルは全体表へ解決済み）
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSheet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExportSheet {
    pub fn new(name: String, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name, columns, rows }
    }
}

impl ViewRows for ExportSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, position: usize, column: &str) -> Option<String> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(position)?.get(col).cloned()
    }
}

/// 検証用に読み戻したエクスポート
#[derive(Debug, Clone)]
pub struct ExportedWorkbook {
    pub master: MasterTable,
    pub sheets: Vec<ExportSheet>,
    /// 参照を解決できずキャッシュ値を使ったセル数
    pub unresolved_cells: usize,
}

/// エクスポートを読み戻す
///
/// `master` が無ければエクスポート自身の全体シートを全体表として使う。
pub fn read_export(
    path: &Path,
    master: Option<MasterTable>,
    master_sheet: &str,
) -> Result<ExportedWorkbook> {
    let mut workbook = loader::open(path).map_err(|e| BomError::ExportRead(e.to_string()))?;
    let read_error = |e: calamine::Error| BomError::ExportRead(format!("{}: {}", path.display(), e));

    let sheet_names = workbook.sheet_names();
    if !sheet_names.iter().any(|s| s == master_sheet) {
        return Err(BomError::ExportRead(format!(
            "{}: 全体シート「{}」がありません",
            path.display(),
            master_sheet
        )));
    }

    let master_range = workbook.worksheet_range(master_sheet).map_err(read_error)?;
    let export_master = loader::range_to_table(&master_range);
    let master = master.unwrap_or_else(|| MasterTable::new(export_master.clone()));
    // エクスポートの全体シートの列番号 → 全体表の列番号
    let column_map: Vec<Option<usize>> = export_master
        .columns()
        .iter()
        .map(|name| master.table().column_index(name))
        .collect();

    let resolver = Resolver {
        master: &master,
        master_sheet,
        column_map: &column_map,
    };

    let mut sheets = Vec::new();
    let mut unresolved_cells = 0;
    for name in sheet_names.iter().filter(|s| s.as_str() != master_sheet) {
        let values = workbook.worksheet_range(name).map_err(read_error)?;
        let formulas = workbook.worksheet_formula(name).map_err(read_error)?;
        let (sheet, unresolved) = resolver.read_sheet(name, &values, &formulas);
        unresolved_cells += unresolved;
        sheets.push(sheet);
    }

    if unresolved_cells > 0 {
        tracing::warn!(cells = unresolved_cells, "参照を解決できないセルはキャッシュ値で検証");
    }

    Ok(ExportedWorkbook {
        master,
        sheets,
        unresolved_cells,
    })
}

struct Resolver<'a> {
    master: &'a MasterTable,
    master_sheet: &'a str,
    column_map: &'a [Option<usize>],
}

impl Resolver<'_> {
    fn read_sheet(
        &self,
        name: &str,
        values: &Range<Data>,
        formulas: &Range<String>,
    ) -> (ExportSheet, usize) {
        let columns = loader::headers(values);
        let end_row = [values.end(), formulas.end()]
            .into_iter()
            .flatten()
            .map(|(r, _)| r)
            .max()
            .unwrap_or(0);

        let mut unresolved = 0;
        let rows: Vec<Vec<String>> = (1..=end_row)
            .map(|r| {
                (0..columns.len() as u32)
                    .map(|c| {
                        let formula = formulas.get_value((r, c)).filter(|f| !f.is_empty());
                        match formula.and_then(|f| self.resolve(f)) {
                            Some(value) => value,
                            None => {
                                if formula.is_some() {
                                    unresolved += 1;
                                }
                                values
                                    .get_value((r, c))
                                    .map(|d| data_to_cell(d).to_text().into_owned())
                                    .unwrap_or_default()
                            }
                        }
                    })
                    .collect::<Vec<String>>()
            })
            .collect();

        (ExportSheet::new(name.to_string(), columns, rows), unresolved)
    }

    fn resolve(&self, formula: &str) -> Option<String> {
        let cell = parse_reference(formula)?;
        if cell.sheet != self.master_sheet {
            return None;
        }
        let col = (*self.column_map.get(cell.col as usize)?)?;
        let row = self.master.row(cell.master_index()?)?;
        Some(row[col].to_text().into_owned())
    }
}
