//! 全体表とグループビュー
//!
//! グループビューは全体表の行番号だけを持ち、値は常に全体表から引く。
//! Excel出力では各セルが全体シートの同じ行・列を指す数式になる。

use crate::types::{CellValue, Table};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// 全体シート名
pub const MASTER_SHEET_NAME: &str = "全体";

/// Excelのシート名上限
const MAX_SHEET_NAME_CHARS: usize = 31;

/// 正規化・列整形済みの全体表（共有・読み取り専用）
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTable {
    table: Arc<Table>,
}

impl MasterTable {
    pub fn new(table: Table) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.table.row(index)
    }

    /// 同じスナップショットを共有しているか
    #[cfg(test)]
    pub fn shares_snapshot(&self, other: &MasterTable) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }
}

impl Serialize for MasterTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.table.serialize(serializer)
    }
}

/// 全体シート上のセル位置（0始まり、1行目はヘッダー）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    /// 全体表の行番号（ヘッダー行はNone）
    pub fn master_index(&self) -> Option<usize> {
        (self.row as usize).checked_sub(1)
    }
}

/// グループ列ごとの並べ替え済みビュー
#[derive(Debug, Clone)]
pub struct GroupedView {
    column: String,
    sheet_name: String,
    indices: Vec<usize>,
    master: MasterTable,
}

impl GroupedView {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// 全体表の行番号（ビューの並び順）
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn master(&self) -> &MasterTable {
        &self.master
    }

    pub fn master_index(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    /// ビューの行を全体表から引く
    pub fn row(&self, position: usize) -> Option<&[CellValue]> {
        self.master_index(position).and_then(|i| self.master.row(i))
    }

    /// ビュー上のセル（データ行 `position`、列 `col`）が指す全体シートのセル
    pub fn cell_ref(&self, position: usize, col: usize, master_sheet: &str) -> Option<CellRef> {
        let index = self.master_index(position)?;
        if col >= self.master.columns().len() {
            return None;
        }
        Some(CellRef {
            sheet: master_sheet.to_string(),
            row: (index + 1) as u32,
            col: col as u16,
        })
    }
}

/// グループ列名からシート名を作る
pub fn sheet_name_for(column: &str) -> String {
    column
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | '?' | '*' | '[' | ']' | ':' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

/// グループ列ごとにビューを作る（全体表に無い列は作らない）
///
/// 各ビューはグループ列が空白でない行だけを持ち、
/// グループ列 → 残りのグループ列（宣言順）の順に並べる。
pub fn materialize(master: &MasterTable, grouping_columns: &[String]) -> Vec<GroupedView> {
    let table = master.table();

    let mut seen = HashSet::new();
    let present: Vec<(&str, usize)> = grouping_columns
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .filter_map(|c| table.column_index(c).map(|i| (c.as_str(), i)))
        .collect();

    present
        .iter()
        .map(|&(column, col_idx)| {
            let key_columns: Vec<usize> = std::iter::once(col_idx)
                .chain(
                    present
                        .iter()
                        .filter(|(other, _)| *other != column)
                        .map(|&(_, i)| i),
                )
                .collect();

            let mut indices: Vec<usize> = table
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, row)| !row[col_idx].is_blank())
                .map(|(i, _)| i)
                .collect();
            indices.sort_by(|&a, &b| compare_rows(table, a, b, &key_columns));

            tracing::debug!(column, rows = indices.len(), "グループビュー作成");

            GroupedView {
                column: column.to_string(),
                sheet_name: sheet_name_for(column),
                indices,
                master: master.clone(),
            }
        })
        .collect()
}

/// グループ列名でビューを引く
pub fn view_for<'a>(views: &'a [GroupedView], column: &str) -> Option<&'a GroupedView> {
    views.iter().find(|v| v.column() == column)
}

fn compare_rows(table: &Table, a: usize, b: usize, key_columns: &[usize]) -> Ordering {
    let (row_a, row_b) = (&table.rows()[a], &table.rows()[b]);
    key_columns
        .iter()
        .map(|&c| compare_values(&row_a[c], &row_b[c]))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// 数値として読める値は数値順で先、それ以外は文字列順
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    let (a, b) = (a.to_text(), b.to_text());
    match (parse_number(&a), parse_number(&b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
