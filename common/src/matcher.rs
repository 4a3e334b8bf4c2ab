//! WELD表 × 詳細表の照合
//!
//! WELD表の1行を空でない参照スロットごとに展開し、詳細表の `MATNO` と突き合わせる。
//! 詳細表のキー重複は先頭行を採用する。

use crate::error::{Error, Result};
use crate::schema::{detect_detail, detect_weld, DetailSchema, WeldSchema, DETAIL_KEY_COLUMN};
use crate::types::{CellValue, Table};
use std::collections::HashMap;

/// 照合結果の1レコード（列は `MatchOutcome::columns` の順）
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub values: Vec<CellValue>,
    pub matched: bool,
    /// 展開元のスロット番号（1始まり）
    pub slot: u8,
    /// 展開元のスロット値
    pub slot_value: String,
}

/// 照合結果
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub columns: Vec<String>,
    pub records: Vec<MatchedRecord>,
    pub matched_count: usize,
    pub missing_count: usize,
    /// 詳細表で重複していたキーの数
    pub duplicate_keys: usize,
}

impl MatchOutcome {
    /// 照合フラグを落として表にする
    pub fn into_table(self) -> Table {
        let rows = self.records.into_iter().map(|r| r.values).collect();
        Table::from_rows(self.columns, rows)
    }
}

/// 出力列の値の取り出し元
#[derive(Debug, Clone, Copy)]
enum ColumnSource {
    /// WELD表の列（同名の詳細列があれば照合時に上書き）
    Weld { weld: usize, detail: Option<usize> },
    Detail(usize),
}

/// 列構成を判定してから照合する
///
/// 必須列が無い場合は照合を始めずに `Error::MissingColumn` を返す。
pub fn match_tables(weld: &Table, detail: &Table) -> Result<MatchOutcome> {
    let weld_schema = detect_weld(weld.columns()).ok_or_else(|| Error::MissingColumn {
        table: "WELD".to_string(),
        column: "WELD UNIQUE ID / MATNO1..MATNO6".to_string(),
    })?;
    let detail_schema = detect_detail(detail.columns()).ok_or_else(|| Error::MissingColumn {
        table: "detail".to_string(),
        column: DETAIL_KEY_COLUMN.to_string(),
    })?;

    Ok(match_with_schema(weld, &weld_schema, detail, &detail_schema))
}

pub fn match_with_schema(
    weld: &Table,
    weld_schema: &WeldSchema,
    detail: &Table,
    detail_schema: &DetailSchema,
) -> MatchOutcome {
    let (columns, sources) = merged_columns(weld, detail, detail_schema);

    // キー → 先頭行
    let mut index: HashMap<String, usize> = HashMap::with_capacity(detail.len());
    let mut duplicate_keys = 0;
    for (row_idx, row) in detail.rows().iter().enumerate() {
        let key = key_text(&row[detail_schema.key_index]);
        if key.is_empty() {
            continue;
        }
        if index.contains_key(&key) {
            duplicate_keys += 1;
        } else {
            index.insert(key, row_idx);
        }
    }
    if duplicate_keys > 0 {
        tracing::warn!(duplicate_keys, "詳細表に重複キーがあります（先頭行を採用）");
    }

    let mut outcome = MatchOutcome {
        columns,
        duplicate_keys,
        ..Default::default()
    };

    for weld_row in weld.rows() {
        for slot in &weld_schema.slot_columns {
            let raw = &weld_row[slot.index];
            let slot_value = key_text(raw);
            if slot_value.is_empty() {
                continue;
            }

            let detail_row = index.get(&slot_value).and_then(|&i| detail.row(i));
            let values = sources
                .iter()
                .map(|source| match (source, detail_row) {
                    (ColumnSource::Weld { detail: Some(d), .. }, Some(found)) => found[*d].clone(),
                    (ColumnSource::Weld { detail: Some(d), .. }, None)
                        if *d == detail_schema.key_index =>
                    {
                        raw.clone()
                    }
                    (ColumnSource::Weld { weld, .. }, _) => weld_row[*weld].clone(),
                    (ColumnSource::Detail(d), Some(found)) => found[*d].clone(),
                    (ColumnSource::Detail(d), None) if *d == detail_schema.key_index => raw.clone(),
                    (ColumnSource::Detail(_), None) => CellValue::Empty,
                })
                .collect();

            let matched = detail_row.is_some();
            if matched {
                outcome.matched_count += 1;
            } else {
                outcome.missing_count += 1;
            }
            outcome.records.push(MatchedRecord {
                values,
                matched,
                slot: slot.slot,
                slot_value,
            });
        }
    }

    tracing::debug!(
        weld_rows = weld.len(),
        detail_rows = detail.len(),
        matched = outcome.matched_count,
        missing = outcome.missing_count,
        "照合完了"
    );

    outcome
}

/// WELD列 + WELDに無い詳細列（同名列はWELD側の位置を保つ）
///
/// 詳細表のキー列は綴りに関わらず `MATNO` として出力する。
fn merged_columns(
    weld: &Table,
    detail: &Table,
    detail_schema: &DetailSchema,
) -> (Vec<String>, Vec<ColumnSource>) {
    let detail_names: Vec<&str> = detail
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == detail_schema.key_index {
                DETAIL_KEY_COLUMN
            } else {
                name.as_str()
            }
        })
        .collect();

    let mut columns: Vec<String> = Vec::with_capacity(weld.columns().len() + detail_names.len());
    let mut sources = Vec::with_capacity(columns.capacity());

    for (i, name) in weld.columns().iter().enumerate() {
        columns.push(name.clone());
        sources.push(ColumnSource::Weld {
            weld: i,
            detail: detail_names.iter().position(|d| d == name),
        });
    }
    for (i, name) in detail_names.iter().enumerate() {
        if columns.iter().any(|c| c == name) {
            continue;
        }
        columns.push(name.to_string());
        sources.push(ColumnSource::Detail(i));
    }

    (columns, sources)
}

fn key_text(value: &CellValue) -> String {
    value.to_text().trim().to_string()
}
