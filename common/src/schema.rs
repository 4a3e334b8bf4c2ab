//! 列構成の定義と入力表の種別判定
//!
//! WELD表: 「WELD」と「UNIQUE」を含むID列 + 番号付きMATNO列（2列以上）
//! 詳細表: `MATNO` 列（大文字小文字は区別しない）

use serde::{Deserialize, Serialize};

/// WELD表のID列名（既定）
pub const WELD_ID_COLUMN: &str = "WELD UNIQUE ID";

/// 詳細表のキー列名
pub const DETAIL_KEY_COLUMN: &str = "MATNO";

/// 参照スロット数（MATNO1..MATNO6）
pub const MAX_SLOTS: u8 = 6;

/// グループシートを作る列（宣言順が並べ替えの優先順）
pub const DEFAULT_GROUPING_COLUMNS: &[&str] = &["MATNO", "STEEL NO", "NESTING DWG", "Grade", "T"];

/// 出力列の優先順
pub const DEFAULT_COLUMN_ORDER: &[&str] = &[
    "WELD UNIQUE ID", "BLOCK", "FILENAME", "DWG. Title", "MOD. NO", "DETAIL VIEW",
    "MATNO", "STEEL NO", "NESTING DWG", "Grade",
    "OFF", "WLEG", "WELD. LENG.", "SIDE", "WNO", "P. NO",
    "ea", "total", "T", "B", "L(OD)", "WEIGHT", "MIX", "no",
    "TPYE", "WORKSCOPE", "REV1",
];

/// 出力から除外する列（参照スロット・照合フラグ・MOD補助列）
pub const DEFAULT_EXCLUDE_COLUMNS: &[&str] = &[
    "MATNO1", "MATNO2", "MATNO3", "MATNO4", "MATNO5", "MATNO6", "MOD", "_matched",
];

/// 検証で常に比較する数値列
pub const DEFAULT_COMPARE_FIELDS: &[&str] = &["WEIGHT", "T", "B"];

pub fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// 参照スロット列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotColumn {
    /// スロット番号（1始まり）
    pub slot: u8,
    pub name: String,
    /// 表内の列位置
    pub index: usize,
}

/// WELD表の列構成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeldSchema {
    pub id_column: String,
    /// スロット番号順
    pub slot_columns: Vec<SlotColumn>,
}

/// 詳細表の列構成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSchema {
    pub key_column: String,
    pub key_index: usize,
}

/// 入力表の判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Weld(WeldSchema),
    Detail(DetailSchema),
    Undetermined,
}

/// ヘッダー行から表の種別を判定（WELD判定を優先）
pub fn detect_schema(headers: &[String]) -> SchemaKind {
    if let Some(weld) = detect_weld(headers) {
        return SchemaKind::Weld(weld);
    }
    if let Some(detail) = detect_detail(headers) {
        return SchemaKind::Detail(detail);
    }
    SchemaKind::Undetermined
}

pub fn detect_weld(headers: &[String]) -> Option<WeldSchema> {
    let id_column = headers.iter().find(|h| {
        let upper = h.to_uppercase();
        upper.contains("WELD") && upper.contains("UNIQUE")
    })?;

    let mut slot_columns: Vec<SlotColumn> = headers
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            slot_number(name).map(|slot| SlotColumn {
                slot,
                name: name.clone(),
                index,
            })
        })
        .collect();

    if slot_columns.len() < 2 {
        return None;
    }

    // 同じ番号が重複した場合は先頭列を採用
    slot_columns.sort_by_key(|s| (s.slot, s.index));
    slot_columns.dedup_by_key(|s| s.slot);

    Some(WeldSchema {
        id_column: id_column.clone(),
        slot_columns,
    })
}

pub fn detect_detail(headers: &[String]) -> Option<DetailSchema> {
    headers
        .iter()
        .position(|h| h.trim().to_uppercase() == DETAIL_KEY_COLUMN)
        .map(|key_index| DetailSchema {
            key_column: headers[key_index].clone(),
            key_index,
        })
}

/// `MATNO3` → 3（範囲外・番号なしはNone）
fn slot_number(name: &str) -> Option<u8> {
    let upper = name.to_uppercase();
    if !upper.contains(DETAIL_KEY_COLUMN) {
        return None;
    }
    let digits: String = upper.chars().filter(|c| c.is_ascii_digit()).collect();
    let slot = digits.parse::<u8>().ok()?;
    (1..=MAX_SLOTS).contains(&slot).then_some(slot)
}

/// 列順・除外列の定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSchema {
    pub column_order: Vec<String>,
    pub exclude_columns: Vec<String>,
}

impl Default for ProjectionSchema {
    fn default() -> Self {
        Self {
            column_order: to_strings(DEFAULT_COLUMN_ORDER),
            exclude_columns: to_strings(DEFAULT_EXCLUDE_COLUMNS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_weld() {
        let headers = to_strings(&["WELD UNIQUE ID", "BLOCK", "MATNO2", "MATNO1", "MATNO3"]);
        match detect_schema(&headers) {
            SchemaKind::Weld(schema) => {
                assert_eq!(schema.id_column, "WELD UNIQUE ID");
                let slots: Vec<u8> = schema.slot_columns.iter().map(|s| s.slot).collect();
                assert_eq!(slots, vec![1, 2, 3]);
                assert_eq!(schema.slot_columns[0].index, 3);
            }
            other => panic!("WELD表と判定されない: {:?}", other),
        }
    }

    #[test]
    fn test_detect_weld_needs_two_slots() {
        let headers = to_strings(&["Weld Unique Id", "MATNO1", "MATNO"]);
        // スロット1列のみ → MATNO列があるので詳細表扱い
        assert!(matches!(detect_schema(&headers), SchemaKind::Detail(_)));
    }

    #[test]
    fn test_detect_detail_case_insensitive() {
        let headers = to_strings(&["Grade", "matno", "WEIGHT"]);
        assert_eq!(
            detect_schema(&headers),
            SchemaKind::Detail(DetailSchema {
                key_column: "matno".to_string(),
                key_index: 1,
            })
        );
    }

    #[test]
    fn test_detect_undetermined() {
        let headers = to_strings(&["A", "B"]);
        assert_eq!(detect_schema(&headers), SchemaKind::Undetermined);
    }

    #[test]
    fn test_slot_number_range() {
        assert_eq!(slot_number("MATNO6"), Some(6));
        assert_eq!(slot_number("MATNO7"), None);
        assert_eq!(slot_number("MATNO"), None);
        assert_eq!(slot_number("WNO1"), None);
    }
}
