//! 照合結果の正規化
//!
//! ## 処理順
//! 1. 全空白の列を削除し、重複列名は先頭列のみ残す
//! 2. 残した列がすべて空白の行を削除
//! 3. 文字列の前後空白を除去
//! 4. 欠損値は空文字
//! 5. 日時はISO-8601、整数値の実数は整数表記、その他の数値は文字列
//! 6. `WNO` 列は3桁ゼロ埋め（数値として読める値のみ）
//!
//! 正規化済みの表に再適用しても結果は変わらない。

use crate::types::{format_float, CellValue, Table, ISO_DATETIME_FORMAT};
use std::collections::HashSet;

/// 3桁ゼロ埋め対象の列
pub const WNO_COLUMN: &str = "WNO";

/// 表を正規化する（失敗しない）
pub fn normalize(table: Table) -> Table {
    let (columns, rows) = table.into_parts();

    // 空白列を落としてから重複列名を判定
    let mut seen: HashSet<&str> = HashSet::new();
    let keep: Vec<usize> = (0..columns.len())
        .filter(|&c| rows.iter().any(|row| !row[c].is_blank()))
        .filter(|&c| seen.insert(columns[c].as_str()))
        .collect();

    // 行の空白判定は残す列だけで行う
    let rows: Vec<Vec<CellValue>> = rows
        .into_iter()
        .filter(|row| keep.iter().any(|&c| !row[c].is_blank()))
        .collect();

    let wno = keep.iter().position(|&c| columns[c] == WNO_COLUMN);

    let normalized_rows = rows
        .into_iter()
        .map(|row| {
            keep.iter()
                .enumerate()
                .map(|(out, &c)| {
                    let value = canonical_value(&row[c]);
                    if Some(out) == wno {
                        format_wno(&value).map(CellValue::Text).unwrap_or(value)
                    } else {
                        value
                    }
                })
                .collect()
        })
        .collect();

    let kept_columns = keep.iter().map(|&c| columns[c].clone()).collect();
    Table::from_rows(kept_columns, normalized_rows)
}

/// セル値の正規形（空白は空文字、数値・日時は文字列、真偽値はそのまま）
pub fn canonical_value(value: &CellValue) -> CellValue {
    match value {
        CellValue::Empty => CellValue::Text(String::new()),
        CellValue::Text(s) => CellValue::Text(s.trim().to_string()),
        CellValue::Int(i) => CellValue::Text(i.to_string()),
        CellValue::Float(f) => CellValue::Text(format_float(*f)),
        CellValue::Bool(b) => CellValue::Bool(*b),
        CellValue::DateTime(dt) => CellValue::Text(dt.format(ISO_DATETIME_FORMAT).to_string()),
    }
}

/// `WNO` の3桁ゼロ埋め（`7` → `"007"`, `"42.0"` → `"042"`）
///
/// 数値として読めない値・空白はNone（元の値を残す）。
pub fn format_wno(value: &CellValue) -> Option<String> {
    let text = match value {
        CellValue::Bool(_) => return None,
        other => other.to_text(),
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let stripped: String = text.chars().filter(|c| *c != '.' && *c != '-').collect();
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    // "1.2.3" など数字と記号だけでも実数として読めない値はそのまま
    let number = text.parse::<f64>().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some(format!("{:03}", number.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::to_strings;
    use chrono::NaiveDate;

    #[test]
    fn test_format_wno() {
        assert_eq!(format_wno(&CellValue::Int(7)), Some("007".to_string()));
        assert_eq!(format_wno(&CellValue::from("42.0")), Some("042".to_string()));
        assert_eq!(format_wno(&CellValue::Float(12.0)), Some("012".to_string()));
        assert_eq!(format_wno(&CellValue::from("1234")), Some("1234".to_string()));
        assert_eq!(format_wno(&CellValue::from("ABC")), None);
        assert_eq!(format_wno(&CellValue::from("")), None);
        assert_eq!(format_wno(&CellValue::from("1.2.3")), None);
    }

    #[test]
    fn test_normalize_wno_column() {
        let table = Table::from_rows(
            to_strings(&["WNO", "MATNO"]),
            vec![
                vec![CellValue::Int(7), "A".into()],
                vec!["42.0".into(), "B".into()],
                vec!["ABC".into(), "C".into()],
                vec![CellValue::Empty, "D".into()],
            ],
        );
        let result = normalize(table);
        let wno: Vec<String> = (0..4)
            .map(|r| result.value(r, "WNO").unwrap().to_text().into_owned())
            .collect();
        assert_eq!(wno, vec!["007", "042", "ABC", ""]);
    }

    #[test]
    fn test_drop_blank_rows_and_columns() {
        let table = Table::from_rows(
            to_strings(&["A", "EMPTY", "B"]),
            vec![
                vec!["1".into(), CellValue::Empty, " x ".into()],
                vec![CellValue::Empty, "  ".into(), CellValue::Empty],
                vec!["2".into(), CellValue::Empty, CellValue::Empty],
            ],
        );
        let result = normalize(table);
        assert_eq!(result.columns(), &to_strings(&["A", "B"])[..]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.value(0, "B"), Some(&CellValue::from("x")));
        assert_eq!(result.value(1, "B"), Some(&CellValue::from("")));
    }

    #[test]
    fn test_duplicate_columns_keep_first() {
        let table = Table::from_rows(
            to_strings(&["A", "B", "A"]),
            vec![vec!["first".into(), "b".into(), "second".into()]],
        );
        let result = normalize(table);
        assert_eq!(result.columns(), &to_strings(&["A", "B"])[..]);
        assert_eq!(result.value(0, "A"), Some(&CellValue::from("first")));
    }

    #[test]
    fn test_blank_duplicate_does_not_shadow_later_column() {
        let table = Table::from_rows(
            to_strings(&["A", "A"]),
            vec![vec![CellValue::Empty, "later".into()]],
        );
        let result = normalize(table);
        assert_eq!(result.value(0, "A"), Some(&CellValue::from("later")));
    }

    #[test]
    fn test_canonical_value() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 30)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(canonical_value(&CellValue::Float(10.0)), CellValue::from("10"));
        assert_eq!(canonical_value(&CellValue::Float(2.75)), CellValue::from("2.75"));
        assert_eq!(canonical_value(&CellValue::Int(-4)), CellValue::from("-4"));
        assert_eq!(canonical_value(&CellValue::DateTime(date)), CellValue::from("2026-01-30T08:05:00"));
        assert_eq!(canonical_value(&CellValue::Bool(true)), CellValue::Bool(true));
        assert_eq!(canonical_value(&CellValue::Empty), CellValue::from(""));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = Table::from_rows(
            to_strings(&["WNO", "T", "Grade", "A", "T", "NOTE"]),
            vec![
                vec![CellValue::Float(3.0), CellValue::Float(12.0), " SS400 ".into(), CellValue::Empty, "dup".into(), CellValue::Bool(false)],
                vec!["-5".into(), CellValue::Float(9.5), CellValue::Empty, CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty, CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec!["X-1".into(), CellValue::Int(100), "SM490".into(), CellValue::Empty, CellValue::Empty, "note".into()],
            ],
        );
        let once = normalize(table);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
        assert_eq!(once.value(1, "WNO"), Some(&CellValue::from("-05")));
    }

    #[test]
    fn test_row_blank_except_dropped_duplicate() {
        // 2行目の値は重複列（削除される側）にしか無い
        let table = Table::from_rows(
            to_strings(&["A", "A"]),
            vec![
                vec![CellValue::Empty, "x".into()],
                vec!["y".into(), CellValue::Empty],
            ],
        );
        let once = normalize(table);
        assert_eq!(once.columns(), &["A"]);
        assert_eq!(once.rows(), &[vec![CellValue::from("y")]]);
        assert_eq!(normalize(once.clone()), once);
    }
}
