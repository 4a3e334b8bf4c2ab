//! 全体表 × グループビューの整合性検証
//!
//! ビューごとに期待行数（グループ列が空白でない全体行の数）と実際の行数を比べ、
//! 行数が一致すれば先頭・中央・末尾の3行を全体表と突き合わせる。

use crate::schema::{to_strings, DEFAULT_COMPARE_FIELDS, DETAIL_KEY_COLUMN};
use crate::view::{sheet_name_for, GroupedView, MasterTable};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 検証対象のビュー（メモリ上のビュー、読み戻したExcelシートの両方）
pub trait ViewRows {
    /// ビュー名（シート名）
    fn name(&self) -> &str;
    fn row_count(&self) -> usize;
    /// `position` 行目の `column` 列の値（列が無ければNone）
    fn value(&self, position: usize, column: &str) -> Option<String>;
}

impl ViewRows for GroupedView {
    fn name(&self) -> &str {
        self.sheet_name()
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn value(&self, position: usize, column: &str) -> Option<String> {
        let col = self.master().table().column_index(column)?;
        self.row(position).map(|row| row[col].to_text().into_owned())
    }
}

/// 検証オプション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// 全体行を引くキー列（全体表に無ければグループ列を使う）
    pub key_column: String,
    /// グループ列に加えて常に比較する列
    pub compare_fields: Vec<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            key_column: DETAIL_KEY_COLUMN.to_string(),
            compare_fields: to_strings(DEFAULT_COMPARE_FIELDS),
        }
    }
}

/// ビュー1つ分の検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCheck {
    pub row_count_match: bool,
    pub data_match: bool,
    pub mismatch_count: usize,
}

impl ViewCheck {
    pub fn is_consistent(&self) -> bool {
        self.row_count_match && self.data_match
    }
}

/// 検証レポート（作成後は変更しない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    timestamp: String,
    target_excel: String,
    cross_sheet_validation: ViewChecks,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

impl ValidationReport {
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// 検証したエクスポートの識別子（ファイル名）
    pub fn target(&self) -> &str {
        &self.target_excel
    }

    /// ビュー名と結果（検証した順）
    pub fn views(&self) -> &[(String, ViewCheck)] {
        &self.cross_sheet_validation.0
    }

    pub fn get(&self, view: &str) -> Option<&ViewCheck> {
        self.views()
            .iter()
            .find(|(name, _)| name == view)
            .map(|(_, check)| check)
    }

    /// グループ列を特定できず検証しなかったビュー
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_consistent(&self) -> bool {
        self.views().iter().all(|(_, check)| check.is_consistent())
    }
}

/// ビュー名 → 結果（シート順を保つJSONオブジェクト）
#[derive(Debug, Clone, Default, PartialEq)]
struct ViewChecks(Vec<(String, ViewCheck)>);

impl Serialize for ViewChecks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, check) in &self.0 {
            map.serialize_entry(name, check)?;
        }
        map.end()
    }
}

struct ViewChecksVisitor;

impl<'de> Visitor<'de> for ViewChecksVisitor {
    type Value = ViewChecks;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of view results")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, ViewCheck>()? {
            entries.push(entry);
        }
        Ok(ViewChecks(entries))
    }
}

impl<'de> Deserialize<'de> for ViewChecks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ViewChecksVisitor)
    }
}

/// 両方が数値として読める場合は数値で比較（`"10"` と `"10.0"` は一致）
pub fn numeric_equivalent(a: &str, b: &str) -> bool {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

pub fn values_match(a: &str, b: &str) -> bool {
    a.trim() == b.trim() || numeric_equivalent(a, b)
}

/// 全ビューを検証してレポートを作る
pub fn validate<V: ViewRows>(
    master: &MasterTable,
    views: &[V],
    target: &str,
    options: &ValidationOptions,
) -> ValidationReport {
    let table = master.table();
    let mut results = Vec::new();
    let mut skipped = Vec::new();
    let mut key_indexes: HashMap<String, HashMap<String, usize>> = HashMap::new();

    for view in views {
        let Some((group_idx, group_column)) = table
            .columns()
            .iter()
            .enumerate()
            .find(|(_, c)| sheet_name_for(c) == view.name())
        else {
            tracing::warn!(view = view.name(), "対応するグループ列が見つからないため検証をスキップ");
            skipped.push(view.name().to_string());
            continue;
        };

        let expected = table
            .rows()
            .iter()
            .filter(|row| !row[group_idx].is_blank())
            .count();
        let actual = view.row_count();
        let row_count_match = expected == actual;

        let mut data_match = true;
        let mut mismatch_count = 0;

        if row_count_match && actual > 0 {
            let key_column = if table.has_column(&options.key_column) {
                options.key_column.as_str()
            } else {
                group_column.as_str()
            };
            let index = key_indexes
                .entry(key_column.to_string())
                .or_insert_with(|| build_key_index(master, key_column));

            let mut fields: Vec<&str> = vec![group_column.as_str()];
            for field in &options.compare_fields {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }

            for position in sample_positions(actual) {
                let key = view.value(position, key_column).unwrap_or_default();
                let Some(&master_row) = index.get(key.trim()) else {
                    tracing::debug!(view = view.name(), key = key.as_str(), "キーが全体表に見つからない");
                    data_match = false;
                    break;
                };

                for field in &fields {
                    let Some(col) = table.column_index(field) else {
                        continue;
                    };
                    let Some(view_value) = view.value(position, field) else {
                        continue;
                    };
                    let master_value = table.rows()[master_row][col].to_text();
                    if !values_match(&view_value, &master_value) {
                        tracing::debug!(
                            view = view.name(),
                            field,
                            view_value = view_value.as_str(),
                            master_value = &*master_value,
                            "値の不一致"
                        );
                        data_match = false;
                        mismatch_count += 1;
                    }
                }
            }
        }

        results.push((
            view.name().to_string(),
            ViewCheck {
                row_count_match,
                data_match,
                mismatch_count,
            },
        ));
    }

    ValidationReport {
        timestamp: chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        target_excel: target.to_string(),
        cross_sheet_validation: ViewChecks(results),
        skipped,
    }
}

/// 先頭・中央・末尾
fn sample_positions(len: usize) -> [usize; 3] {
    [0, len / 2, len - 1]
}

/// キー値 → 最初の全体行
fn build_key_index(master: &MasterTable, key_column: &str) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(master.len());
    if let Some(col) = master.table().column_index(key_column) {
        for (i, row) in master.table().rows().iter().enumerate() {
            index
                .entry(row[col].to_text().trim().to_string())
                .or_insert(i);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DEFAULT_GROUPING_COLUMNS;
    use crate::types::Table;
    use crate::view::materialize;

    /// テスト用の読み戻しシート
    struct FakeSheet {
        name: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    }

    impl ViewRows for FakeSheet {
        fn name(&self) -> &str {
            &self.name
        }

        fn row_count(&self) -> usize {
            self.rows.len()
        }

        fn value(&self, position: usize, column: &str) -> Option<String> {
            let col = self.columns.iter().position(|c| c == column)?;
            self.rows.get(position).map(|r| r[col].clone())
        }
    }

    fn master() -> MasterTable {
        MasterTable::new(Table::from_rows(
            to_strings(&["WELD UNIQUE ID", "MATNO", "Grade", "T", "WEIGHT"]),
            vec![
                vec!["W-1".into(), "A1".into(), "SS400".into(), "12".into(), "10.5".into()],
                vec!["W-1".into(), "B2".into(), "".into(), "".into(), "".into()],
                vec!["W-2".into(), "C3".into(), "SM490".into(), "9".into(), "4".into()],
                vec!["W-3".into(), "A1".into(), "SS400".into(), "12".into(), "10.5".into()],
            ],
        ))
    }

    fn sheet_from(master: &MasterTable, view: &GroupedView) -> FakeSheet {
        FakeSheet {
            name: view.sheet_name().to_string(),
            columns: master.columns().to_vec(),
            rows: (0..view.len())
                .map(|p| view.row(p).unwrap().iter().map(|v| v.to_text().into_owned()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_numeric_equivalence() {
        assert!(values_match("10", "10.0"));
        assert!(values_match(" 7 ", "7"));
        assert!(!values_match("10", "11"));
        assert!(!values_match("SS400", "SM490"));
    }

    #[test]
    fn test_in_memory_views_are_consistent() {
        let master = master();
        let views = materialize(&master, &to_strings(DEFAULT_GROUPING_COLUMNS));
        let report = validate(&master, &views, "memory", &ValidationOptions::default());

        assert_eq!(report.views().len(), 3);
        for (name, check) in report.views() {
            assert_eq!(
                *check,
                ViewCheck {
                    row_count_match: true,
                    data_match: true,
                    mismatch_count: 0
                },
                "{}",
                name
            );
        }
        assert!(report.is_consistent());
        assert_eq!(report.target(), "memory");
    }

    #[test]
    fn test_row_count_mismatch() {
        let master = master();
        let views = materialize(&master, &to_strings(&["Grade"]));
        let mut sheet = sheet_from(&master, &views[0]);
        sheet.rows.pop();

        let report = validate(&master, &[sheet], "x.xlsx", &ValidationOptions::default());
        let check = report.get("Grade").unwrap();
        assert!(!check.row_count_match);
        assert!(check.data_match);
        assert_eq!(check.mismatch_count, 0);
    }

    #[test]
    fn test_value_mismatch_counts() {
        let master = master();
        let views = materialize(&master, &to_strings(&["T"]));
        let mut sheet = sheet_from(&master, &views[0]);
        let weight = sheet.columns.iter().position(|c| c == "WEIGHT").unwrap();
        // 数値表現の違いは一致扱い
        sheet.rows[0][weight] = "10.50".to_string();
        let last = sheet.rows.len() - 1;
        sheet.rows[last][weight] = "99".to_string();

        let report = validate(&master, &[sheet], "x.xlsx", &ValidationOptions::default());
        let check = report.get("T").unwrap();
        assert!(check.row_count_match);
        assert!(!check.data_match);
        assert_eq!(check.mismatch_count, 1);
    }

    #[test]
    fn test_unknown_key_marks_data_mismatch() {
        let master = master();
        let views = materialize(&master, &to_strings(&["MATNO"]));
        let mut sheet = sheet_from(&master, &views[0]);
        let key = sheet.columns.iter().position(|c| c == "MATNO").unwrap();
        sheet.rows[0][key] = "ZZZ".to_string();

        let report = validate(&master, &[sheet], "x.xlsx", &ValidationOptions::default());
        let check = report.get("MATNO").unwrap();
        assert!(!check.data_match);
    }

    #[test]
    fn test_unresolvable_view_is_skipped() {
        let master = master();
        let sheet = FakeSheet {
            name: "Sheet9".to_string(),
            columns: vec![],
            rows: vec![],
        };
        let report = validate(&master, &[sheet], "x.xlsx", &ValidationOptions::default());
        assert!(report.views().is_empty());
        assert_eq!(report.skipped(), &["Sheet9".to_string()]);
    }

    #[test]
    fn test_grouping_column_used_as_key_without_matno() {
        let master = MasterTable::new(Table::from_rows(
            to_strings(&["Grade", "T"]),
            vec![
                vec!["SS400".into(), "12".into()],
                vec!["SM490".into(), "9".into()],
            ],
        ));
        let views = materialize(&master, &to_strings(&["Grade"]));
        let report = validate(&master, &views, "x.xlsx", &ValidationOptions::default());
        assert!(report.get("Grade").unwrap().is_consistent());
    }

    #[test]
    fn test_report_serialization_shape() {
        let master = master();
        let views = materialize(&master, &to_strings(&["MATNO"]));
        let report = validate(&master, &views, "weld_export_20260130_101500.xlsx", &ValidationOptions::default());
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["target_excel"], "weld_export_20260130_101500.xlsx");
        assert_eq!(json["cross_sheet_validation"]["MATNO"]["row_count_match"], true);
        assert_eq!(json["cross_sheet_validation"]["MATNO"]["mismatch_count"], 0);
        assert!(json.get("skipped").is_none());
    }

    #[test]
    fn test_report_keeps_sheet_order() {
        let master = master();
        let views = materialize(&master, &to_strings(&["T", "MATNO", "Grade"]));
        let report = validate(&master, &views, "x.xlsx", &ValidationOptions::default());

        let names: Vec<&str> = report.views().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["T", "MATNO", "Grade"]);

        let json = serde_json::to_string(&report).unwrap();
        let (t, matno, grade) = (
            json.find("\"T\"").unwrap(),
            json.find("\"MATNO\"").unwrap(),
            json.find("\"Grade\"").unwrap(),
        );
        assert!(t < matno && matno < grade);

        let restored: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }
}
