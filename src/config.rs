use crate::error::{BomError, Result};
use bom_common::schema::{
    to_strings, DEFAULT_COLUMN_ORDER, DEFAULT_COMPARE_FIELDS, DEFAULT_EXCLUDE_COLUMNS,
    DEFAULT_GROUPING_COLUMNS,
};
use bom_common::{ProjectionSchema, ValidationOptions, MASTER_SHEET_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 入力Excelを探すフォルダ
    pub data_dir: PathBuf,
    /// JSON・Excel・検証レポートの出力先
    pub output_dir: PathBuf,
    /// ファイル名にこの文字列を含む入力を優先する
    pub priority_marker: String,
    pub master_sheet: String,
    pub grouping_columns: Vec<String>,
    pub column_order: Vec<String>,
    pub exclude_columns: Vec<String>,
    /// 検証時にグループ列に加えて比較する列
    pub compare_fields: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込む（無ければ既定値）
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.check()?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BomError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("bom-reconcile").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            priority_marker: "260130".into(),
            master_sheet: MASTER_SHEET_NAME.into(),
            grouping_columns: to_strings(DEFAULT_GROUPING_COLUMNS),
            column_order: to_strings(DEFAULT_COLUMN_ORDER),
            exclude_columns: to_strings(DEFAULT_EXCLUDE_COLUMNS),
            compare_fields: to_strings(DEFAULT_COMPARE_FIELDS),
        }
    }

    fn check(&self) -> Result<()> {
        if self.master_sheet.trim().is_empty() {
            return Err(BomError::Config("master_sheet が空です".into()));
        }
        if self.grouping_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(BomError::Config("grouping_columns に空の列名があります".into()));
        }
        Ok(())
    }

    /// CLI引数で指定されたフォルダを優先する
    pub fn apply_overrides(&mut self, data_dir: Option<PathBuf>, output_dir: Option<PathBuf>) {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
    }

    pub fn projection(&self) -> ProjectionSchema {
        ProjectionSchema {
            column_order: self.column_order.clone(),
            exclude_columns: self.exclude_columns.clone(),
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            compare_fields: self.compare_fields.clone(),
            ..ValidationOptions::default()
        }
    }

    pub fn json_dir(&self) -> PathBuf {
        self.output_dir.join("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.priority_marker, "260130");
        assert_eq!(config.master_sheet, "全体");
        assert_eq!(config.grouping_columns[0], "MATNO");
        assert_eq!(config.compare_fields, vec!["WEIGHT", "T", "B"]);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_dir": "input", "priority_marker": "X"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("input"));
        assert_eq!(config.priority_marker, "X");
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_full_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.grouping_columns = vec!["Grade".into()];
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_empty_master_sheet_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"master_sheet": " "}"#).unwrap();

        assert!(matches!(Config::load_from(&path), Err(BomError::Config(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(None, Some(PathBuf::from("out")));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.json_dir(), PathBuf::from("out").join("json"));
    }
}
