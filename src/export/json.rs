//! 全体表のJSON保存・読み込み（`json/all_data.json`）

use crate::error::{BomError, Result};
use bom_common::{MasterTable, Table};
use std::path::{Path, PathBuf};

pub const ALL_DATA_FILE: &str = "all_data.json";

/// 全体表をキー順を保ったJSON配列で保存
pub fn write_master(master: &MasterTable, json_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(json_dir)?;
    let path = json_dir.join(ALL_DATA_FILE);
    let json = serde_json::to_string_pretty(master)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

pub fn read_master(path: &Path) -> Result<MasterTable> {
    if !path.exists() {
        return Err(BomError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let table: Table = serde_json::from_str(&content)?;
    Ok(MasterTable::new(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bom_common::schema::to_strings;
    use bom_common::CellValue;
    use tempfile::tempdir;

    fn master() -> MasterTable {
        MasterTable::new(Table::from_rows(
            to_strings(&["WELD UNIQUE ID", "MATNO", "Grade", "WNO"]),
            vec![
                vec!["W-1".into(), "A1".into(), "鋼材X".into(), "007".into()],
                vec!["W-1".into(), "B2".into(), "".into(), "007".into()],
            ],
        ))
    }

    #[test]
    fn test_write_keeps_key_order_and_utf8() {
        let dir = tempdir().unwrap();
        let path = write_master(&master(), &dir.path().join("json")).unwrap();
        assert!(path.ends_with("json/all_data.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("鋼材X"));
        let id = content.find("WELD UNIQUE ID").unwrap();
        let matno = content.find("\"MATNO\"").unwrap();
        let wno = content.find("\"WNO\"").unwrap();
        assert!(id < matno && matno < wno);
    }

    #[test]
    fn test_read_back() {
        let dir = tempdir().unwrap();
        let path = write_master(&master(), dir.path()).unwrap();

        let restored = read_master(&path).unwrap();
        assert_eq!(restored.columns(), master().columns());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.table().value(1, "Grade"), Some(&CellValue::from("")));
        assert_eq!(restored.table().value(0, "WNO"), Some(&CellValue::from("007")));
    }

    #[test]
    fn test_read_missing() {
        let result = read_master(Path::new("/nonexistent/all_data.json"));
        assert!(matches!(result, Err(BomError::FileNotFound(_))));
    }
}
