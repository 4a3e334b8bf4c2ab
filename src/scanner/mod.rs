//! 入力Excelの探索と WELD表・詳細表 の判定

use crate::error::{BomError, Result};
use crate::loader;
use bom_common::{detect_schema, SchemaKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// 前回のエクスポート（入力ではない）
const EXPORT_MARKER: &str = "weld_export";
/// Officeのロックファイル
const LOCK_PREFIX: &str = "~$";

/// 照合に使う2ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    pub weld: PathBuf,
    pub detail: PathBuf,
}

/// 入力フォルダを決める（無ければカレントフォルダ）
pub fn resolve_data_dir(data_dir: &Path) -> PathBuf {
    if data_dir.is_dir() {
        data_dir.to_path_buf()
    } else {
        tracing::warn!(dir = %data_dir.display(), "入力フォルダが無いためカレントフォルダを使用");
        PathBuf::from(".")
    }
}

/// フォルダ直下のExcelを列挙（名前順、`priority_marker` を含むものを先頭へ）
pub fn find_excel_files(folder: &Path, priority_marker: &str) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Err(BomError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && is_source_file(path))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    // 安定ソートなので名前順は保たれる
    if !priority_marker.is_empty() {
        files.sort_by_key(|path| !file_name(path).contains(priority_marker));
    }

    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_source_file(path: &Path) -> bool {
    let name = file_name(path);
    if name.starts_with(LOCK_PREFIX) || name.contains(EXPORT_MARKER) {
        return false;
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| EXCEL_EXTENSIONS.contains(&ext.as_str()))
}

/// ヘッダー行から WELD表・詳細表 を判定する
///
/// 判定できなかった側は、まだ使っていない先頭のファイルで補う。
pub fn identify_sources(files: &[PathBuf], folder: &Path) -> Result<SourcePair> {
    if files.len() < 2 {
        return Err(BomError::NotEnoughSources {
            found: files.len(),
            dir: folder.display().to_string(),
        });
    }

    let mut weld: Option<&PathBuf> = None;
    let mut detail: Option<&PathBuf> = None;

    for file in files {
        if weld.is_some() && detail.is_some() {
            break;
        }
        let headers = match loader::read_headers(file) {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "ヘッダーを読めないためスキップ");
                continue;
            }
        };

        match detect_schema(&headers) {
            SchemaKind::Weld(_) if weld.is_none() => weld = Some(file),
            SchemaKind::Detail(_) if detail.is_none() => detail = Some(file),
            kind => tracing::debug!(file = %file.display(), ?kind, "判定対象外"),
        }
    }

    let weld = match weld {
        Some(file) => file,
        None => {
            let file = first_unused(files, detail)?;
            tracing::warn!(file = %file.display(), "WELD表を判定できないため先頭のファイルを使用");
            file
        }
    };
    let detail = match detail {
        Some(file) => file,
        None => {
            let file = first_unused(files, Some(weld))?;
            tracing::warn!(file = %file.display(), "詳細表を判定できないため次のファイルを使用");
            file
        }
    };

    Ok(SourcePair {
        weld: weld.clone(),
        detail: detail.clone(),
    })
}

fn first_unused<'a>(files: &'a [PathBuf], used: Option<&PathBuf>) -> Result<&'a PathBuf> {
    files
        .iter()
        .find(|f| Some(*f) != used)
        .ok_or_else(|| BomError::Config("入力ファイルを決められません".into()))
}

/// 入力フォルダの解決からファイル判定まで
pub fn discover(data_dir: &Path, priority_marker: &str) -> Result<SourcePair> {
    let folder = resolve_data_dir(data_dir);
    let files = find_excel_files(&folder, priority_marker)?;
    identify_sources(&files, &folder)
}
