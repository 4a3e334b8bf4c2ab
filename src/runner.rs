//! モード実行
//!
//! 1: JSON出力 / 2: Excel生成 / 3: 整合性検証 / 4: 1 → 2 → 3
//!
//! 設定エラー（入力ファイル・必須列の不足）は処理全体を止める。
//! それ以外のステージ単位のエラーは `⚠` を表示してそのステージだけをスキップする。

use crate::cli::RunMode;
use crate::config::Config;
use crate::error::Result;
use crate::export::{excel, json};
use crate::pipeline::{self, MasterBuild};
use bom_common::{materialize, validate, view_for, ValidationReport, ViewRows};
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "validation_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Json,
    Excel,
    Validate,
}

fn stages(mode: RunMode) -> &'static [Stage] {
    match mode {
        RunMode::Json => &[Stage::Json],
        RunMode::Excel => &[Stage::Excel],
        RunMode::Validate => &[Stage::Validate],
        RunMode::All => &[Stage::Json, Stage::Excel, Stage::Validate],
    }
}

/// 全体表を作成済みの実行コンテキスト
pub struct Session {
    config: Config,
    build: MasterBuild,
}

impl Session {
    /// 入力を探索して全体表を作る（失敗は設定エラー）
    pub fn prepare(config: Config) -> Result<Self> {
        let build = pipeline::build_master(&config)?;
        Ok(Self { config, build })
    }

    pub fn from_build(config: Config, build: MasterBuild) -> Self {
        Self { config, build }
    }

    /// モードを実行する（ステージのエラーは表示してスキップ）
    pub fn run(&self, mode: RunMode) -> Result<()> {
        for stage in stages(mode) {
            let result = match stage {
                Stage::Json => self.export_json().map(|_| ()),
                Stage::Excel => self.export_excel().map(|_| ()),
                Stage::Validate => self.validate_latest().map(|_| ()),
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(?stage, error = %e, "ステージをスキップ");
                    println!("⚠ {}\n", e);
                }
            }
        }
        Ok(())
    }

    /// 全体表を `json/all_data.json` に保存
    pub fn export_json(&self) -> Result<PathBuf> {
        println!("📄 JSON出力");
        let path = json::write_master(&self.build.master, &self.config.json_dir())?;
        println!("✔ {}件を保存: {}\n", self.build.master.len(), path.display());
        Ok(path)
    }

    /// 全体シート + グループシートのExcelを生成
    pub fn export_excel(&self) -> Result<PathBuf> {
        println!("📊 Excel生成");
        let views = materialize(&self.build.master, &self.config.grouping_columns);
        for column in &self.config.grouping_columns {
            match view_for(&views, column) {
                Some(view) => println!("- {}: {}行", view.sheet_name(), view.len()),
                None => println!("- {}: 列なし（スキップ）", column),
            }
        }

        let path = excel::write_export(
            &self.build.master,
            &views,
            &self.config.output_dir,
            &self.config.master_sheet,
        )?;
        println!("✔ Excel出力: {}\n", path.display());
        Ok(path)
    }

    /// 最新のExcelを検証して `validation_report.json` を書く
    pub fn validate_latest(&self) -> Result<ValidationReport> {
        validate_latest(&self.config)
    }
}

/// 最新のExcelを検証する（全体表はJSON、無ければExcelの全体シート）
pub fn validate_latest(config: &Config) -> Result<ValidationReport> {
    println!("🔍 整合性検証");
    let target = excel::latest_export(&config.output_dir)?;
    println!("- 対象: {}", target.display());

    let json_path = config.json_dir().join(json::ALL_DATA_FILE);
    let master = if json_path.exists() {
        Some(json::read_master(&json_path)?)
    } else {
        tracing::warn!(path = %json_path.display(), "JSONが無いためExcelの全体シートで検証");
        println!("⚠ JSONが無いためExcelの全体シートで検証します");
        None
    };

    let exported = excel::read_export(&target, master, &config.master_sheet)?;
    let target_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| target.display().to_string());
    let report = validate(
        &exported.master,
        &exported.sheets,
        &target_name,
        &config.validation_options(),
    );

    for sheet in &exported.sheets {
        let Some(check) = report.get(sheet.name()) else {
            println!("  {}: - 対応する列なし（スキップ）", sheet.name());
            continue;
        };
        if check.is_consistent() {
            println!("  {}: ✓ 一致 ({}行)", sheet.name(), sheet.row_count());
        } else {
            println!(
                "  {}: ✗ 不一致 ({}行, 行数一致: {}, 値の不一致: {})",
                sheet.name(),
                sheet.row_count(),
                check.row_count_match,
                check.mismatch_count
            );
        }
    }

    let report_path = write_report(&report, &config.output_dir)?;
    if report.is_consistent() {
        println!("✔ すべてのシートが一致: {}\n", report_path.display());
    } else {
        println!("⚠ 不一致のシートがあります: {}\n", report_path.display());
    }
    Ok(report)
}

pub fn write_report(report: &ValidationReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(REPORT_FILE);
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages() {
        assert_eq!(stages(RunMode::Json), &[Stage::Json]);
        assert_eq!(stages(RunMode::Validate), &[Stage::Validate]);
        assert_eq!(
            stages(RunMode::All),
            &[Stage::Json, Stage::Excel, Stage::Validate]
        );
    }
}
