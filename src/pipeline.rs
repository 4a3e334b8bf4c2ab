//! 入力2ファイルから全体表を作る
//!
//! 読み込み → 照合 → 正規化 → 列整形 の順に進め、結果は `MasterTable` として固定する。

use crate::config::Config;
use crate::error::Result;
use crate::loader;
use crate::scanner::{self, SourcePair};
use bom_common::{match_tables, normalize, project, MasterTable, ProjectionSchema};

/// 全体表と作成時の件数
#[derive(Debug, Clone)]
pub struct MasterBuild {
    pub sources: SourcePair,
    pub master: MasterTable,
    pub matched_count: usize,
    pub missing_count: usize,
}

/// 設定の入力フォルダから全体表を作る
pub fn build_master(config: &Config) -> Result<MasterBuild> {
    println!("[1/3] 入力ファイルを探索中...");
    let sources = scanner::discover(&config.data_dir, &config.priority_marker)?;
    println!("✔ WELD表: {}", sources.weld.display());
    println!("✔ 詳細表: {}\n", sources.detail.display());

    build_from_sources(sources, &config.projection())
}

pub fn build_from_sources(sources: SourcePair, projection: &ProjectionSchema) -> Result<MasterBuild> {
    println!("[2/3] 照合中...");
    let weld = loader::read_table(&sources.weld)?;
    let detail = loader::read_table(&sources.detail)?;

    let outcome = match_tables(&weld, &detail)?;
    let (matched_count, missing_count) = (outcome.matched_count, outcome.missing_count);
    println!(
        "✔ {}件（一致: {} / 不一致: {}）\n",
        outcome.records.len(),
        matched_count,
        missing_count
    );
    if outcome.duplicate_keys > 0 {
        println!("⚠ 詳細表のMATNO重複: {}件（先頭行を採用）", outcome.duplicate_keys);
    }

    println!("[3/3] 正規化・列整形中...");
    let table = project(normalize(outcome.into_table()), projection);
    println!("✔ 全体表: {}行 × {}列\n", table.len(), table.columns().len());

    Ok(MasterBuild {
        sources,
        master: MasterTable::new(table),
        matched_count,
        missing_count,
    })
}
