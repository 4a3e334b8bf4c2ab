use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bom-reconcile")]
#[command(about = "WELD表・詳細表のBOM照合、グループシート出力、整合性検証ツール", long_about = None)]
pub struct Cli {
    /// メニューを出さずに実行するモード (1: JSON, 2: Excel, 3: 検証, 4: すべて)
    #[arg(long, num_args = 0..=1, default_missing_value = "4", value_name = "MODE")]
    pub auto: Option<RunMode>,

    /// 入力Excelフォルダ（設定ファイルより優先）
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// 出力フォルダ（設定ファイルより優先）
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 詳細ログを出力
    #[arg(short, long)]
    pub verbose: bool,
}

/// 実行モード
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// 全体表をJSONに保存
    Json,
    /// 全体シート + グループシートのExcelを生成
    Excel,
    /// 最新のExcelを検証
    Validate,
    /// 1 → 2 → 3
    All,
}

impl RunMode {
    pub const ALL: [RunMode; 4] = [RunMode::Json, RunMode::Excel, RunMode::Validate, RunMode::All];

    pub fn number(&self) -> u8 {
        match self {
            RunMode::Json => 1,
            RunMode::Excel => 2,
            RunMode::Validate => 3,
            RunMode::All => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Json => "JSON出力（全体表）",
            RunMode::Excel => "Excel生成（全体 + グループシート）",
            RunMode::Validate => "整合性検証（最新のExcel）",
            RunMode::All => "すべて実行（1 → 2 → 3）",
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "json" => Ok(RunMode::Json),
            "2" | "excel" | "xlsx" => Ok(RunMode::Excel),
            "3" | "validate" => Ok(RunMode::Validate),
            "4" | "all" => Ok(RunMode::All),
            _ => Err(format!("Unknown mode: {}. Use 1, 2, 3, or 4", s)),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}
