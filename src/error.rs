use thiserror::Error;

#[derive(Error, Debug)]
pub enum BomError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("Excelファイルが{found}個しか見つかりません。最低2個必要です: {dir}")]
    NotEnoughSources { found: usize, dir: String },

    #[error("入力ファイル読み込みエラー ({path}): {message}")]
    SourceRead { path: String, message: String },

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("検証対象のエクスポートがありません。先に2（Excel生成）を実行してください: {0}")]
    ExportNotFound(String),

    #[error("エクスポート読み込みエラー: {0}")]
    ExportRead(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] bom_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl BomError {
    /// 処理全体を止める設定エラーか（それ以外は該当ステージのみスキップ）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BomError::Config(_)
                | BomError::FolderNotFound(_)
                | BomError::NotEnoughSources { .. }
                | BomError::Common(bom_common::Error::MissingColumn { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, BomError>;
