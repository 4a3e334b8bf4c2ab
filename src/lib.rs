//! bom-reconcile
//!
//! WELD表と詳細表をMATNOで照合し、全体表（JSON/Excel）とグループシートを出力、
//! 出力したExcelの整合性を検証するCLIのライブラリ部分

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod logging;
pub mod menu;
pub mod pipeline;
pub mod runner;
pub mod scanner;
