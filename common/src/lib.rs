//! BOM Common Library
//!
//! WELD表と詳細表の照合・正規化・列整形、グループビューの作成と整合性検証

pub mod types;
pub mod schema;
pub mod error;
pub mod matcher;
pub mod normalizer;
pub mod projector;
pub mod view;
pub mod validator;
pub mod export;

pub use types::{CellValue, Table};
pub use schema::{detect_schema, DetailSchema, ProjectionSchema, SchemaKind, WeldSchema};
pub use error::{Error, Result};
pub use matcher::{match_tables, MatchOutcome, MatchedRecord};
pub use normalizer::normalize;
pub use projector::project;
pub use view::{materialize, sheet_name_for, view_for, CellRef, GroupedView, MasterTable, MASTER_SHEET_NAME};
pub use validator::{validate, ValidationOptions, ValidationReport, ViewCheck, ViewRows};
