//! 数式のセル参照（`='全体'!C5`）の解析

use bom_common::CellRef;
use regex::Regex;
use rust_xlsxwriter::utility::column_name_to_number;

/// `='シート'!$C$5` / `=Sheet!C5` 形式の単一セル参照を解析する
///
/// 範囲参照や関数を含む数式はNone。
pub fn parse_reference(formula: &str) -> Option<CellRef> {
    lazy_static::lazy_static! {
        static ref REF_RE: Regex =
            Regex::new(r"^=?(?:'((?:[^']|'')+)'|([^'!=]+))!\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap();
    }

    let cap = REF_RE.captures(formula.trim())?;
    let sheet = match (cap.get(1), cap.get(2)) {
        (Some(quoted), _) => quoted.as_str().replace("''", "'"),
        (None, Some(bare)) => bare.as_str().to_string(),
        (None, None) => return None,
    };

    let row: u32 = cap[4].parse().ok()?;
    if row == 0 {
        return None;
    }

    Some(CellRef {
        sheet,
        row: row - 1,
        col: column_name_to_number(&cap[3].to_uppercase()),
    })
}
