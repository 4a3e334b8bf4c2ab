//! 出力列の並べ替えと除外
//!
//! 優先順リストにある列をその順で先頭に置き、残りの列は元の並びのまま後ろへ続ける。

use crate::schema::ProjectionSchema;
use crate::types::Table;

pub fn project(table: Table, schema: &ProjectionSchema) -> Table {
    let (columns, rows) = table.into_parts();

    let retained: Vec<usize> = (0..columns.len())
        .filter(|&c| !schema.exclude_columns.contains(&columns[c]))
        .collect();

    let mut order: Vec<usize> = schema
        .column_order
        .iter()
        .filter_map(|name| retained.iter().copied().find(|&c| &columns[c] == name))
        .collect();
    let rest: Vec<usize> = retained
        .iter()
        .copied()
        .filter(|c| !order.contains(c))
        .collect();
    order.extend(rest);

    let projected_rows = rows
        .into_iter()
        .map(|row| order.iter().map(|&c| row[c].clone()).collect())
        .collect();
    let projected_columns = order.iter().map(|&c| columns[c].clone()).collect();

    Table::from_rows(projected_columns, projected_rows)
}
