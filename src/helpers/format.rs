//! Format - Table rendering for the headless viewer

use crate::domain::{ColumnName, Row};

/// Truncate a string to max characters with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Render one row as tab-separated cells in column order
///
/// Missing cells render empty; tabs and newlines inside cells become spaces.
pub fn format_row(columns: &[ColumnName], row: &Row, max_cell: usize) -> String {
    columns
        .iter()
        .map(|col| {
            let cell = row.get(col).map(|v| v.to_string()).unwrap_or_default();
            truncate(&cell.replace(['\t', '\n', '\r'], " "), max_cell)
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Render a header line plus every row
pub fn format_table(columns: &[ColumnName], rows: &[Row], max_cell: usize) -> String {
    let mut out = columns.join("\t");
    for row in rows {
        out.push('\n');
        out.push_str(&format_row(columns, row, max_cell));
    }
    out
}
