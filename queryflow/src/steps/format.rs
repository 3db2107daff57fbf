//! Text rendering of query results for prompts.

use crate::tools::QueryRows;

/// Renders a single cell.
fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders rows as comma-delimited text with a header line, keeping at
/// most `limit` rows.
#[must_use]
pub fn rows_to_csv(rows: &QueryRows, limit: usize) -> String {
    let mut out = rows
        .columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');

    for row in rows.rows.iter().take(limit) {
        out.push_str(&row.iter().map(cell).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Column;
    use serde_json::json;

    #[test]
    fn test_rows_to_csv() {
        let rows = QueryRows::new(
            vec![Column::new("region", "text"), Column::new("total", "numeric")],
            vec![
                vec![json!("north"), json!(10.5)],
                vec![json!("south"), json!(null)],
            ],
        );
        assert_eq!(rows_to_csv(&rows, 10), "region,total\nnorth,10.5\nsouth,NULL\n");
    }

    #[test]
    fn test_rows_to_csv_caps_rows() {
        let rows = QueryRows::new(
            vec![Column::new("n", "int")],
            (0..25).map(|i| vec![json!(i)]).collect(),
        );
        let csv = rows_to_csv(&rows, 10);
        assert_eq!(csv.lines().count(), 11);
        assert!(csv.ends_with("9\n"));
    }
}
