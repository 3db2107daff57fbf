//! SQL text helpers for the query executor guard.

use regex::Regex;
use std::sync::LazyLock;

/// Statement keywords that modify data or schema.
pub const WRITE_COMMANDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE", "MERGE",
];

// Group 1 captures single-quoted literals so comment markers inside them survive.
static COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"('(?:''|[^'])*')|(--[^\n]*|/\*[\s\S]*?\*/|#[^\n]*)")
        .expect("comment pattern is valid")
});

/// Removes `--`, `#` and `/* */` comments, keeping string literals intact.
#[must_use]
pub fn remove_sql_comments(sql: &str) -> String {
    COMMENTS
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            caps.get(1).map_or(String::new(), |m| m.as_str().to_string())
        })
        .into_owned()
}

/// Returns true unless the first keyword of `sql` is a write command.
#[must_use]
pub fn is_read_only_query(sql: &str) -> bool {
    let stripped = remove_sql_comments(sql);
    let Some(first) = stripped.split_whitespace().next() else {
        return true;
    };
    let keyword = first.trim_start_matches('(').to_ascii_uppercase();
    !WRITE_COMMANDS.contains(&keyword.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_comments() {
        let sql = "-- header\nSELECT a, /* inline */ b FROM t # trailing\nWHERE c = 1";
        assert_eq!(remove_sql_comments(sql), "\nSELECT a,  b FROM t \nWHERE c = 1");
    }

    #[test]
    fn test_remove_comments_keeps_literals() {
        let sql = "SELECT '-- not a comment', 'it''s # fine' FROM t";
        assert_eq!(remove_sql_comments(sql), sql);
    }

    #[test]
    fn test_read_only_select() {
        assert!(is_read_only_query("SELECT * FROM orders"));
        assert!(is_read_only_query("  with x as (select 1) select * from x"));
    }

    #[test]
    fn test_write_commands_rejected() {
        for sql in [
            "DELETE FROM orders",
            "drop table orders",
            "/* sneaky */ INSERT INTO t VALUES (1)",
            "-- note\nupdate t set a = 1",
            "Truncate t",
        ] {
            assert!(!is_read_only_query(sql), "{sql}");
        }
    }
}
