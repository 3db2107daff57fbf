//! Tool naming conventions.

/// Suffix of schema getter tool names.
pub const SCHEMA_GETTER_SUFFIX: &str = "SchemaGetter";

/// Suffix of query executor tool names.
pub const QUERY_EXECUTOR_SUFFIX: &str = "QueryExecutor";

/// Camel-cases a connection name.
///
/// Runs of `_` and `-` become word breaks, every word is title-cased
/// (first letter upper, remaining letters lower, with any non-letter
/// starting a new word), breaks are dropped and the first character is
/// lowercased: `sales_data` becomes `salesData`, `HR-Payroll` becomes
/// `hrPayroll`.
#[must_use]
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            prev_is_letter = false;
            continue;
        }
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }

    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the schema getter bound to a connection.
#[must_use]
pub fn schema_getter_name(connection_name: &str) -> String {
    format!("{}{SCHEMA_GETTER_SUFFIX}", camel_case(connection_name))
}

/// Name of the query executor bound to a connection.
#[must_use]
pub fn query_executor_name(connection_name: &str) -> String {
    format!("{}{QUERY_EXECUTOR_SUFFIX}", camel_case(connection_name))
}

/// Derives the sibling executor name from a schema getter name.
#[must_use]
pub fn sibling_executor_name(schema_tool_name: &str) -> Option<String> {
    schema_tool_name
        .strip_suffix(SCHEMA_GETTER_SUFFIX)
        .map(|prefix| format!("{prefix}{QUERY_EXECUTOR_SUFFIX}"))
}
