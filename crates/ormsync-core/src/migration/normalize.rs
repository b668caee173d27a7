//! Type and default-value normalization, identifier and literal escaping.
//!
//! Declared and introspected values pass through the same normalizer
//! before they are compared.

/// Integer base types whose display width carries no storage meaning.
const INTEGER_TYPES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];

/// Normalize a SQL type for comparison.
///
/// Lowercases, removes insignificant whitespace, maps `boolean`/`bool` to
/// `tinyint(1)` and `integer` to `int`, and strips integer display widths
/// except the `tinyint(1)` boolean marker.
pub fn normalize_type(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let compact = collapsed
        .replace(" (", "(")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(", ", ",")
        .replace(" ,", ",");

    let (base, rest) = match compact.find(|c: char| c == '(' || c == ' ') {
        Some(idx) => compact.split_at(idx),
        None => (compact.as_str(), ""),
    };

    let base = match base {
        "boolean" | "bool" => return format!("tinyint(1){}", rest),
        "integer" => "int",
        other => other,
    };

    if INTEGER_TYPES.contains(&base) && rest.starts_with('(') {
        if let Some(close) = rest.find(')') {
            let width = &rest[1..close];
            let tail = &rest[close + 1..];
            if base == "tinyint" && width == "1" {
                return format!("tinyint(1){}", tail);
            }
            return format!("{}{}", base, tail);
        }
    }

    format!("{}{}", base, rest)
}

/// Normalize a default value for comparison.
///
/// `None` and `NULL` both mean no default. Surrounding quotes are stripped,
/// `true`/`false` become `1`/`0`, and `current_timestamp()` is folded into
/// `CURRENT_TIMESTAMP`. Everything else compares as literal text.
pub fn normalize_default(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        return None;
    }

    let unquoted = strip_quotes(trimmed);

    if unquoted.eq_ignore_ascii_case("true") {
        return Some("1".to_string());
    }
    if unquoted.eq_ignore_ascii_case("false") {
        return Some("0".to_string());
    }

    let bare = unquoted.strip_suffix("()").unwrap_or(unquoted);
    if bare.eq_ignore_ascii_case("current_timestamp") || bare.eq_ignore_ascii_case("now") {
        return Some("CURRENT_TIMESTAMP".to_string());
    }

    Some(unquoted.to_string())
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal by hand: backslashes and single quotes are
/// backslash-escaped.
pub fn escape_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Naive singularization: drops one trailing `s`.
///
/// Irregular plurals (`people`, `statuses`) are not handled; pass an
/// explicit join table name when the derived one is wrong.
pub fn singularize(table: &str) -> &str {
    match table.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem,
        _ => table,
    }
}
