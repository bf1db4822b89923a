//! Quoting helpers for ledger table names and LIKE patterns

/// Double-quote one name part for DDL and DML text.
///
/// Embedded `"` characters are doubled, so ledger and index names from
/// configuration can never close the quoted identifier early.
///
/// # Examples
/// ```
/// use ml_db::sql_utils::quote_ident;
/// assert_eq!(quote_ident("orm_migrations"), r#""orm_migrations""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote every dot-separated part of a table name.
///
/// # Examples
/// ```
/// use ml_db::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("ledger.orm_migrations"), r#""ledger"."orm_migrations""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    let parts: Vec<String> = name.split('.').map(quote_ident).collect();
    parts.join(".")
}

/// Schema and table parts of `name`, as `information_schema` stores them.
///
/// Only the last dot separates; a bare table name belongs to `main`.
///
/// # Examples
/// ```
/// use ml_db::sql_utils::split_qualified_name;
/// assert_eq!(split_qualified_name("orm_migrations"), ("main", "orm_migrations"));
/// assert_eq!(split_qualified_name("ledger.orm_migrations"), ("ledger", "orm_migrations"));
/// ```
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("main", name))
}

/// Escape character paired with [`escape_like`] in `LIKE ... ESCAPE '\'`.
pub const LIKE_ESCAPE: char = '\\';

/// Escape `%`, `_` and the escape character itself so `value` matches
/// literally inside a LIKE pattern.
///
/// # Examples
/// ```
/// use ml_db::sql_utils::escape_like;
/// assert_eq!(escape_like("2020"), "2020");
/// assert_eq!(escape_like("2020_a%"), r"2020\_a\%");
/// ```
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}
