//! Scalar SQL functions installed on every store connection.
//!
//! SQLite parses `X REGEXP Y` but ships no implementation; the operator is
//! rewritten to `regexp(Y, X)`, so argument 0 is the pattern and argument 1
//! the candidate text.

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registers `regexp(pattern, text)` backed by the `regex` crate.
///
/// The compiled pattern is cached as auxiliary data, so a statement binding
/// one pattern compiles it once no matter how many rows it scans. `NULL`
/// text never matches.
pub fn register_regexp_function(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |value| -> Result<_, BoxError> {
                Ok(Regex::new(value.as_str()?)?)
            })?;

            let matched = match ctx.get_raw(1) {
                ValueRef::Null => false,
                value => {
                    let text = value
                        .as_str()
                        .map_err(|err| rusqlite::Error::UserFunctionError(err.into()))?;
                    pattern.is_match(text)
                }
            };
            Ok(matched)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::register_regexp_function;
    use rusqlite::Connection;

    fn matches(conn: &Connection, text: Option<&str>, pattern: &str) -> bool {
        conn.query_row("SELECT ?1 REGEXP ?2;", rusqlite::params![text, pattern], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn regexp_operator_uses_rust_regex_semantics() {
        let conn = Connection::open_in_memory().unwrap();
        register_regexp_function(&conn).unwrap();

        assert!(matches(&conn, Some("http://example.com/a"), r"e\.com/a"));
        assert!(!matches(&conn, Some("http://exampleXcom/a"), r"e\.com/a"));
        assert!(matches(&conn, Some("Grüße aus Köln"), "Köln"));
    }

    #[test]
    fn regexp_operator_treats_null_as_no_match() {
        let conn = Connection::open_in_memory().unwrap();
        register_regexp_function(&conn).unwrap();

        assert!(!matches(&conn, None, "anything"));
    }

    #[test]
    fn invalid_pattern_surfaces_as_sqlite_error() {
        let conn = Connection::open_in_memory().unwrap();
        register_regexp_function(&conn).unwrap();

        let result: rusqlite::Result<bool> =
            conn.query_row("SELECT 'abc' REGEXP '(';", [], |row| row.get(0));
        assert!(result.is_err());
    }
}
