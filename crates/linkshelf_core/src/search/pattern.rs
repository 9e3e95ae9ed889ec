//! Search pattern construction.
//!
//! # Invariants
//! - The key is escaped before it reaches the regex engine, so `.`, `*`,
//!   `(`, `|`, `[` and friends only ever match themselves.
//! - Patterns are unanchored: a match anywhere in the field counts.
//! - Matching is Unicode-aware and case-sensitive unless built with
//!   [`SearchPattern::case_insensitive`].

use regex::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CASE_INSENSITIVE_FLAG: &str = "(?i)";

/// Error raised when an escaped key does not compile.
///
/// Only reachable with a misbehaving escaper; the default one always
/// produces a valid expression.
#[derive(Debug)]
pub struct SearchError {
    expression: String,
    source: regex::Error,
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "search pattern `{}` is not a valid expression: {}",
            self.expression, self.source
        )
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Compiled literal substring pattern.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    expression: String,
    regex: Regex,
}

impl SearchPattern {
    /// Builds a case-sensitive pattern from an already escaped key.
    pub fn from_escaped(escaped: impl Into<String>) -> Result<Self, SearchError> {
        Self::compile(escaped.into())
    }

    /// Builds a pattern that ignores case from an already escaped key.
    pub fn case_insensitive(escaped: impl Into<String>) -> Result<Self, SearchError> {
        Self::compile(format!("{CASE_INSENSITIVE_FLAG}{}", escaped.into()))
    }

    fn compile(expression: String) -> Result<Self, SearchError> {
        match RegexBuilder::new(&expression).unicode(true).build() {
            Ok(regex) => Ok(Self { expression, regex }),
            Err(source) => Err(SearchError { expression, source }),
        }
    }

    /// Expression handed to the store's `REGEXP` operator.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}
