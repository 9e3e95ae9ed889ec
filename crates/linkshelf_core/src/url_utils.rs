//! URL helpers consulted by the resource handlers.
//!
//! # Responsibility
//! - Resolve relative image URLs against the resource's own origin.
//! - Extract a link's origin.
//! - Escape search keys into literal-match expressions.

use url::Url;

/// URL utilities injected into [`crate::ResourceRepository`].
pub trait UrlUtilities: Send + Sync {
    /// Resolves `raw` against `base_domain`.
    ///
    /// Absolute URLs come back unchanged, empty input stays empty.
    fn normalize_url(&self, raw: &str, base_domain: &str) -> String;

    /// Returns the origin (`scheme://host[:port]`) of `url`, if it has one.
    fn get_domain(&self, url: &str) -> Option<String>;

    /// Escapes characters with special meaning in pattern matching.
    fn escape_pattern(&self, key: &str) -> String;
}

/// Default [`UrlUtilities`] on the `url` and `regex` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUrlUtilities;

impl UrlUtilities for StandardUrlUtilities {
    fn normalize_url(&self, raw: &str, base_domain: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if Url::parse(raw).is_ok() {
            return raw.to_string();
        }

        Url::parse(base_domain)
            .and_then(|base| base.join(raw))
            .map_or_else(|_| raw.to_string(), |joined| joined.to_string())
    }

    fn get_domain(&self, url: &str) -> Option<String> {
        let origin = Url::parse(url.trim()).ok()?.origin();
        origin
            .is_tuple()
            .then(|| origin.ascii_serialization())
    }

    fn escape_pattern(&self, key: &str) -> String {
        regex::escape(key)
    }
}
