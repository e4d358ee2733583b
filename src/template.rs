//! # Template variables for module launch parameters.
//!
//! Module descriptors carry `${name}` placeholders in their `args`, `env` and
//! channel bindings. [`resolve`] expands them from a [`Variables`] set.
//!
//! ## Rules
//! - Only keys present in the set are expanded; unknown tokens stay verbatim.
//! - Keys match case-sensitively and literally (no patterns).
//! - Expansion is a single left-to-right pass: substituted text is never
//!   rescanned, so the order in which keys were inserted cannot change the result.
//!
//! ## Example
//! ```rust
//! use rtmngr::{resolve, Variables};
//!
//! let vars = Variables::from_pairs([("scene", "ascene")]);
//! assert_eq!(resolve("SCENE=${scene}", &vars), "SCENE=ascene");
//! assert_eq!(resolve("X=${missing}", &vars), "X=${missing}");
//! ```

use std::collections::BTreeMap;

use url::Url;

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Ordered set of template variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Variables {
    vars: BTreeMap<String, String>,
}

impl Variables {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(key, value)` pairs; later pairs win.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = Self::new();
        for (k, v) in pairs {
            out.insert(k, v);
        }
        out
    }

    /// Parses query parameters from a page URL (`https://host/path?scene=a`) or a bare
    /// query string (`scene=a&ns=b`, optionally with a leading `?`).
    ///
    /// Values are percent-decoded. Repeated keys keep the last value.
    pub fn from_query(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) => Self::from_pairs(url.query_pairs().into_owned()),
            Err(_) => {
                let query = input.trim_start_matches('?');
                Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
            }
        }
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Returns the value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns a new set with `top` layered over `self` (`top` wins on conflicts).
    #[must_use]
    pub fn overlay(&self, top: &Variables) -> Variables {
        let mut out = self.clone();
        out.vars
            .extend(top.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// True if no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Expands every `${key}` in `text` whose key is bound in `vars`.
///
/// Never fails. Unterminated `${` and unknown keys are copied unchanged.
pub fn resolve(text: &str, vars: &Variables) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some(end) = after.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
