//! Route pattern compilation.
//!
//! Patterns are plain paths with `{name}` (required) and `{name?}`
//! (optional) segments. Compilation to an anchored regex happens once at
//! registration; matching at dispatch is a single regex run with named
//! captures.
//!
//! `{name}` becomes `(?P<name>[^/]+)`, one non-empty segment. `{name?}`
//! makes the whole `/segment` optional, so `/urunler/{sayfa?}` matches both
//! `/urunler` and `/urunler/2`.

use super::RouterError;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct CompiledPattern {
    regex: Regex,
    params: Vec<String>,
}

impl CompiledPattern {
    /// Compiles a route pattern into an anchored regex.
    ///
    /// # Errors
    /// Rejects malformed placeholders, duplicate parameter names, and
    /// required segments after an optional one (the regex would be
    /// ambiguous).
    pub(crate) fn compile(pattern: &str) -> Result<Self, RouterError> {
        let invalid = |reason: &str| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut source = String::from("^");
        let mut params = Vec::new();
        let mut seen_optional = false;

        for segment in pattern.split('/').skip(1) {
            if segment.is_empty() {
                // Trailing slash on the pattern; dispatch normalizes paths
                // the same way, so nothing to emit.
                continue;
            }

            if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let (name, optional) = match inner.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (inner, false),
                };

                if name.is_empty() ||
                    !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') ||
                    name.starts_with(|c: char| c.is_ascii_digit())
                {
                    return Err(invalid("parameter names must be [a-zA-Z_][a-zA-Z0-9_]*"));
                }
                if params.iter().any(|p| p == name) {
                    return Err(invalid("duplicate parameter name"));
                }
                if seen_optional && !optional {
                    return Err(invalid("required segment after an optional one"));
                }

                params.push(name.to_string());
                if optional {
                    seen_optional = true;
                    source.push_str(&format!("(?:/(?P<{name}>[^/]+))?"));
                } else {
                    source.push_str(&format!("/(?P<{name}>[^/]+)"));
                }
            } else {
                if segment.contains(['{', '}']) {
                    return Err(invalid("unbalanced braces in segment"));
                }
                source.push('/');
                source.push_str(&regex::escape(segment));
            }
        }

        if source == "^" {
            // The root pattern "/".
            source.push('/');
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| invalid(&format!("regex compilation failed: {e}")))?;

        Ok(Self { regex, params })
    }

    /// Matches a normalized path, returning the captured parameters.
    /// Optional parameters that did not match are simply absent.
    pub(crate) fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;

        let mut params = HashMap::with_capacity(self.params.len());
        for name in &self.params {
            if let Some(value) = captures.name(name) {
                params.insert(name.clone(), value.as_str().to_string());
            }
        }
        Some(params)
    }
}
