//! Pattern matchers
//!
//! A [`Matcher`] decides whether a policy's declared patterns match a
//! request value. The enforcer never interprets patterns itself, so swapping
//! the matcher changes pattern semantics without touching evaluation.
//!
//! Bundled matchers:
//! - [`GlobMatcher`] (default) - `*`, `?` and `<regex>` segments
//! - [`PathMatcher`](super::PathMatcher) - `/`-separated paths with `*` and `**`
//! - [`ExactMatcher`] - plain string equality
//!
//! Every bundled matcher treats an empty pattern set as "no match".

use super::Policy;
use crate::error::MatchError;
use lru::LruCache;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;

/// Decides whether declared patterns match request values
pub trait Matcher: Send + Sync {
    /// Match `value` against any pattern in `patterns`
    ///
    /// Used for the action, resource and scope dimensions of `policy`.
    fn match_policy(
        &self,
        policy: &Policy,
        patterns: &[String],
        value: &str,
    ) -> Result<bool, MatchError>;

    /// Match a single role pattern against the request role
    fn match_role(&self, pattern: &str, role: &str) -> Result<bool, MatchError>;
}

/// Plain string equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
    fn match_policy(
        &self,
        _policy: &Policy,
        patterns: &[String],
        value: &str,
    ) -> Result<bool, MatchError> {
        Ok(patterns.iter().any(|p| p == value))
    }

    fn match_role(&self, pattern: &str, role: &str) -> Result<bool, MatchError> {
        Ok(pattern == role)
    }
}

/// Glob matcher with embedded regular expressions
///
/// - `*` matches any run of characters, including none
/// - `?` matches exactly one character
/// - `<expr>` matches the regular expression `expr`; `expr` may itself
///   contain balanced `<`/`>` pairs such as `(?P<id>[0-9]+)`
/// - everything else matches literally
///
/// Wildcards also match line breaks, so `secrets/*` covers `secrets/a\nb`.
///
/// Compiled patterns are kept in an LRU cache.
///
/// # Examples
/// ```
/// use gatekeeper::GlobMatcher;
///
/// let matcher = GlobMatcher::new();
/// assert!(matcher.matches("docs/*", "docs/readme.md").unwrap());
/// assert!(matcher.matches("user:<[0-9]+>", "user:42").unwrap());
/// assert!(!matcher.matches("user:<[0-9]+>", "user:bob").unwrap());
/// assert!(matcher.matches("user:<[0-9]+", "user:42").is_err());
/// ```
pub struct GlobMatcher {
    cache: Mutex<LruCache<String, Regex>>,
}

impl GlobMatcher {
    /// Default number of compiled patterns kept in memory
    pub const DEFAULT_CACHE_CAPACITY: usize = 512;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CACHE_CAPACITY)
    }

    /// Create a matcher caching up to `capacity` compiled patterns
    /// (a capacity of 0 is treated as 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        GlobMatcher {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Match a single pattern against a value
    pub fn matches(&self, pattern: &str, value: &str) -> Result<bool, MatchError> {
        if !is_glob(pattern) {
            return Ok(pattern == value);
        }

        if let Some(re) = self.cache.lock().get(pattern) {
            return Ok(re.is_match(value));
        }

        let re = compile(pattern)?;
        let matched = re.is_match(value);
        self.cache.lock().put(pattern.to_string(), re);
        Ok(matched)
    }

    /// Number of compiled patterns currently cached
    pub fn cached_patterns(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Default for GlobMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobMatcher")
            .field("cached_patterns", &self.cached_patterns())
            .finish()
    }
}

impl Matcher for GlobMatcher {
    fn match_policy(
        &self,
        _policy: &Policy,
        patterns: &[String],
        value: &str,
    ) -> Result<bool, MatchError> {
        for pattern in patterns {
            if self.matches(pattern, value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn match_role(&self, pattern: &str, role: &str) -> Result<bool, MatchError> {
        self.matches(pattern, role)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '<'])
}

/// Translate a glob pattern into an anchored regular expression
fn compile(pattern: &str) -> Result<Regex, MatchError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '<' => {
                let Some(end) = closing_delimiter(rest) else {
                    return Err(MatchError::UnbalancedDelimiter {
                        pattern: pattern.to_string(),
                    });
                };
                expr.push_str("(?:");
                expr.push_str(&rest[..end]);
                expr.push(')');
                rest = &rest[end + 1..];
            }
            literal => expr.push_str(&regex::escape(literal.encode_utf8(&mut [0; 4]))),
        }
    }

    expr.push('$');
    RegexBuilder::new(&expr)
        .dot_matches_new_line(true)
        .build()
        .map_err(|source| MatchError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Byte offset of the `>` closing an embedded expression, skipping nested
/// `<`/`>` pairs and backslash escapes
fn closing_delimiter(expr: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in expr.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '<' => depth += 1,
            '>' if depth == 0 => return Some(i),
            '>' => depth -= 1,
            _ => {}
        }
    }
    None
}
