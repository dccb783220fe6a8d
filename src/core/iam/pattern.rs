//! Hierarchical path matching
//!
//! Patterns and values are `/`-separated paths. Within a pattern:
//! - `*` - Matches exactly one path segment (e.g., `/users/*/profile`)
//! - `**` - Matches any number of segments, including none (e.g., `/admin/**`)
//! - `*` inside a segment matches any run of characters in that segment (e.g., `*.txt`)
//!
//! Both sides are normalized first, so `.` and `..` cannot be used to
//! escape a prefix.

use super::{Matcher, Policy};
use crate::error::MatchError;

/// Matcher for resource hierarchies
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMatcher;

impl PathMatcher {
    /// Check if a path matches a pattern
    ///
    /// # Examples
    /// ```
    /// use gatekeeper::PathMatcher;
    ///
    /// assert!(PathMatcher::matches("/users/*", "/users/alice"));
    /// assert!(PathMatcher::matches("/admin/**", "/admin/users/bob"));
    /// assert!(!PathMatcher::matches("/users/*", "/admin/alice"));
    /// assert!(!PathMatcher::matches("/public/**", "/public/../private/key"));
    /// ```
    pub fn matches(pattern: &str, path: &str) -> bool {
        let pattern = segments(pattern);
        let path = segments(path);
        match_segments(&pattern, &path)
    }
}

impl Matcher for PathMatcher {
    fn match_policy(
        &self,
        _policy: &Policy,
        patterns: &[String],
        value: &str,
    ) -> Result<bool, MatchError> {
        Ok(patterns.iter().any(|p| Self::matches(p, value)))
    }

    fn match_role(&self, pattern: &str, role: &str) -> Result<bool, MatchError> {
        Ok(Self::matches(pattern, role))
    }
}

/// Split a path into segments, dropping empty ones and resolving `.` and `..`
fn segments(path: &str) -> Vec<&str> {
    let mut resolved = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            _ => resolved.push(part),
        }
    }
    resolved
}

/// Segment-wise match, filled in from the last pattern segment backwards.
/// `next[j]` holds whether the remaining pattern matches `path[j..]`, which
/// keeps `**` at O(pattern * path) instead of backtracking.
fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    let n = path.len();
    let mut next = vec![false; n + 1];
    next[n] = true;

    for &seg_pat in pattern.iter().rev() {
        let mut current = vec![false; n + 1];
        for j in (0..=n).rev() {
            current[j] = if seg_pat == "**" {
                // ** consumes zero segments, or one and stays in place
                next[j] || (j < n && current[j + 1])
            } else {
                j < n && next[j + 1] && segment_matches(seg_pat, path[j])
            };
        }
        next = current;
    }

    next[0]
}

/// Match one segment, where `*` stands for any run of characters
fn segment_matches(pattern: &str, segment: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == segment;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);

    if segment.len() < first.len() + last.len()
        || !segment.starts_with(first)
        || !segment.ends_with(last)
    {
        return false;
    }

    // Middle parts must appear in order between prefix and suffix
    let mut middle = &segment[first.len()..segment.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match middle.find(part) {
            Some(found) => middle = &middle[found + part.len()..],
            None => return false,
        }
    }

    true
}
