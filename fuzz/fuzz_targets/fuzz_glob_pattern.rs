#![no_main]
use gatekeeper::{GlobMatcher, PathMatcher};
use libfuzzer_sys::fuzz_target;

// Arbitrary patterns must either compile or fail with an error, never panic
fuzz_target!(|input: (String, String)| {
    let (pattern, value) = input;

    let matcher = GlobMatcher::with_capacity(8);
    if let Ok(matched) = matcher.matches(&pattern, &value) {
        // Literal patterns match exactly themselves
        if !pattern.contains(['*', '?', '<']) {
            assert_eq!(matched, pattern == value);
        }
    }

    let _ = PathMatcher::matches(&pattern, &value);
});
