//! Key Pattern Module
//!
//! Glob matching over whole keys. `*` matches any run of characters
//! (separators included), `?` one character, `[...]` a character class.

use glob::Pattern;

use crate::error::{CacheError, Result};

// == Key Pattern ==
/// A compiled glob pattern for bulk invalidation.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    pattern: Pattern,
}

impl KeyPattern {
    /// Compiles `pattern`, failing with `InvalidPattern` when malformed.
    ///
    /// Runs of `*` collapse to one, so `**` is an ordinary wildcard rather
    /// than a path component.
    pub fn new(pattern: &str) -> Result<Self> {
        Pattern::new(&collapse_stars(pattern))
            .map(|pattern| Self { pattern })
            .map_err(|source| CacheError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// True when the entire key matches.
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

fn collapse_stars(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}
