//! Whole-string glob matching for package selection
//!
//! `*` matches any run of characters except `/`, `**` matches any run
//! including `/`, and `?` matches a single non-`/` character. Everything else
//! is literal.

use monorun_core::{Error, Result};
use regex::Regex;

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern))
            .map_err(|e| Error::glob(pattern, e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Whether the pattern contains any wildcard at all
    pub fn has_wildcards(pattern: &str) -> bool {
        pattern.contains(['*', '?'])
    }
}

fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    let mut literal = String::new();

    while let Some(c) = chars.next() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                if c == '?' {
                    out.push_str("[^/]");
                } else if chars.peek() == Some(&'*') {
                    chars.next();
                    // Runs of three or more stars collapse into one `**`
                    while chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            _ => literal.push(c),
        }
    }

    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plugin-*", "plugin-x", true)]
    #[case("plugin-*", "plugin-", true)]
    #[case("plugin-*", "core", false)]
    #[case("plugin-*", "plugin-x/sub", false)]
    #[case("@acme/*", "@acme/ui", true)]
    #[case("@acme/*", "@other/ui", false)]
    #[case("packages/**", "packages/a/b/c", true)]
    #[case("**/legacy", "/ws/packages/legacy", true)]
    #[case("**", "anything/at/all", true)]
    #[case("core", "core", true)]
    #[case("core", "core-utils", false)]
    #[case("lib?", "lib1", true)]
    #[case("lib?", "lib/", false)]
    #[case("a.b", "axb", false)]
    #[case("(x)+[y]", "(x)+[y]", true)]
    fn test_glob_semantics(#[case] pattern: &str, #[case] candidate: &str, #[case] expected: bool) {
        let glob = GlobPattern::new(pattern).unwrap();
        assert_eq!(glob.is_match(candidate), expected, "{pattern} vs {candidate}");
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(GlobPattern::has_wildcards("plugin-*"));
        assert!(GlobPattern::has_wildcards("lib?"));
        assert!(!GlobPattern::has_wildcards("packages"));
    }
}
