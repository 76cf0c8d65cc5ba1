//! Route pattern compilation
//!
//! A pattern such as `/users/:id/posts/:postId` is split on `/`. Segments that
//! start with `:` capture one or more non-`/` characters, every other segment
//! must match literally. Matching is anchored at both ends, so a pattern never
//! matches a prefix or suffix of a path.

use crate::error::RouteError;
use std::collections::BTreeMap;

const PLACEHOLDER_MARKER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder,
}

/// Compiled route pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl Pattern {
    /// Compile a route template.
    ///
    /// A lone `:` segment is a literal, matching what a `:name` token needs
    /// at least one name character. Placeholder names must be unique.
    pub fn compile(source: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();

        for raw in source.split('/') {
            match raw.strip_prefix(PLACEHOLDER_MARKER) {
                Some(name) if !name.is_empty() => {
                    if names.iter().any(|n| n == name) {
                        return Err(RouteError::DuplicatePlaceholder {
                            pattern: source.to_string(),
                            name: name.to_string(),
                        });
                    }
                    names.push(name.to_string());
                    segments.push(Segment::Placeholder);
                }
                _ => segments.push(Segment::Literal(raw.to_string())),
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
            names,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in left-to-right order
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    pub fn is_literal(&self) -> bool {
        self.names.is_empty()
    }

    /// Match `path` and return the captured values in placeholder order
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        if self.is_literal() {
            return (path == self.source).then(Vec::new);
        }

        let mut parts = path.split('/');
        let mut captured = Vec::with_capacity(self.names.len());

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Placeholder if part.is_empty() => return None,
                Segment::Placeholder => captured.push(part),
            }
        }

        // Anchored at the end: leftover path segments mean no match
        if parts.next().is_some() {
            return None;
        }

        Some(captured)
    }

    /// Match `path` and zip placeholder names with captured values
    pub fn extract(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captured = self.captures(path)?;
        Some(
            self.names
                .iter()
                .cloned()
                .zip(captured.into_iter().map(str::to_string))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_names_in_order() {
        let p = Pattern::compile("/users/:id/posts/:postId").unwrap();
        assert_eq!(p.param_names(), ["id", "postId"]);
        assert!(!p.is_literal());
    }

    #[test]
    fn test_extract_params() {
        let p = Pattern::compile("/users/:id/posts/:postId").unwrap();
        let params = p.extract("/users/42/posts/abc").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["postId"], "abc");
    }

    #[test]
    fn test_anchored_both_ends() {
        let p = Pattern::compile("/users/:id").unwrap();
        assert!(p.captures("/users/1/extra").is_none());
        assert!(p.captures("/api/users/1").is_none());
        assert!(p.captures("/users/").is_none());
        assert!(p.captures("/users").is_none());
    }

    #[test]
    fn test_trailing_slash_is_significant() {
        let p = Pattern::compile("/about").unwrap();
        assert!(p.captures("/about").is_some());
        assert!(p.captures("/about/").is_none());

        let p = Pattern::compile("/items/:id/").unwrap();
        assert!(p.captures("/items/3/").is_some());
        assert!(p.captures("/items/3").is_none());
    }

    #[test]
    fn test_literal_characters_are_not_regex() {
        let p = Pattern::compile("/file.json").unwrap();
        assert!(p.captures("/file.json").is_some());
        assert!(p.captures("/fileXjson").is_none());
    }

    #[test]
    fn test_case_sensitive() {
        let p = Pattern::compile("/Users/:id").unwrap();
        assert!(p.captures("/users/1").is_none());
    }

    #[test]
    fn test_lone_marker_is_literal() {
        let p = Pattern::compile("/a/:").unwrap();
        assert!(p.is_literal());
        assert!(p.captures("/a/:").is_some());
        assert!(p.captures("/a/b").is_none());
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let err = Pattern::compile("/a/:id/b/:id").unwrap_err();
        assert!(matches!(
            err,
            RouteError::DuplicatePlaceholder { ref name, .. } if name == "id"
        ));
    }
}
