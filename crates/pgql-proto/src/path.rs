//! Field paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered list of segments addressing a value inside a JSONB document or a
/// direct column.
///
/// Paths are immutable once built; aliasing is handled by
/// [`FieldSelection`](crate::FieldSelection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Create a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dot-separated path (`"author.name"`).
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.').filter(|s| !s.is_empty()))
    }

    /// The path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    pub fn leaf_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Split off the first segment.
    pub fn split_first(&self) -> Option<(&str, FieldPath)> {
        let (head, rest) = self.segments.split_first()?;
        Some((head.as_str(), FieldPath::new(rest.iter().cloned())))
    }

    /// Return a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Dot-joined representation.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Normalise every segment from camelCase to snake_case.
    pub fn to_snake_case(&self) -> Self {
        Self::new(self.segments.iter().map(|s| to_snake_case(s)))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<String> for FieldPath {
    fn from(dotted: String) -> Self {
        Self::parse(&dotted)
    }
}

/// Convert a GraphQL-style camelCase name to snake_case.
///
/// Acronym runs stay together: `HTTPStatus` becomes `http_status`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
            Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
            _ => false,
        };

        if boundary && !out.ends_with('_') {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = FieldPath::parse("author.profile.name");
        assert_eq!(path.len(), 3);
        assert_eq!(path.leaf_name(), Some("name"));
        assert_eq!(path.to_string(), "author.profile.name");
    }

    #[test]
    fn test_split_first() {
        let path = FieldPath::parse("author.name");
        let (head, rest) = path.split_first().unwrap();
        assert_eq!(head, "author");
        assert_eq!(rest, FieldPath::parse("name"));
        assert!(FieldPath::new(Vec::<String>::new()).split_first().is_none());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("status"), "status");
        assert_eq!(to_snake_case("tenant_id"), "tenant_id");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
        assert_eq!(to_snake_case("userID"), "user_id");
        assert_eq!(to_snake_case("ipv4Address"), "ipv4_address");
    }

    #[test]
    fn test_path_snake_case() {
        let path = FieldPath::parse("authorProfile.displayName").to_snake_case();
        assert_eq!(path.dotted(), "author_profile.display_name");
    }
}
