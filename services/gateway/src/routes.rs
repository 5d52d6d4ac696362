//! Route classification
//!
//! Paths are matched against Ant-style patterns split on `/`:
//! - `**` matches any number of segments, including none
//! - `*` inside a segment matches any run of characters in that segment
//! - anything else matches literally
//!
//! Public patterns win over protected ones; unmatched paths are `Default`.

use serde::Serialize;

use crate::config::RouteConfig;

/// Access class of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    /// Admitted without identity
    Public,
    /// Requires a valid identity
    Protected,
    /// Not configured, admitted without identity
    Default,
}

impl RouteClass {
    /// Whether admission depends on a valid principal
    #[must_use]
    pub const fn requires_identity(self) -> bool {
        matches!(self, Self::Protected)
    }
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Protected => f.write_str("protected"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// A compiled path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<String>,
}

impl PathPattern {
    /// Compile a pattern such as `/api/**` or `/v*/docs`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            raw: pattern.to_string(),
            segments: split_segments(pattern).map(str::to_string).collect(),
        }
    }

    /// Pattern source text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `path` matches this pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path_segments: Vec<&str> = split_segments(path).collect();
        let pattern_segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match_segments(&pattern_segments, &path_segments)
    }
}

/// Path classifier built from configured pattern lists
#[derive(Debug, Clone, Default)]
pub struct RouteClassifier {
    public: Vec<PathPattern>,
    protected: Vec<PathPattern>,
}

impl RouteClassifier {
    /// Compile the configured pattern lists
    #[must_use]
    pub fn new(config: &RouteConfig) -> Self {
        Self::from_patterns(&config.public_patterns, &config.protected_patterns)
    }

    /// Build from raw pattern lists
    pub fn from_patterns<S: AsRef<str>>(public: &[S], protected: &[S]) -> Self {
        Self {
            public: public.iter().map(|p| PathPattern::new(p.as_ref())).collect(),
            protected: protected.iter().map(|p| PathPattern::new(p.as_ref())).collect(),
        }
    }

    /// Classify a request path
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public.iter().any(|p| p.matches(path)) {
            RouteClass::Public
        } else if self.protected.iter().any(|p| p.matches(path)) {
            RouteClass::Protected
        } else {
            RouteClass::Default
        }
    }
}

/// Percent-decode `path` and resolve `.` and `..` segments
///
/// Returns `None` for a path that climbs above the root, carries a broken
/// `%` escape or decodes to invalid UTF-8.
#[must_use]
pub fn normalize_path(path: &str) -> Option<String> {
    if !has_valid_escapes(path) {
        return None;
    }
    let decoded = urlencoding::decode(path).ok()?;
    if decoded.contains('\0') {
        return None;
    }

    let mut resolved: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                resolved.pop()?;
            }
            other => resolved.push(other),
        }
    }

    Some(format!("/{}", resolved.join("/")))
}

fn has_valid_escapes(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    })
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((head, rest)) => match path.split_first() {
            Some((segment, path_rest)) => {
                match_segment(head, segment) && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

/// Match one segment, `*` standing for any run of characters
fn match_segment(pattern: &str, segment: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == segment;
    }

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut remaining) = segment.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = parts.collect();
    let Some((last, inner)) = middle.split_last() else {
        return true;
    };

    for part in inner {
        match remaining.find(part) {
            Some(index) => remaining = &remaining[index + part.len()..],
            None => return false,
        }
    }

    remaining.len() >= last.len() && remaining.ends_with(last)
}
