//! Path-pattern matching for the gateway route table.
//!
//! Patterns are static segments mixed with `{param}` captures, with an
//! optional trailing `/*` splat:
//!
//! - `/2/schemas` matches only itself
//! - `/2/data/{type}/{id}` captures `type` and `id`
//! - `/2/files/*` matches any deeper path
//!
//! Trailing-slash normalization is applied to both patterns and request
//! paths.

use std::collections::HashMap;

#[derive(Debug)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path pattern.
#[derive(Debug)]
pub struct PathPattern {
    segments: Vec<Segment>,
    trailing_splat: bool,
}

/// Parameters captured from a matched request path, keyed by segment name.
pub type PathParams = HashMap<String, String>;

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let mut normalized = pattern.trim().trim_matches('/');

        let mut trailing_splat = false;
        if let Some(stripped) = normalized.strip_suffix("/*") {
            trailing_splat = true;
            normalized = stripped;
        }

        let segments = if normalized.is_empty() {
            Vec::new()
        } else {
            normalized
                .split('/')
                .map(|s| {
                    match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                        Some(name) => Segment::Param(name.to_string()),
                        None => Segment::Literal(s.to_string()),
                    }
                })
                .collect()
        };

        Self {
            segments,
            trailing_splat,
        }
    }

    /// Matches a request path, returning captured params on success.
    pub fn capture(&self, path: &str) -> Option<PathParams> {
        let normalized = path.trim().trim_matches('/');

        let request_segments: Vec<&str> = if normalized.is_empty() {
            Vec::new()
        } else {
            normalized.split('/').collect()
        };

        let mut params = PathParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            let request_segment = *request_segments.get(i)?;
            match segment {
                Segment::Literal(s) => {
                    if request_segment != s {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), request_segment.to_string());
                }
            }
        }

        if self.trailing_splat || self.segments.len() == request_segments.len() {
            Some(params)
        } else {
            None
        }
    }
}
