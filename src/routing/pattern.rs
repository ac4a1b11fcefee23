//! Path template compilation.
//!
//! Accepted segment forms:
//! - `items` literal
//! - `{id}`, `{id=*}` or `:id` single-segment variable
//! - `{path=**}` or `*path` wildcard, consumes the rest of the path
//!
//! The last segment may carry a verb suffix (`/v1/jobs/{id}:cancel`).
//! Empty segments are ignored, so `/a//b/` compiles like `/a/b`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error produced while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path template must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("empty variable name in segment {0:?}")]
    EmptyVariable(String),

    #[error("duplicate variable {0:?}")]
    DuplicateVariable(String),

    #[error("wildcard {0:?} must be the last segment")]
    WildcardNotLast(String),

    #[error("unsupported segment {0:?}")]
    InvalidSegment(String),

    #[error("empty verb suffix in {0:?}")]
    EmptyVerb(String),
}

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
    Wildcard(String),
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
    verb: Option<String>,
}

impl PathPattern {
    /// Compile a template such as `/items/{id}`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let body = template
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(template.to_string()))?;

        let mut raw: Vec<&str> = body.split('/').filter(|s| !s.is_empty()).collect();

        let mut verb = None;
        if let Some(last) = raw.last_mut() {
            if let Some((segment, suffix)) = split_verb(last) {
                if suffix.is_empty() {
                    return Err(PatternError::EmptyVerb(template.to_string()));
                }
                verb = Some(suffix.to_string());
                *last = segment;
            }
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(raw.len());
        let count = raw.len();

        for (i, s) in raw.into_iter().enumerate() {
            let segment = parse_segment(s)?;
            match &segment {
                Segment::Variable(name) | Segment::Wildcard(name) => {
                    if !seen.insert(name.clone()) {
                        return Err(PatternError::DuplicateVariable(name.clone()));
                    }
                    if matches!(segment, Segment::Wildcard(_)) && i + 1 != count {
                        return Err(PatternError::WildcardNotLast(name.clone()));
                    }
                }
                Segment::Literal(_) => {}
            }
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            verb,
        })
    }

    /// The source template.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Trailing verb suffix, if any.
    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// Variable and wildcard names in path order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(n) | Segment::Wildcard(n) => Some(n.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Split `seg:verb` into its parts. A leading `:` (variable syntax) and a
/// `:` inside braces are not verb separators.
fn split_verb(segment: &str) -> Option<(&str, &str)> {
    let from = if segment.starts_with('{') {
        segment.find('}').map(|i| i + 1)?
    } else if segment.starts_with(':') {
        1
    } else {
        0
    };
    segment[from..]
        .find(':')
        .map(|i| (&segment[..from + i], &segment[from + i + 1..]))
}

fn parse_segment(s: &str) -> Result<Segment, PatternError> {
    if let Some(inner) = s.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| PatternError::InvalidSegment(s.to_string()))?;
        let (name, pattern) = match inner.split_once('=') {
            Some((n, p)) => (n.trim(), Some(p.trim())),
            None => (inner.trim(), None),
        };
        if name.is_empty() {
            return Err(PatternError::EmptyVariable(s.to_string()));
        }
        return match pattern {
            None | Some("*") => Ok(Segment::Variable(name.to_string())),
            Some("**") => Ok(Segment::Wildcard(name.to_string())),
            Some(_) => Err(PatternError::InvalidSegment(s.to_string())),
        };
    }

    if let Some(name) = s.strip_prefix(':') {
        if name.is_empty() {
            return Err(PatternError::EmptyVariable(s.to_string()));
        }
        return Ok(Segment::Variable(name.to_string()));
    }

    if let Some(name) = s.strip_prefix('*') {
        if name.is_empty() {
            return Err(PatternError::EmptyVariable(s.to_string()));
        }
        return Ok(Segment::Wildcard(name.to_string()));
    }

    if s.contains(['{', '}']) {
        return Err(PatternError::InvalidSegment(s.to_string()));
    }

    Ok(Segment::Literal(s.to_string()))
}
