//! # Hierarchical event addresses.
//!
//! [`Path`] is an ordered sequence of string segments. The empty sequence is the
//! root. Every subscription and every event position is a `Path`.
//!
//! ## Canonical form
//! ```text
//! root            "/"
//! concrete        "/editor/toolbar/save"
//! query           "?/editor/*/save"
//! ```
//!
//! The canonical string is what the registry is indexed by, so two paths are the
//! same address exactly when their strings are equal.
//!
//! ## Queries
//! A [`PathKind::Query`] path is a pattern: `*` matches any single segment.
//! Queries are addressable like any other path (handlers can subscribe on them)
//! but never bubble and never take part in broadcasting.

use std::fmt;
use std::str::FromStr;

use crate::error::EventError;

/// Segment matching exactly one segment in a query.
pub const WILDCARD: &str = "*";

/// Distinguishes concrete addresses from query patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKind {
    /// A single location in the address space.
    Concrete,
    /// A pattern matching several concrete locations.
    Query,
}

/// Hierarchical address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    kind: PathKind,
    segments: Vec<String>,
}

impl Path {
    /// The root address (`"/"`).
    #[must_use]
    pub fn root() -> Self {
        Self {
            kind: PathKind::Concrete,
            segments: Vec::new(),
        }
    }

    /// Builds a concrete path from segments.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] if a segment is empty or contains `/`.
    pub fn new<I, S>(segments: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(PathKind::Concrete, segments)
    }

    /// Builds a query path from segments (`*` matches one segment).
    ///
    /// # Errors
    /// Same as [`Path::new`].
    pub fn query<I, S>(segments: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(PathKind::Query, segments)
    }

    fn build<I, S>(kind: PathKind, segments: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(|s| {
                let s = s.into();
                check_segment(&s)?;
                Ok(s)
            })
            .collect::<Result<Vec<_>, EventError>>()?;
        Ok(Self { kind, segments })
    }

    /// Parses the canonical string form.
    ///
    /// A leading `?` makes a query; empty segments (`//`) are skipped.
    ///
    /// ```
    /// use eventspace::Path;
    ///
    /// let p = Path::parse("/a/b").unwrap();
    /// assert_eq!(p.segments(), ["a", "b"]);
    /// assert!(Path::parse("?/a/*").unwrap().is_query());
    /// assert!(Path::parse("/").unwrap().is_root());
    /// ```
    ///
    /// # Errors
    /// Never for well-formed input; kept fallible to share validation with [`Path::new`].
    pub fn parse(s: &str) -> Result<Self, EventError> {
        let (kind, rest) = match s.strip_prefix('?') {
            Some(rest) => (PathKind::Query, rest),
            None => (PathKind::Concrete, s),
        };
        Self::build(kind, rest.split('/').filter(|seg| !seg.is_empty()))
    }

    /// The segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for a path with no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for the root address. Query roots (`"?/"`) are not the root.
    pub fn is_root(&self) -> bool {
        self.kind == PathKind::Concrete && self.segments.is_empty()
    }

    /// Address kind.
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// True for query patterns.
    pub fn is_query(&self) -> bool {
        self.kind == PathKind::Query
    }

    /// Canonical string used as the registry key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns a copy with one more segment at the end.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an invalid segment.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, EventError> {
        let mut out = self.clone();
        out.push(segment)?;
        Ok(out)
    }

    /// Appends a segment in place.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an invalid segment.
    pub fn push(&mut self, segment: impl Into<String>) -> Result<(), EventError> {
        let segment = segment.into();
        check_segment(&segment)?;
        self.segments.push(segment);
        Ok(())
    }

    /// Inserts a segment at the front in place.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an invalid segment.
    pub fn prepend(&mut self, segment: impl Into<String>) -> Result<(), EventError> {
        let segment = segment.into();
        check_segment(&segment)?;
        self.segments.insert(0, segment);
        Ok(())
    }

    /// Removes and returns the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// The enclosing address, `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// Concatenates `other`'s segments onto this path, keeping this path's kind.
    #[must_use]
    pub fn join(&self, other: &Path) -> Self {
        let mut out = self.clone();
        out.segments.extend(other.segments.iter().cloned());
        out
    }

    /// True when this path equals `other` or lies below it.
    ///
    /// Paths of different kinds are never relative to each other.
    pub fn is_relative_to(&self, other: &Path) -> bool {
        self.kind == other.kind && self.segments.starts_with(&other.segments)
    }

    /// True when `other` equals this path or lies below it.
    pub fn is_root_of(&self, other: &Path) -> bool {
        other.is_relative_to(self)
    }

    /// The part of this path below `base`, as a concrete relative path.
    pub fn strip_prefix(&self, base: &Path) -> Option<Self> {
        if !self.is_relative_to(base) {
            return None;
        }
        Some(Self {
            kind: PathKind::Concrete,
            segments: self.segments[base.segments.len()..].to_vec(),
        })
    }

    /// Tests a concrete path against this path.
    ///
    /// Concrete paths match only themselves; queries match segment-wise with `*`.
    pub fn matches(&self, concrete: &Path) -> bool {
        if concrete.is_query() {
            return false;
        }
        match self.kind {
            PathKind::Concrete => self.segments == concrete.segments,
            PathKind::Query => {
                self.segments.len() == concrete.segments.len()
                    && self
                        .segments
                        .iter()
                        .zip(&concrete.segments)
                        .all(|(pat, seg)| pat == WILDCARD || pat == seg)
            }
        }
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == PathKind::Query {
            f.write_str("?")?;
        }
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

fn check_segment(segment: &str) -> Result<(), EventError> {
    if segment.is_empty() {
        return Err(EventError::invalid("path segment must not be empty"));
    }
    if segment.contains('/') {
        return Err(EventError::invalid(format!(
            "path segment `{segment}` must not contain '/'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_canonical_strings() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(p("/a/b").to_string(), "/a/b");
        assert_eq!(p("a//b/").to_string(), "/a/b");
        assert_eq!(p("?/a/*").to_string(), "?/a/*");
        assert_eq!(p("?").to_string(), "?/");
    }

    #[test]
    fn test_relative_and_root_of() {
        assert!(p("/a/b").is_relative_to(&p("/a")));
        assert!(p("/a").is_relative_to(&p("/a")));
        assert!(p("/a").is_relative_to(&Path::root()));
        assert!(!p("/ab").is_relative_to(&p("/a")));
        assert!(!p("/a").is_relative_to(&p("/a/b")));
        assert!(p("/a").is_root_of(&p("/a/b/c")));
        assert!(!p("?/a/b").is_relative_to(&p("/a")));
    }

    #[test]
    fn test_pop_walks_to_root() {
        let mut path = p("/a/b");
        assert_eq!(path.pop().as_deref(), Some("b"));
        assert_eq!(path.pop().as_deref(), Some("a"));
        assert!(path.is_root());
        assert_eq!(path.pop(), None);
    }

    #[test]
    fn test_append_and_prepend() {
        let mut path = p("/b");
        path.prepend("a").unwrap();
        path.push("c").unwrap();
        assert_eq!(path.to_string(), "/a/b/c");
        assert!(path.push("x/y").is_err());
        assert!(path.child("").is_err());
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(p("/a/b/c").strip_prefix(&p("/a")), Some(p("/b/c")));
        assert_eq!(p("/a").strip_prefix(&p("/a")), Some(Path::root()));
        assert_eq!(p("/x").strip_prefix(&p("/a")), None);
    }

    #[test]
    fn test_query_matching() {
        let q = p("?/list/*/title");
        assert!(q.matches(&p("/list/3/title")));
        assert!(!q.matches(&p("/list/3/body")));
        assert!(!q.matches(&p("/list/title")));
        assert!(p("/a").matches(&p("/a")));
        assert!(!q.matches(&q));
    }
}
