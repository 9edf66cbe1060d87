//! Typed dotted paths.
//!
//! A path such as `"complex.arr.0.id"` is parsed once into a sequence of
//! [`Segment`]s. A segment is an [`Segment::Index`] when it is a canonical
//! decimal number (`"0"`, `"12"`, but not `"012"` or `"+1"`), and a
//! [`Segment::Key`] otherwise.

use crate::error::{PathError, PathResult};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A sequence position.
    Index(usize),
}

impl Segment {
    fn parse(text: &str) -> Self {
        let canonical = text.bytes().all(|b| b.is_ascii_digit()) && (text == "0" || !text.starts_with('0'));
        if canonical {
            if let Ok(index) = text.parse::<usize>() {
                return Self::Index(index);
            }
        }
        Self::Key(text.to_owned())
    }

    /// The segment as a mapping key.
    ///
    /// Index segments spell their decimal text, which is how they address
    /// a mapping.
    #[must_use]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Key(key) => Cow::Borrowed(key),
            Self::Index(index) => Cow::Owned(index.to_string()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A parsed, non-empty dotted path into a [`State`](crate::State).
///
/// # Example
///
/// ```rust
/// use sman_core::path::{Path, Segment};
///
/// let path: Path = "complex.arr.0.id".parse().unwrap();
/// assert_eq!(path.top_level_key(), "complex");
/// assert_eq!(path.segments()[2], Segment::Index(0));
/// assert_eq!(path.to_string(), "complex.arr.0.id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse dotted text.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] for an empty string and
    /// [`PathError::EmptySegment`] when two dots are adjacent or the text
    /// starts or ends with a dot.
    pub fn parse(text: &str) -> PathResult<Self> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = text
            .split('.')
            .enumerate()
            .map(|(position, part)| {
                if part.is_empty() {
                    Err(PathError::EmptySegment {
                        path: text.to_owned(),
                        position,
                    })
                } else {
                    Ok(Segment::parse(part))
                }
            })
            .collect::<PathResult<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Build a path from segments. Returns `None` when `segments` is empty.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments; always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; paths cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The first segment, the unit of subscription.
    #[must_use]
    pub fn top_level_key(&self) -> Cow<'_, str> {
        self.segments[0].as_key()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&String> for Path {
    type Error = PathError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
