use std::fmt;

use bson::{Bson, Document};

/// Why a dotted field name could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path '{0}' contains an empty field name")]
    EmptySegment(String),
}

/// A parsed dotted field name: `"a.b.0.c"` → `["a", "b", "0", "c"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn parse(s: &str) -> Result<Path, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(s.to_string()));
        }
        Ok(Path { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment.
    pub fn prefix(&self) -> &str {
        &self.segments[0]
    }

    /// Last segment.
    pub fn suffix(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// The path without its first segment. `None` for single-segment paths.
    pub fn trim_prefix(&self) -> Option<Path> {
        (self.segments.len() > 1).then(|| Path {
            segments: self.segments[1..].to_vec(),
        })
    }

    /// The path without its last segment. `None` for single-segment paths.
    pub fn trim_suffix(&self) -> Option<Path> {
        (self.segments.len() > 1).then(|| Path {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Whether the path ends with the positional placeholder `$`.
    pub fn is_positional(&self) -> bool {
        self.suffix() == "$"
    }

    pub fn is_prefix_of(&self, other: &Path) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Parse a segment as an array index. Only plain decimal digits qualify.
pub(crate) fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Resolve `path` to every value it reaches in `doc`.
///
/// Documents are descended by key. Arrays are indexed when the segment is
/// a number, otherwise every document element is descended ("fan-out");
/// nested arrays are not entered. Missing branches simply drop out.
pub fn resolve_values<'a>(doc: &'a Document, path: &Path) -> Vec<&'a Bson> {
    let (first, rest) = match path.segments.split_first() {
        Some(split) => split,
        None => return Vec::new(),
    };

    let mut current: Vec<&'a Bson> = doc.get(first).into_iter().collect();
    for segment in rest {
        let mut next = Vec::with_capacity(current.len());
        for value in current {
            step(value, segment, &mut next);
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    current
}

fn step<'a>(value: &'a Bson, segment: &str, out: &mut Vec<&'a Bson>) {
    match value {
        Bson::Document(doc) => out.extend(doc.get(segment)),
        Bson::Array(arr) => match array_index(segment) {
            Some(i) => out.extend(arr.get(i)),
            None => {
                for elem in arr {
                    if let Bson::Document(doc) = elem {
                        out.extend(doc.get(segment));
                    }
                }
            }
        },
        _ => {}
    }
}

/// Resolve `path` into uniform one-key leaf documents `{suffix: value}`.
pub fn resolve(doc: &Document, path: &Path) -> (String, Vec<Document>) {
    let key = path.suffix().to_string();
    let leaves = resolve_values(doc, path)
        .into_iter()
        .map(|value| {
            let mut leaf = Document::new();
            leaf.insert(key.clone(), value.clone());
            leaf
        })
        .collect();
    (key, leaves)
}

/// Value at `path` following only documents and numeric array indexes.
pub fn get_by_path<'a>(doc: &'a Document, path: &Path) -> Option<&'a Bson> {
    let (first, rest) = path.segments.split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        current = match current {
            Bson::Document(d) => d.get(segment)?,
            Bson::Array(arr) => arr.get(array_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}
