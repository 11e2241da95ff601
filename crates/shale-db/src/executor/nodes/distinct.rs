use std::cmp::Ordering;

use bson::{Bson, Document};
use shale_query::path::resolve_values;
use shale_query::{CommandError, CompareResult, ErrorCode, Path, PathError, compare, compare_total};

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Collects the distinct values of `key` across `source`, yielding a
/// single `{values: [...]}` document.
///
/// Array values contribute their elements. Documents without the key are
/// ignored. Values are deduplicated by comparison (`1` and `1.0` are one
/// value) and returned in ascending order.
pub struct DistinctIter<'a> {
    source: Source<'a>,
    key: Path,
    done: bool,
}

impl<'a> DistinctIter<'a> {
    /// Parses `key` up front. On failure `source` is closed.
    pub fn new(source: DocIter<'a>, key: &str) -> Result<Self, DbError> {
        let source = Source::new("distinct", source);
        let key = Path::parse(key).map_err(|e| match e {
            PathError::Empty => CommandError::new(
                ErrorCode::EmptyFieldPath,
                "FieldPath cannot be constructed with empty string",
            ),
            PathError::EmptySegment(_) => CommandError::new(
                ErrorCode::PathContainsEmptyElement,
                "FieldPath field names may not be empty strings.",
            ),
        })?;
        Ok(Self {
            source,
            key,
            done: false,
        })
    }
}

/// Sort `values` and drop duplicates, keeping the first of each.
///
/// Values that tie in the total order form a run; only runs are scanned
/// for equality, so this is `O(n log n)` unless many values tie.
fn sorted_distinct(mut values: Vec<Bson>) -> Vec<Bson> {
    values.sort_by(compare_total);
    let mut distinct: Vec<Bson> = Vec::with_capacity(values.len());
    let mut run_start = 0;
    for value in values {
        if distinct.last().is_some_and(|last| compare_total(last, &value) != Ordering::Equal) {
            run_start = distinct.len();
        }
        if !distinct[run_start..].iter().any(|v| compare(v, &value) == CompareResult::Equal) {
            distinct.push(value);
        }
    }
    distinct
}

impl DocumentIter for DistinctIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.done {
            return Ok(None);
        }
        let mut values = Vec::new();
        while let Some(doc) = self.source.next()? {
            for value in resolve_values(&doc, &self.key) {
                match value {
                    Bson::Array(arr) => values.extend(arr.iter().cloned()),
                    other => values.push(other.clone()),
                }
            }
        }
        self.done = true;

        let mut doc = Document::new();
        doc.insert("values", sorted_distinct(values));
        Ok(Some(doc))
    }

    fn close(&mut self) {
        self.source.close();
    }
}
