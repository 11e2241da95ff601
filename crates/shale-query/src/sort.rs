use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::compare::{SortDirection, compare_for_sort};
use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::path::{Path, PathError, get_by_path};
use crate::value::{WholeNumberError, format_value, whole_number};

/// One key of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: Path,
    pub direction: SortDirection,
}

/// Parse a sort specification (`{ "a": 1, "b.c": -1 }`) into its keys.
pub fn parse_sort(spec: &Document, config: &QueryConfig) -> Result<Vec<Sort>, CommandError> {
    if spec.len() > config.max_sort_keys {
        return Err(CommandError::with_argument(
            ErrorCode::BadValue,
            format!("maximum sort keys exceeded: {}", spec.len()),
            "sort",
        ));
    }

    spec.iter()
        .map(|(key, value)| {
            let field = sort_path(key)?;
            let direction = sort_direction(key, value)?;
            Ok(Sort { field, direction })
        })
        .collect()
}

fn sort_path(key: &str) -> Result<Path, CommandError> {
    if key.contains('$') {
        return Err(CommandError::with_argument(
            ErrorCode::FieldPathInvalidName,
            "FieldPath field names may not start with '$'. Consider using $getField or $setField.",
            "sort",
        ));
    }
    Path::parse(key).map_err(|e| match e {
        PathError::Empty => CommandError::with_argument(
            ErrorCode::EmptyFieldPath,
            "FieldPath cannot be constructed with empty string",
            "sort",
        ),
        PathError::EmptySegment(_) => CommandError::with_argument(
            ErrorCode::PathContainsEmptyElement,
            "FieldPath field names may not be empty strings.",
            "sort",
        ),
    })
}

fn sort_direction(key: &str, value: &Bson) -> Result<SortDirection, CommandError> {
    let order = whole_number(value).map_err(|e| match e {
        WholeNumberError::UnexpectedType => {
            let shown = match value {
                Bson::String(s) => s.clone(),
                other => format_value(other),
            };
            CommandError::with_argument(
                ErrorCode::SortBadValue,
                format!("Illegal key in $sort specification: {key}: {shown}"),
                "$sort",
            )
        }
        _ => CommandError::with_argument(ErrorCode::BadValue, "$sort must be a whole number", "$sort"),
    })?;

    match order {
        1 => Ok(SortDirection::Asc),
        -1 => Ok(SortDirection::Desc),
        _ => Err(CommandError::with_argument(
            ErrorCode::SortBadOrder,
            "$sort key ordering must be 1 (for ascending) or -1 (for descending)",
            "$sort",
        )),
    }
}

/// Sort `docs` in place by `spec`.
///
/// Keys compare lexicographically in spec order; a missing field sorts as
/// `null`. The sort is stable, so documents equal on every key keep their
/// relative order.
pub fn sort_documents(docs: &mut [Document], spec: &Document) -> Result<(), CommandError> {
    sort_documents_with(docs, spec, &QueryConfig::default())
}

/// [`sort_documents`] with explicit limits.
pub fn sort_documents_with(
    docs: &mut [Document],
    spec: &Document,
    config: &QueryConfig,
) -> Result<(), CommandError> {
    let sorts = parse_sort(spec, config)?;
    if sorts.is_empty() {
        return Ok(());
    }
    docs.sort_by(|a, b| compare_documents(a, b, &sorts));
    Ok(())
}

/// Composite ordering of two documents under parsed sort keys.
pub fn compare_documents(a: &Document, b: &Document, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let a_field = get_by_path(a, &sort.field).unwrap_or(&Bson::Null);
        let b_field = get_by_path(b, &sort.field).unwrap_or(&Bson::Null);
        let ord = compare_for_sort(a_field, b_field, sort.direction);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
