use bson::{Bson, Document};

use crate::compare::{CompareResult, compare};
use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::filter::{filter_document_with, filter_field_expr};
use crate::path::{Path, get_by_path};
use crate::value::{WholeNumberError, format_value, type_alias, whole_number};

use super::access;
use super::fields::document_id;

fn not_an_array(key: &str, value: &Bson, doc: &Document) -> CommandError {
    CommandError::new(
        ErrorCode::BadValue,
        format!(
            "The field '{key}' must be an array but is of type '{}' in document {{_id: {}}}",
            type_alias(value),
            document_id(doc)
        ),
    )
}

/// The array at `path`, created empty when missing. The flag is set when
/// the array was created.
fn array_mut<'a>(doc: &'a mut Document, key: &str, path: &Path) -> Result<(&'a mut Vec<Bson>, bool), CommandError> {
    let created = match get_by_path(doc, path) {
        None => {
            access::set(doc, path, Bson::Array(Vec::new()))?;
            true
        }
        Some(Bson::Array(_)) => false,
        Some(other) => return Err(not_an_array(key, other, doc)),
    };
    match access::get_mut(doc, path) {
        Some(Bson::Array(arr)) => Ok((arr, created)),
        _ => Err(CommandError::internal("$push", format!("path '{key}' is not an array after creation"))),
    }
}

/// The existing array at `path`. `None` when the field is missing, after
/// checking that the path could have been traversed.
fn existing_array_mut<'a>(
    doc: &'a mut Document,
    key: &str,
    path: &Path,
) -> Result<Option<&'a mut Vec<Bson>>, CommandError> {
    match get_by_path(doc, path) {
        None => {
            access::check_traversable(doc, path)?;
            return Ok(None);
        }
        Some(Bson::Array(_)) => {}
        Some(other) => return Err(not_an_array(key, other, doc)),
    }
    match access::get_mut(doc, path) {
        Some(Bson::Array(arr)) => Ok(Some(arr)),
        _ => Ok(None),
    }
}

/// `$each` modifier of `$push` / `$addToSet`, or the value itself.
fn each_values<'a>(op: &str, value: &'a Bson, mismatch: ErrorCode) -> Result<Vec<&'a Bson>, CommandError> {
    let Bson::Document(spec) = value else {
        return Ok(vec![value]);
    };
    match spec.get("$each") {
        None => Ok(vec![value]),
        Some(Bson::Array(each)) => Ok(each.iter().collect()),
        Some(other) => {
            let separator = if op == "$push" { ":" } else { "" };
            Err(CommandError::new(
                mismatch,
                format!(
                    "The argument to $each in {op} must be an array but it was of type{separator} {}",
                    type_alias(other)
                ),
            ))
        }
    }
}

fn equal(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == CompareResult::Equal
}

/// `$pop`: Remove the last (`1`) or first (`-1`) element of an array.
///
/// A missing field or an empty array is not a change.
pub(crate) fn op_pop(doc: &mut Document, key: &str, path: &Path, value: &Bson) -> Result<bool, CommandError> {
    let end = whole_number(value).map_err(|_: WholeNumberError| {
        let shown = match value {
            Bson::String(s) => s.clone(),
            other => format_value(other),
        };
        CommandError::new(
            ErrorCode::FailedToParse,
            format!("Expected a number in: {key}: \"{shown}\""),
        )
    })?;
    if end != 1 && end != -1 {
        return Err(CommandError::new(
            ErrorCode::FailedToParse,
            format!("$pop expects 1 or -1, found: {end}"),
        ));
    }

    match get_by_path(doc, path) {
        None => {
            access::check_traversable(doc, path)?;
            return Ok(false);
        }
        Some(Bson::Array(_)) => {}
        Some(other) => {
            return Err(CommandError::new(
                ErrorCode::TypeMismatch,
                format!(
                    "Path '{key}' contains an element of non-array type '{}'",
                    type_alias(other)
                ),
            ));
        }
    }

    let Some(Bson::Array(arr)) = access::get_mut(doc, path) else {
        return Ok(false);
    };
    if arr.is_empty() {
        return Ok(false);
    }
    if end == 1 {
        arr.pop();
    } else {
        arr.remove(0);
    }
    Ok(true)
}

/// `$push`: Append a value (or each value of `{$each: [...]}`) to an
/// array, creating the array when the field is missing.
pub(crate) fn op_push(doc: &mut Document, key: &str, path: &Path, value: &Bson) -> Result<bool, CommandError> {
    let values = each_values("$push", value, ErrorCode::BadValue)?;
    let (arr, created) = array_mut(doc, key, path)?;
    arr.extend(values.iter().map(|v| (*v).clone()));
    Ok(created || !values.is_empty())
}

/// `$addToSet`: Append values not already present in the array.
pub(crate) fn op_add_to_set(doc: &mut Document, key: &str, path: &Path, value: &Bson) -> Result<bool, CommandError> {
    let values = each_values("$addToSet", value, ErrorCode::TypeMismatch)?;
    let (arr, mut changed) = array_mut(doc, key, path)?;
    for v in values {
        if !arr.iter().any(|elem| equal(elem, v)) {
            arr.push(v.clone());
            changed = true;
        }
    }
    Ok(changed)
}

/// `$pullAll`: Remove every element equal to any of the given values.
pub(crate) fn op_pull_all(doc: &mut Document, key: &str, path: &Path, value: &Bson) -> Result<bool, CommandError> {
    let Bson::Array(remove) = value else {
        return Err(CommandError::new(
            ErrorCode::BadValue,
            format!(
                "The field '{key}' must be an array but is of type '{}'",
                type_alias(value)
            ),
        ));
    };
    let Some(arr) = existing_array_mut(doc, key, path)? else {
        return Ok(false);
    };
    let before = arr.len();
    arr.retain(|elem| !remove.iter().any(|r| equal(elem, r)));
    Ok(arr.len() != before)
}

/// `$pull`: Remove every element matching a condition.
///
/// - `{$gt: 3}`-style operator documents are applied to each element
/// - other documents are queries against document elements
/// - any other value removes equal elements
pub(crate) fn op_pull(
    doc: &mut Document,
    key: &str,
    path: &Path,
    condition: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let Some(arr) = existing_array_mut(doc, key, path)? else {
        return Ok(false);
    };

    let mut keep = Vec::with_capacity(arr.len());
    for elem in arr.iter() {
        keep.push(!pull_matches(elem, key, condition, config)?);
    }
    let before = arr.len();
    let mut flags = keep.into_iter();
    arr.retain(|_| flags.next().unwrap_or(true));
    Ok(arr.len() != before)
}

fn pull_matches(elem: &Bson, key: &str, condition: &Bson, config: &QueryConfig) -> Result<bool, CommandError> {
    match condition {
        Bson::Document(cond) if cond.keys().next().is_some_and(|k| k.starts_with('$')) => {
            filter_field_expr(&[elem], key, cond, config)
        }
        Bson::Document(query) => match elem {
            Bson::Document(sub) => filter_document_with(sub, query, config),
            _ => Ok(false),
        },
        other => Ok(equal(elem, other)),
    }
}
