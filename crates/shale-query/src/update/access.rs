use bson::{Bson, Document};

use crate::error::{CommandError, ErrorCode};
use crate::path::{Path, array_index};
use crate::value::format_value;

/// Arrays are never padded past this many elements.
const MAX_PADDING: usize = 1_500_000;

/// Mutable counterpart of [`crate::path::get_by_path`]: follows documents
/// and numeric array indexes, never fans out.
pub(crate) fn get_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Bson> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = doc.get_mut(first)?;
    for segment in rest {
        current = match current {
            Bson::Document(d) => d.get_mut(segment)?,
            Bson::Array(arr) => arr.get_mut(array_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set `value` at `path`, creating missing intermediate documents.
///
/// A numeric segment indexes into an array, padding it with `null` when the
/// index is past the end. Traversing through a scalar, or naming an array
/// element with a non-numeric segment, is `UnsuitableValueType`.
pub(crate) fn set(doc: &mut Document, path: &Path, value: Bson) -> Result<(), CommandError> {
    set_in_document(doc, path.segments(), value)
}

fn set_in_document(doc: &mut Document, segments: &[String], value: Bson) -> Result<(), CommandError> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        doc.insert(first.clone(), value);
        return Ok(());
    }
    if !doc.contains_key(first) {
        doc.insert(first.clone(), Document::new());
    }
    match doc.get_mut(first) {
        Some(child) => set_in_value(child, first, rest, value),
        None => Ok(()),
    }
}

fn set_in_value(target: &mut Bson, key: &str, segments: &[String], value: Bson) -> Result<(), CommandError> {
    match target {
        Bson::Document(doc) => set_in_document(doc, segments, value),
        Bson::Array(arr) => set_in_array(arr, key, segments, value),
        other => Err(cannot_create(&segments[0], key, other)),
    }
}

fn set_in_array(arr: &mut Vec<Bson>, key: &str, segments: &[String], value: Bson) -> Result<(), CommandError> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };
    let Some(index) = array_index(first) else {
        return Err(cannot_create(first, key, &Bson::Array(arr.clone())));
    };
    if index >= arr.len() {
        if index - arr.len() > MAX_PADDING {
            return Err(CommandError::new(
                ErrorCode::BadValue,
                format!("can't backfill array to larger than {MAX_PADDING} elements"),
            ));
        }
        arr.resize(index + 1, Bson::Null);
        if !rest.is_empty() {
            arr[index] = Bson::Document(Document::new());
        }
    }
    if rest.is_empty() {
        arr[index] = value;
        return Ok(());
    }
    set_in_value(&mut arr[index], first, rest, value)
}

fn cannot_create(segment: &str, key: &str, element: &Bson) -> CommandError {
    CommandError::new(
        ErrorCode::UnsuitableValueType,
        format!(
            "Cannot create field '{segment}' in element {{{key}: {}}}",
            format_value(element)
        ),
    )
}

/// Remove the value at `path`. Array elements are replaced with `null`
/// so the positions of later elements do not shift.
pub(crate) fn remove(doc: &mut Document, path: &Path) -> Option<Bson> {
    let parent = match path.trim_suffix() {
        None => return doc.remove(path.suffix()),
        Some(parent) => get_mut(doc, &parent)?,
    };
    match parent {
        Bson::Document(d) => d.remove(path.suffix()),
        Bson::Array(arr) => {
            let slot = arr.get_mut(array_index(path.suffix())?)?;
            Some(std::mem::replace(slot, Bson::Null))
        }
        _ => None,
    }
}

/// Check that a missing `path` could be traversed at all.
///
/// Fine when no part of the path exists. Reaching a scalar before the last
/// segment, or an array through a non-numeric segment, is
/// `UnsuitableValueType`.
pub(crate) fn check_traversable(doc: &Document, path: &Path) -> Result<(), CommandError> {
    let full = path.to_string();
    let segments = path.segments();
    let mut current: &Bson = match doc.get(&segments[0]) {
        Some(value) => value,
        None => return Ok(()),
    };
    let mut parent_key = segments[0].as_str();

    for next in &segments[1..] {
        current = match current {
            Bson::Document(d) => match d.get(next) {
                Some(value) => value,
                None => return Ok(()),
            },
            Bson::Array(arr) => match array_index(next) {
                Some(i) => match arr.get(i) {
                    Some(value) => value,
                    None => return Ok(()),
                },
                None => return Err(cannot_traverse(next, &full, parent_key, current)),
            },
            other => return Err(cannot_traverse(next, &full, parent_key, other)),
        };
        parent_key = next;
    }
    Ok(())
}

fn cannot_traverse(part: &str, full: &str, parent_key: &str, element: &Bson) -> CommandError {
    CommandError::new(
        ErrorCode::UnsuitableValueType,
        format!(
            "Cannot use the part ({part}) of ({full}) to traverse the element ({{{parent_key}: {}}})",
            format_value(element)
        ),
    )
}
