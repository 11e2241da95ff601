mod access;
mod arrays;
mod fields;
mod validate;

use std::cmp::Ordering;

use bson::{Bson, DateTime, Document};

use crate::compare::{CompareResult, compare};
use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};

pub use validate::{UpdateKind, validate_update};
use validate::{operator_fields, update_path};

/// Whether the document being updated already existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// An existing document: `$setOnInsert` is skipped.
    #[default]
    Update,
    /// A document created by an upsert: `$setOnInsert` applies.
    Insert,
}

/// Apply `update` to `doc` in place. Returns whether anything changed.
///
/// `update` is either a set of modifiers (`{$set: {...}, $inc: {...}}`) or
/// a replacement document. The whole update is validated before `doc` is
/// touched; a failure while applying leaves `doc` partially updated, so
/// callers that need atomicity work on a copy.
pub fn update_document(doc: &mut Document, update: &Document) -> Result<bool, CommandError> {
    update_document_with(doc, update, UpdateMode::Update, &QueryConfig::default())
}

/// [`update_document`] with an explicit mode and limits.
pub fn update_document_with(
    doc: &mut Document,
    update: &Document,
    mode: UpdateMode,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    match validate_update(update)? {
        UpdateKind::Replacement => replace(doc, update),
        UpdateKind::Operators => apply_operators(doc, update, mode, config),
    }
}

/// Replace every field but `_id`.
fn replace(doc: &mut Document, replacement: &Document) -> Result<bool, CommandError> {
    if let (Some(current), Some(new)) = (doc.get("_id"), replacement.get("_id")) {
        if compare(current, new) != CompareResult::Equal {
            return Err(CommandError::new(
                ErrorCode::ImmutableField,
                "Performing an update on the path '_id' would modify the immutable field '_id'",
            ));
        }
    }

    if fields_except_id(doc).eq(fields_except_id(replacement)) {
        return Ok(false);
    }

    let id = doc.remove("_id");
    doc.clear();
    if let Some(id) = id {
        doc.insert("_id", id);
    }
    for (key, value) in replacement {
        doc.insert(key.clone(), value.clone());
    }
    Ok(true)
}

fn fields_except_id(doc: &Document) -> impl Iterator<Item = (&String, &Bson)> {
    doc.iter().filter(|(key, _)| key.as_str() != "_id")
}

fn apply_operators(
    doc: &mut Document,
    update: &Document,
    mode: UpdateMode,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let now = DateTime::now();
    let mut changed = false;

    for op in update.keys() {
        let Some(args) = operator_fields(update, op)? else { continue };
        let updated = match op.as_str() {
            "$set" => for_each_sorted(args, |key, value| fields::op_set(doc, &update_path(key)?, value))?,
            "$setOnInsert" if mode == UpdateMode::Insert => for_each_sorted(args, |key, value| {
                // null and empty arrays are not inserted
                match value {
                    Bson::Null => Ok(false),
                    Bson::Array(arr) if arr.is_empty() => Ok(false),
                    _ => fields::op_set(doc, &update_path(key)?, value),
                }
            })?,
            "$setOnInsert" => false,
            "$unset" => for_each(args, |key, _| Ok(fields::op_unset(doc, &update_path(key)?)))?,
            "$inc" => for_each(args, |key, value| fields::op_inc(doc, key, &update_path(key)?, value))?,
            "$mul" => for_each(args, |key, value| fields::op_mul(doc, key, &update_path(key)?, value))?,
            "$min" => for_each_sorted(args, |key, value| {
                fields::op_min_max(doc, &update_path(key)?, value, Ordering::Less)
            })?,
            "$max" => for_each_sorted(args, |key, value| {
                fields::op_min_max(doc, &update_path(key)?, value, Ordering::Greater)
            })?,
            "$currentDate" => for_each_sorted(args, |key, value| {
                fields::op_current_date(doc, &update_path(key)?, value, now)
            })?,
            "$rename" => for_each_sorted(args, |key, value| {
                let target = match value {
                    Bson::String(target) => target.as_str(),
                    _ => return Ok(false),
                };
                fields::op_rename(doc, &update_path(key)?, &update_path(target)?)
            })?,
            "$bit" => for_each(args, |key, value| fields::op_bit(doc, &update_path(key)?, value))?,
            "$pop" => for_each(args, |key, value| arrays::op_pop(doc, key, &update_path(key)?, value))?,
            "$push" => for_each(args, |key, value| arrays::op_push(doc, key, &update_path(key)?, value))?,
            "$addToSet" => for_each(args, |key, value| {
                arrays::op_add_to_set(doc, key, &update_path(key)?, value)
            })?,
            "$pullAll" => for_each(args, |key, value| {
                arrays::op_pull_all(doc, key, &update_path(key)?, value)
            })?,
            "$pull" => for_each(args, |key, value| {
                arrays::op_pull(doc, key, &update_path(key)?, value, config)
            })?,
            _ => false,
        };
        changed |= updated;
    }

    Ok(changed)
}

/// Run `f` over the operator's fields in document order, OR-ing the
/// change flags.
fn for_each(
    fields: &Document,
    mut f: impl FnMut(&str, &Bson) -> Result<bool, CommandError>,
) -> Result<bool, CommandError> {
    let mut changed = false;
    for (key, value) in fields {
        changed |= f(key, value)?;
    }
    Ok(changed)
}

/// [`for_each`] in key order.
fn for_each_sorted(
    fields: &Document,
    mut f: impl FnMut(&str, &Bson) -> Result<bool, CommandError>,
) -> Result<bool, CommandError> {
    let mut entries: Vec<(&String, &Bson)> = fields.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut changed = false;
    for (key, value) in entries {
        changed |= f(key, value)?;
    }
    Ok(changed)
}
