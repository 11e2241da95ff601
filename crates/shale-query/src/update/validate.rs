use bson::{Bson, Document};

use crate::error::{CommandError, ErrorCode};
use crate::path::{Path, PathError};
use crate::value::{format_value, type_alias};

/// Update operators in validation order.
pub(crate) const OPERATORS: [&str; 15] = [
    "$currentDate",
    "$inc",
    "$max",
    "$min",
    "$mul",
    "$set",
    "$unset",
    "$setOnInsert",
    "$rename",
    "$pop",
    "$push",
    "$addToSet",
    "$pullAll",
    "$pull",
    "$bit",
];

/// What an update document asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Only `$`-prefixed modifiers.
    Operators,
    /// No modifiers: the document replaces everything but `_id`.
    Replacement,
}

/// Validate `update` before anything is mutated.
///
/// Checks, in order:
/// - every `$` key is a known modifier, and modifiers are not mixed with
///   plain fields
/// - every modifier value is a document
/// - no path is empty, and no path is a prefix of (or equal to) another
///   path anywhere in the update
/// - `$currentDate` and `$rename` arguments are well formed
pub fn validate_update(update: &Document) -> Result<UpdateKind, CommandError> {
    let mut modifiers = 0;
    for key in update.keys() {
        if OPERATORS.contains(&key.as_str()) {
            modifiers += 1;
        } else if key.starts_with('$') {
            return Err(CommandError::new(
                ErrorCode::FailedToParse,
                format!(
                    "Unknown modifier: {key}. Expected a valid update modifier or pipeline-style update specified as an array"
                ),
            ));
        }
    }
    if modifiers == 0 {
        return Ok(UpdateKind::Replacement);
    }
    if modifiers != update.len() {
        return Err(CommandError::new(
            ErrorCode::DollarPrefixedFieldName,
            "The dollar ($) prefixed field is not allowed in the context of an update's replacement document.",
        ));
    }

    let mut visited: Vec<Path> = Vec::new();
    for op in OPERATORS {
        let Some(fields) = operator_fields(update, op)? else { continue };
        if op == "$rename" {
            continue;
        }
        for key in fields.keys() {
            let path = update_path(key)?;
            check_conflict(&visited, &path, key)?;
            visited.push(path);
        }
    }

    validate_current_date(update)?;
    validate_rename(update, &mut visited)?;

    Ok(UpdateKind::Operators)
}

/// The document argument of `op`, if `update` has it.
pub(crate) fn operator_fields<'a>(update: &'a Document, op: &str) -> Result<Option<&'a Document>, CommandError> {
    match update.get(op) {
        None => Ok(None),
        Some(Bson::Document(fields)) => Ok(Some(fields)),
        Some(other) => Err(CommandError::new(
            ErrorCode::FailedToParse,
            format!(
                "Modifiers operate on fields but we found type {} instead. For example: {{$mod: {{<field>: ...}}}} not {{{op}: {}}}",
                type_alias(other),
                format_value(other)
            ),
        )),
    }
}

/// Parse an update path; empty names are `EmptyName`.
pub(crate) fn update_path(key: &str) -> Result<Path, CommandError> {
    Path::parse(key).map_err(|e| match e {
        PathError::Empty | PathError::EmptySegment(_) => CommandError::new(
            ErrorCode::EmptyName,
            format!("The update path '{key}' contains an empty field name, which is not allowed."),
        ),
    })
}

fn check_conflict(visited: &[Path], path: &Path, key: &str) -> Result<(), CommandError> {
    if visited.iter().any(|seen| seen.is_prefix_of(path) || path.is_prefix_of(seen)) {
        return Err(conflict(key));
    }
    Ok(())
}

fn conflict(key: &str) -> CommandError {
    CommandError::new(
        ErrorCode::ConflictingUpdateOperators,
        format!("Updating the path '{key}' would create a conflict at '{key}'"),
    )
}

fn validate_current_date(update: &Document) -> Result<(), CommandError> {
    let Some(fields) = operator_fields(update, "$currentDate")? else {
        return Ok(());
    };
    for value in fields.values() {
        match value {
            Bson::Boolean(_) => {}
            Bson::Document(spec) => {
                if let Some(option) = spec.keys().find(|k| *k != "$type") {
                    return Err(CommandError::new(
                        ErrorCode::BadValue,
                        format!("Unrecognized $currentDate option: {option}"),
                    ));
                }
                match spec.get("$type") {
                    None => {}
                    Some(Bson::String(t)) if t == "date" || t == "timestamp" => {}
                    Some(_) => {
                        return Err(CommandError::new(
                            ErrorCode::BadValue,
                            "The '$type' string field is required to be 'date' or 'timestamp': {$currentDate: {field : {$type: 'date'}}}",
                        ));
                    }
                }
            }
            other => {
                return Err(CommandError::new(
                    ErrorCode::BadValue,
                    format!(
                        "{} is not valid type for $currentDate. Please use a boolean ('true') or a $type expression ({{$type: 'timestamp/date'}}).",
                        type_alias(other)
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// `$rename` sources and targets join the conflict set, so a rename can
/// neither collide with another modifier nor with itself.
fn validate_rename(update: &Document, visited: &mut Vec<Path>) -> Result<(), CommandError> {
    let Some(fields) = operator_fields(update, "$rename")? else {
        return Ok(());
    };
    for (source, target) in fields {
        let Bson::String(target) = target else {
            return Err(CommandError::new(
                ErrorCode::BadValue,
                format!(
                    "The 'to' field for $rename must be a string: {source}: {}",
                    format_value(target)
                ),
            ));
        };
        if source == target {
            return Err(CommandError::new(
                ErrorCode::BadValue,
                format!("The source and target field for $rename must differ: {source}: \"{target}\""),
            ));
        }
        if source.is_empty() || target.is_empty() {
            return Err(CommandError::new(ErrorCode::EmptyName, "An empty update path is not valid."));
        }
        for key in [source, target] {
            let path = update_path(key)?;
            check_conflict(visited, &path, key)?;
            visited.push(path);
        }
    }
    Ok(())
}
