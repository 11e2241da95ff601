mod positional;
mod slice;
mod tree;

use bson::{Bson, Document};

use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::filter::{filter_document_with, filter_field_expr};
use crate::path::Path;
use crate::value::{format_value, type_alias};

use self::slice::Slice;
use self::tree::FieldTree;

const POSITIONAL_LOCATION: &str = "Positional projection may only be used at the end, for example: a.b.$. If the query previously used a form like a.b.$.d, remove the parts following the '$' and the results will be equivalent.";

const INVALID_NAME: &str =
    "FieldPath field names may not start with '$'. Consider using $getField or $setField.";

fn projection_error(code: ErrorCode, message: impl Into<String>) -> CommandError {
    CommandError::with_argument(code, message, "projection")
}

/// Validate a projection document.
///
/// Returns the normalized projection and whether it is an inclusion
/// projection. Numbers are normalized to booleans (`0` excludes, anything
/// else includes); literal values are kept as new-value assignments;
/// `$elemMatch` and `$slice` operator documents are kept as-is and do not
/// decide the mode, except that an `$elemMatch` makes an otherwise
/// undecided projection an inclusion. `_id` may disagree with the other
/// fields.
///
/// An empty projection is an exclusion of nothing.
pub fn validate_projection(projection: &Document) -> Result<(Document, bool), CommandError> {
    let mut validated = Document::new();
    let mut inclusion: Option<bool> = None;
    let mut has_elem_match = false;

    for (key, value) in projection {
        validate_key(key)?;
        let positional = key.ends_with('$');

        let flag = match value {
            Bson::Document(op) => {
                validate_operator(key, op)?;
                has_elem_match |= op.contains_key("$elemMatch");
                validated.insert(key.clone(), value.clone());
                None
            }
            Bson::Boolean(b) => {
                validated.insert(key.clone(), *b);
                Some(*b)
            }
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                let included = !is_zero(value);
                validated.insert(key.clone(), included);
                Some(included)
            }
            Bson::Array(_)
            | Bson::String(_)
            | Bson::Binary(_)
            | Bson::ObjectId(_)
            | Bson::DateTime(_)
            | Bson::Null
            | Bson::RegularExpression(_)
            | Bson::Timestamp(_) => {
                validated.insert(key.clone(), value.clone());
                Some(true)
            }
            other => {
                return Err(projection_error(
                    ErrorCode::NotImplemented,
                    format!("projection value {} is not supported", format_value(other)),
                ));
            }
        };

        if projection.len() == 1 && key == "_id" {
            return Ok((validated, flag.unwrap_or(false)));
        }

        let Some(included) = flag else { continue };

        if !included && positional {
            return Err(projection_error(
                ErrorCode::ExclusionPositionalProjection,
                "positional projection cannot be used with exclusion",
            ));
        }

        if key == "_id" {
            continue;
        }
        match inclusion {
            None => inclusion = Some(included),
            Some(true) if !included => {
                return Err(projection_error(
                    ErrorCode::ProjectionExIn,
                    format!("Cannot do exclusion on field {key} in inclusion projection"),
                ));
            }
            Some(false) if included => {
                return Err(projection_error(
                    ErrorCode::ProjectionInEx,
                    format!("Cannot do inclusion on field {key} in exclusion projection"),
                ));
            }
            Some(_) => {}
        }
    }

    Ok((validated, inclusion.unwrap_or(has_elem_match)))
}

fn is_zero(value: &Bson) -> bool {
    match value {
        Bson::Int32(n) => *n == 0,
        Bson::Int64(n) => *n == 0,
        Bson::Double(f) => *f == 0.0,
        _ => false,
    }
}

fn validate_key(key: &str) -> Result<(), CommandError> {
    if key.is_empty() {
        return Err(projection_error(
            ErrorCode::EmptyFieldPath,
            "FieldPath cannot be constructed with empty string",
        ));
    }

    let path = Path::parse(key).map_err(|_| {
        if key.ends_with('$') {
            projection_error(ErrorCode::InvalidFieldPath, "FieldPath must not end with a '.'.")
        } else {
            projection_error(
                ErrorCode::PathContainsEmptyElement,
                "FieldPath field names may not be empty strings.",
            )
        }
    })?;

    if let Some(parent) = path.trim_suffix() {
        if parent.to_string().matches('$').count() > 1 {
            return Err(projection_error(
                ErrorCode::WrongPositionalOperatorLocation,
                POSITIONAL_LOCATION,
            ));
        }
    }

    if key.starts_with('$') {
        return Err(projection_error(ErrorCode::FieldPathInvalidName, INVALID_NAME));
    }

    if let Some(parent) = path.trim_suffix() {
        if parent.segments().iter().any(|s| s == "$") {
            return Err(projection_error(
                ErrorCode::WrongPositionalOperatorLocation,
                POSITIONAL_LOCATION,
            ));
        }
    }

    // `v.$foo` is invalid; `v.$` and `v.foo$` are fine
    if path.segments().iter().any(|s| s.starts_with('$') && s != "$") {
        return Err(projection_error(ErrorCode::FieldPathInvalidName, INVALID_NAME));
    }

    Ok(())
}

fn validate_operator(key: &str, op: &Document) -> Result<(), CommandError> {
    let unsupported = || {
        projection_error(
            ErrorCode::CommandNotFound,
            format!("projection {} is not supported", format_value(&Bson::Document(op.clone()))),
        )
    };

    if op.len() != 1 {
        return Err(unsupported());
    }
    match op.iter().next() {
        Some((name, arg)) if name == "$elemMatch" => {
            if key.contains('.') {
                return Err(projection_error(
                    ErrorCode::BadValue,
                    "Cannot use $elemMatch projection on a nested field.",
                ));
            }
            if !matches!(arg, Bson::Document(_)) {
                return Err(projection_error(
                    ErrorCode::BadValue,
                    format!(
                        "elemMatch: Invalid argument, object required, but got {}",
                        type_alias(arg)
                    ),
                ));
            }
            Ok(())
        }
        Some((name, arg)) if name == "$slice" => Slice::parse(arg).map(|_| ()),
        _ => Err(unsupported()),
    }
}

/// Apply a projection produced by [`validate_projection`] to `doc`.
///
/// `filter` is the query filter; positional (`field.$`) projections use it
/// to pick the matching array element.
pub fn project_document(
    doc: &Document,
    projection: &Document,
    inclusion: bool,
    filter: &Document,
) -> Result<Document, CommandError> {
    project_document_with(doc, projection, inclusion, filter, &QueryConfig::default())
}

/// [`project_document`] with explicit limits.
pub fn project_document_with(
    doc: &Document,
    projection: &Document,
    inclusion: bool,
    filter: &Document,
    config: &QueryConfig,
) -> Result<Document, CommandError> {
    let mut projected = Document::new();
    if let Some(id) = doc.get("_id") {
        projected.insert("_id", id.clone());
    }
    match projection.get("_id") {
        None | Some(Bson::Boolean(true)) => {}
        Some(Bson::Boolean(false)) => {
            projected.remove("_id");
        }
        Some(Bson::Document(op)) => apply_operator(&mut projected, &["_id".to_string()], op, config)?,
        Some(literal) => {
            projected.insert("_id", literal.clone());
        }
    }

    let body = if inclusion {
        include(doc, projection, filter, config)?
    } else {
        exclude(doc, projection, config)?
    };
    for (key, value) in body {
        projected.insert(key, value);
    }
    Ok(projected)
}

fn include(
    doc: &Document,
    projection: &Document,
    filter: &Document,
    config: &QueryConfig,
) -> Result<Document, CommandError> {
    let included = projection.iter().filter(|(k, v)| {
        *k != "_id" && matches!(v, Bson::Boolean(true) | Bson::Document(_))
    });
    let tree = FieldTree::from_paths(included.map(|(k, _)| k.as_str()));
    let mut out = tree::include(doc, &tree, filter, config)?;

    for (key, value) in projection {
        if key == "_id" {
            continue;
        }
        let segments = path_segments(key);
        match value {
            Bson::Boolean(_) => {}
            Bson::Document(op) => apply_operator(&mut out, &segments, op, config)?,
            literal => set_literal(&mut out, &segments, literal.clone()),
        }
    }
    Ok(out)
}

fn exclude(doc: &Document, projection: &Document, config: &QueryConfig) -> Result<Document, CommandError> {
    let mut out = doc.clone();
    out.remove("_id");

    for (key, value) in projection {
        if key == "_id" {
            continue;
        }
        let segments = path_segments(key);
        match value {
            Bson::Boolean(false) => tree::exclude(&mut out, &segments),
            Bson::Document(op) => apply_operator(&mut out, &segments, op, config)?,
            _ => {}
        }
    }
    Ok(out)
}

fn path_segments(key: &str) -> Vec<String> {
    key.split('.').map(str::to_string).collect()
}

/// Write a new-value assignment, creating intermediate documents.
fn set_literal(doc: &mut Document, segments: &[String], value: Bson) {
    let Some((first, rest)) = segments.split_first() else { return };
    if rest.is_empty() {
        doc.insert(first.clone(), value);
        return;
    }
    if !matches!(doc.get(first), Some(Bson::Document(_))) {
        doc.insert(first.clone(), Document::new());
    }
    if let Some(Bson::Document(sub)) = doc.get_mut(first) {
        set_literal(sub, rest, value);
    }
}

// ── Projection operators ────────────────────────────────────────

/// Apply `$elemMatch` / `$slice` at `segments`, fanning out over the
/// document elements of arrays crossed on the way.
fn apply_operator(
    doc: &mut Document,
    segments: &[String],
    op: &Document,
    config: &QueryConfig,
) -> Result<(), CommandError> {
    let Some((first, rest)) = segments.split_first() else { return Ok(()) };

    if !rest.is_empty() {
        match doc.get_mut(first) {
            Some(Bson::Document(sub)) => apply_operator(sub, rest, op, config)?,
            Some(Bson::Array(arr)) => {
                for elem in arr.iter_mut() {
                    if let Bson::Document(sub) = elem {
                        apply_operator(sub, rest, op, config)?;
                    }
                }
            }
            _ => {}
        }
        return Ok(());
    }

    let Some((name, arg)) = op.iter().next() else { return Ok(()) };
    match name.as_str() {
        "$elemMatch" => {
            let cond = match arg {
                Bson::Document(cond) => cond,
                _ => return Ok(()),
            };
            let found = match doc.get(first) {
                Some(Bson::Array(arr)) => elem_match(arr, first, cond, config)?,
                _ => None,
            };
            match found {
                Some(elem) => {
                    doc.insert(first.clone(), vec![elem]);
                }
                None => {
                    doc.remove(first);
                }
            }
        }
        "$slice" => {
            let slice = Slice::parse(arg)?;
            let sliced = match doc.get(first) {
                Some(Bson::Array(arr)) => slice.apply(arr),
                // non-array fields are left alone
                _ => return Ok(()),
            };
            match sliced {
                Some(kept) => {
                    doc.insert(first.clone(), kept);
                }
                None => {
                    doc.remove(first);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// First element of `arr` satisfying `cond`. Operator conditions
/// (`{$gt: 1}`) test elements directly; field conditions (`{x: 1}`) test
/// document elements as filter targets.
fn elem_match(
    arr: &[Bson],
    key: &str,
    cond: &Document,
    config: &QueryConfig,
) -> Result<Option<Bson>, CommandError> {
    let operator_form = cond.keys().next().is_some_and(|k| k.starts_with('$'));
    for elem in arr {
        let hit = if operator_form {
            filter_field_expr(&[elem], key, cond, config)?
        } else {
            match elem {
                Bson::Document(sub) => filter_document_with(sub, cond, config)?,
                _ => false,
            }
        };
        if hit {
            return Ok(Some(elem.clone()));
        }
    }
    Ok(None)
}
