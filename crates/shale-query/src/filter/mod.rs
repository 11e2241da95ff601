mod operators;

use bson::{Bson, Document};

use crate::compare::values_equal;
use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::path::{self, Path};
use crate::pattern;

pub(crate) use operators::filter_field_expr;

/// Evaluate whether `doc` matches the MongoDB `filter` document.
///
/// Top-level keys are ANDed:
/// - `{ "field": value }` is implicit equality, and any array element may match
/// - `{ "field": { "$op": v, ... } }` applies field operators
/// - `{ "a.b": ... }` resolves the dotted path, fanning out over arrays
/// - `$and` / `$or` / `$nor` take non-empty arrays of filter documents
/// - `$comment` is ignored
pub fn filter_document(doc: &Document, filter: &Document) -> Result<bool, CommandError> {
    filter_document_with(doc, filter, &QueryConfig::default())
}

/// [`filter_document`] with explicit limits.
pub fn filter_document_with(
    doc: &Document,
    filter: &Document,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    for (key, value) in filter {
        let matched = if key.starts_with('$') {
            filter_operator(doc, key, value, config)?
        } else {
            let values = field_values(doc, key)?;
            filter_values(&values, key, value, config)?
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a single `key: value` clause against the values resolved for
/// `key`. An empty slice means the field is missing.
pub(crate) fn filter_values(
    values: &[&Bson],
    key: &str,
    value: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    match value {
        Bson::Document(expr) => filter_field_expr(values, key, expr, config),
        // null matches missing fields as well as explicit nulls
        Bson::Null => Ok(values.is_empty() || values.iter().any(|v| values_equal(v, &Bson::Null))),
        Bson::RegularExpression(re) => {
            let compiled = pattern::compile(&re.pattern, &re.options, config)?;
            Ok(values
                .iter()
                .any(|v| operators::regex_matches(v, &compiled, &re.pattern, &re.options)))
        }
        other => Ok(values.iter().any(|v| values_equal(v, other))),
    }
}

/// Values a filter key refers to. Dotted keys fan out over arrays.
pub(crate) fn field_values<'a>(doc: &'a Document, key: &str) -> Result<Vec<&'a Bson>, CommandError> {
    if !key.contains('.') {
        return Ok(doc.get(key).into_iter().collect());
    }
    let path = Path::parse(key).map_err(|_| {
        CommandError::with_argument(
            ErrorCode::PathContainsEmptyElement,
            "FieldPath field names may not be empty strings.",
            key,
        )
    })?;
    Ok(path::resolve_values(doc, &path))
}

fn filter_operator(
    doc: &Document,
    op: &str,
    value: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    match op {
        "$and" => {
            for expr in logical_operands(op, value)? {
                if !filter_document_with(doc, expr, config)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$or" | "$nor" => {
            let mut any = false;
            for expr in logical_operands(op, value)? {
                if filter_document_with(doc, expr, config)? {
                    any = true;
                    break;
                }
            }
            Ok(if op == "$or" { any } else { !any })
        }
        "$comment" => Ok(true),
        _ => Err(CommandError::with_argument(
            ErrorCode::BadValue,
            format!(
                "unknown top level operator: {op}. If you have a field name that starts with a '$' symbol, consider using $getField or $setField."
            ),
            "$operator",
        )),
    }
}

/// Validate and unpack the operand array of `$and` / `$or` / `$nor`.
fn logical_operands<'a>(op: &str, value: &'a Bson) -> Result<Vec<&'a Document>, CommandError> {
    let arr = match value {
        Bson::Array(arr) => arr,
        _ => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                format!("{op} must be an array"),
                op,
            ));
        }
    };
    if arr.is_empty() {
        return Err(CommandError::with_argument(
            ErrorCode::BadValue,
            "$and/$or/$nor must be a nonempty array",
            op,
        ));
    }
    arr.iter()
        .map(|elem| match elem {
            Bson::Document(doc) => Ok(doc),
            _ => Err(CommandError::with_argument(
                ErrorCode::BadValue,
                "$or/$and/$nor entries need to be full objects",
                op,
            )),
        })
        .collect()
}
