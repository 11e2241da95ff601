use bson::{Bson, Document};

use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::filter::{field_values, filter_values};

/// Resolve a positional projection (`"v.$"`) against the array at `v`.
///
/// The filter must constrain the array path (`{v: 2}` or `{"v.x": 2}`).
/// The first element satisfying every such clause is returned alone in a
/// one-element array.
pub(crate) fn first_match(
    arr: &[Bson],
    filter: &Document,
    full_key: &str,
    config: &QueryConfig,
) -> Result<Bson, CommandError> {
    if arr.is_empty() || filter.is_empty() {
        return Err(CommandError::with_argument(
            ErrorCode::BadPositionalProjection,
            "Executor error during find command :: caused by :: positional operator '.$' couldn't find a matching element in the array",
            "projection",
        ));
    }

    let array_path = full_key.strip_suffix(".$").unwrap_or(full_key);
    let nested_prefix = format!("{array_path}.");
    let clauses: Vec<(&String, &Bson)> = filter
        .iter()
        .filter(|(k, _)| *k == array_path || k.starts_with(&nested_prefix))
        .collect();
    if clauses.is_empty() {
        return Err(CommandError::with_argument(
            ErrorCode::BadPositionalProjection,
            format!(
                "Executor error during find command :: caused by :: positional projection '{full_key}' does not match the query document."
            ),
            "projection",
        ));
    }

    for elem in arr {
        if element_matches(elem, &clauses, array_path.len(), config)? {
            return Ok(Bson::Array(vec![elem.clone()]));
        }
    }

    Err(CommandError::with_argument(
        ErrorCode::ElementMismatchPositionalProjection,
        "Executor error during find command :: caused by :: positional operator '.$' element mismatch",
        "projection",
    ))
}

fn element_matches(
    elem: &Bson,
    clauses: &[(&String, &Bson)],
    prefix_len: usize,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    for (key, value) in clauses {
        let matched = if key.len() == prefix_len {
            filter_values(&[elem], key, value, config)?
        } else {
            let rest = &key[prefix_len + 1..];
            match elem {
                Bson::Document(doc) => {
                    let values = field_values(doc, rest)?;
                    filter_values(&values, rest, value, config)?
                }
                _ => filter_values(&[], rest, value, config)?,
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}
