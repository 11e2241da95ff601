use bson::{Bson, Document};
use regex::Regex;

use crate::compare::{CompareResult, SortDirection, compare_for_ordering, values_equal};
use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};
use crate::pattern;
use crate::value::{TypeCode, WholeNumberError, format_value, whole_number};

use super::filter_document_with;

/// Evaluate a field expression document (`{ $gt: 1, $lt: 5 }`) against the
/// values resolved for `key`. An empty `values` slice means "missing".
///
/// Each operator is tested independently over all values; the clause
/// matches when every operator does.
pub(crate) fn filter_field_expr(
    values: &[&Bson],
    key: &str,
    expr: &Document,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let first = match expr.keys().next() {
        Some(k) => k,
        None => {
            let empty = Bson::Document(Document::new());
            return Ok(values.iter().any(|v| values_equal(v, &empty)));
        }
    };

    // { field: { a: 1 } } is an exact nested-document match
    if !first.starts_with('$') {
        let target = Bson::Document(expr.clone());
        return Ok(values.iter().any(|v| values_equal(v, &target)));
    }

    let missing = values.is_empty();
    let null = Bson::Null;
    let present: Vec<&Bson> = if missing { vec![&null] } else { values.to_vec() };

    for (op, operand) in expr {
        let matched = match op.as_str() {
            "$eq" => any_equal(&present, operand),
            "$ne" => {
                if let Bson::RegularExpression(_) = operand {
                    return Err(CommandError::with_argument(
                        ErrorCode::BadValue,
                        "Can't have regex as arg to $ne.",
                        "$ne",
                    ));
                }
                !any_equal(&present, operand)
            }
            "$gt" | "$gte" | "$lt" | "$lte" => compare_op(&present, key, op, operand)?,
            "$in" => in_array(&present, op, operand, config)?,
            "$nin" => !in_array(&present, op, operand, config)?,
            "$not" => not(values, key, operand, config)?,
            "$regex" => regex_op(&present, expr, operand, config)?,
            "$options" => {
                if !expr.contains_key("$regex") {
                    return Err(CommandError::with_argument(
                        ErrorCode::BadValue,
                        "$options needs a $regex",
                        "$options",
                    ));
                }
                true
            }
            "$size" => size(&present, operand)?,
            "$all" => all(&present, operand)?,
            "$elemMatch" => elem_match(&present, key, operand, config)?,
            "$mod" => modulo(&present, operand)?,
            // non-boolean operands are vacuously true
            "$exists" => match operand {
                Bson::Boolean(expected) => *expected != missing,
                _ => true,
            },
            "$type" => {
                let codes = type_codes(operand)?;
                !missing && present.iter().any(|v| codes.iter().any(|c| has_type(v, *c)))
            }
            "$bitsAllClear" | "$bitsAllSet" | "$bitsAnyClear" | "$bitsAnySet" => {
                bits(&present, op, operand)?
            }
            _ => {
                return Err(CommandError::with_argument(
                    ErrorCode::BadValue,
                    format!("unknown operator: {op}"),
                    "$operator",
                ));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_equal(values: &[&Bson], operand: &Bson) -> bool {
    values.iter().any(|v| values_equal(v, operand))
}

/// Apply `check` to a value, or to each element when it is an array.
fn any_scalar(value: &Bson, check: &dyn Fn(&Bson) -> bool) -> bool {
    match value {
        Bson::Array(arr) => arr.iter().any(check),
        other => check(other),
    }
}

// ── Comparison ──────────────────────────────────────────────────

fn compare_op(values: &[&Bson], key: &str, op: &str, operand: &Bson) -> Result<bool, CommandError> {
    if let Bson::RegularExpression(_) = operand {
        return Err(CommandError::with_argument(
            ErrorCode::BadValue,
            format!("Can't have RegEx as arg to predicate over field '{key}'."),
            op,
        ));
    }

    let (direction, predicate): (SortDirection, fn(CompareResult) -> bool) = match op {
        "$gt" => (SortDirection::Desc, |r| r == CompareResult::Greater),
        "$gte" => (SortDirection::Desc, |r| {
            r == CompareResult::Greater || r == CompareResult::Equal
        }),
        "$lt" => (SortDirection::Asc, |r| r == CompareResult::Less),
        _ => (SortDirection::Asc, |r| {
            r == CompareResult::Less || r == CompareResult::Equal
        }),
    };

    Ok(values
        .iter()
        .any(|v| predicate(compare_for_ordering(v, operand, direction))))
}

fn in_array(
    values: &[&Bson],
    op: &str,
    operand: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let arr = match operand {
        Bson::Array(arr) => arr,
        _ => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                format!("{op} needs an array"),
                op,
            ));
        }
    };

    for elem in arr {
        if let Bson::Document(doc) = elem {
            if doc.keys().any(|k| k.starts_with('$')) {
                return Err(CommandError::with_argument(
                    ErrorCode::BadValue,
                    "cannot nest $ under $in",
                    op,
                ));
            }
        }
    }

    for elem in arr {
        let hit = match elem {
            Bson::RegularExpression(re) => {
                let compiled = pattern::compile(&re.pattern, &re.options, config)?;
                values
                    .iter()
                    .any(|v| regex_matches(v, &compiled, &re.pattern, &re.options))
            }
            other => any_equal(values, other),
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

fn not(values: &[&Bson], key: &str, operand: &Bson, config: &QueryConfig) -> Result<bool, CommandError> {
    match operand {
        Bson::Document(expr) => {
            if expr.is_empty() {
                return Err(CommandError::with_argument(
                    ErrorCode::BadValue,
                    "$not cannot be empty",
                    "$not",
                ));
            }
            Ok(!filter_field_expr(values, key, expr, config)?)
        }
        Bson::RegularExpression(re) => {
            let compiled = pattern::compile(&re.pattern, &re.options, config)?;
            Ok(!values
                .iter()
                .any(|v| regex_matches(v, &compiled, &re.pattern, &re.options)))
        }
        _ => Err(CommandError::with_argument(
            ErrorCode::BadValue,
            "$not needs a regex or a document",
            "$not",
        )),
    }
}

// ── Regex ───────────────────────────────────────────────────────

/// Strings match by pattern, arrays by any string element, and stored
/// regex values by equality with the source pattern and options.
pub(crate) fn regex_matches(value: &Bson, re: &Regex, pattern: &str, options: &str) -> bool {
    any_scalar(value, &|v| match v {
        Bson::String(s) => re.is_match(s),
        Bson::RegularExpression(stored) => stored.pattern == pattern && stored.options == options,
        _ => false,
    })
}

fn regex_op(
    values: &[&Bson],
    expr: &Document,
    operand: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let options = match expr.get("$options") {
        None => None,
        Some(Bson::String(s)) => Some(s.as_str()),
        Some(_) => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                "$options has to be a string",
                "$options",
            ));
        }
    };

    let (pattern, flags) = match operand {
        Bson::String(p) => (p.as_str(), options.unwrap_or("")),
        Bson::RegularExpression(re) => {
            let extra = options.filter(|o| !o.is_empty());
            if extra.is_some() && !re.options.is_empty() {
                return Err(CommandError::with_argument(
                    ErrorCode::RegexOptions,
                    "options set in both $regex and $options",
                    "$regex",
                ));
            }
            (re.pattern.as_str(), extra.unwrap_or(re.options.as_str()))
        }
        _ => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                "$regex has to be a string",
                "$regex",
            ));
        }
    };

    let compiled = pattern::compile(pattern, flags, config)?;
    Ok(values
        .iter()
        .any(|v| regex_matches(v, &compiled, pattern, flags)))
}

// ── Arrays ──────────────────────────────────────────────────────

fn size(values: &[&Bson], operand: &Bson) -> Result<bool, CommandError> {
    let shown = format_value(operand);
    let bad = |msg: String| CommandError::with_argument(ErrorCode::BadValue, msg, "$size");

    let size = whole_number(operand).map_err(|e| match e {
        WholeNumberError::UnexpectedType => {
            bad(format!("Failed to parse $size. Expected a number in: $size: {shown}"))
        }
        WholeNumberError::NotWholeNumber => {
            bad(format!("Failed to parse $size. Expected an integer: $size: {shown}"))
        }
        WholeNumberError::Infinity
        | WholeNumberError::LongExceededPositive
        | WholeNumberError::LongExceededNegative => bad(format!(
            "Failed to parse $size. Cannot represent as a 64-bit integer: $size: {shown}"
        )),
    })?;
    if size < 0 {
        return Err(bad(format!(
            "Failed to parse $size. Expected a non-negative number in: $size: {shown}"
        )));
    }

    Ok(values
        .iter()
        .any(|v| matches!(v, Bson::Array(arr) if arr.len() as i64 == size)))
}

fn all(values: &[&Bson], operand: &Bson) -> Result<bool, CommandError> {
    let wanted = match operand {
        Bson::Array(arr) => arr,
        _ => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                "$all needs an array",
                "$all",
            ));
        }
    };
    if wanted.is_empty() {
        return Ok(false);
    }
    Ok(values
        .iter()
        .any(|v| wanted.iter().all(|w| values_equal(v, w))))
}

fn elem_match(
    values: &[&Bson],
    key: &str,
    operand: &Bson,
    config: &QueryConfig,
) -> Result<bool, CommandError> {
    let expr = match operand {
        Bson::Document(doc) => doc,
        _ => {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                "$elemMatch needs an Object",
                "$elemMatch",
            ));
        }
    };

    for k in expr.keys() {
        match k.as_str() {
            "$text" | "$where" => {
                return Err(CommandError::with_argument(
                    ErrorCode::BadValue,
                    format!("{k} can only be applied to the top-level document"),
                    "$elemMatch",
                ));
            }
            "$and" | "$or" | "$nor" => {
                return Err(CommandError::with_argument(
                    ErrorCode::NotImplemented,
                    format!("$elemMatch: support for {k} not implemented yet"),
                    "$elemMatch",
                ));
            }
            _ => {}
        }
    }

    // { $elemMatch: { $gt: 1 } } tests elements directly; { $elemMatch: { x: 1 } }
    // treats each document element as a filter target.
    let operator_form = expr.keys().next().is_some_and(|k| k.starts_with('$'));
    if operator_form {
        if let Some(k) = expr.keys().find(|k| !k.starts_with('$')) {
            return Err(CommandError::with_argument(
                ErrorCode::BadValue,
                format!("unknown operator: {k}"),
                "$elemMatch",
            ));
        }
    }

    for value in values {
        let Bson::Array(arr) = value else { continue };
        for elem in arr {
            let hit = if operator_form {
                filter_field_expr(&[elem], key, expr, config)?
            } else {
                match elem {
                    Bson::Document(doc) => filter_document_with(doc, expr, config)?,
                    _ => false,
                }
            };
            if hit {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

// ── $mod ────────────────────────────────────────────────────────

fn modulo(values: &[&Bson], operand: &Bson) -> Result<bool, CommandError> {
    let bad = |msg: &str| CommandError::with_argument(ErrorCode::BadValue, msg, "$mod");

    let args = match operand {
        Bson::Array(arr) => arr,
        _ => return Err(bad("malformed mod, needs to be an array")),
    };
    match args.len() {
        0 | 1 => return Err(bad("malformed mod, not enough elements")),
        2 => {}
        _ => return Err(bad("malformed mod, too many elements")),
    }

    let divisor = mod_param(&args[0], "divisor")?;
    let remainder = mod_param(&args[1], "remainder")?;
    if divisor == 0 {
        return Err(bad("divisor cannot be 0"));
    }

    Ok(values.iter().any(|v| {
        any_scalar(v, &|x| match integral(x) {
            Some(n) => n.wrapping_rem(divisor) == remainder,
            None => false,
        })
    }))
}

fn mod_param(value: &Bson, what: &str) -> Result<i64, CommandError> {
    let bad = |msg: String| CommandError::with_argument(ErrorCode::BadValue, msg, "$mod");
    match value {
        Bson::Int32(n) => Ok(i64::from(*n)),
        Bson::Int64(n) => Ok(*n),
        Bson::Double(f) if f.is_nan() || f.is_infinite() => Err(bad(format!(
            "malformed mod, {what} value is invalid :: caused by :: Unable to coerce NaN/Inf to integral type"
        ))),
        Bson::Double(f) if *f >= TWO_POW_63 || *f < -TWO_POW_63 => Err(bad(format!(
            "malformed mod, {what} value is invalid :: caused by :: Out of bounds coercing to integral value"
        ))),
        Bson::Double(f) => Ok(f.trunc() as i64),
        _ => Err(bad(format!("malformed mod, {what} not a number"))),
    }
}

/// Integer view of a numeric field; doubles truncate, NaN/Inf do not match.
fn integral(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

// ── $type ───────────────────────────────────────────────────────

fn type_codes(operand: &Bson) -> Result<Vec<TypeCode>, CommandError> {
    let codes = match operand {
        Bson::Array(arr) => {
            if arr.is_empty() {
                return Err(CommandError::with_argument(
                    ErrorCode::BadValue,
                    "$type must match at least one type",
                    "$type",
                ));
            }
            arr.iter().map(type_code).collect::<Result<Vec<_>, _>>()?
        }
        other => vec![type_code(other)?],
    };

    for code in &codes {
        if matches!(code, TypeCode::Decimal | TypeCode::MinKey | TypeCode::MaxKey) {
            return Err(CommandError::with_argument(
                ErrorCode::NotImplemented,
                format!("Type code {} not implemented", code.alias()),
                "$type",
            ));
        }
    }
    Ok(codes)
}

fn type_code(value: &Bson) -> Result<TypeCode, CommandError> {
    let invalid = |shown: String| {
        CommandError::with_argument(
            ErrorCode::BadValue,
            format!("Invalid numerical type code: {shown}"),
            "$type",
        )
    };

    match value {
        Bson::String(alias) => TypeCode::from_alias(alias).ok_or_else(|| {
            CommandError::with_argument(
                ErrorCode::BadValue,
                format!("Unknown type name alias: {alias}"),
                "$type",
            )
        }),
        Bson::Int32(n) => TypeCode::from_code(*n).ok_or_else(|| invalid(n.to_string())),
        Bson::Int64(n) => i32::try_from(*n)
            .ok()
            .and_then(TypeCode::from_code)
            .ok_or_else(|| invalid(n.to_string())),
        Bson::Double(f) if f.is_nan() => Err(invalid("nan".to_string())),
        Bson::Double(f) if f.is_infinite() => {
            Err(invalid(if *f > 0.0 { "inf" } else { "-inf" }.to_string()))
        }
        Bson::Double(f) if f.trunc() != *f => Err(invalid(f.to_string())),
        Bson::Double(f) => TypeCode::from_code(*f as i32).ok_or_else(|| invalid(f.to_string())),
        other => Err(invalid(format_value(other))),
    }
}

/// Arrays match a non-array code when any non-array element does.
fn has_type(value: &Bson, code: TypeCode) -> bool {
    if code != TypeCode::Array {
        if let Bson::Array(arr) = value {
            if arr
                .iter()
                .any(|e| !matches!(e, Bson::Array(_)) && code.matches(e))
            {
                return true;
            }
        }
    }
    code.matches(value)
}

// ── Bitwise ─────────────────────────────────────────────────────

fn bits(values: &[&Bson], op: &str, operand: &Bson) -> Result<bool, CommandError> {
    let mask = bit_mask(op, operand)?;

    for value in values {
        let field = match value {
            Bson::Int32(n) => Some(i64::from(*n) as u64),
            Bson::Int64(n) => Some(*n as u64),
            Bson::Double(f) if f.trunc() == *f && *f > -TWO_POW_63 && *f < TWO_POW_63 => {
                Some(*f as i64 as u64)
            }
            Bson::Binary(bin) => {
                if let Bson::Binary(_) = operand {
                    return Err(CommandError::with_argument(
                        ErrorCode::NotImplemented,
                        "BinData() not supported yet",
                        op,
                    ));
                }
                Some(bytes_mask(&bin.bytes))
            }
            _ => None,
        };

        let Some(field) = field else { continue };
        let hit = match op {
            "$bitsAllClear" => field & mask == 0,
            "$bitsAllSet" => field & mask == mask,
            "$bitsAnyClear" => field & mask != mask,
            _ => field & mask != 0,
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Little-endian bit pattern of the first 8 bytes; any set bit beyond them
/// saturates into the top bit.
fn bytes_mask(bytes: &[u8]) -> u64 {
    let mut mask = 0u64;
    for (i, b) in bytes.iter().enumerate() {
        if *b == 0 {
            continue;
        }
        if i < 8 {
            mask |= u64::from(*b) << (i * 8);
        } else {
            mask |= 1 << 63;
        }
    }
    mask
}

fn bit_mask(op: &str, operand: &Bson) -> Result<u64, CommandError> {
    let shown = format_value(operand);
    match operand {
        Bson::Array(positions) => {
            let mut mask = 0u64;
            for (i, pos) in positions.iter().enumerate() {
                let bit = whole_number(pos).map_err(|e| {
                    let msg = match e {
                        WholeNumberError::UnexpectedType => format!(
                            "Failed to parse bit position. Expected a number in: {i}: {}",
                            format_value(pos)
                        ),
                        _ => format!(
                            "Failed to parse bit position. Expected integer: {i}: {}",
                            format_value(pos)
                        ),
                    };
                    CommandError::with_argument(ErrorCode::BadValue, msg, op)
                })?;
                if bit < 0 {
                    return Err(CommandError::with_argument(
                        ErrorCode::BadValue,
                        format!(
                            "Failed to parse bit position. Expected a non-negative number in: {i}: {bit}"
                        ),
                        op,
                    ));
                }
                mask |= 1 << bit.min(63);
            }
            Ok(mask)
        }
        Bson::Double(f) => {
            if f.trunc() != *f || f.is_infinite() {
                return Err(CommandError::with_argument(
                    ErrorCode::FailedToParse,
                    format!("Expected an integer: {op}: {shown}"),
                    op,
                ));
            }
            if *f < 0.0 {
                return Err(CommandError::with_argument(
                    ErrorCode::FailedToParse,
                    format!("Expected a non-negative number in: {op}: {f:.1}"),
                    op,
                ));
            }
            Ok(*f as u64)
        }
        Bson::Binary(bin) => Ok(bytes_mask(&bin.bytes)),
        Bson::Int32(_) | Bson::Int64(_) => {
            let n = match operand {
                Bson::Int32(n) => i64::from(*n),
                Bson::Int64(n) => *n,
                _ => 0,
            };
            if n < 0 {
                return Err(CommandError::with_argument(
                    ErrorCode::FailedToParse,
                    format!("Expected a non-negative number in: {op}: {n}"),
                    op,
                ));
            }
            Ok(n as u64)
        }
        _ => Err(CommandError::with_argument(
            ErrorCode::BadValue,
            format!("value takes an Array, a number, or a BinData but received: {op}: {shown}"),
            op,
        )),
    }
}
