use std::cmp::Ordering;

use bson::{Bson, DateTime, Document, Timestamp};

use crate::compare::compare_total;
use crate::error::{CommandError, ErrorCode};
use crate::path::{Path, get_by_path};
use crate::value::{format_value, is_number, type_alias};

use super::access;

/// `_id` as it appears in error messages.
pub(super) fn document_id(doc: &Document) -> String {
    format_value(doc.get("_id").unwrap_or(&Bson::Null))
}

/// `$set` / `$setOnInsert`: Set the field to `value`, creating missing
/// intermediate documents. Setting an identical value (same type and
/// value) is not a change.
pub(crate) fn op_set(doc: &mut Document, path: &Path, value: &Bson) -> Result<bool, CommandError> {
    if get_by_path(doc, path) == Some(value) {
        return Ok(false);
    }
    access::set(doc, path, value.clone())?;
    Ok(true)
}

/// `$unset`: Remove the field.
pub(crate) fn op_unset(doc: &mut Document, path: &Path) -> bool {
    access::remove(doc, path).is_some()
}

/// `$rename`: Move a value to another path. A missing source is a no-op.
pub(crate) fn op_rename(doc: &mut Document, from: &Path, to: &Path) -> Result<bool, CommandError> {
    match access::remove(doc, from) {
        Some(value) => {
            access::set(doc, to, value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Failure of numeric `$inc`/`$mul` arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithError {
    /// The current field value is not a number.
    NotNumeric,
    /// The int64 result does not fit.
    Overflow,
}

/// Sum of two numbers, widened to the broader type.
///
/// Type promotion rules:
/// - i32 + i32 → i32 (unless overflow, then i64)
/// - i32 + i64 → i64
/// - i64 + i64 → i64 (overflow is an error)
/// - any + f64 → f64
fn add_numbers(current: &Bson, operand: &Bson) -> Result<Bson, ArithError> {
    match (current, operand) {
        (Bson::Double(a), b) => Ok(Bson::Double(a + numeric(b)?)),
        (a, Bson::Double(b)) => Ok(Bson::Double(numeric(a)? + b)),
        (Bson::Int32(a), Bson::Int32(b)) => Ok(match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        }),
        (a, b) => {
            let (a, b) = (integer(a)?, integer(b)?);
            a.checked_add(b).map(Bson::Int64).ok_or(ArithError::Overflow)
        }
    }
}

/// Product of two numbers, with the same promotion rules as [`add_numbers`].
fn multiply_numbers(current: &Bson, operand: &Bson) -> Result<Bson, ArithError> {
    match (current, operand) {
        (Bson::Double(a), b) => Ok(Bson::Double(a * numeric(b)?)),
        (a, Bson::Double(b)) => Ok(Bson::Double(numeric(a)? * b)),
        (Bson::Int32(a), Bson::Int32(b)) => Ok(match a.checked_mul(*b) {
            Some(product) => Bson::Int32(product),
            None => Bson::Int64(i64::from(*a) * i64::from(*b)),
        }),
        (a, b) => {
            let (a, b) = (integer(a)?, integer(b)?);
            a.checked_mul(b).map(Bson::Int64).ok_or(ArithError::Overflow)
        }
    }
}

fn numeric(value: &Bson) -> Result<f64, ArithError> {
    match value {
        Bson::Double(f) => Ok(*f),
        Bson::Int32(n) => Ok(f64::from(*n)),
        Bson::Int64(n) => Ok(*n as f64),
        _ => Err(ArithError::NotNumeric),
    }
}

fn integer(value: &Bson) -> Result<i64, ArithError> {
    match value {
        Bson::Int32(n) => Ok(i64::from(*n)),
        Bson::Int64(n) => Ok(*n),
        _ => Err(ArithError::NotNumeric),
    }
}

/// `$inc`: Increment a numeric field.
///
/// - a non-numeric operand is `TypeMismatch`
/// - a missing field is set to the operand
/// - a result identical to the current value is not a change, unless the
///   current value is NaN
pub(crate) fn op_inc(doc: &mut Document, key: &str, path: &Path, amount: &Bson) -> Result<bool, CommandError> {
    if !is_number(amount) {
        return Err(CommandError::new(
            ErrorCode::TypeMismatch,
            format!(
                "Cannot increment with non-numeric argument: {{{key}: {}}}",
                format_value(amount)
            ),
        ));
    }
    arithmetic(doc, key, path, amount, "$inc", add_numbers, amount.clone())
}

/// `$mul`: Multiply a numeric field.
///
/// - a missing field is set to zero of the operand's type
/// - a result of ±Infinity is `BadValue`
/// - int32 `0` becoming int64 `0` is a change
pub(crate) fn op_mul(doc: &mut Document, key: &str, path: &Path, factor: &Bson) -> Result<bool, CommandError> {
    let zero = match factor {
        Bson::Double(_) => Bson::Double(0.0),
        Bson::Int32(_) => Bson::Int32(0),
        Bson::Int64(_) => Bson::Int64(0),
        other => {
            return Err(CommandError::new(
                ErrorCode::TypeMismatch,
                format!(
                    "Cannot multiply with non-numeric argument: {{{key}: {}}}",
                    format_value(other)
                ),
            ));
        }
    };
    arithmetic(doc, key, path, factor, "$mul", multiply_numbers, zero)
}

fn arithmetic(
    doc: &mut Document,
    key: &str,
    path: &Path,
    operand: &Bson,
    op: &str,
    apply: fn(&Bson, &Bson) -> Result<Bson, ArithError>,
    initial: Bson,
) -> Result<bool, CommandError> {
    let Some(current) = get_by_path(doc, path) else {
        access::set(doc, path, initial)?;
        return Ok(true);
    };

    let result = apply(current, operand).map_err(|e| match e {
        ArithError::NotNumeric => {
            let field = if path.len() > 1 { path.suffix() } else { key };
            CommandError::new(
                ErrorCode::TypeMismatch,
                format!(
                    "Cannot apply {op} to a value of non-numeric type. {{_id: {}}} has the field '{field}' of non-numeric type {}",
                    document_id(doc),
                    type_alias(current)
                ),
            )
        }
        ArithError::Overflow => {
            let kind = if matches!(current, Bson::Int32(_)) { "NumberInt" } else { "NumberLong" };
            CommandError::new(
                ErrorCode::BadValue,
                format!(
                    "Failed to apply {op} operations to current value (({kind}){}) for document {{_id: {}}}",
                    format_value(current),
                    document_id(doc)
                ),
            )
        }
    })?;

    if let Bson::Double(f) = result {
        if f.is_infinite() && op == "$mul" {
            let shown = if f > 0.0 { "+Inf" } else { "-Inf" };
            return Err(CommandError::new(
                ErrorCode::BadValue,
                format!(
                    "update produces invalid value: {{ \"{path}\": {shown} }} (update operations that produce infinity values are not allowed)"
                ),
            ));
        }
    }

    // NaN != NaN, so a NaN field always counts as changed
    if result == *current {
        return Ok(false);
    }
    access::set(doc, path, result)?;
    Ok(true)
}

/// `$min` / `$max`: Replace the field when `value` orders below (`$min`)
/// or above (`$max`) the current value. A missing field is set.
pub(crate) fn op_min_max(
    doc: &mut Document,
    path: &Path,
    value: &Bson,
    keep: Ordering,
) -> Result<bool, CommandError> {
    if let Some(current) = get_by_path(doc, path) {
        if compare_total(value, current) != keep {
            return Ok(false);
        }
    }
    access::set(doc, path, value.clone())?;
    Ok(true)
}

/// `$currentDate`: Set the field to the current time, as a date or, with
/// `{$type: "timestamp"}`, as a timestamp.
pub(crate) fn op_current_date(doc: &mut Document, path: &Path, spec: &Bson, now: DateTime) -> Result<bool, CommandError> {
    let timestamp = matches!(
        spec,
        Bson::Document(d) if matches!(d.get("$type"), Some(Bson::String(t)) if t == "timestamp")
    );
    let value = if timestamp {
        let secs = now.timestamp_millis().div_euclid(1000);
        Bson::Timestamp(Timestamp {
            time: u32::try_from(secs).unwrap_or(u32::MAX),
            increment: 1,
        })
    } else {
        Bson::DateTime(now)
    };
    access::set(doc, path, value)?;
    Ok(true)
}

/// `$bit`: Apply `and`/`or`/`xor` to an integer field, in argument order.
///
/// A missing field starts from int32 `0`. The result is int64 when either
/// side is int64.
pub(crate) fn op_bit(doc: &mut Document, path: &Path, spec: &Bson) -> Result<bool, CommandError> {
    let Bson::Document(ops) = spec else {
        return Err(CommandError::new(
            ErrorCode::BadValue,
            format!(
                "The $bit modifier is not compatible with a {}. You must pass in an embedded document: {{$bit: {{field: {{and/or/xor: #}}}}",
                type_alias(spec)
            ),
        ));
    };
    if ops.is_empty() {
        return Err(CommandError::new(
            ErrorCode::BadValue,
            "You must pass in at least one bitwise operation. The format is: {$bit: {field: {and/or/xor: #}}",
        ));
    }

    let existing = get_by_path(doc, path).cloned();
    let original = existing.clone().unwrap_or(Bson::Int32(0));
    let mut value = original.clone();

    for (op, operand) in ops {
        if !matches!(operand, Bson::Int32(_) | Bson::Int64(_)) {
            return Err(CommandError::new(
                ErrorCode::BadValue,
                format!(
                    "The $bit modifier field must be an Integer(32/64 bit); a '{}' is not supported here: {{{op}: {}}}",
                    type_alias(operand),
                    format_value(operand)
                ),
            ));
        }
        value = match (&value, operand) {
            (Bson::Int32(a), Bson::Int32(b)) => Bson::Int32(bitwise(op, i64::from(*a), i64::from(*b))? as i32),
            (Bson::Int32(_) | Bson::Int64(_), _) => {
                let a = integer_bits(&value);
                let b = integer_bits(operand);
                Bson::Int64(bitwise(op, a, b)?)
            }
            (other, _) => {
                return Err(CommandError::new(
                    ErrorCode::BadValue,
                    format!(
                        "Cannot apply $bit to a value of non-integral type._id: {} has the field {} of non-integer type {}",
                        document_id(doc),
                        path.suffix(),
                        type_alias(other)
                    ),
                ));
            }
        };
    }

    if existing.is_some() && value == original {
        return Ok(false);
    }
    access::set(doc, path, value)?;
    Ok(true)
}

fn integer_bits(value: &Bson) -> i64 {
    match value {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        _ => 0,
    }
}

fn bitwise(op: &str, a: i64, b: i64) -> Result<i64, CommandError> {
    match op {
        "and" => Ok(a & b),
        "or" => Ok(a | b),
        "xor" => Ok(a ^ b),
        _ => Err(CommandError::new(
            ErrorCode::BadValue,
            format!(
                "The $bit modifier only supports 'and', 'or', and 'xor', not '{op}' which is an unknown operator: {{{op}: {b}}}"
            ),
        )),
    }
}
