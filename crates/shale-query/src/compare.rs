use std::cmp::Ordering;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Outcome of comparing two values.
///
/// `NotComparable` covers cross-type pairs and NaN against a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Less,
    Equal,
    Greater,
    NotComparable,
}

impl From<Ordering> for CompareResult {
    fn from(o: Ordering) -> Self {
        match o {
            Ordering::Less => CompareResult::Less,
            Ordering::Equal => CompareResult::Equal,
            Ordering::Greater => CompareResult::Greater,
        }
    }
}

impl CompareResult {
    /// Swap `Less` and `Greater`.
    pub fn reverse(self) -> Self {
        match self {
            CompareResult::Less => CompareResult::Greater,
            CompareResult::Greater => CompareResult::Less,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Position of a value's type in the canonical cross-type ordering.
///
/// MinKey < Null < NaN < numbers < strings < documents < arrays < binary
/// < ObjectId < booleans < dates < timestamps < regexes < MaxKey. Kinds
/// outside that list share a slot just below MaxKey.
pub fn type_order(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null => 1,
        Bson::Double(f) if f.is_nan() => 2,
        Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_) => 3,
        Bson::String(_) | Bson::Symbol(_) => 4,
        Bson::Document(_) => 5,
        Bson::Array(_) => 6,
        Bson::Binary(_) => 7,
        Bson::ObjectId(_) => 8,
        Bson::Boolean(_) => 9,
        Bson::DateTime(_) => 10,
        Bson::Timestamp(_) => 11,
        Bson::RegularExpression(_) => 12,
        Bson::Decimal128(_)
        | Bson::Undefined
        | Bson::DbPointer(_)
        | Bson::JavaScriptCode(_)
        | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 14,
    }
}

/// Compare two whole values of the same kind.
///
/// Arrays are compared as arrays here; array-element semantics live in
/// [`values_equal`] and [`compare_for_ordering`].
pub fn compare(a: &Bson, b: &Bson) -> CompareResult {
    match (a, b) {
        (
            Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_),
            Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_),
        ) => compare_numbers(a, b),
        (Bson::String(x), Bson::String(y)) => x.as_bytes().cmp(y.as_bytes()).into(),
        (Bson::Symbol(x), Bson::Symbol(y)) => x.as_bytes().cmp(y.as_bytes()).into(),
        (Bson::Document(x), Bson::Document(y)) => compare_documents(x, y).into(),
        (Bson::Array(x), Bson::Array(y)) => compare_arrays(x, y).into(),
        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| u8::from(x.subtype).cmp(&u8::from(y.subtype)))
            .then_with(|| x.bytes.cmp(&y.bytes))
            .into(),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()).into(),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y).into(),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis()).into()
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment)).into()
        }
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => x
            .pattern
            .cmp(&y.pattern)
            .then_with(|| x.options.cmp(&y.options))
            .into(),
        (Bson::JavaScriptCode(x), Bson::JavaScriptCode(y)) => x.cmp(y).into(),
        (Bson::Decimal128(x), Bson::Decimal128(y)) if x.bytes() == y.bytes() => {
            CompareResult::Equal
        }
        (Bson::Null, Bson::Null)
        | (Bson::Undefined, Bson::Undefined)
        | (Bson::MinKey, Bson::MinKey)
        | (Bson::MaxKey, Bson::MaxKey) => CompareResult::Equal,
        _ => CompareResult::NotComparable,
    }
}

/// Total order over all values: type bracket first, then value.
pub fn compare_total(a: &Bson, b: &Bson) -> Ordering {
    type_order(a)
        .cmp(&type_order(b))
        .then_with(|| match compare(a, b) {
            CompareResult::Less => Ordering::Less,
            CompareResult::Greater => Ordering::Greater,
            CompareResult::Equal | CompareResult::NotComparable => Ordering::Equal,
        })
}

/// Implicit equality used by `{field: value}`, `$eq`, `$in` and friends.
///
/// An array field matches when it equals the operand as a whole or when
/// any of its elements does.
pub fn values_equal(doc_value: &Bson, filter_value: &Bson) -> bool {
    if compare(doc_value, filter_value) == CompareResult::Equal {
        return true;
    }
    match doc_value {
        Bson::Array(arr) => arr
            .iter()
            .any(|elem| compare(elem, filter_value) == CompareResult::Equal),
        _ => false,
    }
}

/// Comparison backing `$gt`, `$gte`, `$lt` and `$lte`.
///
/// Values of different type brackets never compare. An array field is
/// represented by its largest (`Desc`, for `$gt`/`$gte`) or smallest
/// (`Asc`, for `$lt`/`$lte`) element of the operand's bracket.
pub fn compare_for_ordering(
    doc_value: &Bson,
    filter_value: &Bson,
    direction: SortDirection,
) -> CompareResult {
    if let Bson::Array(arr) = doc_value {
        if !matches!(filter_value, Bson::Array(_)) {
            let bracket = type_order(filter_value);
            let candidates = arr.iter().filter(|v| type_order(v) == bracket);
            let extremal = match direction {
                SortDirection::Asc => candidates.min_by(|x, y| compare_total(x, y)),
                SortDirection::Desc => candidates.max_by(|x, y| compare_total(x, y)),
            };
            return match extremal {
                Some(v) => compare(v, filter_value),
                None => CompareResult::NotComparable,
            };
        }
    }

    if type_order(doc_value) != type_order(filter_value) {
        return CompareResult::NotComparable;
    }
    compare(doc_value, filter_value)
}

/// Order two sort keys.
///
/// An array sorts by its smallest element ascending and its largest
/// element descending; an empty array sorts below every other value.
pub fn compare_for_sort(a: &Bson, b: &Bson, direction: SortDirection) -> Ordering {
    let ord = match (sort_key(a, direction), sort_key(b, direction)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_total(x, y),
    };
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn sort_key(value: &Bson, direction: SortDirection) -> Option<&Bson> {
    match value {
        Bson::Array(arr) => match direction {
            SortDirection::Asc => arr.iter().min_by(|x, y| compare_total(x, y)),
            SortDirection::Desc => arr.iter().max_by(|x, y| compare_total(x, y)),
        },
        other => Some(other),
    }
}

// ── Numbers ─────────────────────────────────────────────────────

fn compare_numbers(a: &Bson, b: &Bson) -> CompareResult {
    match (a, b) {
        (Bson::Double(x), Bson::Double(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => CompareResult::Equal,
            (false, false) => x
                .partial_cmp(y)
                .map_or(CompareResult::NotComparable, CompareResult::from),
            _ => CompareResult::NotComparable,
        },
        (Bson::Double(x), _) => match as_i64(b) {
            Some(n) => compare_double_long(*x, n),
            None => CompareResult::NotComparable,
        },
        (_, Bson::Double(y)) => match as_i64(a) {
            Some(n) => compare_double_long(*y, n).reverse(),
            None => CompareResult::NotComparable,
        },
        _ => match (as_i64(a), as_i64(b)) {
            (Some(x), Some(y)) => x.cmp(&y).into(),
            _ => CompareResult::NotComparable,
        },
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Exact `f64` vs `i64` comparison.
///
/// Splits the double into integral and fractional parts instead of
/// rounding the integer to 53 bits.
fn compare_double_long(f: f64, n: i64) -> CompareResult {
    if f.is_nan() {
        return CompareResult::NotComparable;
    }
    if f >= TWO_POW_63 {
        return CompareResult::Greater;
    }
    if f < -TWO_POW_63 {
        return CompareResult::Less;
    }

    // |trunc(f)| <= 2^63 and f >= -2^63, so the cast is exact.
    let whole = f.trunc();
    match (whole as i64).cmp(&n) {
        Ordering::Equal => {
            let frac = f - whole;
            if frac > 0.0 {
                CompareResult::Greater
            } else if frac < 0.0 {
                CompareResult::Less
            } else {
                CompareResult::Equal
            }
        }
        o => o.into(),
    }
}

// ── Composites ──────────────────────────────────────────────────

/// Field-by-field: value bracket, then key, then value. Key order matters.
fn compare_documents(a: &Document, b: &Document) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => {
                let o = type_order(va)
                    .cmp(&type_order(vb))
                    .then_with(|| ka.cmp(kb))
                    .then_with(|| compare_total(va, vb));
                if o != Ordering::Equal {
                    return o;
                }
            }
        }
    }
}

fn compare_arrays(a: &[Bson], b: &[Bson]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let o = compare_total(x, y);
        if o != Ordering::Equal {
            return o;
        }
    }
    a.len().cmp(&b.len())
}
