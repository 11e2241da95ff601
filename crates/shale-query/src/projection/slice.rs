use bson::Bson;

use crate::error::{CommandError, ErrorCode};
use crate::value::{format_value, type_alias};

/// A parsed `$slice` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slice {
    /// `n >= 0`: keep the first `n` elements.
    First(usize),
    /// `n < 0`: keep the last `|n|` elements.
    Last(usize),
    /// `[skip, limit]`; a negative skip counts from the end.
    Range { skip: i64, limit: usize },
    /// `[skip, null]`: drop the field.
    Omit,
}

impl Slice {
    pub(crate) fn parse(arg: &Bson) -> Result<Slice, CommandError> {
        match arg {
            Bson::Int32(n) => Ok(Slice::from_count(i64::from(*n))),
            Bson::Int64(n) => Ok(Slice::from_count(*n)),
            Bson::Double(f) if f.is_nan() => Ok(Slice::First(0)),
            Bson::Double(f) if *f == f64::INFINITY => Ok(Slice::First(usize::MAX)),
            Bson::Double(f) if *f == f64::NEG_INFINITY => Ok(Slice::Last(usize::MAX)),
            Bson::Double(f) => Ok(Slice::from_count(f.trunc() as i64)),
            Bson::Array(args) => Slice::parse_range(arg, args),
            other => Err(syntax_error(
                other,
                "Location31273: $slice only supports numbers and [skip, limit] arrays",
                1,
            )),
        }
    }

    fn from_count(n: i64) -> Slice {
        let magnitude = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
        if n < 0 {
            Slice::Last(magnitude)
        } else {
            Slice::First(magnitude)
        }
    }

    fn parse_range(arg: &Bson, args: &[Bson]) -> Result<Slice, CommandError> {
        if args.len() != 2 && args.len() != 3 {
            return Err(syntax_error(
                arg,
                "Location31272: $slice array argument should be of form [skip, limit]",
                args.len(),
            ));
        }

        // every shape error below names the type of the first element
        let first_arg = || {
            CommandError::with_argument(
                ErrorCode::SliceFirstArg,
                format!(
                    "First argument to $slice must be an array, but is of type: {}",
                    type_alias(&args[0])
                ),
                "projection",
            )
        };

        if args.len() == 3 {
            return Err(first_arg());
        }
        let skip = match integral(&args[0]) {
            Some(n) => n,
            None => return Err(first_arg()),
        };
        let limit = match &args[1] {
            Bson::Null => return Ok(Slice::Omit),
            other => integral(other).ok_or_else(first_arg)?,
        };
        if limit < 0 {
            return Err(first_arg());
        }

        Ok(Slice::Range {
            skip,
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
        })
    }

    /// Slice `arr`. `None` means the field is dropped.
    pub(crate) fn apply(self, arr: &[Bson]) -> Option<Vec<Bson>> {
        let len = arr.len();
        let (start, end) = match self {
            Slice::First(n) => (0, n.min(len)),
            Slice::Last(n) => (len - n.min(len), len),
            Slice::Range { skip, limit } => {
                let start = if skip < 0 {
                    let back = usize::try_from(skip.unsigned_abs()).unwrap_or(usize::MAX);
                    len.saturating_sub(back)
                } else {
                    usize::try_from(skip).unwrap_or(usize::MAX).min(len)
                };
                (start, start.saturating_add(limit).min(len))
            }
            Slice::Omit => return None,
        };
        Some(arr[start..end].to_vec())
    }
}

/// Numeric `$slice` element; doubles truncate toward zero.
fn integral(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) => Some(f.trunc() as i64),
        _ => None,
    }
}

fn syntax_error(arg: &Bson, reason: &str, passed: usize) -> CommandError {
    CommandError::with_argument(
        ErrorCode::InvalidArg,
        format!(
            "Invalid $slice syntax. The given syntax {{ $slice: {} }} did not match the find() syntax because :: {reason} :: The given syntax did not match the expression $slice syntax. :: caused by :: Expression $slice takes at least 2 arguments, and at most 3, but {passed} were passed in.",
            format_value(arg)
        ),
        "projection",
    )
}
