use regex::{Regex, RegexBuilder};

use crate::config::QueryConfig;
use crate::error::{CommandError, ErrorCode};

/// Compile a MongoDB regular expression.
///
/// Supported option flags are `i`, `m`, `s` and `x`; anything else is
/// rejected before compiling.
pub fn compile(pattern: &str, options: &str, config: &QueryConfig) -> Result<Regex, CommandError> {
    let mut builder = RegexBuilder::new(pattern);
    for ch in options.chars() {
        match ch {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            c => {
                return Err(CommandError::with_argument(
                    ErrorCode::BadRegexOption,
                    format!(" invalid flag in regex options: {c}"),
                    "$options",
                ));
            }
        };
    }

    builder
        .size_limit(config.regex_size_limit)
        .build()
        .map_err(|e| {
            CommandError::with_argument(
                ErrorCode::RegexMissingParen,
                format!("Regular expression is invalid: {}", describe(&e)),
                "$regex",
            )
        })
}

fn describe(err: &regex::Error) -> String {
    match err {
        regex::Error::Syntax(msg) => {
            let last = msg.lines().last().unwrap_or_default();
            let reason = last.trim().trim_start_matches("error: ");
            match reason {
                "unclosed group" => "missing )".to_string(),
                "unopened group" => "unmatched closing parenthesis".to_string(),
                other => other.to_string(),
            }
        }
        regex::Error::CompiledTooBig(_) => "regular expression is too large".to_string(),
        other => other.to_string(),
    }
}
