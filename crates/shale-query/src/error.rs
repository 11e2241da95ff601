use bson::{Bson, Document, doc};

/// Error codes surfaced to clients.
///
/// Named codes map to MongoDB's well-known `codeName`s; the remaining
/// variants are location codes reported as `Location<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InternalError,
    BadValue,
    FailedToParse,
    TypeMismatch,
    UnsuitableValueType,
    ConflictingUpdateOperators,
    DollarPrefixedFieldName,
    EmptyName,
    CommandNotFound,
    ImmutableField,
    NotImplemented,
    SortBadValue,
    SortBadOrder,
    PathContainsEmptyElement,
    FieldPathInvalidName,
    InvalidArg,
    SliceFirstArg,
    ProjectionInEx,
    ProjectionExIn,
    WrongPositionalOperatorLocation,
    ExclusionPositionalProjection,
    EmptyFieldPath,
    InvalidFieldPath,
    RegexOptions,
    RegexMissingParen,
    BadRegexOption,
    ElementMismatchPositionalProjection,
    BadPositionalProjection,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::InternalError => 1,
            ErrorCode::BadValue => 2,
            ErrorCode::FailedToParse => 9,
            ErrorCode::TypeMismatch => 14,
            ErrorCode::UnsuitableValueType => 28,
            ErrorCode::ConflictingUpdateOperators => 40,
            ErrorCode::DollarPrefixedFieldName => 52,
            ErrorCode::EmptyName => 56,
            ErrorCode::CommandNotFound => 59,
            ErrorCode::ImmutableField => 66,
            ErrorCode::NotImplemented => 238,
            ErrorCode::SortBadValue => 15974,
            ErrorCode::SortBadOrder => 15975,
            ErrorCode::PathContainsEmptyElement => 15998,
            ErrorCode::FieldPathInvalidName => 16410,
            ErrorCode::InvalidArg => 28667,
            ErrorCode::SliceFirstArg => 28724,
            ErrorCode::ProjectionInEx => 31253,
            ErrorCode::ProjectionExIn => 31254,
            ErrorCode::WrongPositionalOperatorLocation => 31394,
            ErrorCode::ExclusionPositionalProjection => 31395,
            ErrorCode::EmptyFieldPath => 40352,
            ErrorCode::InvalidFieldPath => 40353,
            ErrorCode::RegexOptions => 51075,
            ErrorCode::RegexMissingParen => 51091,
            ErrorCode::BadRegexOption => 51108,
            ErrorCode::ElementMismatchPositionalProjection => 51246,
            ErrorCode::BadPositionalProjection => 51247,
        }
    }

    /// The `codeName` field of the wire error document.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::InternalError => "InternalError",
            ErrorCode::BadValue => "BadValue",
            ErrorCode::FailedToParse => "FailedToParse",
            ErrorCode::TypeMismatch => "TypeMismatch",
            ErrorCode::UnsuitableValueType => "UnsuitableValueType",
            ErrorCode::ConflictingUpdateOperators => "ConflictingUpdateOperators",
            ErrorCode::DollarPrefixedFieldName => "DollarPrefixedFieldName",
            ErrorCode::EmptyName => "EmptyName",
            ErrorCode::CommandNotFound => "CommandNotFound",
            ErrorCode::ImmutableField => "ImmutableField",
            ErrorCode::NotImplemented => "NotImplemented",
            ErrorCode::SortBadValue => "Location15974",
            ErrorCode::SortBadOrder => "Location15975",
            ErrorCode::PathContainsEmptyElement => "Location15998",
            ErrorCode::FieldPathInvalidName => "Location16410",
            ErrorCode::InvalidArg => "Location28667",
            ErrorCode::SliceFirstArg => "Location28724",
            ErrorCode::ProjectionInEx => "Location31253",
            ErrorCode::ProjectionExIn => "Location31254",
            ErrorCode::WrongPositionalOperatorLocation => "Location31394",
            ErrorCode::ExclusionPositionalProjection => "Location31395",
            ErrorCode::EmptyFieldPath => "Location40352",
            ErrorCode::InvalidFieldPath => "Location40353",
            ErrorCode::RegexOptions => "Location51075",
            ErrorCode::RegexMissingParen => "Location51091",
            ErrorCode::BadRegexOption => "Location51108",
            ErrorCode::ElementMismatchPositionalProjection => "Location51246",
            ErrorCode::BadPositionalProjection => "Location51247",
        }
    }
}

/// A command failure: code, client-facing message and the offending
/// argument (operator or command field) when one is known.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    code: ErrorCode,
    message: String,
    argument: Option<String>,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            argument: None,
        }
    }

    pub fn with_argument(
        code: ErrorCode,
        message: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            argument: Some(argument.into()),
        }
    }

    /// Wrap a collaborator failure, prefixing the call site.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, format!("{context}: {err}"))
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// `{ok: 0, errmsg, code, codeName}`
    pub fn to_document(&self) -> Document {
        doc! {
            "ok": 0.0,
            "errmsg": self.message.as_str(),
            "code": self.code.code(),
            "codeName": self.code.name(),
        }
    }
}

/// One failed item of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteError {
    pub index: usize,
    pub code: ErrorCode,
    pub message: String,
}

impl WriteError {
    pub fn to_document(&self) -> Document {
        doc! {
            "index": self.index as i32,
            "code": self.code.code(),
            "errmsg": self.message.as_str(),
        }
    }
}

/// Per-item failures collected while processing a batch.
#[derive(Debug, Clone, Default, PartialEq, thiserror::Error)]
#[error("{} write error(s)", .0.len())]
pub struct WriteErrors(Vec<WriteError>);

impl WriteErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, err: CommandError) {
        self.0.push(WriteError {
            index,
            code: err.code,
            message: err.message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WriteError> {
        self.0.iter()
    }

    /// `{ok: 1, writeErrors: [{index, code, errmsg}, ...]}`
    pub fn to_document(&self) -> Document {
        let errors: Vec<Bson> = self
            .0
            .iter()
            .map(|e| Bson::Document(e.to_document()))
            .collect();
        doc! { "ok": 1.0, "writeErrors": errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_location_codes() {
        assert_eq!(ErrorCode::BadValue.code(), 2);
        assert_eq!(ErrorCode::BadValue.name(), "BadValue");
        assert_eq!(ErrorCode::SortBadOrder.code(), 15975);
        assert_eq!(ErrorCode::SortBadOrder.name(), "Location15975");
        assert_eq!(ErrorCode::NotImplemented.code(), 238);
    }

    #[test]
    fn command_error_document_shape() {
        let err = CommandError::with_argument(ErrorCode::BadValue, "$and must be an array", "$and");
        assert_eq!(err.argument(), Some("$and"));
        assert_eq!(err.to_string(), "$and must be an array");

        let doc = err.to_document();
        assert_eq!(doc.get_f64("ok").unwrap(), 0.0);
        assert_eq!(doc.get_str("errmsg").unwrap(), "$and must be an array");
        assert_eq!(doc.get_i32("code").unwrap(), 2);
        assert_eq!(doc.get_str("codeName").unwrap(), "BadValue");
    }

    #[test]
    fn write_errors_carry_index() {
        let mut errors = WriteErrors::new();
        assert!(errors.is_empty());
        errors.push(3, CommandError::new(ErrorCode::TypeMismatch, "bad inc"));

        let doc = errors.to_document();
        let list = doc.get_array("writeErrors").unwrap();
        assert_eq!(list.len(), 1);
        let first = list[0].as_document().unwrap();
        assert_eq!(first.get_i32("index").unwrap(), 3);
        assert_eq!(first.get_i32("code").unwrap(), 14);
        assert_eq!(first.get_str("errmsg").unwrap(), "bad inc");
    }
}
