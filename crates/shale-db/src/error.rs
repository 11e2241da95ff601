use shale_query::CommandError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("source error: {0}")]
    Source(String),
    #[error("iterator is closed")]
    Closed,
}

impl DbError {
    /// The wire error document for this failure.
    ///
    /// Source and lifecycle failures surface as `InternalError`.
    pub fn to_command_error(&self) -> CommandError {
        match self {
            DbError::Command(e) => e.clone(),
            other => CommandError::internal("executor", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use shale_query::ErrorCode;

    use super::*;

    #[test]
    fn command_errors_pass_through() {
        let err: DbError = CommandError::new(ErrorCode::BadValue, "bad").into();
        assert_eq!(err.to_string(), "bad");
        assert_eq!(err.to_command_error().code(), ErrorCode::BadValue);
    }

    #[test]
    fn other_errors_are_internal() {
        let err = DbError::Source("disk gone".into()).to_command_error();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "executor: source error: disk gone");
        assert_eq!(DbError::Closed.to_command_error().message(), "executor: iterator is closed");
    }
}
