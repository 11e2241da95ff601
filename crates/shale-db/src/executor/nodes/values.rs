use bson::Document;

use crate::error::DbError;
use crate::executor::DocumentIter;

/// In-memory document source.
pub struct ValuesIter {
    docs: std::vec::IntoIter<Document>,
    closed: bool,
}

impl ValuesIter {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: docs.into_iter(),
            closed: false,
        }
    }
}

impl DocumentIter for ValuesIter {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.closed {
            return Err(DbError::Closed);
        }
        Ok(self.docs.next())
    }

    fn close(&mut self) {
        self.closed = true;
        self.docs = Vec::new().into_iter();
    }
}
