use bson::{Bson, Document};

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Counts `source`, yielding a single `{field: n}` document.
pub struct CountIter<'a> {
    source: Source<'a>,
    field: String,
    done: bool,
}

impl<'a> CountIter<'a> {
    pub fn new(source: DocIter<'a>, field: impl Into<String>) -> Self {
        Self {
            source: Source::new("count", source),
            field: field.into(),
            done: false,
        }
    }
}

impl DocumentIter for CountIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.done {
            return Ok(None);
        }
        let mut n: i64 = 0;
        while self.source.next()?.is_some() {
            n += 1;
        }
        self.done = true;

        let count = match i32::try_from(n) {
            Ok(n) => Bson::Int32(n),
            Err(_) => Bson::Int64(n),
        };
        let mut doc = Document::new();
        doc.insert(self.field.clone(), count);
        Ok(Some(doc))
    }

    fn close(&mut self) {
        self.source.close();
    }
}
