use bson::Document;

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Discards the first `n` documents of `source`.
pub struct SkipIter<'a> {
    source: Source<'a>,
    remaining: usize,
}

impl<'a> SkipIter<'a> {
    pub fn new(source: DocIter<'a>, n: usize) -> Self {
        Self {
            source: Source::new("skip", source),
            remaining: n,
        }
    }
}

impl DocumentIter for SkipIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        while self.remaining > 0 {
            if self.source.next()?.is_none() {
                self.remaining = 0;
                return Ok(None);
            }
            self.remaining -= 1;
        }
        self.source.next()
    }

    fn close(&mut self) {
        self.source.close();
    }
}

/// Yields at most `n` documents of `source`, then stops pulling.
pub struct LimitIter<'a> {
    source: Source<'a>,
    remaining: usize,
}

impl<'a> LimitIter<'a> {
    pub fn new(source: DocIter<'a>, n: usize) -> Self {
        Self {
            source: Source::new("limit", source),
            remaining: n,
        }
    }
}

impl DocumentIter for LimitIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let doc = self.source.next()?;
        if doc.is_some() {
            self.remaining -= 1;
        }
        Ok(doc)
    }

    fn close(&mut self) {
        self.source.close();
    }
}
