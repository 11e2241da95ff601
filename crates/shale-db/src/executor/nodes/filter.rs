use bson::Document;
use shale_query::{QueryConfig, filter_document_with};

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Yields the documents of `source` that match `filter`.
pub struct FilterIter<'a> {
    source: Source<'a>,
    filter: Document,
    config: QueryConfig,
}

impl<'a> FilterIter<'a> {
    pub fn new(source: DocIter<'a>, filter: Document, config: QueryConfig) -> Self {
        Self {
            source: Source::new("filter", source),
            filter,
            config,
        }
    }
}

impl DocumentIter for FilterIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        while let Some(doc) = self.source.next()? {
            if filter_document_with(&doc, &self.filter, &self.config)? {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.source.close();
    }
}
