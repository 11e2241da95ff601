use bson::Document;
use shale_query::{QueryConfig, project_document_with, validate_projection};

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Projects each document of `source`.
///
/// `filter` is the query filter, needed by positional (`field.$`)
/// projections.
pub struct ProjectionIter<'a> {
    source: Source<'a>,
    projection: Document,
    inclusion: bool,
    filter: Document,
    config: QueryConfig,
}

impl<'a> ProjectionIter<'a> {
    /// Validates `projection` up front. On failure `source` is closed.
    pub fn new(
        source: DocIter<'a>,
        projection: &Document,
        filter: Document,
        config: QueryConfig,
    ) -> Result<Self, DbError> {
        let source = Source::new("projection", source);
        let (projection, inclusion) = validate_projection(projection)?;
        Ok(Self {
            source,
            projection,
            inclusion,
            filter,
            config,
        })
    }
}

impl DocumentIter for ProjectionIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        let Some(doc) = self.source.next()? else {
            return Ok(None);
        };
        let projected = project_document_with(
            &doc,
            &self.projection,
            self.inclusion,
            &self.filter,
            &self.config,
        )?;
        Ok(Some(projected))
    }

    fn close(&mut self) {
        self.source.close();
    }
}
