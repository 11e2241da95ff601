use bson::Document;
use shale_query::QueryConfig;
use tracing::debug;

use crate::error::DbError;
use crate::executor::{
    CountIter, DistinctIter, DocIter, DocumentIter, FilterIter, LimitIter, ProjectionIter, SkipIter,
    SortIter, Source,
};
use crate::options::{DistinctOptions, FindOptions};

/// A composed chain of stages over one document source.
///
/// Closing the pipeline closes every stage, and through them the source,
/// exactly once. Dropping an unclosed pipeline closes it.
pub struct Pipeline<'a> {
    root: Source<'a>,
}

impl<'a> Pipeline<'a> {
    /// `find`: filter, sort, skip, limit, then projection.
    ///
    /// Projection runs last so sort keys and the positional operator see
    /// whole documents.
    pub fn find(source: DocIter<'a>, options: &FindOptions, config: &QueryConfig) -> Result<Self, DbError> {
        let mut iter: DocIter<'a> = source;
        let mut stages = vec!["values"];

        if !options.filter.is_empty() {
            iter = Box::new(FilterIter::new(iter, options.filter.clone(), config.clone()));
            stages.push("filter");
        }
        if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
            iter = Box::new(SortIter::new(iter, sort, config)?);
            stages.push("sort");
        }
        if options.skip > 0 {
            iter = Box::new(SkipIter::new(iter, to_usize(options.skip)));
            stages.push("skip");
        }
        if options.limit > 0 {
            iter = Box::new(LimitIter::new(iter, to_usize(options.limit)));
            stages.push("limit");
        }
        if let Some(projection) = options.projection.as_ref() {
            iter = Box::new(ProjectionIter::new(
                iter,
                projection,
                options.filter.clone(),
                config.clone(),
            )?);
            stages.push("projection");
        }

        debug!(command = "find", stages = ?stages, "pipeline built");
        Ok(Self::new(iter))
    }

    /// `count`: yields `{n: <matching documents>}`.
    pub fn count(source: DocIter<'a>, filter: &Document, config: &QueryConfig) -> Result<Self, DbError> {
        let filtered: DocIter<'a> = Box::new(FilterIter::new(source, filter.clone(), config.clone()));
        debug!(command = "count", "pipeline built");
        Ok(Self::new(Box::new(CountIter::new(filtered, "n"))))
    }

    /// `distinct`: yields `{values: [...]}`.
    pub fn distinct(
        source: DocIter<'a>,
        options: &DistinctOptions,
        config: &QueryConfig,
    ) -> Result<Self, DbError> {
        let filtered: DocIter<'a> = Box::new(FilterIter::new(source, options.filter.clone(), config.clone()));
        let iter = DistinctIter::new(filtered, &options.key)?;
        debug!(command = "distinct", key = %options.key, "pipeline built");
        Ok(Self::new(Box::new(iter)))
    }

    fn new(root: DocIter<'a>) -> Self {
        Self {
            root: Source::new("pipeline", root),
        }
    }

    /// Pull every remaining document and close the pipeline.
    pub fn collect(mut self) -> Result<Vec<Document>, DbError> {
        let mut docs = Vec::new();
        let result = loop {
            match self.root.next() {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => break Ok(docs),
                Err(e) => break Err(e),
            }
        };
        self.root.close();
        result
    }
}

impl DocumentIter for Pipeline<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        self.root.next()
    }

    fn close(&mut self) {
        self.root.close();
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
