use bson::Document;
use shale_query::{QueryConfig, Sort, compare_documents, parse_sort};
use tracing::debug;

use crate::error::DbError;
use crate::executor::{DocIter, DocumentIter, Source};

/// Sorts `source`. The whole input is pulled on the first `next`.
pub struct SortIter<'a> {
    source: Source<'a>,
    sorts: Vec<Sort>,
    sorted: Option<std::vec::IntoIter<Document>>,
}

impl<'a> SortIter<'a> {
    /// Parses `spec` up front. On failure `source` is closed.
    pub fn new(source: DocIter<'a>, spec: &Document, config: &QueryConfig) -> Result<Self, DbError> {
        let source = Source::new("sort", source);
        let sorts = parse_sort(spec, config)?;
        Ok(Self {
            source,
            sorts,
            sorted: None,
        })
    }

    fn materialize(&mut self) -> Result<std::vec::IntoIter<Document>, DbError> {
        let mut docs = Vec::new();
        while let Some(doc) = self.source.next()? {
            docs.push(doc);
        }
        // stable, so equal keys keep input order
        docs.sort_by(|a, b| compare_documents(a, b, &self.sorts));
        debug!(stage = "sort", docs = docs.len(), "materialized");
        Ok(docs.into_iter())
    }
}

impl DocumentIter for SortIter<'_> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.sorted.is_none() {
            let sorted = self.materialize()?;
            self.sorted = Some(sorted);
        }
        Ok(self.sorted.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) {
        self.sorted = None;
        self.source.close();
    }
}
