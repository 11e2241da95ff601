mod nodes;

use bson::Document;
use tracing::trace;

use crate::error::DbError;

pub use nodes::count::CountIter;
pub use nodes::distinct::DistinctIter;
pub use nodes::filter::FilterIter;
pub use nodes::limit::{LimitIter, SkipIter};
pub use nodes::projection::ProjectionIter;
pub use nodes::sort::SortIter;
pub use nodes::values::ValuesIter;

// ── DocumentIter ────────────────────────────────────────────────

/// A pull-based, finite sequence of documents that must be closed.
///
/// `next` returns `Ok(None)` once exhausted. `close` releases whatever the
/// iterator holds; the stage that owns an iterator calls it exactly once,
/// explicitly or on drop.
pub trait DocumentIter {
    fn next(&mut self) -> Result<Option<Document>, DbError>;
    fn close(&mut self);
}

pub type DocIter<'a> = Box<dyn DocumentIter + 'a>;

impl<T: DocumentIter + ?Sized> DocumentIter for Box<T> {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Pull every remaining document, then close `iter` whether or not the
/// pull failed.
pub fn drain(mut iter: impl DocumentIter) -> Result<Vec<Document>, DbError> {
    let mut docs = Vec::new();
    let result = loop {
        match iter.next() {
            Ok(Some(doc)) => docs.push(doc),
            Ok(None) => break Ok(docs),
            Err(e) => break Err(e),
        }
    };
    iter.close();
    result
}

// ── Source ──────────────────────────────────────────────────────

/// The inner iterator of a stage.
///
/// Closes it on the first `close` and on drop, never twice. Pulling after
/// close is `DbError::Closed`.
pub(crate) struct Source<'a> {
    stage: &'static str,
    inner: Option<DocIter<'a>>,
}

impl<'a> Source<'a> {
    pub(crate) fn new(stage: &'static str, inner: DocIter<'a>) -> Self {
        Self {
            stage,
            inner: Some(inner),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Document>, DbError> {
        match self.inner.as_mut() {
            Some(inner) => inner.next(),
            None => Err(DbError::Closed),
        }
    }

    pub(crate) fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
            trace!(stage = self.stage, "closed");
        }
    }
}

impl Drop for Source<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests;
