mod compare;
mod config;
mod error;
mod filter;
pub mod path;
mod pattern;
mod projection;
mod sort;
mod update;
pub mod value;

pub use bson::{Bson, Document};
pub use compare::{CompareResult, SortDirection, compare, compare_for_sort, compare_total};
pub use config::QueryConfig;
pub use error::{CommandError, ErrorCode, WriteError, WriteErrors};
pub use filter::{filter_document, filter_document_with};
pub use path::{Path, PathError};
pub use projection::{project_document, project_document_with, validate_projection};
pub use sort::{Sort, compare_documents, parse_sort, sort_documents, sort_documents_with};
pub use update::{UpdateKind, UpdateMode, update_document, update_document_with, validate_update};
