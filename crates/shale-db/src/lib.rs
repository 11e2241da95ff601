mod error;
mod executor;
mod options;
mod pipeline;
mod write;

pub use bson::{Bson, Document};
pub use error::DbError;
pub use executor::{
    CountIter, DistinctIter, DocIter, DocumentIter, FilterIter, LimitIter, ProjectionIter, SkipIter,
    SortIter, ValuesIter, drain,
};
pub use options::{DistinctOptions, FindOptions, UpdateOptions};
pub use pipeline::Pipeline;
pub use write::{UpdateOutcome, UpdateStatement, update_many};
