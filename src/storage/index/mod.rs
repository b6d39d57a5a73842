#![forbid(unsafe_code)]

mod catalog;
mod selector;
mod types;

pub use catalog::{IndexCatalog, IndexRegistry};
pub use selector::{IndexPlan, IndexSelector, PropertyPredicate};
pub use types::{IndexKey, IndexMetadata, IndexScope, OperationType};
