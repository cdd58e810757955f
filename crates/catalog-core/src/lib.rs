pub mod error;
pub mod query;

pub use error::CoreError;
pub use query::{CacheKey, CatalogQuery, GenreId, UpstreamRequest};
