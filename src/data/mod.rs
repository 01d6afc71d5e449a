//! Data access: blob stores, measure parsing, loading, caching, and synthetic data.

pub mod aggregator;
pub mod blob;
pub mod cache;
pub mod http;
pub mod measure;
pub mod synthetic;
pub mod weights;

pub use aggregator::{LoadReport, MeasureAggregator};
pub use blob::{BlobKey, BlobStore, DirBlobStore, MemoryBlobStore};
pub use cache::{CachedMeasures, MeasureCache};
pub use http::HttpBlobStore;
pub use measure::MeasureStore;
pub use weights::WeightTable;
