//! Object store adapters.
//!
//! The pipeline talks to storage only through the [`ObjectStore`] trait so
//! the S3 client can be swapped for the in-memory store in tests.

mod memory;
mod s3;
mod traits;

pub use memory::{InMemoryObjectStore, StoreCall, StoreOperation};
pub use s3::{S3ObjectStore, S3StoreConfig};
pub use traits::{ArcObjectStore, ObjectStore};
