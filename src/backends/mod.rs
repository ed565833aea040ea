//! Scanning backend implementations.
//!
//! This module contains implementations of the `Scanner` trait.
//!
//! ## Available Backends
//!
//! - [`clamav`] - ClamAV via the one-shot `clamscan` command
//! - [`mock`] - A mock scanner for testing
//!
//! ## Implementing a Custom Backend
//!
//! A backend only has to produce the engine's raw report; verdict
//! derivation is shared:
//!
//! ```rust,ignore
//! use scanroute::core::{ClassificationError, ScanReport, Scanner};
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! pub struct MyScanner;
//!
//! #[async_trait]
//! impl Scanner for MyScanner {
//!     fn name(&self) -> &str {
//!         "my-scanner"
//!     }
//!
//!     async fn scan(&self, path: &Path) -> Result<ScanReport, ClassificationError> {
//!         todo!()
//!     }
//! }
//! ```

pub mod clamav;
pub mod mock;

// Re-exports
pub use clamav::{ClamAvConfig, ClamAvScanner};
pub use mock::MockScanner;
