//! Signature database maintenance.
//!
//! - [`SignatureRefresher`] updates the local database before each scan,
//!   best-effort and time-bounded.
//! - [`DefinitionsPublisher`] copies a refreshed database to a bucket so
//!   other scanners can reuse it.
//! - [`DefinitionsUpdater`] runs both on a schedule, treating any refresh
//!   failure as an error.

mod publisher;
mod refresher;
mod updater;

pub use publisher::DefinitionsPublisher;
pub use refresher::{
    count_signature_files, ArcRefresher, FreshclamConfig, FreshclamRefresher, RefreshOutcome,
    SignatureRefresher, StaticRefresher,
};
pub use updater::DefinitionsUpdater;
