//! The scan-and-route pipeline and its state machine.
//!
//! Each invocation moves through
//! `Received → DefinitionsRefreshed → Downloaded → Classified → Tagged →
//! Routed → Notified → CleanedUp`. A fatal error jumps to `CleanedUp`;
//! side effects already performed are not undone.

mod artifact;
mod routing;
mod scan_pipeline;
mod state;

pub use artifact::LocalArtifact;
pub use routing::{route_object, RoutingTable, TopicTable};
pub use scan_pipeline::{NotificationStatus, ScanPipeline, ScanPipelineBuilder, ScanSummary};
pub use state::PipelineState;
