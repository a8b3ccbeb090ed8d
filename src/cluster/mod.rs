//! Cluster resize workflow.
//!
//! - [`model`] - typed topology payloads
//! - [`build_resize_request`] - target specification from the observed topology
//! - [`ResizeOrchestrator`] - the fetch / compute / submit state machine

mod delta;
mod error;
pub mod model;
mod orchestrator;

pub use delta::{build_resize_request, current_instance_size};
pub use error::ResizeError;
pub use model::{
    ClusterDescription, InstanceSpecs, RegionConfig, ReplicationSpec, ResizeRequest,
};
pub use orchestrator::{
    ATLAS_MEDIA_TYPE, ResizeOrchestrator, ResizeOutcome, ResizeState, resize_cluster,
};
