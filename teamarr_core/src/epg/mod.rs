//! EPG orchestration.
//!
//! Turns configured teams and event groups into programme timelines:
//! fetch → enrich → resolve → splice filler. Per-team work runs on a
//! bounded pool with per-team error isolation.

pub mod context;
pub mod groups;
pub mod orchestrator;

pub use orchestrator::{
    EpgOrchestrator, GenerationRequest, GenerationResult, GenerationStats, ProgressCallback,
};
