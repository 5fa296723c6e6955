//! Definition build & publish pipeline.
//!
//! The pipeline is a single logical sequence per invocation:
//! source selection, bundling, optional sandboxed validation, gzip
//! compression, then the backend's three-phase publish protocol. The
//! orchestrator owns all temporary resources end to end; no component
//! retains state across calls.

pub mod compress;
mod error;
mod orchestrator;
mod phase;
mod workspace;

pub use error::{PublishError, Result};
pub use orchestrator::PublishOrchestrator;
pub use phase::{PhaseMachine, PublishPhase};
pub use workspace::TempWorkspace;
