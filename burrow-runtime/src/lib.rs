//! Burrow Runtime
//!
//! Drives a research run end to end:
//! - [`Orchestrator`]: depth-bounded recursion over search, extraction and
//!   sub-query generation
//! - [`Settings`]: TOML configuration for the run and the network layer
//! - [`ReportWriter`]: persists a run's results as markdown documents

pub mod orchestrator;
pub mod report;
pub mod settings;

pub use orchestrator::*;
pub use report::*;
pub use settings::*;
