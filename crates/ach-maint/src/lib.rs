//! Maintenance tooling for the achievement workspace
//!
//! - [`simulate`]: concurrent review race simulator over in-memory stores
//! - [`telemetry`]: tracing subscriber setup for the binary

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod simulate;
pub mod telemetry;

pub use simulate::{run_simulator, SimulatorConfig, SimulatorReport, SimulatorStats, Violation};
