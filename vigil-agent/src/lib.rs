//! Software-in-the-loop harness for the Vigil vehicle telemetry agent.
//!
//! Wires the core acquisition loop to simulated hardware so the whole
//! park/drive/accident pipeline can run on a workstation.

pub mod agent;
pub mod sim;

pub use agent::{AgentConfig, VehicleAgent};
