pub mod engine;
pub mod scenario;
pub mod trace;

pub use engine::{LinkEventSummary, NodeId, Simulator};
pub use trace::{SimulationReport, Stats};
