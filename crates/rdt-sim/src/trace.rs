use serde::Serialize;
use std::collections::HashMap;

use rdt_abstract::SimConfig;

use crate::engine::LinkEventSummary;

/// Every counter the simulator tracks, plus two raw sample lists
/// (`rtt_samples`, `message_sizes`) for offline analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub packets_sent: u32,
    pub packets_retransmitted: u32,
    pub packets_received: u32,
    pub packets_delivered: u32,
    pub packets_corrupted: u32,
    pub packets_lost: u32,
    pub packets_out_of_order: u32,
    pub timeouts: u32,
    pub rtt_samples: Vec<f64>,
    pub message_sizes: Vec<usize>,
}

/// A serializable snapshot of a finished simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub duration: u64,
    pub stats: Stats,
    pub delivered_data: Vec<Vec<u8>>,
    /// Arbitrary named time series recorded via `SystemContext::record_metric`.
    pub metrics: HashMap<String, Vec<(u64, f64)>>,
    pub link_events: Vec<LinkEventSummary>,
}
