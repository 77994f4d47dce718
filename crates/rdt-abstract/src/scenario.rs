use crate::config::SimConfig;
use serde::Deserialize;

/// A scripted, fully data-driven test case: traffic + deterministic
/// faults + post-run assertions against a `SimulationReport`-shaped
/// summary. What `rdt-cli --scenario <file>.toml` drives directly.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    pub actions: Vec<TestAction>,
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub window_size: Option<u32>,
    pub loss_rate: Option<f64>,
    pub corrupt_rate: Option<f64>,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub seed: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.loss_rate {
            config.loss_rate = v;
        }
        if let Some(v) = self.corrupt_rate {
            config.corrupt_rate = v;
        }
        if let Some(v) = self.min_latency {
            config.min_latency = v;
        }
        if let Some(v) = self.max_latency {
            config.max_latency = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Application sends data at a specific time.
    AppSend { time: u64, data: String },
    /// Deterministically drop the first packet sent by the sender with
    /// the given seq number, regardless of the RNG draw.
    DropNextFromSenderSeq { seq: u32 },
    /// Deterministically drop the first ACK sent by the receiver with
    /// the given ack number, regardless of the RNG draw.
    DropNextFromReceiverAck { ack: u32 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Some delivered payload equals `data` exactly.
    DataDelivered { data: String },
    /// Deliveries, concatenated in order, equal `data` exactly.
    DeliveredInOrder { data: String },
    /// Total packets sent by the sender falls in `[min, max]`.
    SenderPacketCount { min: u32, max: Option<u32> },
    /// Total retransmissions falls in `[min, max]`.
    RetransmissionCount { min: u32, max: Option<u32> },
    /// Total timeouts falls in `[min, max]`.
    TimeoutCount { min: u32, max: Option<u32> },
    /// Simulation finishes within `ms` logical time units.
    MaxDuration { ms: u64 },
}
