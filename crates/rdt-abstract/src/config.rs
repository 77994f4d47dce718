use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Every tunable the simulator exposes. Channel shape
/// (loss/corrupt/latency/seed) and protocol shape (window/buffer/RTO) are
/// kept in one struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Sender window size N (1 for ABP, >=1 for GBN).
    pub window_size: u32,
    /// Bytes per packet before fragmentation.
    pub max_payload: usize,
    /// Ring buffer slots at the sender.
    pub bufsize: u32,

    /// RTO used before the first RTT sample.
    pub initial_rto: u64,
    pub rto_min: u64,
    pub rto_max: u64,
    /// Ceiling on the exponential-backoff multiplier.
    pub backoff_cap: u32,

    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            max_payload: 20,
            bufsize: 64,

            initial_rto: 15,
            rto_min: 1,
            rto_max: 120,
            backoff_cap: 64,

            loss_rate: 0.2,
            corrupt_rate: 0.01,
            min_latency: 5,
            max_latency: 15,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// The fixed, non-configurable ABP variant: window of 1, everything
    /// else taken from `self`.
    pub fn abp(self) -> Self {
        Self {
            window_size: 1,
            ..self
        }
    }

    /// Reject configurations that would make fragmentation or windowing
    /// ill-defined (a zero-byte `max_payload` would panic `[u8]::chunks`;
    /// a zero window or buffer would never admit a single packet).
    pub fn validate(&self) -> Result<(), SimError> {
        if self.max_payload == 0 {
            return Err(SimError::InvariantViolation("max_payload must be non-zero".into()));
        }
        if self.window_size == 0 {
            return Err(SimError::InvariantViolation("window_size must be non-zero".into()));
        }
        if self.bufsize == 0 {
            return Err(SimError::InvariantViolation("bufsize must be non-zero".into()));
        }
        Ok(())
    }
}
