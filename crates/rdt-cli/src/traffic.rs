//! Application-layer traffic generators: either a scripted list of
//! `(time, bytes)` sends, or a Poisson arrival process with fixed-size
//! payloads.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

use rdt_sim::Simulator;

/// A single message to hand to the application layer at a given logical
/// time.
pub struct ScriptedSend {
    pub time: u64,
    pub data: Vec<u8>,
}

pub enum Traffic {
    /// An explicit, ordered list of sends.
    Scripted(Vec<ScriptedSend>),
    /// `count` messages of `payload_len` bytes, with inter-arrival times
    /// drawn from an exponential distribution of rate `rate_per_sec`
    /// (logical time units are treated as milliseconds).
    Poisson {
        rate_per_sec: f64,
        count: u32,
        payload_len: usize,
        seed: u64,
    },
}

impl Traffic {
    /// Schedule every generated send on `sim`.
    pub fn apply(&self, sim: &mut Simulator) {
        match self {
            Traffic::Scripted(sends) => {
                for send in sends {
                    sim.schedule_app_send(send.time, send.data.clone());
                }
            }
            Traffic::Poisson { rate_per_sec, count, payload_len, seed } => {
                let mean_gap_ms = 1000.0 / rate_per_sec.max(1e-9);
                let exp = Exp::new(1.0 / mean_gap_ms).expect("rate must be positive");
                let mut rng = StdRng::seed_from_u64(*seed);

                let mut time = 0u64;
                for i in 0..*count {
                    let gap = exp.sample(&mut rng).round() as u64;
                    time += gap.max(1);
                    let payload = vec![b'a' + (i % 26) as u8; *payload_len];
                    sim.schedule_app_send(time, payload);
                }
            }
        }
    }
}
