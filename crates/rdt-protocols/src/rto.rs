use rdt_abstract::SimConfig;

/// Jacobson/Karels SRTT/RTTVAR estimator, driving the adaptive RTO. No
/// sample is ever fed in for a retransmitted segment — callers are
/// responsible for Karn's rule; this type only owns the smoothing math.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    srtt: Option<f64>,
    rttvar: f64,
    initial_rto: f64,
    rto_min: f64,
    rto_max: f64,
}

const ALPHA: f64 = 1.0 / 8.0;
const BETA: f64 = 1.0 / 4.0;

impl RttEstimator {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            srtt: None,
            rttvar: 0.0,
            initial_rto: config.initial_rto as f64,
            rto_min: config.rto_min as f64,
            rto_max: config.rto_max as f64,
        }
    }

    /// Fold in one RTT sample (logical time units).
    pub fn sample(&mut self, rtt: f64) {
        self.srtt = Some(match self.srtt {
            None => {
                self.rttvar = rtt / 2.0;
                rtt
            }
            Some(srtt) => {
                self.rttvar = (1.0 - BETA) * self.rttvar + BETA * (srtt - rtt).abs();
                (1.0 - ALPHA) * srtt + ALPHA * rtt
            }
        });
    }

    /// Current RTO estimate, clamped to `[rto_min, rto_max]`. Before the
    /// first sample this is `initial_rto` (also clamped).
    pub fn rto(&self) -> u64 {
        let raw = match self.srtt {
            Some(srtt) => srtt + 4.0 * self.rttvar,
            None => self.initial_rto,
        };
        raw.clamp(self.rto_min, self.rto_max).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig {
            initial_rto: 15,
            rto_min: 1,
            rto_max: 120,
            ..Default::default()
        }
    }

    #[test]
    fn uses_initial_rto_before_first_sample() {
        let estimator = RttEstimator::new(&config());
        assert_eq!(estimator.rto(), 15);
    }

    #[test]
    fn first_sample_sets_rttvar_to_half_the_sample() {
        let mut estimator = RttEstimator::new(&config());
        estimator.sample(10.0);
        // rto = srtt + 4*rttvar = 10 + 4*5 = 30
        assert_eq!(estimator.rto(), 30);
    }

    #[test]
    fn rto_is_clamped_to_bounds() {
        let mut cfg = config();
        cfg.rto_max = 20;
        let mut estimator = RttEstimator::new(&cfg);
        estimator.sample(1000.0);
        assert_eq!(estimator.rto(), 20);
    }
}
