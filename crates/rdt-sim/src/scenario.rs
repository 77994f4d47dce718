use anyhow::{Result, bail};
use rdt_abstract::{SimConfig, TestAction, TestAssertion, TestScenario, TransportProtocol};

use crate::Simulator;
use crate::trace::SimulationReport;

/// Build a `Simulator` for `scenario` and drive it to completion, applying
/// the scenario's scripted traffic and deterministic faults as it goes.
pub fn run_scenario(
    scenario: &TestScenario,
    base_config: SimConfig,
    sender: Box<dyn TransportProtocol>,
    receiver: Box<dyn TransportProtocol>,
) -> SimulationReport {
    let mut config = base_config;
    scenario.config.apply_to(&mut config);

    let mut sim = Simulator::new(config, sender, receiver);
    for action in &scenario.actions {
        match action {
            TestAction::AppSend { time, data } => {
                sim.schedule_app_send(*time, data.as_bytes().to_vec());
            }
            TestAction::DropNextFromSenderSeq { seq } => {
                sim.add_drop_sender_seq_once(*seq);
            }
            TestAction::DropNextFromReceiverAck { ack } => {
                sim.add_drop_receiver_ack_once(*ack);
            }
        }
    }

    sim.run_until_complete();
    sim.export_report()
}

/// Check every assertion in `scenario` against a finished report. Returns
/// the first failure as an error; all assertions must hold for `Ok(())`.
pub fn check_assertions(scenario: &TestScenario, report: &SimulationReport) -> Result<()> {
    for assertion in &scenario.assertions {
        match assertion {
            TestAssertion::DataDelivered { data } => {
                let expected = data.as_bytes();
                if !report.delivered_data.iter().any(|d| d == expected) {
                    bail!("expected delivered data {data:?}, got {:?}", report.delivered_data);
                }
            }
            TestAssertion::DeliveredInOrder { data } => {
                let joined: Vec<u8> = report.delivered_data.concat();
                if joined != data.as_bytes() {
                    bail!(
                        "expected in-order delivery {:?}, got {:?}",
                        data,
                        String::from_utf8_lossy(&joined)
                    );
                }
            }
            TestAssertion::SenderPacketCount { min, max } => {
                let count = report.stats.packets_sent + report.stats.packets_retransmitted;
                check_range("sender packet count", count, *min, *max)?;
            }
            TestAssertion::RetransmissionCount { min, max } => {
                check_range("retransmission count", report.stats.packets_retransmitted, *min, *max)?;
            }
            TestAssertion::TimeoutCount { min, max } => {
                check_range("timeout count", report.stats.timeouts, *min, *max)?;
            }
            TestAssertion::MaxDuration { ms } => {
                if report.duration > *ms {
                    bail!("simulation took {} > max {}", report.duration, ms);
                }
            }
        }
    }
    Ok(())
}

fn check_range(label: &str, value: u32, min: u32, max: Option<u32>) -> Result<()> {
    if value < min {
        bail!("{label} {value} below minimum {min}");
    }
    if let Some(max) = max
        && value > max
    {
        bail!("{label} {value} above maximum {max}");
    }
    Ok(())
}
