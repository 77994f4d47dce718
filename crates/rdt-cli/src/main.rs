use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use rdt_abstract::{SimConfig, TestScenario, TransportProtocol};
use rdt_sim::{Simulator, SimulationReport};

mod traffic;
use traffic::{ScriptedSend, Traffic};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Protocol {
    Abp,
    Gbn,
}

/// Drive the discrete-event simulator from the command line: either a
/// scripted/Poisson traffic run, or a data-driven scenario file with its
/// own assertions.
#[derive(Parser, Debug)]
#[command(author, version, about = "Sliding-window reliable data transfer simulator")]
struct Args {
    /// Which protocol implementation to simulate.
    #[arg(long, value_enum, default_value_t = Protocol::Gbn)]
    protocol: Protocol,

    /// Sender window size (ignored for --protocol abp, which is always 1).
    #[arg(long, default_value_t = 8)]
    window_size: u32,
    #[arg(long, default_value_t = 20)]
    max_payload: usize,
    #[arg(long, default_value_t = 64)]
    bufsize: u32,

    #[arg(long, default_value_t = 15)]
    initial_rto: u64,
    #[arg(long, default_value_t = 1)]
    rto_min: u64,
    #[arg(long, default_value_t = 120)]
    rto_max: u64,
    #[arg(long, default_value_t = 64)]
    backoff_cap: u32,

    #[arg(long, default_value_t = 0.2)]
    loss_rate: f64,
    #[arg(long, default_value_t = 0.01)]
    corrupt_rate: f64,
    #[arg(long, default_value_t = 5)]
    min_latency: u64,
    #[arg(long, default_value_t = 15)]
    max_latency: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// A message to send; repeat for multiple messages. Ignored when
    /// --poisson-rate or --scenario is given.
    #[arg(long = "message")]
    messages: Vec<String>,
    /// Logical-time gap between scripted --message sends.
    #[arg(long, default_value_t = 100)]
    message_interval: u64,

    /// Generate Poisson-arrival traffic instead of --message sends.
    #[arg(long)]
    poisson_rate: Option<f64>,
    #[arg(long, default_value_t = 10)]
    poisson_count: u32,
    #[arg(long, default_value_t = 16)]
    poisson_payload_len: usize,

    /// Run a data-driven scenario file instead of ad-hoc traffic, and
    /// check its assertions against the finished run.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

impl Args {
    fn base_config(&self) -> SimConfig {
        let config = SimConfig {
            window_size: self.window_size,
            max_payload: self.max_payload,
            bufsize: self.bufsize,
            initial_rto: self.initial_rto,
            rto_min: self.rto_min,
            rto_max: self.rto_max,
            backoff_cap: self.backoff_cap,
            loss_rate: self.loss_rate,
            corrupt_rate: self.corrupt_rate,
            min_latency: self.min_latency,
            max_latency: self.max_latency,
            seed: self.seed,
        };
        match self.protocol {
            Protocol::Abp => config.abp(),
            Protocol::Gbn => config,
        }
    }

    fn build_pair(&self, config: &SimConfig) -> (Box<dyn TransportProtocol>, Box<dyn TransportProtocol>) {
        match self.protocol {
            Protocol::Abp => rdt_protocols::abp_pair(config),
            Protocol::Gbn => rdt_protocols::gbn_pair(config),
        }
    }

    fn traffic(&self) -> Traffic {
        if let Some(rate) = self.poisson_rate {
            return Traffic::Poisson {
                rate_per_sec: rate,
                count: self.poisson_count,
                payload_len: self.poisson_payload_len,
                seed: self.seed,
            };
        }

        let messages = if self.messages.is_empty() {
            vec!["Packet 1".to_string(), "Packet 2".to_string(), "Packet 3".to_string()]
        } else {
            self.messages.clone()
        };

        let sends = messages
            .into_iter()
            .enumerate()
            .map(|(i, text)| ScriptedSend { time: i as u64 * self.message_interval, data: text.into_bytes() })
            .collect();
        Traffic::Scripted(sends)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!(protocol = ?args.protocol, "rdt-cli starting");

    let config = args.base_config();
    config.validate().context("invalid configuration")?;

    let report = if let Some(path) = &args.scenario {
        run_scenario_file(&args, path, config)?
    } else {
        run_ad_hoc(&args, config)
    };

    println!(
        "delivered {} payload(s) in {} logical time units ({} sent, {} retransmitted, {} timeouts)",
        report.delivered_data.len(),
        report.duration,
        report.stats.packets_sent,
        report.stats.packets_retransmitted,
        report.stats.timeouts,
    );

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

fn run_ad_hoc(args: &Args, config: SimConfig) -> SimulationReport {
    let (sender, receiver) = args.build_pair(&config);
    let mut sim = Simulator::new(config, sender, receiver);
    args.traffic().apply(&mut sim);

    info!("running headless simulation");
    sim.run_until_complete();
    info!("simulation complete");
    sim.export_report()
}

fn run_scenario_file(args: &Args, path: &Path, config: SimConfig) -> Result<SimulationReport> {
    let scenario = load_scenario(path)?;
    let (sender, receiver) = args.build_pair(&config);
    let report = rdt_sim::scenario::run_scenario(&scenario, config, sender, receiver);

    match rdt_sim::scenario::check_assertions(&scenario, &report) {
        Ok(()) => info!(scenario = %scenario.name, "all assertions passed"),
        Err(err) => {
            anyhow::bail!("scenario '{}' failed: {err}", scenario.name);
        }
    }

    Ok(report)
}

fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).context("failed to parse scenario file")
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("failed to serialize simulation trace")?;
    fs::write(path, &data).with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(())
}
