use rdt_abstract::SimConfig;
use rdt_protocols::abp_pair;
use rdt_sim::Simulator;

fn main() {
    let config = SimConfig { loss_rate: 0.1, ..Default::default() };
    let (sender, receiver) = abp_pair(&config);
    let mut sim = Simulator::new(config, sender, receiver);
    sim.schedule_app_send(0, b"Hello from ABP".to_vec());
    sim.schedule_app_send(50, b"stop and wait works".to_vec());
    sim.run_until_complete();

    let report = sim.export_report();
    println!("delivered {} payloads, {} timeouts", report.delivered_data.len(), report.stats.timeouts);
}
