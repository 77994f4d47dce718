use rdt_abstract::SimConfig;
use rdt_protocols::gbn_pair;
use rdt_sim::Simulator;

fn main() {
    let config = SimConfig { window_size: 4, loss_rate: 0.1, ..Default::default() };
    let (sender, receiver) = gbn_pair(&config);
    let mut sim = Simulator::new(config, sender, receiver);
    sim.schedule_app_send(0, b"AAAAABBBBBCCCCCDDDDDEEEEE".to_vec());
    sim.run_until_complete();

    let report = sim.export_report();
    println!("delivered {} payloads, {} retransmits", report.delivered_data.len(), report.stats.packets_retransmitted);
}
