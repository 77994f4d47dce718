use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

use rdt_abstract::{Packet, SimConfig, SimError, SystemContext, TransportProtocol};

use crate::trace::{SimulationReport, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeId {
    Sender,
    Receiver,
}

impl NodeId {
    pub fn peer(&self) -> Self {
        match self {
            NodeId::Sender => NodeId::Receiver,
            NodeId::Receiver => NodeId::Sender,
        }
    }
}

#[derive(Debug)]
enum EventType {
    PacketArrival { to: NodeId, packet: Packet },
    TimerExpiry { node: NodeId, timer_id: u32, generation: u64 },
    AppSend { data: Vec<u8> },
}

#[derive(Debug)]
struct Event {
    time: u64,
    event_type: EventType,
    id: u64,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // Reversed so `BinaryHeap` (a max-heap) pops the smallest time first;
    // ties broken by insertion order so same-timestamp events stay FIFO.
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

/// A compact textual summary of a link-layer event, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkEventSummary {
    pub time: u64,
    pub description: String,
}

/// Actions a handler recorded during a single dispatch. Applied to
/// simulator-wide state only after the handler returns.
#[derive(Default)]
struct ActionBuffer {
    fresh_packets: Vec<Packet>,
    retransmitted_packets: Vec<Packet>,
    timers_start: Vec<(u64, u32)>,
    timers_cancel: Vec<u32>,
    logs: Vec<String>,
    delivered_data: Vec<Vec<u8>>,
    metrics: Vec<(String, f64)>,
    rtt_samples: Vec<f64>,
    timeouts: u32,
    corrupted: u32,
    out_of_order: u32,
}

struct ScopedContext<'a> {
    buffer: &'a mut ActionBuffer,
    now: u64,
}

impl<'a> SystemContext for ScopedContext<'a> {
    fn send_packet(&mut self, packet: Packet) {
        self.buffer.fresh_packets.push(packet);
    }

    fn send_retransmission(&mut self, packet: Packet) {
        self.buffer.retransmitted_packets.push(packet);
    }

    fn start_timer(&mut self, delay: u64, timer_id: u32) {
        self.buffer.timers_start.push((delay, timer_id));
    }

    fn cancel_timer(&mut self, timer_id: u32) {
        self.buffer.timers_cancel.push(timer_id);
    }

    fn deliver_data(&mut self, data: &[u8]) {
        self.buffer.delivered_data.push(data.to_vec());
    }

    fn log(&mut self, message: &str) {
        self.buffer.logs.push(message.to_string());
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn record_metric(&mut self, name: &str, value: f64) {
        self.buffer.metrics.push((name.to_string(), value));
    }

    fn note_timeout(&mut self) {
        self.buffer.timeouts += 1;
    }

    fn note_rtt_sample(&mut self, rtt: f64) {
        self.buffer.rtt_samples.push(rtt);
    }

    fn note_corrupted(&mut self) {
        self.buffer.corrupted += 1;
    }

    fn note_out_of_order(&mut self) {
        self.buffer.out_of_order += 1;
    }
}

/// The discrete-event driver (C2/C3/C6): a monotonic logical clock, a
/// min-priority event queue, the lossy channel, and the two protocol
/// endpoints it shuttles packets between.
pub struct Simulator {
    time: u64,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    config: SimConfig,
    rng: rand::rngs::StdRng,

    pub sender: Box<dyn TransportProtocol>,
    pub receiver: Box<dyn TransportProtocol>,

    stats: Stats,
    delivered_data: Vec<Vec<u8>>,
    metrics: HashMap<String, Vec<(u64, f64)>>,
    link_events: Vec<LinkEventSummary>,

    drop_sender_seq_once: Vec<u32>,
    drop_receiver_ack_once: Vec<u32>,

    /// Generation counter per `(node, timer_id)`, used to tombstone a
    /// cancelled timer instead of rebuilding the queue: a popped
    /// `TimerExpiry` whose carried generation no longer matches the
    /// current one is silently skipped.
    timer_generations: HashMap<(NodeId, u32), u64>,
}

impl Simulator {
    pub fn new(
        config: SimConfig,
        sender: Box<dyn TransportProtocol>,
        receiver: Box<dyn TransportProtocol>,
    ) -> Self {
        use rand::SeedableRng;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);

        Self {
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            config,
            rng,
            sender,
            receiver,
            stats: Stats::default(),
            delivered_data: Vec::new(),
            metrics: HashMap::new(),
            link_events: Vec::new(),
            drop_sender_seq_once: Vec::new(),
            drop_receiver_ack_once: Vec::new(),
            timer_generations: HashMap::new(),
        }
    }

    /// Register a deterministic fault: drop the first packet sent by the
    /// sender whose seq equals `seq`, independent of the RNG draw.
    pub fn add_drop_sender_seq_once(&mut self, seq: u32) {
        self.drop_sender_seq_once.push(seq);
    }

    /// Register a deterministic fault: drop the first ACK sent by the
    /// receiver whose ack equals `ack`, independent of the RNG draw.
    pub fn add_drop_receiver_ack_once(&mut self, ack: u32) {
        self.drop_receiver_ack_once.push(ack);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn metric_series(&self, name: &str) -> Option<&[(u64, f64)]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    fn push_event(&mut self, time: u64, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    pub fn schedule_app_send(&mut self, time: u64, data: Vec<u8>) {
        self.stats.message_sizes.push(data.len());
        self.push_event(time, EventType::AppSend { data });
    }

    pub fn init(&mut self) {
        for node in [NodeId::Sender, NodeId::Receiver] {
            let mut buffer = ActionBuffer::default();
            {
                let mut ctx = ScopedContext {
                    buffer: &mut buffer,
                    now: self.time,
                };
                match node {
                    NodeId::Sender => self.sender.init(&mut ctx),
                    NodeId::Receiver => self.receiver.init(&mut ctx),
                }
            }
            self.process_actions(node, buffer);
        }
    }

    pub fn current_time(&self) -> u64 {
        self.time
    }

    pub fn remaining_events(&self) -> usize {
        self.event_queue.len()
    }

    /// Process the single earliest event. Returns `false` if the queue is
    /// empty.
    pub fn step(&mut self) -> bool {
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return false,
        };

        assert!(
            event.time >= self.time,
            "scheduler popped a non-monotonic timestamp: {} < {}",
            event.time,
            self.time
        );
        self.time = event.time;
        debug!(time = self.time, event = ?event.event_type, "dispatching event");

        match event.event_type {
            EventType::PacketArrival { to, packet } => {
                if to == NodeId::Receiver {
                    self.stats.packets_received += 1;
                }
                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    match to {
                        NodeId::Sender => self.sender.on_packet(&mut ctx, packet),
                        NodeId::Receiver => self.receiver.on_packet(&mut ctx, packet),
                    }
                }
                self.process_actions(to, buffer);
            }
            EventType::TimerExpiry { node, timer_id, generation } => {
                let key = (node, timer_id);
                match self.timer_generations.get(&key) {
                    Some(&current) if current == generation => {}
                    _ => {
                        debug!(timer_id, "skipping cancelled or orphaned timer");
                        return true;
                    }
                }

                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    match node {
                        NodeId::Sender => self.sender.on_timer(&mut ctx, timer_id),
                        NodeId::Receiver => self.receiver.on_timer(&mut ctx, timer_id),
                    }
                }
                self.process_actions(node, buffer);
            }
            EventType::AppSend { data } => {
                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    self.sender.on_app_data(&mut ctx, &data);
                }
                self.process_actions(NodeId::Sender, buffer);
            }
        }
        true
    }

    pub fn run_until_complete(&mut self) {
        self.init();
        while self.step() {}
    }

    /// Run until the queue drains or `horizon` logical time is reached,
    /// whichever comes first.
    pub fn run_until(&mut self, horizon: u64) {
        self.init();
        while self.event_queue.peek().is_some_and(|e| e.time < horizon) {
            if !self.step() {
                break;
            }
        }
    }

    pub fn export_report(&self) -> SimulationReport {
        self.try_export_report().expect("simulator bookkeeping invariant violated")
    }

    /// Like `export_report`, but surfaces a bookkeeping inconsistency as
    /// an error instead of panicking. The conditions checked here can
    /// only fail if `process_actions`'s accounting itself has a bug, not
    /// from anything a protocol or the channel can trigger.
    pub fn try_export_report(&self) -> Result<SimulationReport, SimError> {
        if self.stats.packets_delivered as usize != self.delivered_data.len() {
            return Err(SimError::InvariantViolation(format!(
                "packets_delivered counter ({}) disagrees with delivered_data length ({})",
                self.stats.packets_delivered,
                self.delivered_data.len()
            )));
        }

        Ok(SimulationReport {
            config: self.config.clone(),
            duration: self.time,
            stats: self.stats.clone(),
            delivered_data: self.delivered_data.clone(),
            metrics: self.metrics.clone(),
            link_events: self.link_events.clone(),
        })
    }

    fn process_actions(&mut self, source_node: NodeId, buffer: ActionBuffer) {
        for (name, value) in buffer.metrics {
            self.metrics.entry(name).or_default().push((self.time, value));
        }

        self.stats.timeouts += buffer.timeouts;
        self.stats.packets_corrupted += buffer.corrupted;
        self.stats.packets_out_of_order += buffer.out_of_order;
        self.stats.rtt_samples.extend(buffer.rtt_samples);

        for log in buffer.logs {
            debug!(node = ?source_node, "{}", log);
        }

        for data in buffer.delivered_data {
            self.stats.packets_delivered += 1;
            self.link_events.push(LinkEventSummary {
                time: self.time,
                description: format!("[{source_node:?}] delivered {} bytes to application", data.len()),
            });
            self.delivered_data.push(data);
        }

        for timer_id in buffer.timers_cancel {
            let key = (source_node, timer_id);
            *self.timer_generations.entry(key).or_insert(0) += 1;
        }

        for (delay, id) in buffer.timers_start {
            let key = (source_node, id);
            let generation = *self.timer_generations.entry(key).or_insert(0);
            self.push_event(
                self.time + delay,
                EventType::TimerExpiry { node: source_node, timer_id: id, generation },
            );
        }

        self.transmit_all(source_node, buffer.fresh_packets, false);
        self.transmit_all(source_node, buffer.retransmitted_packets, true);
    }

    /// Shared tail of `process_actions`: feed a batch of packets through
    /// the deterministic fault hooks and the random loss/corrupt/latency
    /// channel model.
    fn transmit_all(&mut self, source_node: NodeId, packets: Vec<Packet>, is_retransmission: bool) {
        for mut packet in packets {
            if source_node == NodeId::Sender {
                if is_retransmission {
                    self.stats.packets_retransmitted += 1;
                } else {
                    self.stats.packets_sent += 1;
                }

                if let Some(pos) = self
                    .drop_sender_seq_once
                    .iter()
                    .position(|s| *s == packet.seq_num)
                {
                    self.drop_sender_seq_once.remove(pos);
                    self.note_link_event(format!(
                        "[Sender->Receiver] drop (deterministic) seq={}",
                        packet.seq_num
                    ));
                    continue;
                }
            } else if let Some(pos) = self
                .drop_receiver_ack_once
                .iter()
                .position(|a| *a == packet.ack_num)
            {
                self.drop_receiver_ack_once.remove(pos);
                self.note_link_event(format!(
                    "[Receiver->Sender] drop (deterministic) ack={}",
                    packet.ack_num
                ));
                continue;
            }

            if self.rng.random::<f64>() < self.config.loss_rate {
                self.stats.packets_lost += 1;
                self.note_link_event(format!(
                    "[{:?}->{:?}] drop (random loss) seq={} ack={}",
                    source_node,
                    source_node.peer(),
                    packet.seq_num,
                    packet.ack_num
                ));
                continue;
            }

            if self.rng.random::<f64>() < self.config.corrupt_rate {
                self.stats.packets_corrupted += 1;
                self.note_link_event(format!(
                    "[{:?}->{:?}] corrupt seq={} ack={}",
                    source_node,
                    source_node.peer(),
                    packet.seq_num,
                    packet.ack_num
                ));
                packet = packet.corrupted();
            }

            let latency = self.rng.random_range(self.config.min_latency..=self.config.max_latency);
            let arrival_time = self.time + latency;
            let target_node = source_node.peer();

            self.note_link_event(format!(
                "[{:?}->{:?}] send seq={} ack={} (latency={})",
                source_node, target_node, packet.seq_num, packet.ack_num, latency
            ));

            self.push_event(arrival_time, EventType::PacketArrival { to: target_node, packet });
        }
    }

    fn note_link_event(&mut self, description: String) {
        self.link_events.push(LinkEventSummary { time: self.time, description });
    }
}
