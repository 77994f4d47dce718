use crate::packet::Packet;

/// The capability the simulator grants to a protocol implementation.
/// A handler only ever *records* intent through this trait; the simulator
/// applies the recorded actions (including channel sampling) after the
/// handler returns, so no handler can observe a mutation caused by its
/// own side effects.
pub trait SystemContext {
    /// Hand a freshly-assigned packet to the (unreliable) channel. Counted
    /// as a `packets_sent`.
    fn send_packet(&mut self, packet: Packet);

    /// Re-send a packet already counted once under `packets_sent`. Counted
    /// as a `packets_retransmitted` instead.
    fn send_retransmission(&mut self, packet: Packet);

    /// Start a timer identified by `timer_id`, firing in `delay` logical
    /// time units. Starting a timer with an id that already has one
    /// running implicitly cancels the old one.
    fn start_timer(&mut self, delay: u64, timer_id: u32);

    /// Cancel a running timer. Idempotent: cancelling an unknown or
    /// already-fired id is a no-op.
    fn cancel_timer(&mut self, timer_id: u32);

    /// Deliver payload bytes to the application layer.
    fn deliver_data(&mut self, data: &[u8]);

    /// Emit a structured trace line (routed through `tracing`, never a
    /// bare `println!`, so tests can assert on it if they need to).
    fn log(&mut self, message: &str);

    /// Current simulation logical time.
    fn now(&self) -> u64;

    /// Record a named numeric sample (window size, ssthresh, ...) for
    /// later inspection via `SimulationReport::metrics`.
    fn record_metric(&mut self, _name: &str, _value: f64) {}

    /// A retransmission timer fired and a retransmission was issued.
    fn note_timeout(&mut self) {}

    /// An RTT sample was taken and folded into the RTO estimate.
    fn note_rtt_sample(&mut self, _rtt: f64) {}

    /// A packet was discarded because its checksum did not verify.
    fn note_corrupted(&mut self) {}

    /// A data packet arrived out of the expected order.
    fn note_out_of_order(&mut self) {}
}

/// The interface a sender or receiver state machine implements.
pub trait TransportProtocol {
    /// Called once before the first event is dispatched.
    fn init(&mut self, _ctx: &mut dyn SystemContext) {}

    /// A packet arrived at this node.
    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet);

    /// A previously started timer fired.
    fn on_timer(&mut self, ctx: &mut dyn SystemContext, timer_id: u32);

    /// The application layer wants to send `data` reliably.
    fn on_app_data(&mut self, ctx: &mut dyn SystemContext, data: &[u8]);
}
