use std::collections::VecDeque;

use rdt_abstract::{MAX_PAYLOAD, Packet, SimConfig, SystemContext, TransportProtocol};

use crate::rto::RttEstimator;

const TIMER_ID: u32 = 0;

/// Alternating-Bit sender: the `window_size = 1` degenerate case of GBN,
/// but kept as its own state machine rather than a `GbnSender` wrapper —
/// its sequence number lives in `{0, 1}` and wraps every send, instead of
/// growing without bound the way GBN's does. Messages that arrive while a
/// packet is outstanding are queued, never dropped, so reliable in-order
/// delivery holds even under back-to-back application sends.
pub struct AbpSender {
    seq: u32,
    waiting: bool,
    current: Option<Packet>,
    overflow: VecDeque<Vec<u8>>,
    max_payload: usize,

    rtt: RttEstimator,
    backoff: u32,
    backoff_cap: u32,
    send_time: Option<u64>,
    retransmitted: bool,
}

impl AbpSender {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            seq: 0,
            waiting: false,
            current: None,
            overflow: VecDeque::new(),
            max_payload: config.max_payload,
            rtt: RttEstimator::new(config),
            backoff: 1,
            backoff_cap: config.backoff_cap,
            send_time: None,
            retransmitted: false,
        }
    }

    fn rto_delay(&self) -> u64 {
        self.rtt.rto() * self.backoff as u64
    }

    fn try_send_next(&mut self, ctx: &mut dyn SystemContext) {
        if self.waiting {
            return;
        }
        let Some(chunk) = self.overflow.pop_front() else {
            return;
        };
        let packet = Packet::new_data(self.seq, &chunk);
        self.current = Some(packet.clone());
        self.send_time = Some(ctx.now());
        self.retransmitted = false;
        self.waiting = true;
        ctx.send_packet(packet);
        ctx.start_timer(self.rto_delay(), TIMER_ID);
    }
}

impl TransportProtocol for AbpSender {
    fn on_app_data(&mut self, ctx: &mut dyn SystemContext, data: &[u8]) {
        for chunk in data.chunks(self.max_payload.min(MAX_PAYLOAD).max(1)) {
            self.overflow.push_back(chunk.to_vec());
        }
        self.try_send_next(ctx);
    }

    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet) {
        if !packet.is_valid() {
            ctx.note_corrupted();
            return;
        }
        if !self.waiting || packet.ack_num != self.seq {
            return; // stale/duplicate ACK, not an error
        }

        ctx.cancel_timer(TIMER_ID);
        if let Some(sent_at) = self.send_time.take()
            && !self.retransmitted
        {
            let sample = (ctx.now() - sent_at) as f64;
            self.rtt.sample(sample);
            ctx.note_rtt_sample(sample);
            ctx.record_metric("rto", self.rtt.rto() as f64);
        }

        self.backoff = 1;
        self.waiting = false;
        self.current = None;
        self.seq = 1 - self.seq;

        self.try_send_next(ctx);
    }

    fn on_timer(&mut self, ctx: &mut dyn SystemContext, timer_id: u32) {
        if timer_id != TIMER_ID || !self.waiting {
            return;
        }
        ctx.note_timeout();
        self.backoff = (self.backoff * 2).min(self.backoff_cap);

        let packet = self
            .current
            .clone()
            .expect("invariant: waiting implies a packet is outstanding");
        self.retransmitted = true;
        ctx.send_retransmission(packet);
        ctx.start_timer(self.rto_delay(), TIMER_ID);
    }
}

/// Alternating-Bit receiver: `expect_seq` lives in `{0, 1}`; the sentinel
/// ACK acks `1`, i.e. "the bit not yet sent", so a lost first packet
/// yields a repeated ACK the sender safely ignores.
pub struct AbpReceiver {
    expect_seq: u32,
    last_ack: Packet,
}

impl Default for AbpReceiver {
    fn default() -> Self {
        Self {
            expect_seq: 0,
            last_ack: Packet::new_ack(1),
        }
    }
}

impl TransportProtocol for AbpReceiver {
    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet) {
        if !packet.is_valid() {
            ctx.note_corrupted();
            ctx.send_packet(self.last_ack.clone());
            return;
        }
        if packet.seq_num != self.expect_seq {
            ctx.note_out_of_order();
            ctx.send_packet(self.last_ack.clone());
            return;
        }

        ctx.deliver_data(&packet.payload);
        self.last_ack = Packet::new_ack(self.expect_seq);
        self.expect_seq = 1 - self.expect_seq;
        ctx.send_packet(self.last_ack.clone());
    }

    fn on_timer(&mut self, _ctx: &mut dyn SystemContext, _timer_id: u32) {}

    fn on_app_data(&mut self, _ctx: &mut dyn SystemContext, _data: &[u8]) {}
}
