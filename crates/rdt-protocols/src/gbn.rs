use std::collections::{HashMap, HashSet, VecDeque};

use rdt_abstract::{MAX_PAYLOAD, Packet, SimConfig, SystemContext, TransportProtocol};

use crate::rto::RttEstimator;

/// The sender's single outstanding RTO timer. GBN only ever runs one
/// timer at a time, so a fixed id is enough.
const TIMER_ID: u32 = 0;

/// Go-Back-N sender: sliding window over a ring buffer, cumulative ACKs,
/// full-window retransmit on timeout. Sequence numbers start at 1 and
/// grow without bound; `seq mod bufsize` only ever indexes the ring.
/// Retransmitted segments are excluded from RTT sampling (Karn's
/// algorithm), since folding their RTT in would systematically inflate
/// the RTO estimate.
pub struct GbnSender {
    base: u32,
    next_seq: u32,
    buffer_next: u32,
    window_size: u32,
    bufsize: u32,
    max_payload: usize,

    buf: Vec<Option<Packet>>,
    overflow: VecDeque<Vec<u8>>,

    rtt: RttEstimator,
    backoff: u32,
    backoff_cap: u32,

    send_time: HashMap<u32, u64>,
    /// Seqs that have been retransmitted at least once since last being
    /// (re)buffered; an ACK for one of these yields no RTT sample.
    retransmitted: HashSet<u32>,
}

impl GbnSender {
    pub fn new(config: &SimConfig) -> Self {
        let bufsize = config.bufsize.max(config.window_size);
        Self {
            base: 1,
            next_seq: 1,
            buffer_next: 1,
            window_size: config.window_size,
            bufsize,
            max_payload: config.max_payload,
            buf: vec![None; bufsize as usize],
            overflow: VecDeque::new(),
            rtt: RttEstimator::new(config),
            backoff: 1,
            backoff_cap: config.backoff_cap,
            send_time: HashMap::new(),
            retransmitted: HashSet::new(),
        }
    }

    fn slot(&self, seq: u32) -> usize {
        (seq % self.bufsize) as usize
    }

    fn buffer_chunk(&mut self, chunk: Vec<u8>) {
        let seq = self.buffer_next;
        let slot = self.slot(seq);
        self.buf[slot] = Some(Packet::new_data(seq, &chunk));
        self.retransmitted.remove(&seq);
        self.buffer_next += 1;
    }

    fn drain_overflow(&mut self) {
        while self.buffer_next - self.base < self.bufsize {
            match self.overflow.pop_front() {
                Some(chunk) => self.buffer_chunk(chunk),
                None => break,
            }
        }
    }

    fn send_window(&mut self, ctx: &mut dyn SystemContext) {
        while self.next_seq < self.buffer_next && self.next_seq < self.base + self.window_size {
            let seq = self.next_seq;
            let packet = self.buf[self.slot(seq)]
                .clone()
                .expect("invariant: every seq in [base, next_seq) is buffered");

            self.send_time.insert(seq, ctx.now());
            if self.base == self.next_seq {
                ctx.start_timer(self.rto_delay(), TIMER_ID);
            }
            ctx.send_packet(packet);
            self.next_seq += 1;
        }
    }

    fn rto_delay(&self) -> u64 {
        self.rtt.rto() * self.backoff as u64
    }
}

impl TransportProtocol for GbnSender {
    fn on_app_data(&mut self, ctx: &mut dyn SystemContext, data: &[u8]) {
        for chunk in data.chunks(self.max_payload.min(MAX_PAYLOAD).max(1)) {
            if self.buffer_next - self.base < self.bufsize {
                self.buffer_chunk(chunk.to_vec());
            } else {
                ctx.log("sender buffer full, queueing chunk in overflow FIFO");
                self.overflow.push_back(chunk.to_vec());
            }
        }
        self.send_window(ctx);
    }

    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet) {
        if !packet.is_valid() {
            ctx.note_corrupted();
            return;
        }
        if packet.ack_num < self.base {
            return; // duplicate or stale ACK, not an error
        }

        let new_base = packet.ack_num + 1;

        if let Some(&sent_at) = self.send_time.get(&packet.ack_num)
            && !self.retransmitted.contains(&packet.ack_num)
        {
            let sample = (ctx.now() - sent_at) as f64;
            self.rtt.sample(sample);
            ctx.note_rtt_sample(sample);
            ctx.record_metric("rto", self.rtt.rto() as f64);
        }

        self.backoff = 1;
        for seq in self.base..new_base {
            self.send_time.remove(&seq);
            self.retransmitted.remove(&seq);
        }
        self.base = new_base;

        self.drain_overflow();

        ctx.cancel_timer(TIMER_ID);
        if self.base < self.next_seq {
            ctx.start_timer(self.rto_delay(), TIMER_ID);
        }

        self.send_window(ctx);
    }

    fn on_timer(&mut self, ctx: &mut dyn SystemContext, timer_id: u32) {
        if timer_id != TIMER_ID {
            return;
        }
        assert!(
            self.base < self.next_seq,
            "RTO fired with an empty window; timer discipline is broken"
        );

        ctx.note_timeout();
        self.backoff = (self.backoff * 2).min(self.backoff_cap);

        for seq in self.base..self.next_seq {
            let packet = self.buf[self.slot(seq)]
                .clone()
                .expect("invariant: every seq in [base, next_seq) is buffered");
            self.retransmitted.insert(seq);
            ctx.send_retransmission(packet);
        }

        ctx.start_timer(self.rto_delay(), TIMER_ID);
    }
}

/// Go-Back-N receiver: pure in-order delivery, no out-of-order buffering.
/// A packet that arrives corrupted or ahead of `expect_seq` gets the last
/// correctly-received cumulative ACK re-sent, never a NAK.
pub struct GbnReceiver {
    expect_seq: u32,
    last_ack: Packet,
}

impl Default for GbnReceiver {
    fn default() -> Self {
        Self {
            expect_seq: 1,
            last_ack: Packet::new_ack(0),
        }
    }
}

impl TransportProtocol for GbnReceiver {
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
        self.expect_seq += 1;
        ctx.send_packet(self.last_ack.clone());
    }

    fn on_timer(&mut self, _ctx: &mut dyn SystemContext, _timer_id: u32) {}

    fn on_app_data(&mut self, _ctx: &mut dyn SystemContext, _data: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_into_max_payload_chunks() {
        let config = SimConfig { window_size: 4, ..Default::default() };
        let mut sender = GbnSender::new(&config);
        let mut captured = Vec::new();
        struct Capture<'a>(&'a mut Vec<Packet>, u64);
        impl<'a> SystemContext for Capture<'a> {
            fn send_packet(&mut self, packet: Packet) {
                self.0.push(packet);
            }
            fn send_retransmission(&mut self, packet: Packet) {
                self.0.push(packet);
            }
            fn start_timer(&mut self, _delay: u64, _timer_id: u32) {}
            fn cancel_timer(&mut self, _timer_id: u32) {}
            fn deliver_data(&mut self, _data: &[u8]) {}
            fn log(&mut self, _message: &str) {}
            fn now(&self) -> u64 {
                self.1
            }
        }
        let mut ctx = Capture(&mut captured, 0);
        sender.on_app_data(&mut ctx, &[b'a'; 45]);
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].payload.len(), 20);
        assert_eq!(captured[2].payload.len(), 5);
    }
}
