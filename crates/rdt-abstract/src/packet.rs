use serde::{Deserialize, Serialize};

/// Packets truncate payloads to this many bytes; anything longer must be
/// fragmented by the sender before it reaches `Packet::new_data`.
pub const MAX_PAYLOAD: usize = 20;

/// Compute the additive checksum `seqnum + acknum + sum(bytes)`, wrapping
/// rather than panicking on overflow.
pub fn compute_checksum(seq_num: u32, ack_num: u32, payload: &[u8]) -> u32 {
    let mut sum = seq_num.wrapping_add(ack_num);
    for &b in payload {
        sum = sum.wrapping_add(b as u32);
    }
    sum
}

/// A data or ACK packet crossing the simulated channel.
///
/// There is no flags byte: whether a packet is "data" or "ACK" is decided
/// entirely by which node it arrives at (the scheduler tags every arrival
/// with its destination), so there is nothing here for a NAK variant to
/// hang off of either — duplicate-ACK is the only re-ACK shape this wire
/// format can express.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Packet {
    pub seq_num: u32,
    pub ack_num: u32,
    pub payload: Vec<u8>,
    pub checksum: u32,
}

impl Packet {
    /// Build a data packet; `payload` is truncated to `MAX_PAYLOAD` bytes.
    pub fn new_data(seq_num: u32, payload: &[u8]) -> Self {
        let payload = payload[..payload.len().min(MAX_PAYLOAD)].to_vec();
        let checksum = compute_checksum(seq_num, 0, &payload);
        Self {
            seq_num,
            ack_num: 0,
            payload,
            checksum,
        }
    }

    /// Build a pure ACK packet (`seqnum = 0`, empty payload).
    pub fn new_ack(ack_num: u32) -> Self {
        let checksum = compute_checksum(0, ack_num, &[]);
        Self {
            seq_num: 0,
            ack_num,
            payload: Vec::new(),
            checksum,
        }
    }

    /// Whether the stored checksum matches the recomputed one.
    pub fn is_valid(&self) -> bool {
        self.checksum == compute_checksum(self.seq_num, self.ack_num, &self.payload)
    }

    /// Clone this packet with its checksum flipped, simulating channel
    /// corruption. Always produces an invalid packet.
    pub fn corrupted(&self) -> Self {
        let mut p = self.clone();
        p.checksum = !p.checksum;
        p
    }
}
