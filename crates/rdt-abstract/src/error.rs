use thiserror::Error;

/// The only two conditions worth promoting out of "just a counter":
/// a bounded overflow queue and an invariant the simulator must never
/// actually violate. Every other protocol condition (corrupt packet,
/// stale ACK, out-of-order data, ...) is silent and counted, not an
/// `Err`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("sender overflow FIFO is full")]
    BufferFull,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
