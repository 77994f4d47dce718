//! Reference sender/receiver state machines implementing the
//! `TransportProtocol` interface: Alternating-Bit (window = 1) and
//! Go-Back-N (window = N), both with adaptive RTO and Karn's algorithm.

pub mod abp;
pub mod gbn;
pub mod rto;

pub use abp::{AbpReceiver, AbpSender};
pub use gbn::{GbnReceiver, GbnSender};
pub use rdt_abstract::{Packet, SystemContext, TransportProtocol};

use rdt_abstract::SimConfig;

/// Build a matched ABP sender/receiver pair (`window_size` forced to 1).
pub fn abp_pair(config: &SimConfig) -> (Box<dyn TransportProtocol>, Box<dyn TransportProtocol>) {
    let config = config.clone().abp();
    (Box::new(AbpSender::new(&config)), Box::new(AbpReceiver::default()))
}

/// Build a matched GBN sender/receiver pair.
pub fn gbn_pair(config: &SimConfig) -> (Box<dyn TransportProtocol>, Box<dyn TransportProtocol>) {
    (Box::new(GbnSender::new(config)), Box::new(GbnReceiver::default()))
}
