pub mod config;
pub mod error;
pub mod interface;
pub mod packet;
pub mod scenario;

pub use config::SimConfig;
pub use error::SimError;
pub use interface::{SystemContext, TransportProtocol};
pub use packet::{MAX_PAYLOAD, Packet};
pub use scenario::{SimConfigOverride, TestAction, TestAssertion, TestScenario};
