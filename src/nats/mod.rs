//! NATS messaging
//!
//! Connection wrapper, publisher seam and the JSON payloads exchanged on the bus.

pub mod client;
pub mod messages;

pub use client::{publish_json, NatsClient, Publisher};
pub use messages::{
    ChangeAlert, DiscoveredDomain, DiscoveryRequest, ScanRequest, ScanResultMessage,
};
