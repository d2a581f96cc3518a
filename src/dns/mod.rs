//! DNS helpers: liveness probing

pub mod probe;

pub use probe::{is_valid_hostname, DnsProbe, LivenessProbe};
