//! Message handlers, one per worker binary

pub mod change_alert;
pub mod dns_scanner;
pub mod domain_discovery;

pub use change_alert::ChangeAlertService;
pub use dns_scanner::DnsScanService;
pub use domain_discovery::DomainDiscoveryService;
