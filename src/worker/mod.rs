//! Worker module - bus subscription and per-message task dispatch

pub mod shell;

pub use shell::{serve, shutdown_signal, Delivery, MessageHandler, ServeStats, WorkerShell};
