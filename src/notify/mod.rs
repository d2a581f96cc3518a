//! Change-alert notifications
//!
//! [`Notifier`] is the per-recipient send seam; [`NotifyClient`] implements it
//! over HTTP and [`NotificationDispatcher`] fans an alert out to every
//! configured recipient.

pub mod client;
pub mod dispatcher;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Result;

pub use client::{ApiKey, NotifyClient};
pub use dispatcher::{personalisation, DeliveryReport, NotificationDispatcher};

/// Sends one templated email
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the delivery receipt id
    async fn send_email(&self, email: &str, template_id: &str, personalisation: &Value) -> Result<String>;
}
