//! Change-alert fan-out
//!
//! One notification per configured recipient. A failed send is logged and
//! counted; it never prevents delivery to the remaining recipients and is
//! never retried.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::Notifier;
use crate::nats::ChangeAlert;

/// Per-alert delivery tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
    template_id: String,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, recipients: Vec<String>, template_id: impl Into<String>) -> Self {
        Self {
            notifier,
            recipients,
            template_id: template_id.into(),
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub async fn dispatch(&self, alert: &ChangeAlert) -> DeliveryReport {
        let personalisation = personalisation(alert);
        let mut report = DeliveryReport::default();

        for recipient in &self.recipients {
            match self
                .notifier
                .send_email(recipient, &self.template_id, &personalisation)
                .await
            {
                Ok(receipt) => {
                    info!("Email sent to {} with response: {}", recipient, receipt);
                    report.sent += 1;
                }
                Err(e) => {
                    error!("Failed to send email to {} with error: {}", recipient, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Template fields for a change alert
pub fn personalisation(alert: &ChangeAlert) -> Value {
    let details = &alert.org.org_details;
    json!({
        "domain": alert.domain,
        "record_type": alert.record_type,
        "org_name_en": details.en.name,
        "org_name_fr": details.fr.name,
        "org_acronym_en": details.en.acronym,
        "org_acronym_fr": details.fr.acronym,
        "prev_val": alert.prev_val,
        "current_val": alert.current_val,
    })
}
