use async_trait::async_trait;
use tracing::{info, warn};

use crate::nats::ChangeAlert;
use crate::notify::{DeliveryReport, NotificationDispatcher};
use crate::types::Result;
use crate::worker::{Delivery, MessageHandler};

/// Emails every stakeholder about a changed DNS record
pub struct ChangeAlertService {
    dispatcher: NotificationDispatcher,
}

impl ChangeAlertService {
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn process(&self, alert: &ChangeAlert) -> DeliveryReport {
        let report = self.dispatcher.dispatch(alert).await;
        if report.failed > 0 {
            warn!(
                domain = %alert.domain,
                record_type = %alert.record_type,
                sent = report.sent,
                failed = report.failed,
                "Change alert partially delivered"
            );
        } else {
            info!(
                domain = %alert.domain,
                record_type = %alert.record_type,
                sent = report.sent,
                "Change alert delivered"
            );
        }
        report
    }
}

#[async_trait]
impl MessageHandler for ChangeAlertService {
    fn name(&self) -> &'static str {
        "change-notifier"
    }

    async fn handle(&self, delivery: Delivery) -> Result<()> {
        let alert: ChangeAlert = delivery.json()?;
        self.process(&alert).await;
        Ok(())
    }
}
