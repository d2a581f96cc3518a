//! Scan request handler: reconcile selectors, then scan and publish

use async_trait::async_trait;
use tracing::info;

use crate::nats::ScanRequest;
use crate::reconcile::SelectorReconciler;
use crate::scan::ScanDispatcher;
use crate::types::Result;
use crate::worker::{Delivery, MessageHandler};

pub struct DnsScanService {
    reconciler: SelectorReconciler,
    dispatcher: ScanDispatcher,
}

impl DnsScanService {
    pub fn new(reconciler: SelectorReconciler, dispatcher: ScanDispatcher) -> Self {
        Self {
            reconciler,
            dispatcher,
        }
    }

    pub async fn process(&self, request: &ScanRequest) -> Result<()> {
        let reconciled = self.reconciler.reconcile(&request.domain).await?;
        if !reconciled.added.is_empty() {
            info!(
                domain = %request.domain,
                added = ?reconciled.added,
                "Tracking new DKIM selectors"
            );
        }

        self.dispatcher
            .dispatch(request, &reconciled.domain, &reconciled.selectors)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for DnsScanService {
    fn name(&self) -> &'static str {
        "dns-scanner"
    }

    async fn handle(&self, delivery: Delivery) -> Result<()> {
        let request: ScanRequest = delivery.json()?;
        self.process(&request).await
    }
}
