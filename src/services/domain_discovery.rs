//! Discovery request handler
//!
//! Admits newly found subdomains for the requesting organization and hands
//! each one on to the scanners on `<publish_to>.<domain_key>`. Publishing
//! stops at the first failure; the graph writes already made stay, so a
//! redelivered request will not republish domains it has already admitted.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::graph::org_vertex_id;
use crate::nats::messages::discovery_result_subject;
use crate::nats::{publish_json, DiscoveredDomain, DiscoveryRequest, Publisher};
use crate::reconcile::DiscoveryReconciler;
use crate::types::Result;
use crate::worker::{Delivery, MessageHandler};

pub struct DomainDiscoveryService {
    reconciler: DiscoveryReconciler,
    publisher: Arc<dyn Publisher>,
    publish_to: String,
}

impl DomainDiscoveryService {
    pub fn new(reconciler: DiscoveryReconciler, publisher: Arc<dyn Publisher>, publish_to: impl Into<String>) -> Self {
        Self {
            reconciler,
            publisher,
            publish_to: publish_to.into(),
        }
    }

    /// Returns how many domains were published
    pub async fn process(&self, request: &DiscoveryRequest) -> Result<usize> {
        let org_id = org_vertex_id(&request.org_id)?;
        let admitted = self.reconciler.discover(&request.domain, &org_id).await?;

        for domain in &admitted {
            let subject = discovery_result_subject(&self.publish_to, &domain.key);
            let message = DiscoveredDomain::new(&domain.domain, &domain.key);
            publish_json(self.publisher.as_ref(), &subject, &message).await?;
            info!(subject = %subject, "Published discovered domain {}", domain.domain);
        }

        Ok(admitted.len())
    }
}

#[async_trait]
impl MessageHandler for DomainDiscoveryService {
    fn name(&self) -> &'static str {
        "domain-discovery"
    }

    async fn handle(&self, delivery: Delivery) -> Result<()> {
        let request: DiscoveryRequest = delivery.json()?;
        self.process(&request).await.map(|_| ())
    }
}
