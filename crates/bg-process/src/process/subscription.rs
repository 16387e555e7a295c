use crate::{Ledger, Task};
use async_trait::async_trait;
use chrono::Utc;
use eyre::{Error, Result};
use log::{info, warn};

#[derive(Clone)]
pub struct SubscriptionExpiryBg {
    ledger: Ledger,
}

#[async_trait]
impl Task for SubscriptionExpiryBg {
    const NAME: &'static str = "subscription_expiry";

    async fn process(&mut self) -> Result<(), Error> {
        let report = self
            .ledger
            .expiry
            .scan_and_cancel_expired(Utc::now())
            .await?;

        info!(
            "Expiry scan: {} candidates, {} cancelled, {} still running, {} skipped",
            report.scanned,
            report.cancelled.len(),
            report.not_expired,
            report.not_eligible
        );
        for failed in &report.failed {
            warn!(
                "Order {} will be retried on the next scan: {}",
                failed.order_id, failed.error
            );
        }
        Ok(())
    }
}

impl SubscriptionExpiryBg {
    pub fn new(ledger: Ledger) -> SubscriptionExpiryBg {
        SubscriptionExpiryBg { ledger }
    }
}
