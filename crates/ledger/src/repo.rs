use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use eyre::Result;
use gateway::transfer::TransferRecord;
use log::{error, info};
use model::{
    earnings::{EarningsRecord, PayoutWindow},
    order::SubscriptionOrder,
    payout::PayoutRecord,
};
use storage::{
    earnings::EarningsStore, instructors::InstructorStore, orders::OrderStore,
    payouts::PayoutStore,
};

use crate::service::payouts::InstructorSummary;

#[async_trait]
pub trait SubscriptionOrders: Send + Sync {
    async fn find_cancellable(&self, gateway: &str) -> Result<Vec<SubscriptionOrder>>;
    async fn mark_cancelled(&self, id: ObjectId) -> Result<()>;
}

#[async_trait]
pub trait EarningsLedger: Send + Sync {
    async fn find_pending(&self, window: PayoutWindow) -> Result<Vec<EarningsRecord>>;
    async fn clear_pending(&self, ids: &[ObjectId]) -> Result<u64>;
}

#[async_trait]
pub trait InstructorDirectory: Send + Sync {
    async fn gateway_account(&self, instructor_id: ObjectId) -> Result<Option<String>>;
}

/// Receives successful payouts for downstream notification.
#[async_trait]
pub trait PayoutEvents: Send + Sync {
    async fn instructor_paid(&self, transfer: &TransferRecord, summary: &InstructorSummary);
}

#[async_trait]
impl SubscriptionOrders for OrderStore {
    async fn find_cancellable(&self, gateway: &str) -> Result<Vec<SubscriptionOrder>> {
        OrderStore::find_cancellable(self, gateway).await
    }

    async fn mark_cancelled(&self, id: ObjectId) -> Result<()> {
        OrderStore::mark_cancelled(self, id).await
    }
}

#[async_trait]
impl EarningsLedger for EarningsStore {
    async fn find_pending(&self, window: PayoutWindow) -> Result<Vec<EarningsRecord>> {
        EarningsStore::find_pending(self, window).await
    }

    async fn clear_pending(&self, ids: &[ObjectId]) -> Result<u64> {
        EarningsStore::clear_pending(self, ids).await
    }
}

#[async_trait]
impl InstructorDirectory for InstructorStore {
    async fn gateway_account(&self, instructor_id: ObjectId) -> Result<Option<String>> {
        Ok(self
            .get(instructor_id)
            .await?
            .and_then(|profile| profile.account_id().map(str::to_owned)))
    }
}

#[async_trait]
impl PayoutEvents for PayoutStore {
    async fn instructor_paid(&self, transfer: &TransferRecord, summary: &InstructorSummary) {
        let record = PayoutRecord {
            id: ObjectId::new(),
            transfer_id: transfer.id.clone(),
            instructor_id: summary.payout.instructor_id,
            order_ids: summary.payout.order_ids.clone(),
            gross_total: summary.gross_total,
            computed_minor: summary.computed_minor,
            sent_minor: summary.sent_minor,
            currency: summary.currency.clone(),
            transfer_group: summary.transfer_group.clone(),
            created_at: Utc::now(),
        };
        match self.insert(&record).await {
            Ok(()) => info!(
                "Recorded payout {} for instructor {}",
                transfer.id, summary.payout.instructor_id
            ),
            Err(err) => error!(
                "Failed to record payout {} for instructor {}: {:#}",
                transfer.id, summary.payout.instructor_id, err
            ),
        }
    }
}
