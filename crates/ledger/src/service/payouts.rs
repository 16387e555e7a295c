use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::NaiveDate;
use eyre::{Context as _, Result};
use gateway::{
    transfer::{TransferRecord, TransferRequest},
    GatewayApi,
};
use log::{error, info, warn};
use model::{
    decimal::Decimal,
    earnings::PayoutWindow,
    payout::{InstructorPayout, PayoutBatch, PayoutConfig},
};

use crate::{
    errors::PayoutError,
    repo::{EarningsLedger, InstructorDirectory, PayoutEvents},
};

/// Instructor side of a successful transfer, handed to [`PayoutEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorSummary {
    pub payout: InstructorPayout,
    pub gross_total: Decimal,
    pub computed_minor: i64,
    pub sent_minor: i64,
    pub currency: String,
    pub transfer_group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutOutcome {
    Paid { transfer_id: String },
    NothingToPay,
    MissingAccountId,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorReport {
    pub instructor_id: ObjectId,
    pub order_ids: Vec<ObjectId>,
    pub gross_total: Decimal,
    /// Amount derived from the earnings, in minor units.
    pub computed_minor: i64,
    /// Amount actually put on the transfer, if one was attempted.
    pub sent_minor: Option<i64>,
    pub outcome: PayoutOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReport {
    pub as_of: NaiveDate,
    pub selected: usize,
    pub instructors: Vec<InstructorReport>,
}

impl PayoutReport {
    pub fn paid(&self) -> usize {
        self.instructors
            .iter()
            .filter(|i| matches!(i.outcome, PayoutOutcome::Paid { .. }))
            .count()
    }
}

/// Pays instructors their share of recently due earnings.
#[derive(Clone)]
pub struct PayoutAggregator {
    earnings: Arc<dyn EarningsLedger>,
    instructors: Arc<dyn InstructorDirectory>,
    gateway: Arc<dyn GatewayApi>,
    events: Arc<dyn PayoutEvents>,
}

impl PayoutAggregator {
    pub fn new(
        earnings: Arc<dyn EarningsLedger>,
        instructors: Arc<dyn InstructorDirectory>,
        gateway: Arc<dyn GatewayApi>,
        events: Arc<dyn PayoutEvents>,
    ) -> Self {
        PayoutAggregator {
            earnings,
            instructors,
            gateway,
            events,
        }
    }

    pub async fn run_payout_batch(
        &self,
        as_of: NaiveDate,
        config: &PayoutConfig,
    ) -> Result<PayoutReport> {
        let window = PayoutWindow::trailing(as_of, config.window_days);
        let records = self
            .earnings
            .find_pending(window)
            .await
            .context("find_pending")?;
        let records: Vec<_> = records
            .into_iter()
            .filter(|record| record.pending && window.contains(record.payout_date))
            .collect();
        let selected = records.len();
        let batch = PayoutBatch::aggregate(records);
        info!(
            "Payout run for {}: {} records from {} instructors",
            as_of,
            selected,
            batch.len()
        );
        if batch.is_empty() {
            return Ok(PayoutReport {
                as_of,
                selected,
                instructors: vec![],
            });
        }

        let mut instructors = Vec::with_capacity(batch.len());
        for payout in batch.payouts {
            instructors.push(self.disburse(payout, as_of, config).await);
        }
        Ok(PayoutReport {
            as_of,
            selected,
            instructors,
        })
    }

    async fn disburse(
        &self,
        payout: InstructorPayout,
        as_of: NaiveDate,
        config: &PayoutConfig,
    ) -> InstructorReport {
        let gross_total = payout.gross_total();
        let computed_minor = config.payable_minor(gross_total);
        let mut report = InstructorReport {
            instructor_id: payout.instructor_id,
            order_ids: payout.order_ids.clone(),
            gross_total,
            computed_minor,
            sent_minor: None,
            outcome: PayoutOutcome::NothingToPay,
        };

        if computed_minor <= 0 {
            warn!(
                "Nothing to pay to instructor {}: gross {}",
                payout.instructor_id, gross_total
            );
            return report;
        }

        let request = match self.transfer_request(&payout, computed_minor, as_of, config).await {
            Ok(request) => request,
            Err(PayoutError::MissingAccountId(id)) => {
                error!("Instructor {} has no payout account, skipping", id);
                report.outcome = PayoutOutcome::MissingAccountId;
                return report;
            }
            Err(err) => {
                error!("Failed to prepare payout for {}: {:#}", payout.instructor_id, err);
                report.outcome = PayoutOutcome::Failed {
                    error: err.to_string(),
                };
                return report;
            }
        };

        report.sent_minor = Some(request.amount);
        match self.gateway.transfer(&request).await {
            Ok(transfer) => {
                self.finalize(&transfer, payout, &request, gross_total, computed_minor)
                    .await;
                report.outcome = PayoutOutcome::Paid {
                    transfer_id: transfer.id,
                };
            }
            Err(err) => {
                error!(
                    "Transfer to instructor {} failed: {}",
                    report.instructor_id, err
                );
                report.outcome = PayoutOutcome::Failed {
                    error: PayoutError::from(err).to_string(),
                };
            }
        }
        report
    }

    async fn transfer_request(
        &self,
        payout: &InstructorPayout,
        amount: i64,
        as_of: NaiveDate,
        config: &PayoutConfig,
    ) -> Result<TransferRequest, PayoutError> {
        let destination = match payout.account_id.clone() {
            Some(account) => account,
            None => self
                .instructors
                .gateway_account(payout.instructor_id)
                .await?
                .ok_or(PayoutError::MissingAccountId(payout.instructor_id))?,
        };
        Ok(TransferRequest {
            amount,
            currency: config.currency.clone(),
            destination,
            transfer_group: payout.grouping_tag(as_of),
        })
    }

    // Runs only after the gateway accepted the transfer.
    async fn finalize(
        &self,
        transfer: &TransferRecord,
        payout: InstructorPayout,
        request: &TransferRequest,
        gross_total: Decimal,
        computed_minor: i64,
    ) {
        let record_ids = payout.record_ids.clone();
        let summary = InstructorSummary {
            payout,
            gross_total,
            computed_minor,
            sent_minor: request.amount,
            currency: request.currency.clone(),
            transfer_group: request.transfer_group.clone(),
        };
        self.events.instructor_paid(transfer, &summary).await;

        match self.earnings.clear_pending(&record_ids).await {
            Ok(cleared) => info!(
                "Paid {} minor units to instructor {} (transfer {}), cleared {} records",
                request.amount, summary.payout.instructor_id, transfer.id, cleared
            ),
            Err(err) => error!(
                "Transfer {} succeeded but earnings of instructor {} are still pending: {:#}",
                transfer.id, summary.payout.instructor_id, err
            ),
        }
    }
}
