use std::sync::Arc;

use crate::{Ledger, Scheduler, Task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{eyre, Error, Result};
use ledger::service::payouts::PayoutOutcome;
use log::{error, info, warn};
use model::payout::{PayoutConfig, PayoutSchedule};

#[derive(Clone)]
pub struct PayoutBg {
    ledger: Ledger,
    config: PayoutConfig,
    schedule: PayoutSchedule,
    scheduler: Arc<dyn Scheduler>,
}

#[async_trait]
impl Task for PayoutBg {
    const NAME: &'static str = "instructor_payouts";

    async fn process(&mut self) -> Result<(), Error> {
        let now = Utc::now();
        let result = self
            .ledger
            .payouts
            .run_payout_batch(now.date_naive(), &self.config)
            .await;
        // The next run is armed even if this one failed.
        self.rearm(now).await?;

        let report = result?;
        info!(
            "Payout run for {}: {} records, {} of {} instructors paid",
            report.as_of,
            report.selected,
            report.paid(),
            report.instructors.len()
        );
        for instructor in &report.instructors {
            match &instructor.outcome {
                PayoutOutcome::Paid { .. } | PayoutOutcome::NothingToPay => {}
                PayoutOutcome::MissingAccountId => warn!(
                    "Instructor {} has no payout account, {} kept pending",
                    instructor.instructor_id, instructor.gross_total
                ),
                PayoutOutcome::Failed { error } => error!(
                    "Payout to instructor {} failed: {}",
                    instructor.instructor_id, error
                ),
            }
        }
        Ok(())
    }
}

impl PayoutBg {
    pub fn new(
        ledger: Ledger,
        config: PayoutConfig,
        schedule: PayoutSchedule,
        scheduler: Arc<dyn Scheduler>,
    ) -> PayoutBg {
        PayoutBg {
            ledger,
            config,
            schedule,
            scheduler,
        }
    }

    async fn rearm(&self, now: DateTime<Utc>) -> Result<()> {
        let next = self
            .schedule
            .next_payout_at(now)
            .ok_or_else(|| eyre!("No payout date after {}", now))?;
        self.scheduler.schedule_once(Self::NAME, next).await?;
        info!("Next payout run at {}", next);
        Ok(())
    }
}
