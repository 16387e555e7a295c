use std::{sync::Arc, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use env::Env;
use eyre::{eyre, Error, Result};
use ledger::Ledger;
use log::{error, info};
use model::payout::PayoutSchedule;
use process::{payouts::PayoutBg, subscription::SubscriptionExpiryBg};
use scheduler::CronScheduler;
use storage::schedule::ScheduleStore;
use tokio::time;

pub mod process;
pub mod scheduler;

#[cfg(test)]
mod stubs;

pub const EXPIRY_JOB: &str = SubscriptionExpiryBg::NAME;
pub const PAYOUT_JOB: &str = PayoutBg::NAME;

#[async_trait]
pub trait Task {
    const NAME: &'static str;

    async fn process(&mut self) -> Result<(), Error>;
}

/// Named job triggers.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn is_scheduled(&self, job: &str) -> Result<bool>;
    /// Arms `job` to run now and then every `interval`.
    async fn schedule_recurring(&self, job: &str, interval: Duration) -> Result<()>;
    /// Arms `job` for a single run at `at`, replacing any pending trigger.
    async fn schedule_once(&self, job: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Arms the expiry scan and the next payout run unless they are already armed.
pub async fn bootstrap(
    scheduler: &dyn Scheduler,
    payouts: PayoutSchedule,
    now: DateTime<Utc>,
) -> Result<()> {
    if !scheduler.is_scheduled(EXPIRY_JOB).await? {
        scheduler
            .schedule_recurring(EXPIRY_JOB, Duration::days(1))
            .await?;
    }

    if !scheduler.is_scheduled(PAYOUT_JOB).await? {
        let at = payouts
            .next_payout_at(now)
            .ok_or_else(|| eyre!("No payout date after {}", now))?;
        scheduler.schedule_once(PAYOUT_JOB, at).await?;
    }
    Ok(())
}

pub async fn start(ledger: Ledger, env: &Env, store: ScheduleStore) -> Result<CronScheduler> {
    let scheduler = CronScheduler::new(Arc::new(store)).await?;
    let handle: Arc<dyn Scheduler> = Arc::new(scheduler.clone());
    let payout_schedule = env.payout_schedule();

    scheduler.register(SubscriptionExpiryBg::new(ledger.clone()));
    scheduler.register(PayoutBg::new(
        ledger,
        env.payout_config().clone(),
        payout_schedule,
        handle.clone(),
    ));

    let restored = scheduler.restore().await?;
    info!("Restored {} scheduled jobs", restored);
    scheduler.start().await?;

    tokio::spawn(async move {
        let mut interval = time::interval(StdDuration::from_secs(10 * 60));
        loop {
            interval.tick().await;
            if let Err(err) = bootstrap(handle.as_ref(), payout_schedule, Utc::now()).await {
                error!("Failed to arm background jobs: {:#}", err);
            }
        }
    });
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::stubs::FakeScheduler;

    #[tokio::test]
    async fn test_bootstrap_arms_both_jobs() {
        let scheduler = FakeScheduler::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap();
        bootstrap(&scheduler, PayoutSchedule::default(), now)
            .await
            .unwrap();

        assert_eq!(
            scheduler.recurring(EXPIRY_JOB),
            Some(Duration::days(1))
        );
        assert_eq!(
            scheduler.once(PAYOUT_JOB),
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).single().unwrap())
        );
        assert_eq!(scheduler.calls(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let scheduler = FakeScheduler::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap();
        bootstrap(&scheduler, PayoutSchedule::default(), now)
            .await
            .unwrap();
        bootstrap(&scheduler, PayoutSchedule::default(), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(scheduler.calls(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_only_fills_missing_job() {
        let scheduler = FakeScheduler::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap();
        scheduler
            .schedule_recurring(EXPIRY_JOB, Duration::days(1))
            .await
            .unwrap();

        bootstrap(&scheduler, PayoutSchedule::default(), now)
            .await
            .unwrap();
        assert_eq!(scheduler.calls(), 2);
        assert!(scheduler.once(PAYOUT_JOB).is_some());
    }
}
