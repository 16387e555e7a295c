use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use eyre::{eyre, Result};
use gateway::{transfer::TransferRecord, GatewayApi, GatewayError, Method};
use ledger::{
    repo::{EarningsLedger, InstructorDirectory, PayoutEvents, SubscriptionOrders},
    service::{expiry::ExpiryScanner, payouts::{InstructorSummary, PayoutAggregator}},
    Ledger,
};
use model::{
    earnings::{EarningsRecord, PayoutWindow},
    order::SubscriptionOrder,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::Scheduler;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    Recurring(Duration),
    Once(DateTime<Utc>),
}

#[derive(Default)]
pub struct FakeScheduler {
    jobs: Mutex<HashMap<String, Trigger>>,
    calls: Mutex<usize>,
}

impl FakeScheduler {
    pub fn recurring(&self, job: &str) -> Option<Duration> {
        match self.jobs.lock().get(job) {
            Some(Trigger::Recurring(interval)) => Some(*interval),
            _ => None,
        }
    }

    pub fn once(&self, job: &str) -> Option<DateTime<Utc>> {
        match self.jobs.lock().get(job) {
            Some(Trigger::Once(at)) => Some(*at),
            _ => None,
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    fn put(&self, job: &str, trigger: Trigger) {
        self.jobs.lock().insert(job.to_owned(), trigger);
        *self.calls.lock() += 1;
    }
}

#[async_trait]
impl Scheduler for FakeScheduler {
    async fn is_scheduled(&self, job: &str) -> Result<bool> {
        Ok(self.jobs.lock().contains_key(job))
    }

    async fn schedule_recurring(&self, job: &str, interval: Duration) -> Result<()> {
        self.put(job, Trigger::Recurring(interval));
        Ok(())
    }

    async fn schedule_once(&self, job: &str, at: DateTime<Utc>) -> Result<()> {
        self.put(job, Trigger::Once(at));
        Ok(())
    }
}

/// Storage that holds nothing, or fails every query.
#[derive(Default)]
pub struct EmptyStore {
    pub broken: bool,
}

impl EmptyStore {
    fn check(&self) -> Result<()> {
        if self.broken {
            Err(eyre!("database unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubscriptionOrders for EmptyStore {
    async fn find_cancellable(&self, _: &str) -> Result<Vec<SubscriptionOrder>> {
        self.check()?;
        Ok(vec![])
    }

    async fn mark_cancelled(&self, _: ObjectId) -> Result<()> {
        self.check()
    }
}

#[async_trait]
impl EarningsLedger for EmptyStore {
    async fn find_pending(&self, _: PayoutWindow) -> Result<Vec<EarningsRecord>> {
        self.check()?;
        Ok(vec![])
    }

    async fn clear_pending(&self, _: &[ObjectId]) -> Result<u64> {
        self.check()?;
        Ok(0)
    }
}

#[async_trait]
impl InstructorDirectory for EmptyStore {
    async fn gateway_account(&self, _: ObjectId) -> Result<Option<String>> {
        self.check()?;
        Ok(None)
    }
}

#[async_trait]
impl PayoutEvents for EmptyStore {
    async fn instructor_paid(&self, _: &TransferRecord, _: &InstructorSummary) {}
}

pub struct SilentGateway;

#[async_trait]
impl GatewayApi for SilentGateway {
    async fn call(
        &self,
        _: &str,
        _: Option<Value>,
        _: Method,
    ) -> Result<Value, GatewayError> {
        Ok(json!({}))
    }
}

pub fn ledger(broken: bool) -> Ledger {
    let store = Arc::new(EmptyStore { broken });
    let gateway = Arc::new(SilentGateway);
    Ledger::from_parts(
        ExpiryScanner::new(store.clone(), gateway.clone(), "stripe".to_owned()),
        PayoutAggregator::new(store.clone(), store.clone(), gateway, store),
    )
}
