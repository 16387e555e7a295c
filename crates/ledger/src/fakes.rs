use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use eyre::Result;
use gateway::{
    transfer::{TransferRecord, TransferRequest},
    GatewayApi, GatewayError, Method,
};
use model::{
    earnings::{EarningsRecord, PayoutWindow},
    order::{SubscriptionOrder, SubscriptionStatus},
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{
    repo::{EarningsLedger, InstructorDirectory, PayoutEvents, SubscriptionOrders},
    service::payouts::InstructorSummary,
};

pub struct InMemoryOrders {
    orders: Mutex<Vec<SubscriptionOrder>>,
    filtered: bool,
}

impl InMemoryOrders {
    pub fn new(orders: Vec<SubscriptionOrder>) -> Self {
        InMemoryOrders {
            orders: Mutex::new(orders),
            filtered: true,
        }
    }

    /// Returns every stored order, like a store with a sloppy query.
    pub fn unfiltered(orders: Vec<SubscriptionOrder>) -> Self {
        InMemoryOrders {
            orders: Mutex::new(orders),
            filtered: false,
        }
    }

    pub fn status(&self, id: ObjectId) -> Option<SubscriptionStatus> {
        self.orders
            .lock()
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.subscription_status)
    }
}

#[async_trait]
impl SubscriptionOrders for InMemoryOrders {
    async fn find_cancellable(&self, gateway: &str) -> Result<Vec<SubscriptionOrder>> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| !self.filtered || o.check_eligible(gateway).is_ok())
            .cloned()
            .collect())
    }

    async fn mark_cancelled(&self, id: ObjectId) -> Result<()> {
        for order in self.orders.lock().iter_mut() {
            if order.id == id {
                order.subscription_status = SubscriptionStatus::Cancelled;
            }
        }
        Ok(())
    }
}

pub struct InMemoryEarnings {
    records: Mutex<Vec<EarningsRecord>>,
}

impl InMemoryEarnings {
    pub fn new(records: Vec<EarningsRecord>) -> Self {
        InMemoryEarnings {
            records: Mutex::new(records),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.pending)
            .count()
    }

    pub fn is_pending(&self, id: ObjectId) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| r.id == id && r.pending)
    }
}

#[async_trait]
impl EarningsLedger for InMemoryEarnings {
    async fn find_pending(&self, window: PayoutWindow) -> Result<Vec<EarningsRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.pending && window.contains(r.payout_date))
            .cloned()
            .collect())
    }

    async fn clear_pending(&self, ids: &[ObjectId]) -> Result<u64> {
        let mut cleared = 0;
        for record in self.records.lock().iter_mut() {
            if record.pending && ids.contains(&record.id) {
                record.pending = false;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

pub struct FakeDirectory {
    accounts: HashMap<ObjectId, String>,
}

impl FakeDirectory {
    pub fn new(accounts: Vec<(ObjectId, &str)>) -> Self {
        FakeDirectory {
            accounts: accounts
                .into_iter()
                .map(|(id, account)| (id, account.to_owned()))
                .collect(),
        }
    }
}

#[async_trait]
impl InstructorDirectory for FakeDirectory {
    async fn gateway_account(&self, instructor_id: ObjectId) -> Result<Option<String>> {
        Ok(self.accounts.get(&instructor_id).cloned())
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(TransferRecord, InstructorSummary)>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<(TransferRecord, InstructorSummary)> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

#[async_trait]
impl PayoutEvents for RecordingEvents {
    async fn instructor_paid(&self, transfer: &TransferRecord, summary: &InstructorSummary) {
        self.events
            .lock()
            .push((transfer.clone(), summary.clone()));
    }
}

type Call = (String, Option<Value>, Method);

/// Records every call. Calls mentioning `fail_marker` in the path or as the
/// transfer destination are declined.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    fail_marker: Option<String>,
    fail_status: u16,
    transfer_body: Option<Value>,
}

impl FakeGateway {
    pub fn failing_on(marker: &str) -> Self {
        FakeGateway::rejecting(marker, 402)
    }

    pub fn rejecting(marker: &str, status: u16) -> Self {
        FakeGateway {
            fail_marker: Some(marker.to_owned()),
            fail_status: status,
            ..FakeGateway::default()
        }
    }

    /// Accepts every transfer but answers with `body`.
    pub fn answering_transfers_with(body: Value) -> Self {
        FakeGateway {
            transfer_body: Some(body),
            ..FakeGateway::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.calls()
            .into_iter()
            .filter(|(path, _, _)| path == "transfers")
            .filter_map(|(_, payload, _)| payload)
            .map(|payload| serde_json::from_value(payload).unwrap())
            .collect()
    }

    fn should_fail(&self, path: &str, payload: &Option<Value>) -> bool {
        let Some(marker) = self.fail_marker.as_deref() else {
            return false;
        };
        let destination = payload
            .as_ref()
            .and_then(|p| p.get("destination"))
            .and_then(Value::as_str);
        path.contains(marker) || destination == Some(marker)
    }
}

#[async_trait]
impl GatewayApi for FakeGateway {
    async fn call(
        &self,
        path: &str,
        payload: Option<Value>,
        method: Method,
    ) -> Result<Value, GatewayError> {
        let seq = {
            let mut calls = self.calls.lock();
            calls.push((path.to_owned(), payload.clone(), method));
            calls.len()
        };
        if self.should_fail(path, &payload) {
            return Err(GatewayError::Api {
                status: self.fail_status,
                message: "Your card was declined".to_owned(),
            });
        }
        if let (Method::Post, Some(body)) = (method, &self.transfer_body) {
            return Ok(body.clone());
        }
        match (method, payload) {
            (Method::Post, Some(mut body)) => {
                body["id"] = json!(format!("tr_{}", seq));
                Ok(body)
            }
            _ => Ok(json!({ "status": "canceled" })),
        }
    }
}
