use std::sync::Arc;

use gateway::GatewayApi;
use service::{expiry::ExpiryScanner, payouts::PayoutAggregator};
use storage::Storage;

pub mod errors;
pub mod repo;
pub mod service;

#[cfg(test)]
mod fakes;

#[derive(Clone)]
pub struct Ledger {
    pub expiry: ExpiryScanner,
    pub payouts: PayoutAggregator,
}

impl Ledger {
    pub fn new(storage: Storage, gateway: Arc<dyn GatewayApi>, gateway_name: String) -> Self {
        let expiry = ExpiryScanner::new(
            Arc::new(storage.orders.clone()),
            gateway.clone(),
            gateway_name,
        );
        let payouts = PayoutAggregator::new(
            Arc::new(storage.earnings.clone()),
            Arc::new(storage.instructors.clone()),
            gateway,
            Arc::new(storage.payouts.clone()),
        );
        Ledger { expiry, payouts }
    }

    pub fn from_parts(expiry: ExpiryScanner, payouts: PayoutAggregator) -> Self {
        Ledger { expiry, payouts }
    }
}
