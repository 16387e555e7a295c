use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use eyre::{eyre, Context as _, Result};
use gateway::{GatewayApi, GatewayError};
use log::{debug, error, info, warn};
use model::order::SubscriptionOrder;

use crate::repo::SubscriptionOrders;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCancellation {
    pub order_id: ObjectId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub scanned: usize,
    pub not_eligible: usize,
    pub not_expired: usize,
    pub cancelled: Vec<ObjectId>,
    pub failed: Vec<FailedCancellation>,
}

/// Cancels gateway subscriptions whose finite billing plan has run out.
#[derive(Clone)]
pub struct ExpiryScanner {
    orders: Arc<dyn SubscriptionOrders>,
    gateway: Arc<dyn GatewayApi>,
    gateway_name: String,
}

impl ExpiryScanner {
    pub fn new(
        orders: Arc<dyn SubscriptionOrders>,
        gateway: Arc<dyn GatewayApi>,
        gateway_name: String,
    ) -> Self {
        ExpiryScanner {
            orders,
            gateway,
            gateway_name,
        }
    }

    pub async fn scan_and_cancel_expired(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        let orders = self
            .orders
            .find_cancellable(&self.gateway_name)
            .await
            .context("find_cancellable")?;

        let mut report = ScanReport::default();
        for order in orders {
            report.scanned += 1;
            if let Err(reason) = order.check_eligible(&self.gateway_name) {
                debug!("Order {} skipped: {:?}", order.id, reason);
                report.not_eligible += 1;
                continue;
            }

            let plan = order.plan();
            let expiry = match plan.expiry(order.order_start) {
                Some(expiry) => expiry,
                None => {
                    warn!(
                        "Order {} has unrepresentable end date: {} from {}",
                        order.id,
                        plan.length_label(),
                        order.order_start
                    );
                    report.not_expired += 1;
                    continue;
                }
            };
            if now <= expiry {
                report.not_expired += 1;
                continue;
            }

            match self.cancel(&order).await {
                Ok(()) => {
                    info!(
                        "Cancelled subscription of order {} ({} plan ended at {})",
                        order.id,
                        plan.length_label(),
                        expiry
                    );
                    report.cancelled.push(order.id);
                }
                Err(err) => {
                    error!("Unable to cancel subscription of order {}: {:#}", order.id, err);
                    report.failed.push(FailedCancellation {
                        order_id: order.id,
                        error: format!("{:#}", err),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn cancel(&self, order: &SubscriptionOrder) -> Result<()> {
        let customer = order
            .customer_id()
            .ok_or_else(|| eyre!("Order has no gateway customer id"))?;
        let subscription = order
            .subscription_id()
            .ok_or_else(|| eyre!("Order has no gateway subscription id"))?;
        match self.gateway.cancel_subscription(customer, subscription).await {
            Ok(()) => {}
            // Cancelled earlier but the status was never saved.
            Err(GatewayError::Api { status: 404, message }) => warn!(
                "Subscription {} of order {} is already gone at the gateway: {}",
                subscription, order.id, message
            ),
            Err(err) => return Err(err.into()),
        }
        self.orders
            .mark_cancelled(order.id)
            .await
            .context("Subscription cancelled but order status was not saved")?;
        Ok(())
    }
}
