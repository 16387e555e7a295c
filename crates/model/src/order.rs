use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::{BillingPeriod, BillingPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
}

/// Purchase order paid through a recurring gateway subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOrder {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub gateway_subscription_id: Option<String>,
    #[serde(default)]
    pub gateway_customer_id: Option<String>,
    pub gateway: String,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub order_start: DateTime<Utc>,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub billing_frequency: u32,
    #[serde(default)]
    pub billing_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotEligible {
    NoGatewaySubscription,
    AlreadyCancelled,
    OpenEnded,
    OtherGateway,
}

impl SubscriptionOrder {
    pub fn plan(&self) -> BillingPlan {
        BillingPlan {
            period: self.billing_period,
            frequency: self.billing_frequency,
            length: self.billing_length,
        }
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.gateway_subscription_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.gateway_customer_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_cancelled(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Cancelled
    }

    /// Checks whether the order may be cancelled through `gateway`.
    pub fn check_eligible(&self, gateway: &str) -> Result<(), NotEligible> {
        if self.subscription_id().is_none() {
            return Err(NotEligible::NoGatewaySubscription);
        }
        if self.is_cancelled() {
            return Err(NotEligible::AlreadyCancelled);
        }
        if !self.plan().is_finite() {
            return Err(NotEligible::OpenEnded);
        }
        if self.gateway != gateway {
            return Err(NotEligible::OtherGateway);
        }
        Ok(())
    }
}
