use bson::oid::ObjectId;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// Instructor share of a single order awaiting payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub order_id: ObjectId,
    pub instructor_id: ObjectId,
    pub amount: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    /// Day the share becomes payable, stored as `YYYY-MM-DD` so it sorts.
    pub payout_date: NaiveDate,
    #[serde(default)]
    pub gateway_account_id: Option<String>,
    #[serde(default)]
    pub pending: bool,
}

impl EarningsRecord {
    pub fn new(
        order_id: ObjectId,
        instructor_id: ObjectId,
        amount: Decimal,
        tax: Decimal,
        payout_date: NaiveDate,
    ) -> Self {
        EarningsRecord {
            id: ObjectId::new(),
            order_id,
            instructor_id,
            amount,
            tax,
            payout_date,
            gateway_account_id: None,
            pending: true,
        }
    }

    pub fn net_share(&self) -> Decimal {
        self.amount - self.tax
    }

    pub fn account_id(&self) -> Option<&str> {
        self.gateway_account_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// Closed date range `[from, to]` of payout dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl PayoutWindow {
    pub fn trailing(as_of: NaiveDate, days: u32) -> PayoutWindow {
        PayoutWindow {
            from: as_of
                .checked_sub_days(Days::new(days as u64))
                .unwrap_or(NaiveDate::MIN),
            to: as_of,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
