use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Datelike as _, Months, NaiveDate, TimeZone as _, Utc};
use serde::{Deserialize, Serialize};

use crate::{decimal::Decimal, earnings::EarningsRecord};

const PERCENT_SCALE: i128 = 100 * 100;

/// Process wide payout terms, passed to every payout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutConfig {
    pub currency: String,
    /// Share of the post-tax revenue owed to the instructor, in percent.
    pub instructor_share: Decimal,
    /// Gateway fee withheld from the instructor share, in percent.
    pub gateway_fee: Decimal,
    pub window_days: u32,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        PayoutConfig {
            currency: "usd".to_owned(),
            instructor_share: Decimal::int(70),
            gateway_fee: Decimal::int(5),
            window_days: 30,
        }
    }
}

impl PayoutConfig {
    /// `floor(gross * share * (1 - fee) * 100)` computed exactly in minor units.
    pub fn payable_minor(&self, gross: Decimal) -> i64 {
        let gross = gross.minor() as i128;
        let share = self.instructor_share.minor() as i128;
        let keep = PERCENT_SCALE - self.gateway_fee.minor() as i128;
        let payable = (gross * share * keep).div_euclid(PERCENT_SCALE * PERCENT_SCALE);
        payable.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// Everything owed to one instructor in a payout run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorPayout {
    pub instructor_id: ObjectId,
    /// Earnings records cleared once the transfer succeeds.
    pub record_ids: Vec<ObjectId>,
    pub order_ids: Vec<ObjectId>,
    pub net_shares: Vec<Decimal>,
    pub account_id: Option<String>,
}

impl InstructorPayout {
    fn new(instructor_id: ObjectId) -> Self {
        InstructorPayout {
            instructor_id,
            record_ids: vec![],
            order_ids: vec![],
            net_shares: vec![],
            account_id: None,
        }
    }

    pub fn gross_total(&self) -> Decimal {
        self.net_shares.iter().copied().sum()
    }

    /// Reconciliation tag attached to the transfer.
    pub fn grouping_tag(&self, as_of: NaiveDate) -> String {
        format!(
            "instructor_{}_{}",
            self.instructor_id.to_hex(),
            as_of.format("%Y%m%d")
        )
    }
}

/// Pending earnings grouped by instructor, in first seen order.
#[derive(Debug, Clone, Default)]
pub struct PayoutBatch {
    pub payouts: Vec<InstructorPayout>,
}

impl PayoutBatch {
    pub fn aggregate<I>(records: I) -> PayoutBatch
    where
        I: IntoIterator<Item = EarningsRecord>,
    {
        let mut index: HashMap<ObjectId, usize> = HashMap::new();
        let mut payouts: Vec<InstructorPayout> = vec![];
        for record in records {
            let idx = *index.entry(record.instructor_id).or_insert_with(|| {
                payouts.push(InstructorPayout::new(record.instructor_id));
                payouts.len() - 1
            });
            let payout = &mut payouts[idx];
            if let Some(account) = record.account_id() {
                payout.account_id = Some(account.to_owned());
            }
            payout.net_shares.push(record.net_share());
            payout.record_ids.push(record.id);
            payout.order_ids.push(record.order_id);
        }
        PayoutBatch { payouts }
    }

    pub fn len(&self) -> usize {
        self.payouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payouts.is_empty()
    }
}

/// Persisted outcome of a successful transfer to an instructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub transfer_id: String,
    pub instructor_id: ObjectId,
    pub order_ids: Vec<ObjectId>,
    pub gross_total: Decimal,
    pub computed_minor: i64,
    pub sent_minor: i64,
    pub currency: String,
    pub transfer_group: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Monthly payout date: `day_of_month` at `hour` UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSchedule {
    pub day_of_month: u32,
    pub hour: u32,
}

impl Default for PayoutSchedule {
    fn default() -> Self {
        PayoutSchedule {
            day_of_month: 1,
            hour: 9,
        }
    }
}

impl PayoutSchedule {
    /// First payout instant strictly after `now`.
    pub fn next_payout_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
        let this_month = self.instant_in(month_start)?;
        if this_month > now {
            return Some(this_month);
        }
        self.instant_in(month_start.checked_add_months(Months::new(1))?)
    }

    fn instant_in(&self, month_start: NaiveDate) -> Option<DateTime<Utc>> {
        let next_month = month_start.checked_add_months(Months::new(1))?;
        let last_day = next_month.pred_opt()?.day();
        let day = self.day_of_month.clamp(1, last_day);
        let date = month_start.with_day(day)?;
        Utc.from_local_datetime(&date.and_hms_opt(self.hour.min(23), 0, 0)?)
            .single()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn record(instructor: ObjectId, amount: i64, tax: i64, account: Option<&str>) -> EarningsRecord {
        let mut record = EarningsRecord::new(
            ObjectId::new(),
            instructor,
            Decimal::int(amount),
            Decimal::int(tax),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        );
        record.gateway_account_id = account.map(|a| a.to_owned());
        record
    }

    #[test]
    fn test_aggregate_by_instructor() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let records = vec![
            record(a, 100, 10, None),
            record(b, 200, 20, Some("acct_b")),
            record(a, 50, 5, None),
        ];
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        let orders: Vec<_> = records.iter().map(|r| r.order_id).collect();
        let batch = PayoutBatch::aggregate(records);

        assert_eq!(batch.len(), 2);
        let pa = &batch.payouts[0];
        assert_eq!(pa.instructor_id, a);
        assert_eq!(pa.gross_total(), Decimal::int(135));
        assert_eq!(pa.record_ids, vec![ids[0], ids[2]]);
        assert_eq!(pa.order_ids, vec![orders[0], orders[2]]);
        assert_eq!(pa.account_id, None);

        let pb = &batch.payouts[1];
        assert_eq!(pb.gross_total(), Decimal::int(180));
        assert_eq!(pb.account_id.as_deref(), Some("acct_b"));
    }

    #[test]
    fn test_last_seen_account_wins() {
        let a = ObjectId::new();
        let batch = PayoutBatch::aggregate(vec![
            record(a, 10, 0, Some("acct_old")),
            record(a, 10, 0, None),
            record(a, 10, 0, Some("acct_new")),
            record(a, 10, 0, Some("")),
        ]);
        assert_eq!(batch.payouts[0].account_id.as_deref(), Some("acct_new"));
        assert_eq!(batch.payouts[0].record_ids.len(), 4);
    }

    #[test]
    fn test_payable_minor() {
        let config = PayoutConfig::default();
        // 135 * 0.70 * 0.95 = 89.775
        assert_eq!(config.payable_minor(Decimal::int(135)), 8977);
        // 180 * 0.70 * 0.95 = 119.70
        assert_eq!(config.payable_minor(Decimal::int(180)), 11970);
        assert_eq!(config.payable_minor(Decimal::zero()), 0);

        let config = PayoutConfig {
            instructor_share: Decimal::int(100),
            gateway_fee: Decimal::zero(),
            ..PayoutConfig::default()
        };
        assert_eq!(config.payable_minor(Decimal::from_minor(1999)), 1999);
    }

    #[test]
    fn test_payable_floors_negative() {
        let config = PayoutConfig {
            instructor_share: Decimal::int(50),
            gateway_fee: Decimal::zero(),
            ..PayoutConfig::default()
        };
        assert_eq!(config.payable_minor(Decimal::from_minor(-3)), -2);
    }

    #[test]
    fn test_grouping_tag() {
        let id = ObjectId::parse_str("65f1c2a4b3e1d2c3a4b5c6d7").unwrap();
        let payout = InstructorPayout::new(id);
        assert_eq!(
            payout.grouping_tag(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
            "instructor_65f1c2a4b3e1d2c3a4b5c6d7_20240331"
        );
    }

    #[test]
    fn test_next_payout_at() {
        let schedule = PayoutSchedule {
            day_of_month: 15,
            hour: 9,
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap();
        assert_eq!(
            schedule.next_payout_at(now),
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).single()
        );

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).single().unwrap();
        assert_eq!(
            schedule.next_payout_at(now),
            Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).single()
        );

        let now = Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).single().unwrap();
        assert_eq!(
            schedule.next_payout_at(now),
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).single()
        );
    }

    #[test]
    fn test_next_payout_clamps_to_month_end() {
        let schedule = PayoutSchedule {
            day_of_month: 31,
            hour: 0,
        };
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single().unwrap();
        assert_eq!(
            schedule.next_payout_at(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).single()
        );
    }
}
