use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BillingPeriod {
    Day,
    Week,
    Month,
    Year,
}

/// Recurring billing terms of a subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPlan {
    pub period: BillingPeriod,
    pub frequency: u32,
    /// Number of billing cycles. Zero means the plan never ends.
    pub length: u32,
}

impl BillingPlan {
    pub fn is_finite(&self) -> bool {
        self.length >= 1
    }

    /// Number of period units covered by the whole plan.
    pub fn total_cycles(&self) -> Option<u32> {
        self.frequency.checked_mul(self.length)
    }

    /// Moment the plan ends when started at `start`.
    ///
    /// Returns `None` for open ended plans and for end dates chrono cannot
    /// represent. Month based periods clamp to the last day of the target
    /// month.
    pub fn expiry(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_finite() || self.frequency == 0 {
            return None;
        }
        let cycles = self.total_cycles()?;
        match self.period {
            BillingPeriod::Day => start.checked_add_signed(Duration::days(cycles as i64)),
            BillingPeriod::Week => {
                start.checked_add_signed(Duration::weeks(cycles as i64))
            }
            BillingPeriod::Month => start.checked_add_months(Months::new(cycles)),
            BillingPeriod::Year => {
                start.checked_add_months(Months::new(cycles.checked_mul(12)?))
            }
        }
    }

    pub fn is_expired(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.expiry(start).map(|end| now > end).unwrap_or(false)
    }

    /// Human readable plan length, e.g. `3 months`.
    pub fn length_label(&self) -> String {
        let cycles = self.total_cycles().unwrap_or(u32::MAX);
        let plural = if cycles > 1 { "s" } else { "" };
        format!("{} {}{}", cycles, self.period, plural)
    }
}
