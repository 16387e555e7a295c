use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted trigger of a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    #[serde(rename = "_id")]
    pub name: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub next_run: DateTime<Utc>,
    /// Set for recurring jobs.
    #[serde(default)]
    pub interval_secs: Option<i64>,
}

impl ScheduledJob {
    pub fn once(name: &str, at: DateTime<Utc>) -> Self {
        ScheduledJob {
            name: name.to_owned(),
            next_run: at,
            interval_secs: None,
        }
    }

    pub fn recurring(name: &str, first_run: DateTime<Utc>, interval: Duration) -> Self {
        ScheduledJob {
            name: name.to_owned(),
            next_run: first_run,
            interval_secs: Some(interval.num_seconds().max(1)),
        }
    }

    /// Repeat interval. Non-positive stored intervals count as one-shot.
    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::seconds)
    }

    /// Next trigger after a run that fired at `fired_at`, if the job repeats.
    pub fn successor(&self, fired_at: DateTime<Utc>) -> Option<ScheduledJob> {
        let interval = self.interval()?;
        let mut next_run = self.next_run + interval;
        if next_run <= fired_at {
            let secs = interval.num_seconds();
            let missed = (fired_at - next_run).num_seconds() / secs + 1;
            next_run += Duration::try_seconds(secs.checked_mul(missed)?)?;
        }
        Some(ScheduledJob {
            name: self.name.clone(),
            next_run,
            interval_secs: self.interval_secs,
        })
    }
}
