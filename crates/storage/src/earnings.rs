use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use eyre::Error;
use model::earnings::{EarningsRecord, PayoutWindow};
use mongodb::{Collection, Database, IndexModel};

use crate::db::collect_rows;

const COLLECTION: &str = "earnings";

#[derive(Clone)]
pub struct EarningsStore {
    earnings: Arc<Collection<EarningsRecord>>,
}

impl EarningsStore {
    pub(crate) async fn new(db: &Database) -> Result<Self, Error> {
        let earnings = db.collection(COLLECTION);
        earnings
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "pending": 1, "payout_date": 1 })
                    .build(),
            )
            .await?;
        Ok(EarningsStore {
            earnings: Arc::new(earnings),
        })
    }

    /// Pending records dated inside `window`. Malformed rows are skipped.
    pub async fn find_pending(&self, window: PayoutWindow) -> Result<Vec<EarningsRecord>, Error> {
        let cursor = self
            .earnings
            .clone_with_type::<Document>()
            .find(pending_filter(window))
            .sort(doc! { "payout_date": 1, "_id": 1 })
            .await?;
        collect_rows(COLLECTION, cursor).await
    }

    /// Drops the pending flag of the given records. Returns how many changed.
    pub async fn clear_pending(&self, ids: &[ObjectId]) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .earnings
            .update_many(
                doc! { "_id": { "$in": ids } },
                doc! { "$unset": { "pending": "" } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

// Dates are stored as `YYYY-MM-DD` strings, so lexical bounds are date bounds.
fn pending_filter(window: PayoutWindow) -> Document {
    doc! {
        "pending": true,
        "payout_date": {
            "$gte": window.from.to_string(),
            "$lte": window.to.to_string(),
        },
    }
}
