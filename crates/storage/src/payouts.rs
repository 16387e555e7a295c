use std::sync::Arc;

use bson::doc;
use eyre::Error;
use model::payout::PayoutRecord;
use mongodb::{Collection, Database, IndexModel};

const COLLECTION: &str = "payouts";

#[derive(Clone)]
pub struct PayoutStore {
    payouts: Arc<Collection<PayoutRecord>>,
}

impl PayoutStore {
    pub(crate) async fn new(db: &Database) -> Result<Self, Error> {
        let payouts = db.collection(COLLECTION);
        payouts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "instructor_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        Ok(PayoutStore {
            payouts: Arc::new(payouts),
        })
    }

    pub async fn insert(&self, record: &PayoutRecord) -> Result<(), Error> {
        self.payouts.insert_one(record).await?;
        Ok(())
    }
}
