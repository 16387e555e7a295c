use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use eyre::Error;
use model::order::SubscriptionOrder;
use mongodb::{Collection, Database, IndexModel};

use crate::db::collect_rows;

const COLLECTION: &str = "orders";

#[derive(Clone)]
pub struct OrderStore {
    orders: Arc<Collection<SubscriptionOrder>>,
}

impl OrderStore {
    pub(crate) async fn new(db: &Database) -> Result<Self, Error> {
        let orders = db.collection(COLLECTION);
        orders
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "gateway": 1, "subscription_status": 1 })
                    .build(),
            )
            .await?;
        Ok(OrderStore {
            orders: Arc::new(orders),
        })
    }

    /// Orders with a live finite subscription billed through `gateway`.
    /// A missing status counts as not cancelled. Malformed rows are skipped.
    pub async fn find_cancellable(&self, gateway: &str) -> Result<Vec<SubscriptionOrder>, Error> {
        let cursor = self
            .orders
            .clone_with_type::<Document>()
            .find(cancellable_filter(gateway))
            .await?;
        collect_rows(COLLECTION, cursor).await
    }

    pub async fn mark_cancelled(&self, id: ObjectId) -> Result<(), Error> {
        self.orders
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "subscription_status": "cancelled" } },
            )
            .await?;
        Ok(())
    }
}

fn cancellable_filter(gateway: &str) -> Document {
    doc! {
        "gateway_subscription_id": { "$exists": true, "$nin": [null, ""] },
        "subscription_status": { "$ne": "cancelled" },
        "billing_length": { "$gte": 1 },
        "gateway": gateway,
    }
}
