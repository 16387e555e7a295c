use std::sync::Arc;

use bson::{doc, Document};
use eyre::Error;
use model::schedule::ScheduledJob;
use mongodb::{Collection, Database};

use crate::db::collect_rows;

const COLLECTION: &str = "scheduled_jobs";

/// Keeps job triggers across restarts.
#[derive(Clone)]
pub struct ScheduleStore {
    jobs: Arc<Collection<ScheduledJob>>,
}

impl ScheduleStore {
    pub(crate) fn new(db: &Database) -> Self {
        ScheduleStore {
            jobs: Arc::new(db.collection(COLLECTION)),
        }
    }

    pub async fn all(&self) -> Result<Vec<ScheduledJob>, Error> {
        let cursor = self.jobs.clone_with_type::<Document>().find(doc! {}).await?;
        collect_rows(COLLECTION, cursor).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<ScheduledJob>, Error> {
        Ok(self.jobs.find_one(doc! { "_id": name }).await?)
    }

    pub async fn save(&self, job: &ScheduledJob) -> Result<(), Error> {
        self.jobs
            .replace_one(doc! { "_id": &job.name }, job)
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<(), Error> {
        self.jobs.delete_one(doc! { "_id": name }).await?;
        Ok(())
    }
}
