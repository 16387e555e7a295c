use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use eyre::Error;
use model::instructor::InstructorProfile;
use mongodb::{Collection, Database};

const COLLECTION: &str = "instructors";

#[derive(Clone)]
pub struct InstructorStore {
    instructors: Arc<Collection<InstructorProfile>>,
}

impl InstructorStore {
    pub(crate) fn new(db: &Database) -> Self {
        InstructorStore {
            instructors: Arc::new(db.collection(COLLECTION)),
        }
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<InstructorProfile>, Error> {
        Ok(self.instructors.find_one(doc! { "_id": id }).await?)
    }
}
