use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructorProfile {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    /// Connected gateway account receiving payouts.
    #[serde(default)]
    pub gateway_account_id: Option<String>,
}

impl InstructorProfile {
    pub fn account_id(&self) -> Option<&str> {
        self.gateway_account_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}
