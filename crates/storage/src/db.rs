use std::ops::Deref;

use bson::{doc, Document};
use eyre::{Context as _, Error};
use futures_util::TryStreamExt as _;
use log::{info, warn};
use mongodb::{Client, Cursor, Database};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct Db {
    _client: Client,
    db: Database,
}

impl Db {
    pub(crate) async fn connect(uri: &str, db_name: &str) -> Result<Self, Error> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        info!("Connected to database {}", db_name);
        Ok(Db {
            _client: client,
            db,
        })
    }
}

impl Deref for Db {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Decodes a stored document. Rows that do not fit `T` are logged and skipped.
pub(crate) fn decode_row<T: DeserializeOwned>(collection: &str, row: Document) -> Option<T> {
    let id = row
        .get("_id")
        .map(|id| id.to_string())
        .unwrap_or_else(|| "without _id".to_owned());
    match bson::from_document(row) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Skipping malformed {} document {}: {}", collection, id, err);
            None
        }
    }
}

pub(crate) async fn collect_rows<T: DeserializeOwned>(
    collection: &str,
    mut cursor: Cursor<Document>,
) -> Result<Vec<T>, Error> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        rows.extend(decode_row(collection, row));
    }
    Ok(rows)
}
