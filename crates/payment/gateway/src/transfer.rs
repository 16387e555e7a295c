use log::error;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    pub transfer_group: String,
}

// {
//   "id": "tr_1MiN3gLkdIwHu7ixNCZvFdgA",
//   "object": "transfer",
//   "amount": 400,
//   "amount_reversed": 0,
//   "balance_transaction": "txn_1MiN3gLkdIwHu7ixxapQrznl",
//   "created": 1678043844,
//   "currency": "usd",
//   "destination": "acct_1MTfjCQ9PRzxEwkZ",
//   "destination_payment": "py_1MiN3gQ9PRzxEwkZWTPGNq9o",
//   "livemode": false,
//   "metadata": {},
//   "reversed": false,
//   "transfer_group": "ORDER_95"
// }
// https://docs.stripe.com/api/transfers/object
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(deserialize_with = "id_or_object")]
    pub destination: String,
    #[serde(default)]
    pub transfer_group: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
}

impl TransferRecord {
    /// Builds the record of a transfer the gateway already accepted. A body
    /// that does not decode falls back to the request, since the money moved.
    pub fn accepted(request: &TransferRequest, response: Value) -> TransferRecord {
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match serde_json::from_value(response) {
            Ok(record) => record,
            Err(err) => {
                error!(
                    "Transfer {:?} to {} accepted but response did not decode: {}",
                    id, request.destination, err
                );
                TransferRecord {
                    id,
                    amount: request.amount,
                    currency: request.currency.clone(),
                    destination: request.destination.clone(),
                    transfer_group: Some(request.transfer_group.clone()),
                    created: None,
                }
            }
        }
    }
}

// Expandable fields come back either as an id or as the expanded object.
fn id_or_object<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Object(object) => match object.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            _ => Err(serde::de::Error::custom("expanded object without id")),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected id or object, got {}",
            other
        ))),
    }
}
