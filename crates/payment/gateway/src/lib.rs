pub mod client;
pub mod transfer;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use transfer::{TransferRecord, TransferRequest};

pub use client::StripeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gateway rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Raw access to the payment gateway REST API.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Calls `path` relative to the API base. `payload` is sent as the
    /// request body when present.
    async fn call(
        &self,
        path: &str,
        payload: Option<Value>,
        method: Method,
    ) -> Result<Value, GatewayError>;

    async fn cancel_subscription(
        &self,
        customer_id: &str,
        subscription_id: &str,
    ) -> Result<(), GatewayError> {
        let path = format!("customers/{}/subscriptions/{}", customer_id, subscription_id);
        self.call(&path, None, Method::Delete).await?;
        Ok(())
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferRecord, GatewayError> {
        let payload = serde_json::to_value(request)?;
        let response = self.call("transfers", Some(payload), Method::Post).await?;
        Ok(TransferRecord::accepted(request, response))
    }
}
