use async_trait::async_trait;
use env::Env;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::{GatewayApi, GatewayError, Method};

/// Stripe compatible REST client. Bodies are form encoded and requests are
/// authenticated with the secret key as a bearer token.
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(env: &Env) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(env.gateway_timeout()).build()?;
        Ok(StripeClient {
            http,
            base_url: env.gateway_api_base().trim_end_matches('/').to_owned(),
            secret_key: env.gateway_secret_key().to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl GatewayApi for StripeClient {
    async fn call(
        &self,
        path: &str,
        payload: Option<Value>,
        method: Method,
    ) -> Result<Value, GatewayError> {
        debug!("Gateway call {:?} {}", method, path);
        let mut request = self
            .http
            .request(method.into(), self.url(path))
            .bearer_auth(&self.secret_key);
        if let Some(payload) = payload {
            request = request.form(&form_fields(&payload));
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = error_message(&text);
            warn!("Gateway call {} failed with {}: {}", path, status, message);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Flattens a JSON object into form fields, nesting as `key[inner]`.
pub fn form_fields(payload: &Value) -> Vec<(String, String)> {
    let mut fields = vec![];
    if let Value::Object(map) = payload {
        for (key, value) in map {
            push_field(&mut fields, key.clone(), value);
        }
    }
    fields
}

fn push_field(fields: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => fields.push((key, s.clone())),
        Value::Bool(_) | Value::Number(_) => fields.push((key, value.to_string())),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                push_field(fields, format!("{}[{}]", key, idx), item);
            }
        }
        Value::Object(map) => {
            for (inner, item) in map {
                push_field(fields, format!("{}[{}]", key, inner), item);
            }
        }
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.to_owned())
}
