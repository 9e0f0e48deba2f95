use crate::error::{ClientError, Result};
use crate::store::{ListParams, ObjectStore};
use async_trait::async_trait;
use podbalancer_core::{collection_path, GroupVersionKind, ResourceKey};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

/// HTTP object store speaking the Kubernetes REST conventions
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of a single object; an empty name would address the collection
    fn object_url(&self, key: &ResourceKey) -> Result<String> {
        if key.name.is_empty() {
            return Err(ClientError::invalid_resource(format!(
                "{} has an empty metadata.name",
                key
            )));
        }
        Ok(self.url(&key.api_path()))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        builder
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("HTTP request failed: {}", e)))
    }

    /// Map a non-success status to the matching error, otherwise parse the body
    async fn into_object(key: &str, method: &str, resp: Response) -> Result<Value> {
        let status = resp.status();
        if status.is_success() {
            return resp.json::<Value>().await.map_err(|e| {
                ClientError::serialization(format!("Failed to parse response: {}", e), Some(Box::new(e)))
            });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(key, method, status, body))
    }
}

fn status_error(key: &str, method: &str, status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::not_found(key),
        StatusCode::CONFLICT if method == "POST" => ClientError::already_exists(key),
        StatusCode::CONFLICT => ClientError::conflict(key, body),
        _ => ClientError::transport(format!(
            "{} {} failed with status {}: {}",
            method, key, status, body
        )),
    }
}

/// Pull the objects out of a list response body
///
/// List items omit apiVersion and kind, so both are filled in from `gvk`.
fn list_items(gvk: &GroupVersionKind, url: &str, mut body: Value) -> Result<Vec<Value>> {
    let Some(items) = body.get_mut("items").and_then(Value::as_array_mut) else {
        return Err(ClientError::serialization(
            format!("List response from {} has no items array", url),
            None,
        ));
    };

    Ok(std::mem::take(items)
        .into_iter()
        .map(|mut item| {
            if let Some(map) = item.as_object_mut() {
                map.entry("apiVersion")
                    .or_insert_with(|| Value::String(gvk.api_version()));
                map.entry("kind")
                    .or_insert_with(|| Value::String(gvk.kind.clone()));
            }
            item
        })
        .collect())
}

#[async_trait]
impl ObjectStore for ApiClient {
    async fn list(&self, gvk: &GroupVersionKind, params: &ListParams) -> Result<Vec<Value>> {
        let url = self.url(&collection_path(gvk, params.namespace.as_deref()));
        debug!("GET {}", url);

        let mut builder = self.client.get(&url);
        if let Some(selector) = &params.label_selector {
            builder = builder.query(&[("labelSelector", selector.to_string())]);
        }

        let resp = self.send(builder).await?;
        let body = Self::into_object(&url, "GET", resp).await?;

        list_items(gvk, &url, body)
    }

    async fn get(&self, key: &ResourceKey) -> Result<Value> {
        let url = self.object_url(key)?;
        debug!("GET {}", url);

        let resp = self.send(self.client.get(&url)).await?;
        Self::into_object(&key.to_string(), "GET", resp).await
    }

    async fn create(&self, key: &ResourceKey, object: Value) -> Result<Value> {
        let url = self.url(&collection_path(&key.gvk, key.namespace()));
        debug!("POST {}", url);

        let resp = self.send(self.client.post(&url).json(&object)).await?;
        Self::into_object(&key.to_string(), "POST", resp).await
    }

    async fn update(&self, key: &ResourceKey, object: Value) -> Result<Value> {
        let url = self.object_url(key)?;
        debug!("PUT {}", url);

        let resp = self.send(self.client.put(&url).json(&object)).await?;
        Self::into_object(&key.to_string(), "PUT", resp).await
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let url = self.object_url(key)?;
        debug!("DELETE {}", url);

        let resp = self.send(self.client.delete(&url)).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(&key.to_string(), "DELETE", status, body))
    }
}
