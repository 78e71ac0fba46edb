//! HTTP document snapshot store.
//!
//! Talks to any key-value document service that exposes one URL per
//! document: `GET` returns the stored JSON, `PUT` replaces it. There are no
//! transactions; the last writer wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::domain::{Snapshot, SnapshotStore, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpSnapshotStore {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSnapshotStore {
    /// Create a store for the document at `url`, optionally sending a bearer token.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SnapshotStore for HttpSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let response = self
            .authorize(self.client.get(&self.url))
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.put(&self.url))
            .json(snapshot)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}
