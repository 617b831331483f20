// src/services/storage.rs
//! Supabase Storage client for candidate attachments

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::SupabaseConfig;
use crate::services::supabase_auth::extract_error_message;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Supabase Storage not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Storage API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Object storage used for attachments
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, StorageError>;
}

#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Option<String>,
    service_role_key: Option<String>,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Percent-encodes each segment of an object path
pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            service_role_key: config.service_role_key.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), StorageError> {
        match (self.base_url.as_deref(), self.service_role_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(StorageError::NotConfigured),
        }
    }

    fn object_url(&self, base_url: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            base_url,
            self.bucket,
            encode_object_path(path)
        )
    }

    async fn api_error(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let message = extract_error_message(&response.text().await.unwrap_or_default());
        error!(status = %status, error = %message, "Storage request failed");
        StorageError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl FileStorage for SupabaseStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let (base_url, key) = self.credentials()?;
        let size = data.len();

        let response = self
            .client
            .post(self.object_url(base_url, path))
            .header("apikey", key)
            .bearer_auth(key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        info!(path = %path, size_bytes = size, "Object uploaded to storage");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let (base_url, key) = self.credentials()?;

        let response = self
            .client
            .delete(self.object_url(base_url, path))
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {
                info!(path = %path, "Object deleted from storage");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, StorageError> {
        let (base_url, key) = self.credentials()?;

        let response = self
            .client
            .post(format!(
                "{}/storage/v1/object/sign/{}/{}",
                base_url,
                self.bucket,
                encode_object_path(path)
            ))
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({ "expiresIn": expires_in_secs }))
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        debug!(path = %path, "Signed URL issued");
        Ok(format!("{}/storage/v1{}", base_url, signed.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_object_path_keeps_separators() {
        assert_eq!(
            encode_object_path("candidates/c1/cv final.pdf"),
            "candidates/c1/cv%20final.pdf"
        );
        assert_eq!(encode_object_path("/a//b/"), "a/b");
    }

    #[tokio::test]
    async fn test_unconfigured_storage() {
        let config = crate::common::config::AppConfig::for_tests();
        let storage = SupabaseStorage::new(&config.supabase, Client::new());
        let result = storage.signed_url("x", 60).await;
        assert!(matches!(result, Err(StorageError::NotConfigured)));
    }
}
