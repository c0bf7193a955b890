use anyhow::Context;
use async_trait::async_trait;
use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::{ReportError, Result};
use crate::stores::ObjectStore;

/// Google Cloud Storage implementation of the object store seam.
#[derive(Clone)]
pub struct GcsObjectStore {
    client: GcsClient,
    bucket: String,
}

impl GcsObjectStore {
    /// Initialise from the mounted service account key.
    pub async fn new(bucket: impl Into<String>) -> anyhow::Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .context("Failed to initialise GCS client with service account")?;

        Ok(Self {
            client: GcsClient::new(config),
            bucket: bucket.into(),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, path = %path))]
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256_checksum = hex::encode(hasher.finalize());

        let upload_type = UploadType::Simple(Media {
            name: path.to_string().into(),
            content_type: content_type.to_string().into(),
            content_length: Some(bytes.len() as u64),
        });

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                bytes.to_vec(),
                &upload_type,
            )
            .await
            .map_err(|e| ReportError::Storage(format!("failed to upload {path}: {e}")))?;

        info!(
            file_size = bytes.len(),
            sha256 = %sha256_checksum,
            "uploaded report artifact"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let disposition = format!("attachment; filename=\"{file_name}\"");

        self.client
            .signed_url(
                &self.bucket,
                path,
                None,
                None,
                SignedURLOptions {
                    method: SignedURLMethod::GET,
                    expires: ttl,
                    query_parameters: vec![(
                        "response-content-disposition".to_string(),
                        vec![disposition],
                    )]
                    .into_iter()
                    .collect(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ReportError::Storage(format!("failed to sign URL for {path}: {e}")))
    }
}
