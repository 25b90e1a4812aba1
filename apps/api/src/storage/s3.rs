use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::storage::{DocumentStore, StoreError};

/// Resume files in S3 (MinIO locally).
#[derive(Clone)]
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::Document(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StoreError::DocumentMissing(key.to_string())
                } else {
                    StoreError::Document(format!("S3 download failed: {service_error}"))
                }
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Document(format!("S3 body read failed: {e}")))?;

        Ok(data.into_bytes())
    }
}
