//! Object store client / 对象存储客户端
//!
//! Narrow capability interface the scan engine talks through, plus the S3
//! implementation over rust-s3. Region resolution is an unauthenticated
//! request against the bucket's virtual-host endpoint, reading the
//! `x-amz-bucket-region` response header; a missing header means the bucket
//! does not exist.

use std::time::Duration;

use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::Region;

use crate::config::CredentialMode;
use crate::error::StoreError;

/// Deadline for the unauthenticated region request; rust-s3 calls carry
/// that crate's own request timeout.
const REGION_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability interface consumed by the engine / 引擎消费的能力接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve the bucket's region, or `NotFound` / `Transport`.
    async fn resolve_region(&self, bucket: &str) -> Result<String, StoreError>;

    /// Open a handle to an existing bucket in the given region.
    async fn open_bucket(&self, bucket: &str, region: &str)
        -> Result<Box<dyn BucketHandle>, StoreError>;
}

/// Operations on one opened bucket / 单个已打开存储桶的操作
#[async_trait]
pub trait BucketHandle: Send + Sync {
    /// All object keys in the bucket. Finite, fetched in one enumeration.
    async fn list_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Size in bytes of a single object's metadata.
    async fn object_size(&self, key: &str) -> Result<u64, StoreError>;

    /// Upload a blob under `key`.
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<(), StoreError>;
}

/// Public URL of an object / 对象的公开URL
pub fn object_url(region: &str, bucket: &str, key: &str) -> String {
    format!("http://s3.{}.amazonaws.com/{}/{}", region, bucket, key)
}

/// S3 implementation of the capability interface / S3实现
#[derive(Debug)]
pub struct S3ObjectStore {
    http: reqwest::Client,
    credentials: Credentials,
}

impl S3ObjectStore {
    /// Build the HTTP client and resolve credentials once. A credential
    /// failure surfaces here, before any worker starts, not per bucket.
    pub fn new(mode: &CredentialMode) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(REGION_RESOLVE_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let credentials = match mode {
            CredentialMode::Anonymous => Credentials::anonymous(),
            CredentialMode::Profile(name) => Credentials::from_profile(Some(name)),
        }
        .map_err(|e| StoreError::Auth(e.to_string()))?;
        Ok(Self { http, credentials })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn resolve_region(&self, bucket: &str) -> Result<String, StoreError> {
        let url = format!("http://{}.s3.amazonaws.com/", bucket);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        match response.headers().get("x-amz-bucket-region") {
            Some(value) => value
                .to_str()
                .map(str::to_string)
                .map_err(|_| StoreError::Transport("malformed region header".to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    async fn open_bucket(
        &self,
        bucket: &str,
        region: &str,
    ) -> Result<Box<dyn BucketHandle>, StoreError> {
        let credentials = self.credentials.clone();
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: format!("https://s3.{}.amazonaws.com", region),
        };
        let bucket = Bucket::new(bucket, region, credentials)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Box::new(S3BucketHandle { bucket }))
    }
}

struct S3BucketHandle {
    bucket: Box<Bucket>,
}

/// 401/403 carry an access-denied body, everything else is transport
fn classify_list_error(e: S3Error) -> StoreError {
    match e {
        S3Error::HttpFailWithBody(401 | 403, body) => StoreError::Auth(body),
        other => StoreError::Transport(other.to_string()),
    }
}

#[async_trait]
impl BucketHandle for S3BucketHandle {
    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let pages = self
            .bucket
            .list(String::new(), None)
            .await
            .map_err(classify_list_error)?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }

    async fn object_size(&self, key: &str) -> Result<u64, StoreError> {
        let (head, code) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| StoreError::ObjectAccess(e.to_string()))?;
        if !(200..300).contains(&code) {
            return Err(StoreError::ObjectAccess(format!("head returned {}", code)));
        }
        Ok(head.content_length.unwrap_or(0).max(0) as u64)
    }

    async fn put_object(&self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        let response = self
            .bucket
            .put_object(key, body)
            .await
            .map_err(|e| StoreError::WriteProbe(e.to_string()))?;
        let code = response.status_code();
        if (200..300).contains(&code) {
            Ok(())
        } else {
            Err(StoreError::WriteProbe(format!("upload returned {}", code)))
        }
    }
}
