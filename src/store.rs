use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rusoto_core::RusotoError;
use rusoto_s3::{
    CreateBucketRequest, DeleteObjectRequest, HeadBucketError, HeadBucketRequest,
    PutObjectRequest, S3Client, StreamingBody, S3,
};
use url::{ParseError, Url};

use crate::errors::StoreError;
use crate::urls;

pub mod memory;

/// What the store reports about an object it saved.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub size: u64,

    /// The store's checksum (ETag) for the object, if it reported one.
    pub checksum: Option<String>,
}

/// Saves named binary objects in a single bucket.
pub trait Store: Send + Sync {
    /// The bucket objects are saved in.
    fn bucket(&self) -> &str;

    /// Deletes the given object.
    fn delete(&self, object_name: &str) -> BoxFuture<Result<(), StoreError>>;

    /// Gets the public URL for the given object.
    fn get_url(&self, object_name: &str) -> Result<Url, ParseError>;

    /// Saves the given data under the given name.
    fn save(
        &self,
        object_name: &str,
        content_type: &str,
        raw: Vec<u8>,
    ) -> BoxFuture<Result<StoredObject, StoreError>>;
}

/// A store that saves its data to S3 or an S3-compatible server.
pub struct S3Store {
    client: Arc<S3Client>,
    acl: Option<String>,
    bucket: String,
    cache_control: Option<String>,
    base_url: Url,
}

impl S3Store {
    /// Creates a new instance.
    pub fn new(
        client: Arc<S3Client>,
        acl: Option<String>,
        bucket: String,
        cache_control: Option<String>,
        base_url: Url,
    ) -> Self {
        Self {
            client,
            acl,
            bucket,
            cache_control,
            base_url: urls::with_trailing_slash(base_url),
        }
    }

    /// Reads the store's settings from `S3_*` and `WHISPR_S3_*`
    /// environment variables. Panics if a required one is missing.
    pub fn from_env() -> Result<Self, StoreError> {
        use rusoto_core::request::HttpClient;
        use rusoto_core::Region;
        use rusoto_credential::StaticProvider;

        use crate::config::{get_optional_variable, get_variable, get_variable_or};

        let access_key = get_variable("S3_ACCESS_KEY");
        let secret_access_key = get_variable("S3_SECRET_ACCESS_KEY");
        let endpoint = get_variable("S3_ENDPOINT");

        let region = Region::Custom {
            name: get_variable_or("S3_REGION_NAME", "us-east-1"),
            endpoint: endpoint.clone(),
        };

        let bucket = get_variable_or("S3_BUCKET_NAME", "whispers");
        let acl = get_optional_variable("WHISPR_S3_ACL");
        let cache_control = get_optional_variable("WHISPR_S3_CACHE_CONTROL");

        let http_client =
            HttpClient::new().map_err(|source| StoreError::ClientCreationFailed { source })?;

        let base_url = public_base_url(get_optional_variable("S3_PUBLIC_URL_BASE"), &endpoint)?;

        let client = Arc::new(S3Client::new_with(
            http_client,
            StaticProvider::new_minimal(access_key, secret_access_key),
            region,
        ));

        Ok(S3Store::new(client, acl, bucket, cache_control, base_url))
    }

    /// Creates the bucket unless it already exists. Returns whether it
    /// had to be created.
    pub async fn ensure_bucket(&self) -> Result<bool, StoreError> {
        let request = HeadBucketRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        match self.client.head_bucket(request).await {
            Ok(_) => Ok(false),
            Err(RusotoError::Service(HeadBucketError::NoSuchBucket(_))) => {
                self.create_bucket().await.map(|_| true)
            }
            Err(RusotoError::Unknown(ref response)) if response.status.as_u16() == 404 => {
                self.create_bucket().await.map(|_| true)
            }
            Err(source) => Err(StoreError::BucketCheckFailed { source }),
        }
    }

    async fn create_bucket(&self) -> Result<(), StoreError> {
        let request = CreateBucketRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .create_bucket(request)
            .await
            .map(|_| ())
            .map_err(|source| StoreError::BucketCreationFailed { source })
    }
}

impl Store for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn delete(&self, object_name: &str) -> BoxFuture<Result<(), StoreError>> {
        delete(self, object_name.to_owned()).boxed()
    }

    fn get_url(&self, object_name: &str) -> Result<Url, ParseError> {
        urls::object_url(&self.base_url, &self.bucket, object_name)
    }

    fn save(
        &self,
        object_name: &str,
        content_type: &str,
        raw: Vec<u8>,
    ) -> BoxFuture<Result<StoredObject, StoreError>> {
        upload(self, object_name.to_owned(), content_type.to_owned(), raw).boxed()
    }
}

/// The URL objects are served from: the configured base if there is
/// one, otherwise the store's endpoint.
fn public_base_url(configured: Option<String>, endpoint: &str) -> Result<Url, StoreError> {
    let url = configured.unwrap_or_else(|| endpoint.to_owned());

    Url::parse(&url).map_err(|source| StoreError::InvalidPublicUrl { url, source })
}

async fn delete(store: &S3Store, key: String) -> Result<(), StoreError> {
    let request = DeleteObjectRequest {
        bucket: store.bucket.clone(),
        key,
        ..Default::default()
    };

    let result = store.client.delete_object(request).await;

    result
        .map(|_| ())
        .map_err(|source| StoreError::DeleteFailed { source })
}

async fn upload(
    store: &S3Store,
    key: String,
    content_type: String,
    raw: Vec<u8>,
) -> Result<StoredObject, StoreError> {
    let size = raw.len() as u64;

    let request = PutObjectRequest {
        acl: store.acl.clone(),
        body: Some(StreamingBody::from(raw)),
        bucket: store.bucket.clone(),
        cache_control: store.cache_control.clone(),
        content_length: Some(size as i64),
        content_type: Some(content_type),
        key: key.clone(),
        ..Default::default()
    };

    let result = store.client.put_object(request).await;

    match result {
        Ok(output) => Ok(StoredObject {
            bucket: store.bucket.clone(),
            key,
            size,
            checksum: output.e_tag,
        }),
        Err(source) => Err(StoreError::UploadFailed { source }),
    }
}
