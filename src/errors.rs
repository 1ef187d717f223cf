use rusoto_core::request::TlsError;
use rusoto_core::RusotoError;
use rusoto_s3::{CreateBucketError, DeleteObjectError, HeadBucketError, PutObjectError};
use thiserror::Error;
use uuid::Uuid;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The media attached to a whisper is of a type we don't accept.
    #[error("unsupported file type: {content_type}; please upload common image or video formats")]
    UnsupportedMedia { content_type: String },

    /// The object store failed.
    #[error("failed to store media: {0}")]
    Storage(#[source] StoreError),

    /// The repository failed while writing or looking up a single
    /// whisper.
    #[error("failed to save or retrieve whisper: {0}")]
    Persistence(#[source] DbError),

    /// The repository failed while scanning whispers.
    #[error("failed to read whispers: {0}")]
    Query(#[source] DbError),

    /// The identifier is well-formed but nothing matches it.
    #[error("whisper {0} not found")]
    NotFound(Uuid),

    /// The multipart body could not be read.
    #[error("malformed form submission")]
    MalformedFormSubmission,

    /// The client did not finish sending its submission in time.
    #[error("timed out reading the submission")]
    SubmissionTimedOut,
}

impl BackendError {
    /// A short, stable name for the kind of error, used in responses.
    pub fn kind(&self) -> &'static str {
        use BackendError::*;

        match self {
            Validation(_) => "validation",
            MalformedFormSubmission => "malformed_submission",
            SubmissionTimedOut => "submission_timeout",
            UnsupportedMedia { .. } => "unsupported_media",
            Storage(_) => "storage",
            Persistence(_) => "persistence",
            Query(_) => "query",
            NotFound(_) => "not_found",
        }
    }

    /// The offending fields, for client errors that have them.
    pub fn fields(&self) -> Option<&[&'static str]> {
        match self {
            BackendError::Validation(e) => Some(e.fields.as_slice()),
            _ => None,
        }
    }
}

/// Describes input that failed validation, naming the offending fields.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("invalid {}: {reason}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            fields: vec![field],
            reason: reason.into(),
        }
    }

    pub fn for_fields(fields: Vec<&'static str>, reason: impl Into<String>) -> Self {
        Self {
            fields,
            reason: reason.into(),
        }
    }
}

/// Enumerates errors returned by the store subsystem.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote server rejected or failed the upload.
    #[error("upload failed")]
    UploadFailed { source: RusotoError<PutObjectError> },

    /// The remote server failed to delete an object.
    #[error("deletion failed")]
    DeleteFailed { source: RusotoError<DeleteObjectError> },

    /// The bucket could not be checked for existence.
    #[error("could not check bucket")]
    BucketCheckFailed { source: RusotoError<HeadBucketError> },

    /// The bucket could not be created.
    #[error("could not create bucket")]
    BucketCreationFailed { source: RusotoError<CreateBucketError> },

    /// The public URL of a saved object could not be built.
    #[error("could not generate URL for {object_name}")]
    UrlGenerationFailed {
        object_name: String,
        source: url::ParseError,
    },

    /// The HTTP client for the store could not be created.
    #[error("could not create store client")]
    ClientCreationFailed { source: TlsError },

    /// The configured public URL base is not a URL.
    #[error("invalid public URL base {url:?}")]
    InvalidPublicUrl { url: String, source: url::ParseError },

    /// The store did not answer before the deadline.
    #[error("object store timed out")]
    TimedOut,

    /// The store is not reachable.
    #[error("object store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Enumerates errors returned by the repository.
#[derive(Debug, Error)]
pub enum DbError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },

    /// The repository did not answer before the deadline.
    #[error("database timed out")]
    TimedOut,

    /// A stored row could not be turned into a whisper.
    #[error("whisper {id} is malformed: {reason}")]
    MalformedRecord { id: Uuid, reason: String },

    /// The repository is not reachable.
    #[error("database unavailable: {reason}")]
    Unavailable { reason: String },
}
