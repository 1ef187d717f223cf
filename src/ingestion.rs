//! Turns a whisper submission into a stored whisper: classify and upload
//! any attached media, check the record, then insert it.

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, o, warn, Logger};
use tokio::time::{timeout, timeout_at, Instant};
use uuid::Uuid;
use warp::filters::multipart::FormData;

use crate::coordinates::Coordinates;
use crate::emotions::parse_emotions;
use crate::environment::{Config, Environment, SafeDb, SafeStore};
use crate::errors::{BackendError, DbError, StoreError, ValidationError};
use crate::io::{parse_submission, MediaUpload, Submission};
use crate::media::{self, Classification};
use crate::whisper::{NewWhisper, Payload, Whisper};

pub struct IngestionPipeline {
    logger: Arc<Logger>,
    db: Arc<SafeDb>,
    store: Arc<SafeStore>,
    config: Config,
}

impl IngestionPipeline {
    pub fn new(environment: &Environment) -> Self {
        IngestionPipeline {
            logger: environment.logger.clone(),
            db: environment.db.clone(),
            store: environment.store.clone(),
            config: environment.config,
        }
    }

    /// Reads a submitted form and stores the whisper it describes.
    /// Reading the form counts against the ingestion deadline.
    pub async fn ingest_form(&self, form: FormData) -> Result<Whisper, BackendError> {
        self.ingest_from(parse_submission(form)).await
    }

    async fn ingest_from<F>(&self, reading: F) -> Result<Whisper, BackendError>
    where
        F: Future<Output = Result<Submission, BackendError>>,
    {
        let deadline = Instant::now() + self.config.ingestion_timeout;

        debug!(self.logger, "Reading submission...");
        let submission = match timeout_at(deadline, reading).await {
            Ok(submission) => submission?,
            Err(_) => return Err(BackendError::SubmissionTimedOut),
        };

        self.ingest_until(submission, deadline).await
    }

    /// Stores a new whisper. Nothing is inserted unless every check
    /// passes, and media uploaded for a whisper that then fails is
    /// deleted again.
    pub async fn ingest(&self, submission: Submission) -> Result<Whisper, BackendError> {
        let deadline = Instant::now() + self.config.ingestion_timeout;

        self.ingest_until(submission, deadline).await
    }

    async fn ingest_until(
        &self,
        submission: Submission,
        deadline: Instant,
    ) -> Result<Whisper, BackendError> {
        let Submission {
            location,
            max_listens,
            emotions,
            data,
            media,
        } = submission;

        let max_listens = parse_max_listens(max_listens.as_deref())?;
        let emotions = parse_emotions(emotions.as_deref().unwrap_or_default());

        if self.config.require_emotions && emotions.is_empty() {
            return Err(ValidationError::new("emotions", "at least one emotion is required").into());
        }

        let location = parse_location(location.as_deref())?;

        let (payload, object_name) = match media {
            Some(upload) => {
                let (payload, object_name) = self.save_media(upload, deadline).await?;
                (payload, Some(object_name))
            }
            None => match data {
                Some(text) if !text.trim().is_empty() => (Payload::Text(text), None),
                _ => {
                    return Err(ValidationError::for_fields(
                        vec!["data", "mediaUrl"],
                        "no media and no text",
                    )
                    .into())
                }
            },
        };

        let logger = match &object_name {
            Some(name) => Arc::new(self.logger.new(o!("object_name" => name.clone()))),
            None => self.logger.clone(),
        };

        let whisper = NewWhisper::new(location, payload, max_listens, emotions);

        if let Err(e) = whisper.validate(self.config.require_emotions) {
            self.discard_object(&logger, object_name.as_deref()).await;
            return Err(e.into());
        }

        debug!(logger, "Writing whisper to database...");
        let result = match timeout_at(deadline, self.db.insert(whisper)).await {
            Ok(result) => result,
            Err(_) => Err(DbError::TimedOut),
        };

        match result {
            Ok(whisper) => {
                debug!(logger, "Stored whisper"; "id" => %whisper.id());
                Ok(whisper)
            }
            // The write may still have committed, so the media stays.
            Err(DbError::TimedOut) => {
                warn!(logger, "Timed out writing whisper; keeping its media");
                Err(BackendError::Persistence(DbError::TimedOut))
            }
            Err(e) => {
                self.discard_object(&logger, object_name.as_deref()).await;
                Err(BackendError::Persistence(e))
            }
        }
    }

    /// Classifies and uploads a file, returning the payload that points
    /// at it and the name it was saved under.
    async fn save_media(
        &self,
        upload: MediaUpload,
        deadline: Instant,
    ) -> Result<(Payload, String), BackendError> {
        let MediaUpload {
            filename,
            declared_type,
            raw,
        } = upload;

        debug!(self.logger, "Classifying media..."; "filename" => &filename, "declared_type" => ?declared_type);
        let (kind, content_type) = match media::classify(declared_type.as_deref(), &filename) {
            Classification::Supported { kind, content_type } => (kind, content_type),
            Classification::Unsupported { content_type } => {
                return Err(BackendError::UnsupportedMedia { content_type })
            }
        };

        let object_name = object_name_for(&filename);
        let logger = self.logger.new(o!("object_name" => object_name.clone()));

        debug!(logger, "Saving media to store..."; "bucket" => self.store.bucket(), "content_type" => &content_type, "size" => raw.len());
        let saved = match timeout_at(deadline, self.store.save(&object_name, &content_type, raw)).await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::TimedOut),
        };
        let saved = saved.map_err(BackendError::Storage)?;
        debug!(logger, "Saved media"; "bucket" => &saved.bucket, "checksum" => ?saved.checksum);

        let url = match self.store.get_url(&object_name) {
            Ok(url) => url,
            Err(source) => {
                let logger = Arc::new(logger);
                self.discard_object(&logger, Some(&object_name)).await;

                return Err(BackendError::Storage(StoreError::UrlGenerationFailed {
                    object_name,
                    source,
                }));
            }
        };

        Ok((Payload::Media { kind, url }, object_name))
    }

    /// Deletes an uploaded object that no whisper will point at. Failure
    /// is logged and otherwise ignored.
    async fn discard_object(&self, logger: &Arc<Logger>, object_name: Option<&str>) {
        let object_name = match object_name {
            Some(name) => name,
            None => return,
        };

        warn!(logger, "Deleting orphaned media...");

        let result = match timeout(self.config.query_timeout, self.store.delete(object_name)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::TimedOut),
        };

        if let Err(e) = result {
            error!(logger, "Failed to delete orphaned media"; "error" => %e);
        }
    }
}

/// Reads `maxListens` as a whole number of at least 1.
pub fn parse_max_listens(raw: Option<&str>) -> Result<i32, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::new("maxListens", "is required"))?;

    let value: i32 = raw
        .parse()
        .map_err(|_| ValidationError::new("maxListens", format!("{:?} is not a whole number", raw)))?;

    if value < 1 {
        return Err(ValidationError::new("maxListens", "must be at least 1"));
    }

    Ok(value)
}

/// Reads `location` as a point on the globe.
pub fn parse_location(raw: Option<&str>) -> Result<Coordinates, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::new("location", "is required"))?;

    let location: Coordinates = raw
        .parse()
        .map_err(|e| ValidationError::new("location", format!("{:?}: {}", raw, e)))?;

    if !location.in_range() {
        return Err(ValidationError::new("location", "coordinates are out of range"));
    }

    Ok(location)
}

/// A fresh, unique object name that keeps the file's extension.
fn object_name_for(filename: &str) -> String {
    let id = Uuid::new_v4();

    match media::extension_of(filename) {
        Some(extension) => format!("{}.{}", id, extension),
        None => id.to_string(),
    }
}
