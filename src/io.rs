use std::io;

use bytes::{Buf, Bytes};
use futures::stream::{Stream, StreamExt, TryStreamExt};
use warp::multipart::{FormData, Part};

use crate::errors::BackendError;

/// A file attached to a submission.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaUpload {
    /// The name the client gave the file.
    pub filename: String,

    /// The content type the client declared for the part, if any.
    pub declared_type: Option<String>,

    pub raw: Vec<u8>,
}

/// The raw fields of a whisper submission, before any validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submission {
    pub location: Option<String>,
    pub max_listens: Option<String>,
    pub emotions: Option<String>,
    pub data: Option<String>,
    pub media: Option<MediaUpload>,
}

/// Reads the parts of a whisper submission. Unknown parts are ignored,
/// and a `mediaFile` part without a filename counts as no file.
pub async fn parse_submission(form: FormData) -> Result<Submission, BackendError> {
    futures::pin_mut!(form);

    let mut submission = Submission::default();

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|_| BackendError::MalformedFormSubmission)?
    {
        let name = part.name().to_owned();

        match name.as_str() {
            "location" => submission.location = Some(part_as_string(part).await?),
            "maxListens" => submission.max_listens = Some(part_as_string(part).await?),
            "emotions" => submission.emotions = Some(part_as_string(part).await?),
            "data" => submission.data = Some(part_as_string(part).await?),
            "mediaFile" => {
                let filename = part.filename().map(str::to_owned);
                let declared_type = part.content_type().map(str::to_owned);
                let raw = part_as_vec(part).await?;

                submission.media = filename
                    .filter(|f| !f.is_empty())
                    .map(|filename| MediaUpload {
                        filename,
                        declared_type,
                        raw,
                    });
            }
            _ => {}
        }
    }

    Ok(submission)
}

/// Collects chunks of [`Part`].
pub async fn part_as_vec(raw: Part) -> Result<Vec<u8>, BackendError> {
    let chunks = part_as_stream(raw)
        .try_collect::<Vec<Bytes>>()
        .await
        .map_err(|_| BackendError::MalformedFormSubmission)?;

    Ok(chunks.concat())
}

/// Collects a [`Part`] as UTF-8 text.
pub async fn part_as_string(raw: Part) -> Result<String, BackendError> {
    let bytes = part_as_vec(raw).await?;

    String::from_utf8(bytes).map_err(|_| BackendError::MalformedFormSubmission)
}

/// Collects raw data from [`Part`].
pub fn part_as_stream(raw: Part) -> impl Stream<Item = Result<Bytes, io::Error>> {
    raw.stream().map(|r| {
        r.map(|mut x| x.copy_to_bytes(x.remaining()))
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "could not retrieve chunk"))
    })
}
