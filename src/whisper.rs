use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::coordinates::Coordinates;
use crate::errors::ValidationError;
use crate::media::MediaKind;

/// What kind of content a whisper carries.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Image,
    Video,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Image => "image",
            DataType::Video => "video",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(DataType::Text),
            "image" => Ok(DataType::Image),
            "video" => Ok(DataType::Video),
            other => Err(UnknownDataType(other.to_owned())),
        }
    }
}

impl From<MediaKind> for DataType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => DataType::Image,
            MediaKind::Video => DataType::Video,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownDataType(pub String);

impl fmt::Display for UnknownDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown data type {:?}", self.0)
    }
}

/// The content of a whisper: inline text or an uploaded file.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Text(String),
    Media { kind: MediaKind, url: Url },
}

impl Payload {
    pub fn data_type(&self) -> DataType {
        match self {
            Payload::Text(_) => DataType::Text,
            Payload::Media { kind, .. } => DataType::from(*kind),
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Media { .. } => None,
        }
    }

    pub fn media_url(&self) -> Option<&Url> {
        match self {
            Payload::Text(_) => None,
            Payload::Media { url, .. } => Some(url),
        }
    }
}

/// A whisper that has been assembled but not yet persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewWhisper {
    pub(crate) location: Coordinates,
    pub(crate) payload: Payload,
    pub(crate) max_listens: i32,
    pub(crate) emotions: Vec<String>,
}

impl NewWhisper {
    pub fn new(
        location: Coordinates,
        payload: Payload,
        max_listens: i32,
        emotions: Vec<String>,
    ) -> Self {
        NewWhisper {
            location,
            payload,
            max_listens,
            emotions,
        }
    }

    pub fn location(&self) -> &Coordinates {
        &self.location
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn max_listens(&self) -> i32 {
        self.max_listens
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    /// Checks the record as a whole. Every offending field is named in
    /// the error.
    pub fn validate(&self, require_emotions: bool) -> Result<(), ValidationError> {
        let mut fields = vec![];
        let mut reasons = vec![];

        if !self.location.in_range() {
            fields.push("location");
            reasons.push("coordinates are out of range");
        }

        match &self.payload {
            Payload::Text(text) if text.trim().is_empty() => {
                fields.push("data");
                fields.push("mediaUrl");
                reasons.push("no media and no text");
            }
            Payload::Media { url, .. } if url.as_str().is_empty() => {
                fields.push("mediaUrl");
                reasons.push("media URL is empty");
            }
            _ => {}
        }

        if self.max_listens < 1 {
            fields.push("maxListens");
            reasons.push("must be at least 1");
        }

        if require_emotions && self.emotions.is_empty() {
            fields.push("emotions");
            reasons.push("at least one emotion is required");
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::for_fields(fields, reasons.join("; ")))
        }
    }

    /// The whisper as the repository stored it.
    pub fn persisted(self, id: Uuid, created_at: OffsetDateTime) -> Whisper {
        let data_type = self.payload.data_type();
        let (data, media_url) = match self.payload {
            Payload::Text(text) => (Some(text), None),
            Payload::Media { url, .. } => (None, Some(url)),
        };

        Whisper {
            id,
            location: self.location,
            data_type,
            data,
            media_url,
            max_listens: self.max_listens,
            amount_listens: 0,
            emotions: self.emotions,
            created_at,
        }
    }
}

/// A single whisper in the repository.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Whisper {
    /// The ID assigned when it was stored.
    pub(crate) id: Uuid,

    /// Where it was left.
    pub(crate) location: Coordinates,

    /// Whether it is text or media.
    pub(crate) data_type: DataType,

    /// The text, for text whispers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<String>,

    /// The public URL of the uploaded file, for media whispers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) media_url: Option<Url>,

    /// How many times it may be listened to.
    pub(crate) max_listens: i32,

    /// How many times it has been listened to.
    pub(crate) amount_listens: i32,

    pub(crate) emotions: Vec<String>,

    /// When it was stored.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) created_at: OffsetDateTime,
}

impl Whisper {
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn location(&self) -> &Coordinates {
        &self.location
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn media_url(&self) -> Option<&Url> {
        self.media_url.as_ref()
    }

    pub fn max_listens(&self) -> i32 {
        self.max_listens
    }

    pub fn amount_listens(&self) -> i32 {
        self.amount_listens
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Whether it still has listens left.
    pub fn is_eligible(&self) -> bool {
        self.amount_listens < self.max_listens
    }
}
