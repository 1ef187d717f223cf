//! Decides whether an attached file is an image, a video, or something
//! we don't accept.
//!
//! Resolution is an ordered table: the declared content type wins unless
//! it is missing or generic, then the filename extension is consulted,
//! and failing both the file is treated as `application/octet-stream`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref IMAGE_TYPES: HashSet<&'static str> =
        ["image/jpeg", "image/png", "image/gif", "image/webp"]
            .iter()
            .copied()
            .collect();

    static ref VIDEO_TYPES: HashSet<&'static str> =
        ["video/mp4", "video/webm", "video/ogg", "video/quicktime"]
            .iter()
            .copied()
            .collect();

    static ref TYPES_BY_EXTENSION: HashMap<&'static str, &'static str> = [
        ("avif", "image/avif"),
        ("bmp", "image/bmp"),
        ("gif", "image/gif"),
        ("heic", "image/heic"),
        ("jpe", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("png", "image/png"),
        ("svg", "image/svg+xml"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("webp", "image/webp"),
        ("avi", "video/x-msvideo"),
        ("m4v", "video/mp4"),
        ("mkv", "video/x-matroska"),
        ("mov", "video/quicktime"),
        ("mp4", "video/mp4"),
        ("ogv", "video/ogg"),
        ("qt", "video/quicktime"),
        ("webm", "video/webm"),
        ("m4a", "audio/mp4"),
        ("mp3", "audio/mpeg"),
        ("oga", "audio/ogg"),
        ("ogg", "audio/ogg"),
        ("wav", "audio/wav"),
        ("json", "application/json"),
        ("pdf", "application/pdf"),
        ("txt", "text/plain"),
    ]
    .iter()
    .copied()
    .collect();
}

/// The kind of media a whisper can carry.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// The outcome of classifying a file. Every variant carries the content
/// type that was resolved for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Classification {
    Supported { kind: MediaKind, content_type: String },
    Unsupported { content_type: String },
}

impl Classification {
    pub fn content_type(&self) -> &str {
        match self {
            Classification::Supported { content_type, .. }
            | Classification::Unsupported { content_type } => content_type,
        }
    }
}

/// Classifies a file from its declared content type and its filename.
/// Never fails; anything unrecognized is `Unsupported`.
pub fn classify(declared: Option<&str>, filename: &str) -> Classification {
    let content_type = resolve_content_type(declared, filename);

    let kind = if IMAGE_TYPES.contains(content_type.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_TYPES.contains(content_type.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    };

    match kind {
        Some(kind) => Classification::Supported { kind, content_type },
        None => Classification::Unsupported { content_type },
    }
}

/// Picks the content type to trust for a file.
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    if let Some(essence) = declared.and_then(essence_of) {
        if essence != mime::APPLICATION_OCTET_STREAM.essence_str() {
            return essence;
        }
    }

    type_for_filename(filename)
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.essence_str())
        .to_owned()
}

/// Looks up the content type for a filename's extension.
pub fn type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = extension_of(filename)?.to_lowercase();

    TYPES_BY_EXTENSION.get(extension.as_str()).copied()
}

/// The extension of a filename, without the dot.
pub fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Reduces a content type header to `type/subtype`, dropping parameters.
fn essence_of(declared: &str) -> Option<String> {
    let declared = declared.trim();

    if declared.is_empty() {
        return None;
    }

    declared
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_lowercase())
}
