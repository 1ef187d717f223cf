use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            error: self.error.kind(),
            message: format!("{}", self.error),
            fields: self.error.fields().map(|fields| fields.to_vec()),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) error: &'static str,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fields: Option<Vec<&'static str>>,
}

/// The operation a rejection came from and the input it was given.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Context {
    Create,
    Retrieve {
        #[serde(rename = "whisperId")]
        whisper_id: Option<String>,
    },
    Nearby {
        location: Option<String>,
        radius: Option<String>,
    },
}

impl Context {
    pub fn create() -> Context {
        Context::Create
    }

    pub fn retrieve(whisper_id: Option<String>) -> Context {
        Context::Retrieve { whisper_id }
    }

    pub fn nearby(location: Option<String>, radius: Option<String>) -> Context {
        Context::Nearby { location, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, Rejection};
    use crate::errors::{BackendError, ValidationError};

    #[test]
    fn rejections_flatten_their_context() {
        let rejection = Rejection::new(
            Context::nearby(Some("abc".to_owned()), None),
            BackendError::from(ValidationError::new("location", "bad format")),
        );

        let json = serde_json::to_value(&rejection.flatten()).expect("serialize rejection");

        assert_eq!(
            json,
            serde_json::json!({
                "operation": "nearby",
                "location": "abc",
                "radius": null,
                "error": "validation",
                "message": "invalid location: bad format",
                "fields": ["location"],
            })
        );
    }

    #[test]
    fn errors_without_fields_omit_them() {
        let rejection = Rejection::new(
            Context::create(),
            BackendError::UnsupportedMedia {
                content_type: "application/pdf".to_owned(),
            },
        );

        let json = serde_json::to_value(&rejection.flatten()).expect("serialize rejection");

        assert_eq!(json["operation"], "create");
        assert_eq!(json["error"], "unsupported_media");
        assert!(json.get("fields").is_none());
    }
}
