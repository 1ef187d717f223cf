use url::{ParseError, Url};
use uuid::Uuid;

/// The path whispers are created and looked up under.
pub const WHISPER_PATH: &str = "whisper";

/// The path nearby whispers are listed under.
pub const WHISPERS_PATH: &str = "whispers";

/// Convenience wrapper for URL generation functions.
#[derive(Clone, Debug)]
pub struct Urls {
    /// Where single whispers are looked up, without a query.
    whisper: Url,
}

impl Urls {
    pub fn new(base: Url) -> Result<Self, ParseError> {
        let whisper = with_trailing_slash(base).join(WHISPER_PATH)?;

        Ok(Urls { whisper })
    }

    /// The URL a single whisper can be retrieved from.
    pub fn whisper(&self, id: &Uuid) -> Url {
        let mut url = self.whisper.clone();
        url.query_pairs_mut()
            .append_pair("whisperId", &id.to_string());

        url
    }
}

/// The public URL of an object: `base + bucket + "/" + object_name`.
pub fn object_url(base: &Url, bucket: &str, object_name: &str) -> Result<Url, ParseError> {
    base.join(&format!("{}/{}", bucket, object_name))
}

/// Makes sure relative URLs are resolved below the base's path rather
/// than next to its last segment.
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}
