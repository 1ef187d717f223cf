use serde::Deserialize;

/// Parameters for looking up a single whisper. Missing values are
/// reported by the handler, not by the filter.
#[derive(Debug, Deserialize)]
pub struct WhisperQuery {
    #[serde(rename = "whisperId")]
    pub whisper_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub location: Option<String>,
    pub radius: Option<String>,
}
