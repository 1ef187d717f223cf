use std::time::{Duration, Instant};

use log::{debug, o};
use warp::{
    filters::multipart::FormData,
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::{BackendError, ValidationError};
use crate::ingestion::IngestionPipeline;
use crate::lookup::Lookup;
use crate::proximity::ProximityQuery;
use crate::routes::{
    query::{NearbyQuery, WhisperQuery},
    rejection::{Context, Rejection},
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn create(environment: Environment, content: FormData) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        let whisper = IngestionPipeline::new(&environment)
            .ingest_form(content)
            .await
            .map_err(error_handler)?;

        let location = environment.urls.whisper(whisper.id());
        let logger = environment.logger.new(o!("id" => whisper.id().to_string()));
        debug!(logger, "Sending response...");

        with_header(
            with_status(json(&whisper), StatusCode::CREATED),
            "location",
            location.as_str(),
        )
    }
}

pub async fn retrieve(environment: Environment, query: WhisperQuery) -> RouteResult {
    timed! {
        let WhisperQuery { whisper_id } = query;

        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(whisper_id.clone()), e);

        let whisper_id = whisper_id
            .clone()
            .ok_or_else(|| BackendError::from(ValidationError::new("whisperId", "is required")))
            .map_err(error_handler)?;

        let whisper = Lookup::new(&environment)
            .get_by_id(&whisper_id)
            .await
            .map_err(error_handler)?;

        with_status(json(&whisper), StatusCode::OK)
    }
}

pub async fn nearby(environment: Environment, query: NearbyQuery) -> RouteResult {
    timed! {
        let NearbyQuery { location, radius } = query;

        let error_handler =
            |e: BackendError| Rejection::new(Context::nearby(location.clone(), radius.clone()), e);

        let origin = location
            .clone()
            .ok_or_else(|| BackendError::from(ValidationError::new("location", "is required")))
            .map_err(error_handler)?;

        let whispers = ProximityQuery::new(&environment)
            .find_nearby(&origin, radius.as_deref())
            .await
            .map_err(error_handler)?;

        with_status(json(&whispers), StatusCode::OK)
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
