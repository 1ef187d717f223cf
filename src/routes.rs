use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The maximum form data size to accept. This should be enforced by
/// the HTTP gateway, so on the Rust side it’s set to an unreasonably
/// large number.
const MAX_CONTENT_LENGTH: u64 = 2 * 1024 * 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation(_) | MalformedFormSubmission | UnsupportedMedia { .. } => {
            StatusCode::BAD_REQUEST
        }
        NotFound(_) => StatusCode::NOT_FOUND,
        SubmissionTimedOut => StatusCode::REQUEST_TIMEOUT,
        Storage(_) | Persistence(_) | Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Lets browsers on any origin call the API.
pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE", "OPTIONS"])
        .allow_headers(vec!["Origin", "Content-Type", "Accept", "Authorization"])
}

mod internal {
    use warp::filters::multipart::form;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{get as g, path as p, post, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::urls::{WHISPERS_PATH, WHISPER_PATH};

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any().map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_create_route => create, rt; p(WHISPER_PATH), end(), post(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_retrieve_route => retrieve, rt; p(WHISPER_PATH), end(), g(), query::<q::WhisperQuery>());
    route!(make_nearby_route => nearby, rt; p(WHISPERS_PATH), end(), g(), query::<q::NearbyQuery>());

    /// Every route of the main server, with rejections turned into JSON
    /// errors and CORS applied.
    pub fn make_api(environment: Environment) -> BoxedFilter<(Box<dyn Reply>,)> {
        let logger = environment.logger.clone();

        make_create_route(environment.clone())
            .or(make_retrieve_route(environment.clone()))
            .unify()
            .or(make_nearby_route(environment))
            .unify()
            .recover(move |r| super::format_rejection(logger.clone(), r))
            .map(|reply| Box::new(reply) as Box<dyn Reply>)
            .with(super::cors())
            .map(|reply| Box::new(reply) as Box<dyn Reply>)
            .boxed()
    }
}
