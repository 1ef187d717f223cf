use std::sync::Arc;

#[cfg(feature = "env_logging")]
use once_cell::sync::OnceCell;
use serde_json::Value;
use url::Url;
use warp::http::StatusCode;

use log::{o, Logger};
use whispr::db::memory::MemoryDb;
use whispr::environment::{Config, Environment};
use whispr::routes;
use whispr::store::memory::MemoryStore;
use whispr::urls::Urls;

#[cfg(feature = "env_logging")]
static SLOG_SCOPE_GUARD: OnceCell<log::GlobalLoggerGuard> = OnceCell::new();

const BOUNDARY: &str = "thisisaboundary1234";
const STORE_BASE_URL: &str = "http://localhost:9000/";

struct Fixture {
    environment: Environment,
    db: Arc<MemoryDb>,
    store: Arc<MemoryStore>,
}

/// A form part: name, optional filename and content type, and content.
struct FormPart<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    content: &'a [u8],
}

impl<'a> FormPart<'a> {
    fn field(name: &'a str, content: &'a str) -> Self {
        FormPart {
            name,
            filename: None,
            content_type: None,
            content: content.as_bytes(),
        }
    }

    fn file(filename: &'a str, content_type: &'a str, content: &'a [u8]) -> Self {
        FormPart {
            name: "mediaFile",
            filename: Some(filename),
            content_type: Some(content_type),
            content,
        }
    }
}

#[tokio::test]
async fn text_whispers_round_trip() {
    let fixture = make_fixture("text_whispers_round_trip");
    let api = routes::make_api(fixture.environment.clone());

    let response = create_whisper(&[
        FormPart::field("location", "51.5,-0.12"),
        FormPart::field("maxListens", "3"),
        FormPart::field("emotions", r#"["calm", "curious", "calm"]"#),
        FormPart::field("data", "hello from the river"),
    ])
    .reply(&api)
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("server-timing"));

    let created = parse_body(response.body());
    assert_eq!(created["dataType"], "text");
    assert_eq!(created["data"], "hello from the river");
    assert_eq!(created["location"], "51.5,-0.12");
    assert_eq!(created["maxListens"], 3);
    assert_eq!(created["amountListens"], 0);
    assert_eq!(created["emotions"], serde_json::json!(["calm", "curious"]));
    assert!(created.get("mediaUrl").is_none());

    let id = created["id"].as_str().expect("get ID from response").to_owned();

    let location = Url::parse(
        response
            .headers()
            .get("location")
            .expect("get location header")
            .to_str()
            .expect("convert location header to string"),
    )
    .expect("parse location header");
    assert_eq!(location.domain(), Some("www.example.com"));
    assert_eq!(location.path(), "/whisper");

    let response = warp::test::request()
        .path(&format!("{}?{}", location.path(), location.query().unwrap_or("")))
        .method("GET")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let fetched = parse_body(response.body());
    assert_eq!(fetched, created);
    assert_eq!(fetched["id"], id.as_str());
    assert_eq!(fixture.db.len(), 1);
}

#[tokio::test]
async fn media_whispers_are_uploaded() {
    let fixture = make_fixture("media_whispers_are_uploaded");
    let api = routes::make_api(fixture.environment.clone());

    let image = [0x89, b'P', b'N', b'G', 0x0d, 0x0a];
    let response = create_whisper(&[
        FormPart::field("location", "40.7,-74"),
        FormPart::field("maxListens", "1"),
        FormPart::field("emotions", "joy"),
        FormPart::file("skyline.png", "image/png", &image),
    ])
    .reply(&api)
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let created = parse_body(response.body());
    assert_eq!(created["dataType"], "image");
    assert!(created.get("data").is_none());

    let names = fixture.store.object_names();
    assert_eq!(names.len(), 1);
    assert_eq!(
        created["mediaUrl"],
        format!("{}whispers/{}", STORE_BASE_URL, names[0]).as_str()
    );

    let object = fixture.store.object(&names[0]).expect("get stored object");
    assert_eq!(object.content_type, "image/png");
    assert_eq!(object.raw, image.to_vec());
}

#[tokio::test]
async fn files_without_names_are_ignored() {
    let fixture = make_fixture("files_without_names_are_ignored");
    let api = routes::make_api(fixture.environment.clone());

    let response = create_whisper(&[
        FormPart::field("location", "1,1"),
        FormPart::field("maxListens", "2"),
        FormPart::field("emotions", "meh"),
        FormPart::field("mediaFile", ""),
        FormPart::field("data", "just text"),
    ])
    .reply(&api)
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(parse_body(response.body())["dataType"], "text");
    assert!(fixture.store.object_names().is_empty());
}

#[tokio::test]
async fn bad_submissions_fail() {
    let fixture = make_fixture("bad_submissions_fail");
    let api = routes::make_api(fixture.environment.clone());

    {
        let response = create_whisper(&[
            FormPart::field("location", "1,1"),
            FormPart::field("maxListens", "2"),
            FormPart::field("emotions", "dread"),
            FormPart::file("report.pdf", "application/pdf", b"%PDF-1.4"),
        ])
        .reply(&api)
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(response.body());
        assert_eq!(body["error"], "unsupported_media");
        assert_eq!(body["operation"], "create");
    }

    {
        let response = create_whisper(&[
            FormPart::field("location", "1,1"),
            FormPart::field("maxListens", "0"),
            FormPart::field("emotions", "dread"),
            FormPart::field("data", "hi"),
        ])
        .reply(&api)
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(response.body());
        assert_eq!(body["error"], "validation");
        assert_eq!(body["fields"], serde_json::json!(["maxListens"]));
    }

    {
        let response = create_whisper(&[
            FormPart::field("location", "1,1"),
            FormPart::field("maxListens", "2"),
            FormPart::field("emotions", "dread"),
        ])
        .reply(&api)
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(response.body());
        assert_eq!(body["fields"], serde_json::json!(["data", "mediaUrl"]));
    }

    assert!(fixture.db.is_empty());
    assert!(fixture.store.object_names().is_empty());
}

#[tokio::test]
async fn non_multipart_bodies_fail() {
    let fixture = make_fixture("non_multipart_bodies_fail");
    let filter = routes::make_create_route(fixture.environment.clone());

    // should fail because of `content-type`
    let response = warp::test::request()
        .path("/whisper")
        .method("POST")
        .header("content-type", "text/plain")
        .header("content-length", 0)
        .reply(&filter)
        .await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn store_failures_are_server_errors() {
    let fixture = make_fixture("store_failures_are_server_errors");
    fixture.store.set_unavailable(true);
    let api = routes::make_api(fixture.environment.clone());

    let response = create_whisper(&[
        FormPart::field("location", "1,1"),
        FormPart::field("maxListens", "2"),
        FormPart::field("emotions", "dread"),
        FormPart::file("clip.mp4", "video/mp4", b"not really a video"),
    ])
    .reply(&api)
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_body(response.body())["error"], "storage");
    assert!(fixture.db.is_empty());
}

#[tokio::test]
async fn lookups_report_bad_and_unknown_ids() {
    let fixture = make_fixture("lookups_report_bad_and_unknown_ids");
    let api = routes::make_api(fixture.environment.clone());

    for (path, status) in &[
        ("/whisper?whisperId=xyz", StatusCode::BAD_REQUEST),
        ("/whisper", StatusCode::BAD_REQUEST),
        (
            "/whisper?whisperId=6f2c7a0e-8d1b-4c4e-9b7a-2f1d3c5e7a90",
            StatusCode::NOT_FOUND,
        ),
    ] {
        let response = warp::test::request()
            .path(path)
            .method("GET")
            .reply(&api)
            .await;

        assert_eq!(response.status(), *status, "GET {}", path);
    }
}

#[tokio::test]
async fn nearby_whispers_are_listed() {
    let fixture = make_fixture("nearby_whispers_are_listed");
    let api = routes::make_api(fixture.environment.clone());

    for (location, data) in &[("3,4", "close"), ("30,40", "far"), ("-3,-4", "also close")] {
        let response = create_whisper(&[
            FormPart::field("location", location),
            FormPart::field("maxListens", "5"),
            FormPart::field("emotions", "calm"),
            FormPart::field("data", data),
        ])
        .reply(&api)
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = warp::test::request()
        .path("/whispers?location=0,0&radius=5")
        .method("GET")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response.body());
    let data = body
        .as_array()
        .expect("get nearby whispers as array")
        .iter()
        .map(|w| w["data"].as_str().expect("get whisper data").to_owned())
        .collect::<Vec<_>>();
    assert_eq!(data, vec!["close", "also close"]);

    let response = warp::test::request()
        .path("/whispers?location=0,0")
        .method("GET")
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response.body()).as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn nearby_queries_need_a_location() {
    let fixture = make_fixture("nearby_queries_need_a_location");
    let api = routes::make_api(fixture.environment.clone());

    for path in &["/whispers?location=abc", "/whispers?location=12", "/whispers"] {
        let response = warp::test::request()
            .path(path)
            .method("GET")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "GET {}", path);

        let body = parse_body(response.body());
        assert_eq!(body["fields"], serde_json::json!(["location"]));
    }

    assert_eq!(fixture.db.scan_count(), 0);
}

fn make_fixture(test_name: &str) -> Fixture {
    let logger = Arc::new(make_logger().new(o!("test" => test_name.to_owned())));

    let db = Arc::new(MemoryDb::new());
    let store = Arc::new(MemoryStore::new(
        "whispers",
        Url::parse(STORE_BASE_URL).expect("parse store URL"),
    ));
    let urls = Urls::new(Url::parse("https://www.example.com/").expect("parse base URL"))
        .expect("build URLs");

    let environment = Environment::new(
        logger,
        db.clone(),
        Arc::new(urls),
        store.clone(),
        Config::default(),
    );

    Fixture {
        environment,
        db,
        store,
    }
}

#[cfg(feature = "env_logging")]
fn make_logger() -> Logger {
    SLOG_SCOPE_GUARD
        .get_or_init(|| log::initialize_env_logger().expect("initialize slog-envlogger"));

    log::scoped()
}

#[cfg(not(feature = "env_logging"))]
fn make_logger() -> Logger {
    log::discard()
}

fn create_whisper(parts: &[FormPart]) -> warp::test::RequestBuilder {
    let body = make_multipart_body(BOUNDARY.as_bytes(), parts);

    warp::test::request()
        .path("/whisper")
        .method("POST")
        .header("content-type", multipart_content_type(BOUNDARY))
        .header("content-length", body.len())
        .body(body)
}

fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("parse response as JSON")
}

fn make_multipart_body(boundary: &[u8], parts: &[FormPart]) -> Vec<u8> {
    const NEWLINE: &[u8] = "\r\n".as_bytes();

    let boundary = boundary_with_leader(boundary);
    let mut body: Vec<u8> = vec![];

    for part in parts {
        body.extend_from_slice(&boundary);
        body.extend_from_slice(NEWLINE);

        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());

        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }

        body.extend_from_slice(NEWLINE);
        body.extend_from_slice(part.content);
        body.extend_from_slice(NEWLINE);
    }

    body.extend_from_slice(&boundary);
    body.extend_from_slice("--".as_bytes());
    body.extend_from_slice(NEWLINE);

    body
}

fn boundary_with_leader(boundary: &[u8]) -> Vec<u8> {
    const BOUNDARY_LEADER: &[u8] = &[b'-', b'-'];

    let parts = &[BOUNDARY_LEADER, boundary];
    parts.concat()
}

fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}
