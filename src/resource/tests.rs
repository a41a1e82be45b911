//! Tests for resource operations against a mock API.

use super::*;
use crate::config::{Config, PaginationConfig, RetryConfig};
use crate::error::{Error, ErrorCategory};
use crate::session::AuthHeader;
use serde_json::json;
use std::ops::Range;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        api_url: server.uri(),
        retry: RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        },
        ..Config::default()
    }
}

fn resource(server: &MockServer, kind: ResourceKind) -> Resource {
    let session = Session::new(config_for(server), None).unwrap();
    Resource::new(&session, kind).unwrap()
}

fn feature_page(total: u64, ids: Range<u64>) -> Value {
    json!({
        "type": "FeatureCollection",
        "total": total,
        "features": ids
            .map(|id| json!({"type": "Feature", "id": format!("alert-{id}")}))
            .collect::<Vec<_>>(),
    })
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

async fn mount_page(server: &MockServer, skip: u64, limit: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("skip", skip.to_string()))
        .and(query_param("limit", limit.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn ids(collection: &crate::aggregate::Collection) -> Vec<String> {
    collection
        .items
        .iter()
        .map(|f| f["id"].as_str().unwrap().to_string())
        .collect()
}

// -----------------------------------------------------------------------
// index
// -----------------------------------------------------------------------

#[tokio::test]
async fn maryland_alerts_merge_three_pages_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, feature_page(250, 0..100)).await;
    mount_page(&server, 100, 100, feature_page(250, 100..200)).await;
    mount_page(&server, 200, 50, feature_page(250, 200..250)).await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let filter = Filter::new().with("state", "Maryland").unwrap();
    let collection = alerts.index(&filter, IndexOptions::default()).await.unwrap();

    assert_eq!(collection.len(), 250);
    assert_eq!(collection.total, 250);
    assert_eq!(collection.pages, 3);
    assert!(!collection.is_truncated());

    let expected: Vec<String> = (0..250).map(|i| format!("alert-{i}")).collect();
    assert_eq!(ids(&collection), expected);

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| r.url.query().unwrap_or("").starts_with("state=Maryland&")),
        "filter must be on every page request"
    );
}

#[tokio::test]
async fn repeated_query_yields_identical_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feature_page(150, 0..100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feature_page(150, 100..150)))
        .mount(&server)
        .await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let first = alerts.index(&Filter::new(), IndexOptions::default()).await.unwrap();
    let second = alerts.index(&Filter::new(), IndexOptions::default()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn short_first_page_makes_no_further_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feature_page(900, 0..42)))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let pages = alerts
        .index_pages(&Filter::new(), IndexOptions::default())
        .await
        .unwrap();

    assert_eq!(pages.request_count(), 1);
    assert_eq!(pages.merge().unwrap().len(), 42);
}

#[tokio::test]
async fn first_page_failure_is_a_sizing_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let err = alerts
        .index(&Filter::new(), IndexOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Sizing);
    match err {
        Error::Sizing { query, source } => {
            assert!(query.ends_with("/alerts?limit=100&skip=0"));
            assert!(matches!(*source, Error::Http { status: 500, .. }));
        }
        other => panic!("expected sizing error, got {other:?}"),
    }
}

#[tokio::test]
async fn first_page_without_total_is_a_sizing_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .mount(&server)
        .await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let err = alerts
        .index(&Filter::new(), IndexOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::Sizing { source, .. } => {
            assert!(matches!(*source, Error::MalformedPage { .. }));
        }
        other => panic!("expected sizing error, got {other:?}"),
    }
}

#[tokio::test]
async fn later_page_failure_is_fatal_on_strict_path() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, feature_page(250, 0..100)).await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_page(&server, 200, 50, feature_page(250, 200..250)).await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let err = alerts
        .index(&Filter::new(), IndexOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PageFailed { skip: 100, .. }));
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[tokio::test]
async fn later_page_failure_can_be_tolerated() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, feature_page(250, 0..100)).await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_page(&server, 200, 50, feature_page(250, 200..250)).await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let pages = alerts
        .index_pages(&Filter::new(), IndexOptions::default())
        .await
        .unwrap();

    assert_eq!(pages.request_count(), 3);
    let failed = pages.failed_windows();
    assert_eq!(failed.len(), 1);
    assert_eq!((failed[0].skip(), failed[0].limit()), (100, 100));

    let (collection, failures) = pages.merge_partial();
    assert_eq!(collection.len(), 150);
    assert_eq!(failures.len(), 1);
    assert_eq!(ids(&collection)[100], "alert-200", "pages stay in window order");
}

#[tokio::test]
async fn declared_total_above_ceiling_is_truncated_not_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feature_page(1000, 0..100)))
        .expect(3)
        .mount(&server)
        .await;

    let config = Config {
        pagination: PaginationConfig {
            max_skip: 300,
            ..PaginationConfig::default()
        },
        ..config_for(&server)
    };
    let session = Session::new(config, None).unwrap();
    let alerts = Resource::new(&session, ResourceKind::Alerts).unwrap();

    let collection = alerts.index(&Filter::new(), IndexOptions::default()).await.unwrap();
    assert_eq!(collection.len(), 300);
    let truncation = collection.truncation.expect("truncation signal");
    assert_eq!(truncation.declared_total, 1000);
    assert_eq!(truncation.max_skip, 300);
}

#[tokio::test]
async fn starting_skip_and_limit_shape_the_windows() {
    let server = MockServer::start().await;
    mount_page(&server, 10, 40, feature_page(100, 10..50)).await;
    mount_page(&server, 50, 40, feature_page(100, 50..90)).await;
    mount_page(&server, 90, 10, feature_page(100, 90..100)).await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let collection = alerts
        .index(&Filter::new(), IndexOptions::default().skip(10).limit(40))
        .await
        .unwrap();
    assert_eq!(collection.len(), 90);
    assert_eq!(collection.pages, 3);
}

#[tokio::test]
async fn collections_use_results_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "results": [{"_id": "c1"}, {"_id": "c2"}],
        })))
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let collection = collections
        .index(&Filter::new(), IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.items[1]["_id"], "c2");
}

#[tokio::test]
async fn invalid_pagination_options_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let too_big = alerts
        .index(&Filter::new(), IndexOptions::default().limit(500))
        .await
        .unwrap_err();
    assert!(matches!(too_big, Error::InvalidQuery(_)));

    let past_ceiling = alerts
        .index(&Filter::new(), IndexOptions::default().skip(4001))
        .await
        .unwrap_err();
    assert_eq!(past_ceiling.category(), ErrorCategory::Usage);
}

// -----------------------------------------------------------------------
// show
// -----------------------------------------------------------------------

#[tokio::test]
async fn show_keeps_id_order_and_isolates_failures() {
    let server = MockServer::start().await;
    for id in ["cam-a", "cam-c"] {
        Mock::given(method("GET"))
            .and(path(format!("/cameras/{id}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"type": "Feature", "id": id})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/cameras/cam-b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let set = cameras
        .show(vec!["cam-a", "cam-b", "cam-c"], &Filter::new())
        .await;

    assert_eq!(set.len(), 3);
    assert_eq!(set.inputs(), vec!["cam-a", "cam-b", "cam-c"]);
    assert_eq!(set.failed().len(), 1);
    assert_eq!(set.failed()[0].input(), "cam-b");
    let found: Vec<&str> = set
        .results()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(found, vec!["cam-a", "cam-c"]);
    assert!(set.queries()[1].unwrap().path.ends_with("/cameras/cam-b"));
}

// -----------------------------------------------------------------------
// preview / show_image
// -----------------------------------------------------------------------

async fn mount_previews(server: &MockServer, failing: &str, media: Vec<u8>) {
    for i in 1..=5 {
        let id = format!("obs-{i}");
        let template = if id == failing {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/media/{id}.png", server.uri()))
        };
        Mock::given(method("GET"))
            .and(path(format!("/observations/{id}/preview")))
            .respond_with(template)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/media/obs-\d\.png$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(media))
        .mount(server)
        .await;
}

fn observation_ids() -> Vec<String> {
    (1..=5).map(|i| format!("obs-{i}")).collect()
}

#[tokio::test]
async fn preview_batch_with_one_transport_failure() {
    let server = MockServer::start().await;
    mount_previews(&server, "obs-3", png_bytes()).await;

    let out = tempdir().unwrap();
    let out_dir = out.path().join("previews");
    let options = MediaOptions::default()
        .output_dir(&out_dir)
        .decode_image(true);

    let observations = resource(&server, ResourceKind::Observations);
    let set = observations
        .preview(observation_ids(), &options)
        .await
        .unwrap();

    assert_eq!(set.len(), 5);
    let failed = set.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].input(), "obs-3");
    assert_eq!(failed[0].error().unwrap().category(), ErrorCategory::Transport);

    let succeeded: Vec<&String> = set.succeeded().iter().map(|r| r.input()).collect();
    assert_eq!(succeeded, vec!["obs-1", "obs-2", "obs-4", "obs-5"]);

    for content in set.results() {
        let file = content.output_file.as_ref().unwrap();
        assert_eq!(file.parent().unwrap(), out_dir);
        assert!(file.is_file());
        assert!(content.name.ends_with(".png"));
        let image = content.image.as_ref().unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
    }
    assert!(!out_dir.join("obs-3.png").exists());
}

#[tokio::test]
async fn undecodable_media_fails_its_record_but_keeps_the_file() {
    let server = MockServer::start().await;
    mount_previews(&server, "none", b"definitely not an image".to_vec()).await;

    let out = tempdir().unwrap();
    let options = MediaOptions::default()
        .output_dir(out.path())
        .decode_image(true);

    let observations = resource(&server, ResourceKind::Observations);
    let set = observations
        .preview(vec!["obs-1", "obs-2"], &options)
        .await
        .unwrap();

    assert_eq!(set.failed().len(), 2);
    assert!(
        set.errors()
            .iter()
            .all(|e| matches!(e, Some(Error::Image(_))))
    );
    assert!(out.path().join("obs-1.png").is_file());
}

#[tokio::test]
async fn preview_without_options_only_reports_names() {
    let server = MockServer::start().await;
    mount_previews(&server, "none", png_bytes()).await;

    let observations = resource(&server, ResourceKind::Observations);
    let set = observations
        .preview(vec!["obs-2"], &MediaOptions::default())
        .await
        .unwrap();

    let content = set.get(0).unwrap().content().unwrap();
    assert_eq!(content.name, "obs-2.png");
    assert_eq!(content.url.path(), "/media/obs-2.png");
    assert!(content.output_file.is_none());
    assert!(content.image.is_none());
    assert_eq!(content.bytes_len, png_bytes().len());
}

#[tokio::test]
async fn unusable_output_dir_fails_before_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempdir().unwrap();
    let blocker = out.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let observations = resource(&server, ResourceKind::Observations);
    let err = observations
        .preview(vec!["obs-1"], &MediaOptions::default().output_dir(&blocker))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn show_image_fetches_each_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/cameras/CAM1/images/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(2)
        .mount(&server)
        .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let set = cameras
        .show_image(
            "CAM1",
            vec!["2017-08-01T00:00:00.000Z", "2017-08-01T00:10:00.000Z"],
            &MediaOptions::default(),
        )
        .await
        .unwrap();

    assert!(set.all_ok());
    let names = set.column(|r| r.content().map(|c| c.name.clone()));
    assert_eq!(
        names,
        vec![
            Some("2017-08-01T00:00:00.000Z".to_string()),
            Some("2017-08-01T00:10:00.000Z".to_string()),
        ]
    );
}

#[tokio::test]
async fn parallelism_override_is_validated() {
    let server = MockServer::start().await;
    let cameras = resource(&server, ResourceKind::Cameras);
    assert_eq!(cameras.executor().max_parallelism(), 20);
    assert!(cameras.clone().with_max_parallelism(0).is_err());
    assert_eq!(
        cameras
            .with_max_parallelism(2)
            .unwrap()
            .executor()
            .max_parallelism(),
        2
    );
}

#[tokio::test]
async fn page_records_keep_method_and_window_params() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, feature_page(250, 0..100)).await;
    mount_page(&server, 100, 100, feature_page(250, 100..200)).await;
    mount_page(&server, 200, 50, feature_page(250, 200..250)).await;

    let alerts = resource(&server, ResourceKind::Alerts);
    let filter = Filter::new().with("state", "Maryland").unwrap();
    let pages = alerts
        .index_pages(&filter, IndexOptions::default())
        .await
        .unwrap();

    let requests: Vec<_> = pages.rest.queries().into_iter().map(Option::unwrap).collect();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == reqwest::Method::GET));
    assert!(requests.iter().all(|r| r.path.ends_with("/alerts")));
    assert_eq!(requests[0].params, "state=Maryland&limit=100&skip=100");
    assert_eq!(requests[1].params, "state=Maryland&limit=50&skip=200");
}

#[tokio::test]
async fn session_rejects_backoff_that_cannot_be_scheduled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        retry: RetryConfig {
            max_attempts: 2,
            backoff_multiplier: -1.0,
            ..RetryConfig::default()
        },
        ..config_for(&server)
    };
    match Session::new(config, None) {
        Err(Error::Config { key, .. }) => {
            assert_eq!(key.as_deref(), Some("retry.backoff_multiplier"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// image_times
// -----------------------------------------------------------------------

async fn mount_times(server: &MockServer, start: &str, times: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/cameras/CAM1/images"))
        .and(query_param("time", start))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "times": times })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn image_times_without_end_is_one_request() {
    let server = MockServer::start().await;
    mount_times(
        &server,
        "2017-08-01",
        &["2017-08-01T00:00:00.000Z", "2017-08-01T00:05:00.000Z"],
    )
    .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let times = cameras
        .image_times("CAM1", "2017-08-01", ImageTimesOptions::default())
        .await
        .unwrap();
    assert_eq!(times.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("time=2017-08-01&limit=500"));
}

#[tokio::test]
async fn image_times_walk_forward_until_end() {
    let server = MockServer::start().await;
    mount_times(
        &server,
        "2017-08-01T00:00:00.000Z",
        &[
            "2017-08-01T00:00:00.000Z",
            "2017-08-01T00:05:00.000Z",
            "2017-08-01T00:10:00.000Z",
        ],
    )
    .await;
    mount_times(
        &server,
        "2017-08-01T00:10:00.000Z",
        &[
            "2017-08-01T00:10:00.000Z",
            "2017-08-01T00:15:00.000Z",
            "2017-08-01T00:20:00.000Z",
        ],
    )
    .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let times = cameras
        .image_times(
            "CAM1",
            "2017-08-01T00:00:00.000Z",
            ImageTimesOptions::default()
                .end_time("2017-08-01T00:15:00.000Z")
                .limit(3),
        )
        .await
        .unwrap();

    assert_eq!(
        times,
        vec![
            "2017-08-01T00:00:00.000Z",
            "2017-08-01T00:05:00.000Z",
            "2017-08-01T00:10:00.000Z",
            "2017-08-01T00:15:00.000Z",
        ],
        "page boundary time appears once and the end is inclusive"
    );
}

#[tokio::test]
async fn image_times_stop_on_an_empty_page() {
    let server = MockServer::start().await;
    mount_times(&server, "2017-08-01", &[]).await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let times = cameras
        .image_times(
            "CAM1",
            "2017-08-01",
            ImageTimesOptions::default().end_time("2017-08-02"),
        )
        .await
        .unwrap();
    assert!(times.is_empty());
}

#[tokio::test]
async fn image_times_reject_bad_arguments_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    for options in [
        ImageTimesOptions::default().limit(0),
        ImageTimesOptions::default().limit(501),
        ImageTimesOptions::default().end_time("next tuesday"),
    ] {
        let err = cameras
            .image_times("CAM1", "2017-08-01", options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    let alerts = resource(&server, ResourceKind::Alerts);
    let err = alerts
        .image_times("CAM1", "2017-08-01", ImageTimesOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("only available on cameras"));
}

#[tokio::test]
async fn image_times_without_times_list_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cameras/CAM1/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": []})))
        .mount(&server)
        .await;

    let cameras = resource(&server, ResourceKind::Cameras);
    let err = cameras
        .image_times("CAM1", "2017-08-01", ImageTimesOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedPage { .. }));
}

// -----------------------------------------------------------------------
// collections
// -----------------------------------------------------------------------

fn collection_page(names: &[String]) -> Value {
    json!({
        "_id": "c-1",
        "name": "Ice Storm",
        "description": "Frames from the ice storm",
        "tags": ["ice", "storm"],
        "images": names,
    })
}

fn frame_names(prefix: &str, range: Range<u64>) -> Vec<String> {
    range.map(|i| format!("{prefix}_{i:04}.jpg")).collect()
}

#[tokio::test]
async fn collection_images_follow_marker_cursor() {
    let server = MockServer::start().await;
    let first = frame_names("ab12-CAM1", 0..200);
    let second = frame_names("ab12-CAM1", 200..230);

    Mock::given(method("GET"))
        .and(path("/collections/c-1"))
        .and(|req: &wiremock::Request| !req.url.query().unwrap_or("").contains("marker="))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_page(&first)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/c-1"))
        .and(query_param("marker", first[199].as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_page(&second)))
        .expect(1)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let names = collections
        .collection_images("c-1", &ImageNameFilter::default())
        .await
        .unwrap();

    assert_eq!(names.len(), 230);
    assert_eq!(names[0], first[0]);
    assert_eq!(names[229], second[29]);
}

#[tokio::test]
async fn collection_images_for_one_camera_stop_past_its_prefix() {
    let server = MockServer::start().await;
    let prefix = crate::utils::camera_image_prefix("CAM1");
    let mut page = frame_names(&prefix, 0..3);
    page.extend(frame_names("ffff-CAM9", 0..2));

    Mock::given(method("GET"))
        .and(path("/collections/c-1"))
        .and(query_param("marker", prefix.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_page(&page)))
        .expect(1)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let names = collections
        .collection_images("c-1", &ImageNameFilter::default().camera("CAM1"))
        .await
        .unwrap();
    assert_eq!(names, frame_names(&prefix, 0..3));
}

#[tokio::test]
async fn legacy_camera_names_match_without_hash() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/c-1"))
        .and(query_param("marker", "CAM1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(collection_page(&frame_names("CAM1", 0..4))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let names = collections
        .collection_images(
            "c-1",
            &ImageNameFilter::default().camera("CAM1").legacy_names(true),
        )
        .await
        .unwrap();
    assert_eq!(names.len(), 4);
}

#[tokio::test]
async fn create_collection_posts_form_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .and(body_string_contains("name=Ice+Storm"))
        .and(body_string_contains("tags=ice%2Cstorm"))
        .and(body_string_contains("access_token=tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"collection_id": "c-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(config_for(&server), Some(AuthHeader::bearer("tok-1"))).unwrap();
    let collections = Resource::new(&session, ResourceKind::Collections).unwrap();
    let id = collections
        .create_collection("Ice Storm", "frames", &["ice".to_string(), "storm".to_string()])
        .await
        .unwrap();
    assert_eq!(id, "c-9");
}

#[tokio::test]
async fn create_collection_without_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let err = collections
        .create_collection("Ice Storm", "frames", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedPage { .. }));
}

#[tokio::test]
async fn update_collection_needs_a_field() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/collections/c-1"))
        .and(body_string_contains("description=renamed"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let err = collections
        .update_collection("c-1", &CollectionFields::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    collections
        .update_collection("c-1", &CollectionFields::default().description("renamed"))
        .await
        .unwrap();
}

#[tokio::test]
async fn add_images_isolates_failed_assets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/c-1/images"))
        .and(body_string_contains("observation_id=obs-bad"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/c-1/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let assets = vec![
        ImageAsset::Camera {
            camera_id: "CAM1".to_string(),
        },
        ImageAsset::Observation {
            observation_id: "obs-bad".to_string(),
        },
        ImageAsset::CameraTime {
            camera_id: "CAM1".to_string(),
            time: "2017-08-01T00:00:00.000Z".to_string(),
        },
    ];

    let collections = resource(&server, ResourceKind::Collections);
    let set = collections.add_images("c-1", assets.clone()).await.unwrap();

    assert_eq!(set.inputs(), assets.iter().collect::<Vec<_>>());
    assert_eq!(set.failure_count(), 1);
    assert!(matches!(
        set.get(1).unwrap().error(),
        Some(Error::Http { status: 400, .. })
    ));
    assert_eq!(set.get(0).unwrap().query().unwrap().method, reqwest::Method::POST);
}

#[tokio::test]
async fn remove_images_deletes_each_name() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/collections/c-1/images/frame_\d\.jpg$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let set = collections
        .remove_images("c-1", vec!["frame_1.jpg", "frame_2.jpg", "frame_3.jpg"])
        .await
        .unwrap();
    assert!(set.all_ok());
    assert_eq!(set.inputs()[2], "frame_3.jpg");
}

#[tokio::test]
async fn collection_writes_are_refused_on_other_resources() {
    let server = MockServer::start().await;
    let cameras = resource(&server, ResourceKind::Cameras);
    assert!(matches!(
        cameras.remove_images("c-1", vec!["a"]).await,
        Err(Error::InvalidQuery(_))
    ));
    assert!(matches!(
        cameras.show_collection("c-1", 200, None).await,
        Err(Error::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn copy_collection_recreates_metadata_and_images() {
    let server = MockServer::start().await;
    let names = frame_names("ab12-CAM1", 0..3);
    Mock::given(method("GET"))
        .and(path("/collections/c-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_page(&names)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .and(body_string_contains("name=Ice+Storm+copy"))
        .and(body_string_contains("description=Frames+from+the+ice+storm"))
        .and(body_string_contains("tags=ice%2Cstorm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"collection_id": "c-2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/c-2/images"))
        .and(body_string_contains("collection_id=c-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let collections = resource(&server, ResourceKind::Collections);
    let copied = collections
        .copy_collection("c-1", "Ice Storm copy")
        .await
        .unwrap();

    assert_eq!(copied.id, "c-2");
    assert!(copied.images.all_ok());
    let copied_names = copied.images.column(|r| match r.input() {
        ImageAsset::CollectionImage { image, .. } => image.clone(),
        other => panic!("unexpected asset {other:?}"),
    });
    assert_eq!(copied_names, names);
}
