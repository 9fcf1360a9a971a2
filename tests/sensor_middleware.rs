use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use page_sensor::{
    sensor_middleware, ApacheHandler, HandlerRegistry, Instrumentation, ManualClock, Sensor,
    SensorConfig, SharedBuffer,
};
use tower::ServiceExt;

struct Harness {
    router: Router,
    log: SharedBuffer,
}

fn harness(handlers: &[&str], require_urls: &[&str], threshold_ms: u64) -> Harness {
    let log = SharedBuffer::new();
    let clock = Arc::new(ManualClock::new());

    let mut registry = HandlerRegistry::with_defaults();
    let sink = log.clone();
    registry.register("apache", move || Arc::new(ApacheHandler::new(Box::new(sink.clone()))));

    let config = SensorConfig {
        handlers: handlers.iter().map(|h| h.to_string()).collect(),
        require_urls: require_urls.iter().map(|u| u.to_string()).collect(),
        time_condition_ms: threshold_ms,
    };
    let instrumentation =
        Arc::new(Instrumentation::new(config, registry).with_clock(clock.clone()));

    let router = Router::new()
        .route("/slow", get(slow_page))
        .route("/fast", get(fast_page))
        .route("/course/view.php", get(fast_page))
        .with_state(clock)
        .layer(middleware::from_fn_with_state(instrumentation, sensor_middleware));

    Harness { router, log }
}

/// Three db queries of 10, 20 and 40 ms, then 80 ms of rendering.
async fn slow_page(State(clock): State<Arc<ManualClock>>, sensor: Sensor) -> &'static str {
    for ms in [10, 20, 40] {
        let _query = sensor.task("db_query");
        clock.advance(Duration::from_millis(ms));
    }
    {
        let _auth = sensor.task_once("auth_check");
        clock.advance(Duration::from_millis(5));
    }
    clock.advance(Duration::from_millis(75));
    "slow"
}

async fn fast_page(State(clock): State<Arc<ManualClock>>, sensor: Sensor) -> &'static str {
    let _render = sensor.task("render");
    clock.advance(Duration::from_millis(50));
    "fast"
}

async fn get_status(router: Router, uri: &str, user: Option<&str>) -> StatusCode {
    let mut request = Request::builder().uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    let response = router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

#[tokio::test]
async fn fast_page_is_not_reported() {
    let h = harness(&["apache"], &[], 100);
    assert_eq!(get_status(h.router, "/fast", Some("7")).await, StatusCode::OK);
    assert!(h.log.contents().is_empty());
}

#[tokio::test]
async fn slow_page_is_reported_with_task_stats() {
    let h = harness(&["apache"], &[], 100);
    assert_eq!(get_status(h.router, "/slow", Some("7")).await, StatusCode::OK);
    assert_eq!(
        h.log.lines(),
        ["[MENTOR_SENSOR] /slow 7 TOTAL(150),db_query(70,3,2,10,40),auth_check(5)"]
    );
}

#[tokio::test]
async fn allowlisted_url_is_reported_even_when_fast() {
    let h = harness(&["apache"], &["view.php"], 10_000);
    let status = get_status(h.router, "/course/view.php?lang=en&id=12", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.log.lines(),
        ["[MENTOR_SENSOR] /course/view.php?id=12 NULL TOTAL(50),render(50,1,5,50,50)"]
    );
}

#[tokio::test]
async fn unknown_handler_leaves_request_untouched() {
    let h = harness(&["apache", "does_not_exist"], &[], 0);
    assert_eq!(get_status(h.router, "/slow", None).await, StatusCode::OK);
    assert!(h.log.contents().is_empty());
}

#[tokio::test]
async fn responses_carry_timing_headers() {
    let h = harness(&["apache"], &[], 100);
    let response = h
        .router
        .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-response-time-us"));
    let server_timing = response.headers()["server-timing"].to_str().unwrap();
    assert!(server_timing.starts_with("total;dur="));
}

#[tokio::test]
async fn routes_without_middleware_use_a_disabled_sensor() {
    async fn probe(sensor: Sensor) -> String {
        let _timer = sensor.task("anything");
        sensor.is_enabled().to_string()
    }

    let router = Router::new().route("/", get(probe));
    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"false");
}
