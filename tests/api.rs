use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use quaderno::application::analytics::AnalyticsLimits;
use quaderno::infra::http::{HttpState, build_router};

fn router() -> Router {
    build_router(HttpState::new(AnalyticsLimits::default()))
}

fn track_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build track request")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn stats(router: &Router) -> Value {
    let request = Request::builder()
        .uri("/api/stats")
        .body(Body::empty())
        .expect("build stats request");
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn track_accepts_event_and_reports_success() {
    let router = router();
    let (status, body) = send(&router, track_request(json!({"path": "/notes/a"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn empty_store_reports_zeroes_and_root_top_page() {
    let body = stats(&router()).await;

    assert_eq!(
        body,
        json!({
            "totalViews": 0,
            "distinctIPs": 0,
            "uniqueVisitors": 0,
            "topPage": "/",
            "topPages": [],
            "recentVisitors": [],
        })
    );
}

#[tokio::test]
async fn repeated_path_is_counted_and_ranked_first() {
    let router = router();
    for _ in 0..3 {
        send(&router, track_request(json!({"path": "/coding/rust"}))).await;
    }
    send(&router, track_request(json!({"path": "/notes/intro"}))).await;

    let body = stats(&router).await;
    assert_eq!(body["totalViews"], 4);
    assert_eq!(body["topPage"], "/coding/rust");
    assert_eq!(body["topPages"][0], json!({"path": "/coding/rust", "count": 3}));
    assert_eq!(body["topPages"][1], json!({"path": "/notes/intro", "count": 1}));
}

#[tokio::test]
async fn forwarded_header_wins_over_peer_address() {
    let router = router();
    let peer: SocketAddr = "192.0.2.1:55000".parse().expect("peer addr");

    let mut forwarded = track_request(json!({"path": "/a"}));
    forwarded
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().expect("header"));
    forwarded.extensions_mut().insert(ConnectInfo(peer));
    send(&router, forwarded).await;

    let mut direct = track_request(json!({"path": "/b"}));
    direct.extensions_mut().insert(ConnectInfo(peer));
    send(&router, direct).await;

    send(&router, track_request(json!({"path": "/c"}))).await;

    let body = stats(&router).await;
    let recent = body["recentVisitors"].as_array().expect("recent visitors");
    assert_eq!(recent[0]["ip"], "unknown");
    assert_eq!(recent[0]["path"], "/c");
    assert_eq!(recent[1]["ip"], "192.0.2.1");
    assert_eq!(recent[2]["ip"], "203.0.113.7");
    assert_eq!(body["distinctIPs"], 3);
}

#[tokio::test]
async fn client_supplied_ip_and_timestamp_are_overwritten() {
    let router = router();
    let mut request = track_request(json!({
        "path": "/career",
        "ip": "1.2.3.4",
        "timestamp": "1999-01-01T00:00:00Z",
    }));
    request
        .headers_mut()
        .insert("x-real-ip", "198.51.100.4".parse().expect("header"));
    send(&router, request).await;

    let body = stats(&router).await;
    let visitor = &body["recentVisitors"][0];
    assert_eq!(visitor["ip"], "198.51.100.4");
    assert_ne!(visitor["timestamp"], "1999-01-01T00:00:00Z");
}

#[tokio::test]
async fn unique_visitors_match_distinct_ips() {
    let router = router();
    let visits = [
        ("v-1", "203.0.113.1"),
        ("v-2", "203.0.113.1"),
        ("v-3", "203.0.113.2"),
    ];
    for (visitor, ip) in visits {
        let mut request = track_request(json!({"path": "/", "visitorId": visitor}));
        request
            .headers_mut()
            .insert("x-forwarded-for", ip.parse().expect("header"));
        send(&router, request).await;
    }

    let body = stats(&router).await;
    assert_eq!(body["distinctIPs"], 2);
    assert_eq!(body["uniqueVisitors"], 2);
}

#[tokio::test]
async fn event_without_path_is_omitted_from_ranking() {
    let router = router();
    send(&router, track_request(json!({"referrer": "https://example.com"}))).await;

    let body = stats(&router).await;
    assert_eq!(body["totalViews"], 1);
    assert_eq!(body["topPage"], "/");
    assert_eq!(body["topPages"], json!([]));
    assert!(body["recentVisitors"][0].get("path").is_none());
}

#[tokio::test]
async fn store_keeps_only_the_newest_ten_thousand_visits() {
    let router = router();
    for index in 0..10_001 {
        send(&router, track_request(json!({"path": format!("/p/{index}")}))).await;
    }

    let body = stats(&router).await;
    assert_eq!(body["totalViews"], 10_000);
    assert_eq!(body["topPages"].as_array().expect("top pages").len(), 10);
    assert_eq!(body["recentVisitors"][0]["path"], "/p/10000");
    assert_eq!(body["recentVisitors"].as_array().expect("recent").len(), 20);
    // Every path ties at one view; the oldest retained visit ranks first.
    assert_eq!(body["topPages"][0]["path"], "/p/1");
}

#[tokio::test]
async fn malformed_json_is_rejected_without_recording() {
    let router = router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("build request");
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = stats(&router).await;
    assert_eq!(body["totalViews"], 0);
}

#[tokio::test]
async fn non_object_json_body_is_a_bad_request() {
    let router = router();
    let (status, body) = send(&router, track_request(json!(["/a"]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON body"}));
    assert_eq!(stats(&router).await["totalViews"], 0);
}

#[tokio::test]
async fn plain_text_beacon_is_recorded() {
    let router = router();
    let beacon = Request::builder()
        .method(Method::POST)
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
        .body(Body::from(r#"{"path":"/notes/beacon"}"#))
        .expect("build beacon");
    let (status, body) = send(&router, beacon).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let opaque = Request::builder()
        .method(Method::POST)
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("not json at all"))
        .expect("build opaque beacon");
    let (status, _) = send(&router, opaque).await;
    assert_eq!(status, StatusCode::OK);

    let body = stats(&router).await;
    assert_eq!(body["totalViews"], 2);
    assert_eq!(body["topPage"], "/notes/beacon");
    assert!(body["recentVisitors"][0].get("path").is_none());
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build health request");
    let (status, body) = send(&router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let timestamp = body["timestamp"].as_str().expect("timestamp string");
    assert!(
        time::OffsetDateTime::parse(timestamp, &time::format_description::well_known::Rfc3339)
            .is_ok()
    );
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/track")
        .header(header::ORIGIN, "https://notebook.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("build preflight");
    let response = router().oneshot(request).await.expect("router responds");

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .expect("build request");
    let response = router().oneshot(request).await.expect("router responds");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-42")
    );
}
