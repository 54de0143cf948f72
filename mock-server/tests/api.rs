use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, register, Routes, ServerInit, ServerReply};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn routes_with(init: ServerInit, reply: ServerReply) -> Routes {
    let routes = Routes::default();
    register(&routes, init, reply).await;
    routes
}

#[tokio::test]
async fn unregistered_route_is_404() {
    let resp = app(Routes::default())
        .oneshot(Request::builder().uri("/nothing").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn method_is_part_of_the_key() {
    let routes = routes_with(ServerInit::get("/only-get"), ServerReply::default()).await;
    let resp = app(routes)
        .oneshot(Request::builder().method("POST").uri("/only-get").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn json_reply_echoes_the_request() {
    let routes = routes_with(
        ServerInit::new("post", "/echo?id=1"),
        ServerReply::json(json!({"ok": true})),
    )
    .await;
    let resp = app(routes)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo?id=1")
                .header(http::header::CONTENT_TYPE, "application/json")
                .header("x-token", "abc")
                .body(r#"{"a":1}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json; charset=utf-8");
    let echo = body_json(resp).await;
    assert_eq!(echo["url"], "/echo?id=1");
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["headers"]["x-token"], "abc");
    assert_eq!(echo["data"], json!({"ok": true}));
    assert_eq!(echo["body"], r#"{"a":1}"#);
}

#[tokio::test]
async fn text_reply_with_status_and_headers() {
    let routes = routes_with(
        ServerInit::get("/text"),
        ServerReply::text("plain body").status(304).header("X-Custom", "1"),
    )
    .await;
    let resp = app(routes)
        .oneshot(Request::builder().uri("/text").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(resp.headers()["x-custom"], "1");
}

#[tokio::test]
async fn text_reply_returns_raw_data() {
    let routes = routes_with(ServerInit::get("/raw"), ServerReply::text("hello")).await;
    let resp = app(routes)
        .oneshot(Request::builder().uri("/raw").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.as_ref(), b"hello");
}

#[tokio::test]
async fn full_url_registration_matches_path_requests() {
    let routes = routes_with(ServerInit::get("http://127.0.0.1:1234/abs"), ServerReply::text("x")).await;
    let resp = app(routes)
        .oneshot(Request::builder().uri("/abs").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn cors_headers_follow_init() {
    let mut init = ServerInit::new("PUT", "/cors");
    init.cors = Some(false);
    init.methods = Some("PUT,OPTIONS".to_string());
    init.credentials = Some(true);
    let routes = routes_with(init, ServerReply::default()).await;

    let resp = app(routes.clone())
        .oneshot(Request::builder().method("OPTIONS").uri("/cors").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
    assert_eq!(resp.headers()["access-control-allow-methods"], "PUT,OPTIONS");
    assert_eq!(resp.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn routes_can_be_registered_over_http() {
    let routes = Routes::default();
    let registration = json!({
        "init": {"url": "/late", "method": "DELETE"},
        "reply": {"type": "text", "data": "gone", "status": 202}
    });
    let resp = app(routes.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__mock/routes")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(registration.to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app(routes)
        .oneshot(Request::builder().method("DELETE").uri("/late").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(body_bytes(resp).await.as_ref(), b"gone");
}

#[tokio::test]
async fn out_of_range_delay_replies_immediately() {
    let routes = routes_with(ServerInit::get("/forever").delay(1e20), ServerReply::text("now")).await;
    let resp = app(routes)
        .oneshot(Request::builder().uri("/forever").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.as_ref(), b"now");
}
