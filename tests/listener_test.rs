mod common;

use authflow::listener::serve;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use common::{TestEnv, FAKE_TOKEN, RESTART_URL};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt; // for `oneshot`

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:55510")
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_home_page() {
    let env = TestEnv::new();
    let app = env.router();

    let response = app.oneshot(get("/home")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    assert_eq!(response.headers()[header::EXPIRES], "0");

    let body = body_text(response).await;
    assert!(body.contains("callback listener is running"));
    assert!(body.contains("test_app"));
    assert!(body.contains("href=\"https://provider.test/developers/apps\""));
    assert!(body.contains("(no documentation found)"));
}

#[tokio::test]
async fn test_home_page_lists_docs() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.doc_dir()).unwrap();
    std::fs::write(env.doc_dir().join("guide.txt"), "hello").unwrap();
    let app = env.router();

    let response = app.oneshot(get("/home")).await.unwrap();

    let body = body_text(response).await;
    assert!(body.contains("http://localhost:55510/doc/guide.txt"));
}

#[tokio::test]
async fn test_latest_url_recorded() {
    let env = TestEnv::new();
    let app = env.router();

    app.oneshot(get("/home?check=1")).await.unwrap();

    assert_eq!(env.latest_url.load(), "http://localhost:55510/home?check=1");
}

#[tokio::test]
async fn test_latest_url_failure_does_not_fail_request() {
    let env = TestEnv::new();
    // A directory where the artifact file should be makes every write fail
    std::fs::create_dir(env.latest_url.path()).unwrap();
    let app = env.router();

    let response = app.oneshot(get("/home")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_finish_route_success() {
    let env = TestEnv::new();
    env.sessions.set("T").unwrap();
    let app = env.router();

    let response = app
        .oneshot(get("/dropbox-auth-finish?code=abc&state=T"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Congratulations"));
    assert_eq!(env.credentials.load().unwrap().token, FAKE_TOKEN);
    assert_eq!(
        env.latest_url.load(),
        "http://localhost:55510/dropbox-auth-finish?code=abc&state=T"
    );
}

#[tokio::test]
async fn test_finish_route_csrf_mismatch() {
    let env = TestEnv::new();
    env.sessions.set("A").unwrap();
    let app = env.router();

    let response = app
        .oneshot(get("/dropbox-auth-finish?code=abc&state=B"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!env.credentials.exists());
    assert_eq!(env.sessions.get(), None);
}

#[tokio::test]
async fn test_finish_route_without_query() {
    let env = TestEnv::new();
    env.sessions.set("T").unwrap();
    let app = env.router();

    let response = app.oneshot(get("/dropbox-auth-finish")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_finish_route_not_approved_redirects_home() {
    let env = TestEnv::new();
    env.provider
        .fail_redirect_with(authflow::provider::ProviderError::NotApproved("denied".into()));
    env.sessions.set("T").unwrap();
    let app = env.router();

    let response = app
        .oneshot(get("/dropbox-auth-finish?error=access_denied&state=T"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], RESTART_URL);
}

#[tokio::test]
async fn test_doc_txt_wrapped_in_pre() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.doc_dir()).unwrap();
    std::fs::write(env.doc_dir().join("notes.txt"), "a < b").unwrap();
    let app = env.router();

    let response = app.oneshot(get("/doc/notes.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<pre>a &lt; b</pre>"));
}

#[tokio::test]
async fn test_doc_html_passed_through() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.doc_dir()).unwrap();
    std::fs::write(env.doc_dir().join("index.html"), "<p>raw</p>").unwrap();
    let app = env.router();

    let response = app.oneshot(get("/doc/index.html")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(body_text(response).await, "<p>raw</p>");
}

#[tokio::test]
async fn test_doc_missing_and_traversal() {
    let env = TestEnv::new();
    std::fs::write(env.dir.path().join("secret.txt"), "secret").unwrap();
    let app = env.router();

    let response = app.clone().oneshot(get("/doc/missing.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/doc/..%2Fsecret.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_doc_index_redirects_home() {
    let env = TestEnv::new();
    let app = env.router();

    let response = app.oneshot(get("/doc/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/home");
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let env = TestEnv::new();
    let app = env.router();

    let response = app.oneshot(get("/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("unsupported request /nope"));
}

#[tokio::test]
async fn test_non_get_rejected() {
    let env = TestEnv::new();
    let app = env.router();

    for uri in ["/home", "/nope"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
    }
}

#[tokio::test]
async fn test_serve_until_cancelled() {
    let env = TestEnv::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(serve(listener, env.router(), shutdown.clone()));

    let response = reqwest::get(format!("http://{addr}/home")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("callback listener is running"));
    assert_eq!(env.latest_url.load(), format!("http://{addr}/home"));

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_finish_complete() {
    let env = TestEnv::new();
    env.provider.set_finish_delay(Duration::from_millis(300));
    env.sessions.set("T").unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(serve(listener, env.router(), shutdown.clone()));

    let request = tokio::spawn(reqwest::get(format!(
        "http://{addr}/dropbox-auth-finish?code=abc&state=T"
    )));
    // Cancel only once the exchange is under way
    while env.provider.finish_redirect_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    shutdown.cancel();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Congratulations"));
    assert_eq!(env.credentials.load().unwrap().token, FAKE_TOKEN);
    handle.await.unwrap().unwrap();
}
