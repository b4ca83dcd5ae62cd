//! Shared helpers: a wiremock authority and a gate-protected router.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use session_gate::{
    app::build_router,
    config::Config,
    services::auth::RemoteValidator,
    state::AppState,
};
use tower::ServiceExt;

/// Builds the full host router against `endpoint` with extra env-style settings.
pub fn app(endpoint: &str, settings: &[(&str, &str)]) -> Router {
    let mut env: HashMap<String, String> = settings
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert("AUTH_ENDPOINT".into(), endpoint.into());

    let config = Config::from_lookup(|key| env.get(key).cloned()).expect("test config");
    let validator = RemoteValidator::new(config.authority.clone()).expect("authority client");
    let state = AppState::new(&config, Arc::new(validator));
    build_router(state, &config)
}

pub fn get(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(Body::empty()).expect("request build")
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response: Response<Body> = app.clone().oneshot(request).await.expect("request execution");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body extraction");
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
