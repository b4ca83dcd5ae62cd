/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は公開, /session/ping と /access/ping はそれぞれの gate の内側
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{
    health::health,
    ping::{access_ping, session_ping},
};
use crate::middleware::auth::gate;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let session = Router::new().route("/session/ping", get(session_ping));
    let session = gate::apply(session, state.session_gate.clone());

    let access = Router::new().route("/access/ping", get(access_ping).post(access_ping));
    let access = gate::apply(access, state.access_gate.clone());

    Router::new()
        .route("/health", get(health))
        .merge(session)
        .merge(access)
}
