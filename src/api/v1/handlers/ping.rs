/*
 * Responsibility
 * - gate の内側に置く保護された handler
 * - ここに到達した = gate が forward した
 */
use axum::Json;

use crate::api::v1::dto::ping::PingResponse;

pub async fn session_ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        scope: "session",
    })
}

pub async fn access_ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        scope: "access",
    })
}
