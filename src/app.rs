/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config読み込み → validator 生成 → Router 組み立て
 * - Middleware の適用 (credential gate / request-id / trace など)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::{RemoteValidator, TlsVerification, trust};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,session_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;
    init_panic_hook(!config.app_env.is_production());

    let authority = &config.authority;
    tracing::info!(
        endpoint = %authority.endpoint,
        encoding = ?authority.encoding,
        tls = ?authority.tls,
        missing_credentials = ?config.missing_credentials,
        session_header = %config.headers.session,
        access_header = %config.headers.access_token,
        "starting gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    if authority.tls == TlsVerification::Skip && !trust::is_loopback_authority(&authority.endpoint)
    {
        tracing::error!(
            endpoint = %authority.endpoint,
            "AUTH_TLS_VERIFY=skip is only honored for https://localhost; every validation call will fail"
        );
    }

    let validator =
        RemoteValidator::new(config.authority.clone()).context("building authority client")?;
    let state = AppState::new(&config, Arc::new(validator));
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    middleware::http::apply(router, config)
}
