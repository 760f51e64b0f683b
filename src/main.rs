// =============================================================================
// fuel-price-server - 燃料価格サーバー
// =============================================================================
//
// ガソリンスタンドを登録すると、スタンドごとに2つのタスクが動き出します。
//
// ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
// │  generator      │────▶│   チャネル      │────▶│  updater        │
// │  (価格モデル)   │◀────│   (容量1+返信)  │◀────│  (ストアに適用) │
// └─────────────────┘     └─────────────────┘     └─────────────────┘
//
// HTTP API (axum) と updater は同じストアのロックを通してスタンドを読み書きします。
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use fuel_price_engine::api::{self, AppState};
use fuel_price_engine::auth::{AuthService, CredentialValidator};
use fuel_price_engine::config::Config;
use fuel_price_engine::store::StationRepository;

#[tokio::main]
async fn main() {
    // .env があれば読み込む（なくてもよい）
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::parse();
    config.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;

    // =========================================================================
    // Step 1: ストアを作る
    // =========================================================================
    let store = Arc::new(StationRepository::new(
        config.pipeline_settings(),
        CredentialValidator::default(),
    ));

    match config.admin() {
        Some(admin) => {
            let user = store.create_user(admin).context("failed to create admin user")?;
            info!(email = %user.email, "admin user ready");
        }
        None => warn!("ADMIN_USERNAME/ADMIN_EMAIL/ADMIN_PASSWORD not set, nobody can log in"),
    }

    // =========================================================================
    // Step 2: Webサーバーを起動
    // =========================================================================
    let state = Arc::new(AppState::new(
        Arc::clone(&store),
        AuthService::new(&config.jwt_secret, config.token_ttl()),
    ));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        interval_secs = config.price_interval_secs,
        "server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // =========================================================================
    // Step 3: 価格パイプラインを止める
    // =========================================================================
    store.shutdown().await;
    info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(%e, "failed to listen for ctrl-c");
        // シグナルが待てないなら止めずに動かし続ける
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
