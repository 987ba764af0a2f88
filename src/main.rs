use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use field_telemetry_rs::services::query::TelemetryQueries;
use field_telemetry_rs::store::PgStore;
use field_telemetry_rs::{cli, config, db, openapi, routes, state};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind field-telemetry-rs listener on {addr}: port already in use. Stop the other service using this port or re-run with --port to choose another port.",
            );
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to bind field-telemetry-rs listener on {addr}")),
    }
}

fn cors_layer(allow_any_origin: bool) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_any_origin {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin([
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:3000"),
        ])
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err:#}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    if args.print_openapi {
        println!(
            "{}",
            serde_json::to_string_pretty(&openapi::openapi_json())?
        );
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::TelemetryConfig::from_env()?;
    let pool = db::connect_lazy(
        &config.database_url,
        config.db_pool_size,
        config.db_acquire_timeout(),
    )?;

    if args.migrate {
        db::apply_migrations(&pool, &args.migrations_dir).await?;
    }

    let store = Arc::new(PgStore::new(
        pool,
        config.default_check_interval_minutes,
    ));
    let queries = TelemetryQueries::new(store.clone(), store, config.window_resolver());
    tracing::info!(
        timezone = %config.timezone,
        strict_range_tokens = config.strict_range_tokens,
        max_window_days = config.max_window_days,
        "telemetry queries ready"
    );
    let state = state::AppState::new(queries);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(60)
            .methods(vec![axum::http::Method::POST])
            .use_headers()
            .finish()
            .context("failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
        governor_limiter.retain_recent();
    });

    let app = routes::router(state)
        .layer(GovernorLayer::new(governor_conf))
        .layer(cors_layer(config.cors_allow_any_origin));
    let addr = format!("{}:{}", args.host, args.port);
    let listener = bind_listener(&addr).await?;
    tracing::info!(%addr, "field-telemetry-rs listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}
