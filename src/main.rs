//! Coworking room and desk booking backend
//!
//! (c) Softlandia 2025

use coworking_booking_api::api;
use coworking_booking_api::config::AppConfig;
use coworking_booking_api::infrastructure::database::DatabaseConnection;

use anyhow::{Context, anyhow};
use axum::http::{HeaderValue, Method};
use di_axum::RouterServiceProviderExtensions;
use log::{error, info};
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // fail fast on a broken environment, before anything is started
    let config = AppConfig::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        let result = web_server_task(config).await;
        if let Err(e) = &result {
            error!("server stopped: {e:#}");
        }
        result
    })
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let provider = coworking_booking_api::services()
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    let connection = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!()
        .run(&**connection)
        .await
        .context("failed to run migrations")?;

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("`CORS_ORIGINS` holds an invalid origin")?;

    let app = api::router()
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                )
                .layer(
                    CorsLayer::new()
                        .allow_headers(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::PATCH,
                            Method::DELETE,
                        ])
                        .allow_origin(origins),
                ),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
