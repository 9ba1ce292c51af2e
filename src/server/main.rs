//! HTTP server answering point lookups against preloaded IBGE boundaries.
//!
//! All six levels are downloaded once at startup; every request after that
//! is an in-memory R-tree query.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geodata::config::Config;
use geodata::{GeoCoords, GeoLevel, GeoLocator, IbgeClient, LocatedUnit, Location, Quality};

#[derive(Parser, Debug)]
#[command(name = "geodata-server")]
#[command(about = "Point lookup server for IBGE administrative boundaries")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Listen address; overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Mesh quality (low, medium, high); overrides the config file
    #[arg(short, long)]
    quality: Option<Quality>,
}

/// Application state shared across handlers
struct AppState {
    locator: GeoLocator,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    let quality = args.quality.unwrap_or(config.locator.quality);
    let listen = args.listen.unwrap_or(config.server.listen);

    info!("geodata server");
    info!("Loading boundaries from {} ({} quality)", config.api.spatial_url, quality);

    // The IBGE client is blocking; keep it off the async workers
    let api = config.api.clone();
    let locator = tokio::task::spawn_blocking(move || -> Result<GeoLocator> {
        let client = IbgeClient::from_config(&api)?;
        Ok(GeoLocator::with_source(client, quality)?)
    })
    .await
    .context("Boundary loader panicked")?
    .context("Failed to load boundary layers")?;

    info!("Loaded {} units", locator.unit_count());

    let state = Arc::new(AppState { locator });
    let app = router(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/locate", get(locate_handler))
        .route("/v1/locate/{level}", get(locate_level_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    quality: Quality,
    units: usize,
    loaded_at: DateTime<Utc>,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        quality: state.locator.quality(),
        units: state.locator.unit_count(),
        loaded_at: state.locator.loaded_at(),
    })
}

#[derive(Deserialize)]
struct PointParams {
    lat: f64,
    lon: f64,
}

impl PointParams {
    fn coords(&self) -> Result<GeoCoords, (StatusCode, String)> {
        GeoCoords::new(self.lat, self.lon).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Containing unit at every level
async fn locate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> Result<Json<Location>, (StatusCode, String)> {
    let coords = params.coords()?;
    Ok(Json(state.locator.locate_all(&coords)))
}

#[derive(Serialize)]
struct LevelResponse {
    level: GeoLevel,
    unit: Option<LocatedUnit>,
}

/// Containing unit at a single level
async fn locate_level_handler(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
    Query(params): Query<PointParams>,
) -> Result<Json<LevelResponse>, (StatusCode, String)> {
    let level: GeoLevel = level
        .parse()
        .map_err(|e: geodata::Error| (StatusCode::NOT_FOUND, e.to_string()))?;
    let coords = params.coords()?;

    let unit = state
        .locator
        .locate(&coords, level)
        .map(LocatedUnit::from_unit);

    Ok(Json(LevelResponse { level, unit }))
}
