//! Asteroid impact simulation HTTP microservice.
//!
//! # Endpoints
//!
//! - `POST /api/v1/simulate` - Run one impact simulation
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//!
//! # Configuration
//!
//! - `RUST_LOG` - Log level (default: info)
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//!
//! Terrain and population lookups run against the public datasets; their
//! failures degrade the simulation rather than failing the request, so the
//! only client errors are validation failures.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use deimos_lib::{
    AsteroidParameters, EffectResult, Error as LibError, GeoDataClient, ImpactSite,
    SiteEnvironment, Simulator, WorldBankClient,
};

/// Asteroid parameters as accepted on the wire, with data-quality defaults
/// for density and entry angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AsteroidInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    diameter_m: f64,
    #[serde(default = "default_density")]
    density_kgm3: f64,
    velocity_kms: f64,
    #[serde(default = "default_angle")]
    angle_deg: f64,
}

fn default_density() -> f64 {
    3000.0
}

fn default_angle() -> f64 {
    45.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimulateRequest {
    asteroid: AsteroidInput,
    site: ImpactSite,
    #[serde(default)]
    ocean: bool,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    inputs: SimulateRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<SiteEnvironment>,
    effects: EffectResult,
    notes: Vec<String>,
}

/// JSON error body returned on failures.
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
        (
            status,
            Json(ApiError {
                error: message.into(),
            }),
        )
    }
}

#[derive(Clone)]
struct AppState {
    simulator: Simulator,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let port: u16 = env::var("SERVICE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    // The data clients are blocking; build them off the async runtime.
    let simulator = tokio::task::spawn_blocking(build_simulator).await??;
    let state = AppState { simulator };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_simulator() -> Result<Simulator, LibError> {
    Ok(Simulator::new(
        Arc::new(GeoDataClient::new()?),
        Arc::new(WorldBankClient::new()?),
    ))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/simulate", post(simulate_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn health_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Handle POST /api/v1/simulate requests.
async fn simulate_handler(
    State(state): State<AppState>,
    Json(request): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, (StatusCode, Json<ApiError>)> {
    info!(
        name = request.asteroid.name.as_deref().unwrap_or("<unnamed>"),
        diameter_m = request.asteroid.diameter_m,
        lat = request.site.lat,
        lon = request.site.lon,
        ocean = request.ocean,
        "handling simulation request"
    );

    let asteroid = AsteroidParameters {
        diameter_m: request.asteroid.diameter_m,
        density_kgm3: request.asteroid.density_kgm3,
        velocity_kms: request.asteroid.velocity_kms,
        angle_deg: request.asteroid.angle_deg,
    };
    let site = request.site;
    let ocean = request.ocean;

    // The simulation calls blocking data clients; keep it off the async
    // runtime.
    let simulator = state.simulator.clone();
    let outcome = tokio::task::spawn_blocking(move || simulator.simulate(&asteroid, &site, ocean))
        .await
        .map_err(|err| {
            error!(error = %err, "simulation task panicked");
            ApiError::response(StatusCode::INTERNAL_SERVER_ERROR, "simulation task failed")
        })?
        .map_err(|err| match err {
            LibError::InvalidParameter { .. } => {
                ApiError::response(StatusCode::BAD_REQUEST, err.to_string())
            }
            other => {
                error!(error = %other, "simulation failed");
                ApiError::response(StatusCode::BAD_GATEWAY, other.to_string())
            }
        })?;

    Ok(Json(SimulateResponse {
        inputs: request,
        environment: outcome.environment,
        effects: outcome.effects,
        notes: outcome.notes,
    }))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
