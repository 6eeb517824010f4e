use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use trim_planner::Error;
use trim_planner::config::Settings;
use trim_planner::mills::MillTable;
use trim_planner::report::SuggestionReport;
use trim_planner::solver::{PenaltyWeights, Solver, SolverConfig};
use trim_planner::types::{
    DeckleBounds, DeckleRange, ProductionParams, RollRequirement, deserialize_u32_from_number,
};

struct AppState {
    solver: SolverConfig,
    mills: MillTable,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeRequest {
    #[serde(default)]
    mill: Option<String>,
    #[serde(default)]
    deckle: Option<DeckleRange>,
    substance: f64,
    length: f64,
    required_rolls: Vec<RequiredRoll>,
    #[serde(default)]
    options: OptimizeOptions,
}

#[derive(Deserialize, Serialize)]
struct RequiredRoll {
    id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    width: u32,
    tons: f64,
}

#[derive(Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
struct OptimizeOptions {
    max_patterns: Option<usize>,
    max_multiplier: Option<u32>,
    under_weight: Option<f64>,
    over_weight: Option<f64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::EmptyInput | Error::InvalidInput(_) | Error::UnknownMill(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::InfeasibleDeckle { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::ConstraintViolation(violation) => {
            tracing::error!(%violation, "solver returned an invalid plan");
            sentry::capture_message(&violation.to_string(), sentry::Level::Error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Error::ConfigRead { .. } | Error::ConfigParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

/// Request options may tighten the configured limits but never raise them.
fn solver_config(
    base: &SolverConfig,
    options: &OptimizeOptions,
) -> Result<SolverConfig, ApiError> {
    let mut config = base.clone();
    if let Some(n) = options.max_patterns {
        if n > base.max_patterns {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("maxPatterns {} exceeds the limit of {}", n, base.max_patterns),
            ));
        }
        config.max_patterns = n;
    }
    if let Some(n) = options.max_multiplier {
        if n > base.max_multiplier {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!(
                    "maxMultiplier {} exceeds the limit of {}",
                    n, base.max_multiplier
                ),
            ));
        }
        config.max_multiplier = n;
    }
    if options.under_weight.is_some() || options.over_weight.is_some() {
        config.penalty = PenaltyWeights::new(
            options.under_weight.unwrap_or(config.penalty.under),
            options.over_weight.unwrap_or(config.penalty.over),
        );
    }
    Ok(config)
}

async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<SuggestionReport>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let deckle = match (req.deckle, &req.mill) {
        (Some(deckle), _) => deckle,
        (None, Some(mill)) => state.mills.resolve(mill).map_err(error_response)?,
        (None, None) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "either mill or deckle is required",
            ));
        }
    };
    let production = ProductionParams::new(req.substance, req.length).map_err(error_response)?;
    let solver = Solver::new(solver_config(&state.solver, &req.options)?);

    // Blank rows from the planner grid are dropped rather than rejected
    let requirements: Vec<RollRequirement> = req
        .required_rolls
        .into_iter()
        .filter(|r| r.width > 0 && r.tons > 0.0)
        .map(|r| RollRequirement::new(r.id, r.width, r.tons))
        .collect();

    let solution =
        tokio::task::spawn_blocking(move || solver.solve(&requirements, deckle, production))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "solve task failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "solve task failed")
            })?
            .map_err(error_response)?;

    Ok(Json(SuggestionReport::new(&solution, &production)))
}

async fn mills(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, DeckleBounds>> {
    Json(
        state
            .mills
            .iter()
            .map(|(name, deckle)| (name.to_string(), DeckleBounds::from(deckle)))
            .collect(),
    )
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/mills", get(mills))
        .route("/optimize", post(optimize))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[tokio::main]
async fn main() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let settings = match std::env::var("TRIM_PLANNER_CONFIG") {
        Ok(path) => Settings::load(std::path::Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        Err(_) => Settings::default(),
    };
    let state = Arc::new(AppState {
        mills: settings.mill_table(),
        solver: settings.solver,
    });

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app(state)).await.unwrap();
}
