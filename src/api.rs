//! REST API for the trailer loading service.
//!
//! Provides HTTP endpoints to run the X distribution strategy on a request's
//! pallets. Uses Axum as the web framework and supports CORS.

use std::collections::HashSet;
use std::sync::OnceLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, LoaderConfig};
use crate::loader::{ConfigError, ConfigOverrides, LoadOutcome, XDistributionLoading, merge};
use crate::model::{Pallet, PalletType, Trailer, ValidationError};
use crate::strategy::{LoadEvent, LoadingStrategy, TracingObserver};
use crate::types::Dimensional;

#[derive(Clone)]
struct ApiState {
    loader_config: LoaderConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>trailer_loader API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Trailer description; omitted in a request to use the service default.
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct TrailerRequest {
    #[schema(value_type = [f64; 3], example = json!([13600.0, 2450.0, 2700.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl TrailerRequest {
    fn into_trailer(self) -> Result<Trailer, ValidationError> {
        Trailer::new(self.dims, self.max_weight)
    }
}

/// Pallet description.
///
/// Catalog types take their dimensions and tare weight from the catalog unless
/// given explicitly. `CUSTOM` pallets need both.
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct PalletRequest {
    pub id: String,
    #[serde(default)]
    pub pallet_type: PalletType,
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true, example = json!([1200.0, 800.0, 144.0]))]
    pub dims: Option<(f64, f64, f64)>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub tare_weight: Option<f64>,
    #[serde(default)]
    pub cargo_weight: f64,
}

impl PalletRequest {
    fn into_pallet(self) -> Result<Pallet, ValidationError> {
        let catalog = self.pallet_type.spec();
        let dims = self
            .dims
            .or_else(|| catalog.map(|spec| (spec.length, spec.width, spec.height)));
        let tare_weight = self
            .tare_weight
            .or_else(|| catalog.map(|spec| spec.tare_weight));

        match (dims, tare_weight) {
            (Some(dims), Some(tare_weight)) => Pallet::new(
                self.id,
                self.pallet_type,
                dims,
                tare_weight,
                self.cargo_weight,
            ),
            _ => Err(ValidationError::InvalidPalletType(format!(
                "pallet {} of type {} needs dims and tare_weight",
                self.id,
                self.pallet_type.code()
            ))),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "trailer": { "dims": [13600.0, 2450.0, 2700.0], "max_weight": 24000.0 },
        "pallets": [
            { "id": "EUR_1", "pallet_type": "EUR", "cargo_weight": 450.0 },
            { "id": "C_1", "pallet_type": "CUSTOM", "dims": [1000.0, 600.0, 150.0], "tare_weight": 20.0, "cargo_weight": 120.0 }
        ],
        "config": { "zones": 4, "balancing_factor": 0.1 }
    })
)]
pub struct LoadRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub trailer: Option<TrailerRequest>,
    pub pallets: Vec<PalletRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub config: Option<ConfigOverrides>,
}

#[derive(Debug)]
struct ValidatedLoadRequest {
    strategy: XDistributionLoading,
    pallets: Vec<Pallet>,
}

#[derive(Debug)]
enum LoadRequestValidationError {
    InvalidTrailer(ValidationError),
    InvalidPallet(ValidationError),
    DuplicatePalletId(String),
    InvalidConfig(ConfigError),
}

impl LoadRequest {
    fn into_validated(
        self,
        defaults: &LoaderConfig,
    ) -> Result<ValidatedLoadRequest, LoadRequestValidationError> {
        let trailer = match self.trailer {
            Some(spec) => spec
                .into_trailer()
                .map_err(LoadRequestValidationError::InvalidTrailer)?,
            None => defaults.trailer().clone(),
        };

        let pallets = self
            .pallets
            .into_iter()
            .map(PalletRequest::into_pallet)
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(LoadRequestValidationError::InvalidPallet)?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = pallets.iter().find(|p| !seen.insert(p.id())) {
            return Err(LoadRequestValidationError::DuplicatePalletId(
                duplicate.id().to_string(),
            ));
        }

        let config = merge(&defaults.strategy(), &self.config.unwrap_or_default());
        let strategy = XDistributionLoading::new(trailer, config)
            .map_err(LoadRequestValidationError::InvalidConfig)?;

        Ok(ValidatedLoadRequest { strategy, pallets })
    }
}

/// Response of a loading run.
#[derive(Serialize, ToSchema)]
pub struct LoadResponse {
    pub strategy: String,
    pub placed: Vec<LoadedPallet>,
    pub unplaced: Vec<UnplacedEntry>,
    /// Weight committed to each zone, front to back
    pub zone_weights: Vec<f64>,
    pub total_weight: f64,
    pub max_weight: f64,
    pub utilization_percent: f64,
    pub is_complete: bool,
}

/// Placed pallet with its final position and footprint.
#[derive(Serialize, ToSchema)]
pub struct LoadedPallet {
    pub id: String,
    pub pallet_type: PalletType,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub pos: (f64, f64, f64),
    /// Dimensions as placed (length and width swapped when rotated)
    #[schema(value_type = [f64; 3], example = json!([1200.0, 800.0, 144.0]))]
    pub dims: (f64, f64, f64),
    pub rotated: bool,
    pub weight: f64,
}

#[derive(Serialize, ToSchema)]
pub struct UnplacedEntry {
    pub id: String,
    pub weight: f64,
    #[schema(value_type = [f64; 3], example = json!([1200.0, 800.0, 144.0]))]
    pub dims: (f64, f64, f64),
    #[schema(nullable = true)]
    pub zone: Option<usize>,
    pub reason_code: String,
    pub reason: String,
}

impl LoadResponse {
    fn from_outcome(outcome: LoadOutcome, trailer: &Trailer) -> Self {
        let is_complete = outcome.is_complete();
        let LoadOutcome {
            placed,
            unplaced,
            zone_weights,
        } = outcome;

        Self {
            strategy: XDistributionLoading::NAME.to_string(),
            placed: placed
                .iter()
                .map(|pallet| LoadedPallet {
                    id: pallet.id().to_string(),
                    pallet_type: pallet.kind(),
                    pos: pallet.position().map(|p| p.as_tuple()).unwrap_or_default(),
                    dims: pallet.dimensions().as_tuple(),
                    rotated: pallet.is_rotated(),
                    weight: pallet.total_weight(),
                })
                .collect(),
            unplaced: unplaced
                .iter()
                .map(|entry| UnplacedEntry {
                    id: entry.pallet.id().to_string(),
                    weight: entry.pallet.total_weight(),
                    dims: entry.pallet.dimensions().as_tuple(),
                    zone: entry.reason.zone(),
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            zone_weights,
            total_weight: trailer.total_weight(),
            max_weight: trailer.max_weight(),
            utilization_percent: trailer.utilization_percent(),
            is_complete,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn unprocessable(error: &str, details: impl Into<String>) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, details)
}

fn parse_load_request(
    payload: Result<Json<LoadRequest>, JsonRejection>,
    defaults: &LoaderConfig,
) -> Result<ValidatedLoadRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(unprocessable("Invalid JSON data", err.to_string())),
    };

    payload.into_validated(defaults).map_err(|err| match err {
        LoadRequestValidationError::InvalidTrailer(err) => {
            unprocessable("Invalid trailer", err.to_string())
        }
        LoadRequestValidationError::InvalidPallet(err) => {
            unprocessable("Invalid input data", err.to_string())
        }
        LoadRequestValidationError::DuplicatePalletId(id) => {
            unprocessable("Invalid input data", format!("duplicate pallet id: {id}"))
        }
        LoadRequestValidationError::InvalidConfig(err) => {
            unprocessable("Invalid loading configuration", err.to_string())
        }
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_load, handle_load_stream),
    components(
        schemas(
            LoadRequest,
            TrailerRequest,
            PalletRequest,
            PalletType,
            ConfigOverrides,
            LoadResponse,
            LoadedPallet,
            UnplacedEntry,
            ErrorResponse
        )
    ),
    tags((name = "loading", description = "Zone-balanced trailer loading"))
)]
struct ApiDoc;

/// Builds the service router.
pub fn router(loader_config: LoaderConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/load", post(handle_load))
        .route("/load_stream", post(handle_load_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { loader_config })
}

/// Starts the API server and serves until it is terminated.
pub async fn start_api_server(config: ApiConfig, loader_config: LoaderConfig) -> std::io::Result<()> {
    let app = router(loader_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        tracing::info!("local access: http://localhost:{}", config.port());
    }
    tracing::info!("endpoints: POST /load, POST /load_stream, GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /load endpoint.
///
/// Loads the request's pallets into the trailer with the X distribution
/// strategy.
///
/// # Returns
/// JSON response with placed pallets, unplaced pallets and zone weights
#[utoipa::path(
    post,
    path = "/load",
    request_body = LoadRequest,
    responses(
        (status = 200, description = "Loading run finished", body = LoadResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, trailer or configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_load(
    State(state): State<ApiState>,
    payload: Result<Json<LoadRequest>, JsonRejection>,
) -> impl IntoResponse {
    let ValidatedLoadRequest {
        mut strategy,
        pallets,
    } = match parse_load_request(payload, &state.loader_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    tracing::info!(pallets = pallets.len(), "new load request");
    let outcome = strategy.load(pallets, &mut TracingObserver);
    let response = LoadResponse::from_outcome(outcome, strategy.trailer());
    tracing::info!(
        placed = response.placed.len(),
        unplaced = response.unplaced.len(),
        "load request finished"
    );

    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /load_stream endpoint (SSE).
///
/// Streams `LoadEvent`s as Server-Sent Events while the run progresses.
#[utoipa::path(
    post,
    path = "/load_stream",
    request_body = LoadRequest,
    responses(
        (
            status = 200,
            description = "Streams loading events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, trailer or configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_load_stream(
    State(state): State<ApiState>,
    payload: Result<Json<LoadRequest>, JsonRejection>,
) -> impl IntoResponse {
    let ValidatedLoadRequest {
        mut strategy,
        pallets,
    } = match parse_load_request(payload, &state.loader_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        strategy.load(pallets, &mut |event: &LoadEvent| {
            if let Ok(json) = serde_json::to_string(event) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
