//! HTTP + WebSocket API for the engine
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /compile - Compile a move feed into designs
//! - GET /designs/:id - Current design snapshot
//! - POST /step - Step two stored designs
//! - POST /loci/copy - Copy a subtree to fresh siblings
//! - POST /loci/instantiate - Bind a witness at a locus
//! - POST /uniformity/check - Compare two instances
//! - WS /ws/designs - Design version notifications

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::core::engine::{DesignVersionEvent, LudicsEngine, StepRequest};
use crate::core::fingerprint::{design_fingerprint, trace_fingerprint};
use crate::core::locus_ops::CopyOutcome;
use crate::error::LudicsError;
use crate::types::{
    CompileOutput, Design, DesignRef, DialogueMove, Locus, ScopingStrategy, Trace, UniformityResult,
};

/// App state
pub struct AppState {
    pub engine: RwLock<LudicsEngine>,
    pub events: broadcast::Sender<DesignVersionEvent>,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Engine error carried to the HTTP boundary
#[derive(Debug)]
pub struct ApiError(pub LudicsError);

impl From<LudicsError> for ApiError {
    fn from(err: LudicsError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LudicsError::LocusNotFound { .. } | LudicsError::DesignNotFound(_) => StatusCode::NOT_FOUND,
            LudicsError::SealedBranch { .. }
            | LudicsError::LocusOccupied { .. }
            | LudicsError::AlreadyInstantiated { .. }
            | LudicsError::DesignVersionMismatch { .. } => StatusCode::CONFLICT,
            LudicsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LudicsError::InvalidLocus { .. }
            | LudicsError::MalformedTree { .. }
            | LudicsError::InvalidWitness { .. }
            | LudicsError::InvalidMove { .. }
            | LudicsError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), code = self.0.code(), error = %self.0, "request failed");
        let body = ErrorBody {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub designs: usize,
}

/// Compile request
#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub moves: Vec<DialogueMove>,
    #[serde(default)]
    pub strategy: Option<ScopingStrategy>,
}

/// Design snapshot response
#[derive(Debug, Serialize, Deserialize)]
pub struct DesignResponse {
    pub design: Design,
    pub fingerprint: String,
}

/// Step response
#[derive(Debug, Serialize, Deserialize)]
pub struct StepResponse {
    pub trace: Trace,
    pub fingerprint: String,
}

/// Copy request
#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub design_id: String,
    pub base: Locus,
    pub count: usize,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Instantiate request
#[derive(Debug, Deserialize)]
pub struct InstantiateRequest {
    pub design_id: String,
    pub base: Locus,
    pub name: String,
    #[serde(default)]
    pub mask: bool,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Uniformity request
#[derive(Debug, Deserialize)]
pub struct UniformityRequest {
    pub design_id: String,
    pub base: Locus,
    pub child_a: Locus,
    pub child_b: Locus,
}

/// Create the API router
pub fn create_router(config: EngineConfig) -> Router {
    let engine = LudicsEngine::new(config);
    let state = Arc::new(AppState {
        events: engine.events(),
        engine: RwLock::new(engine),
    });

    Router::new()
        .route("/health", get(health))
        .route("/compile", post(compile))
        .route("/designs/:id", get(get_design))
        .route("/step", post(step))
        .route("/loci/copy", post(copy_locus))
        .route("/loci/instantiate", post(instantiate))
        .route("/uniformity/check", post(check_uniformity))
        .route("/ws/designs", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.engine.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        designs: engine.len(),
    })
}

async fn compile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompileRequest>,
) -> ApiResult<CompileOutput> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.compile(&req.moves, req.strategy)?))
}

/// Design ids contain `/`; clients percent-encode it
async fn get_design(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DesignResponse> {
    let engine = state.engine.read().await;
    let design = engine
        .design(&id)
        .ok_or_else(|| LudicsError::DesignNotFound(id.clone()))?;
    Ok(Json(DesignResponse {
        fingerprint: design_fingerprint(&design),
        design: design.as_ref().clone(),
    }))
}

async fn step(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> ApiResult<StepResponse> {
    let engine = state.engine.read().await;
    let trace = engine.step(&req)?;
    Ok(Json(StepResponse {
        fingerprint: trace_fingerprint(&trace),
        trace,
    }))
}

async fn copy_locus(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CopyRequest>,
) -> ApiResult<CopyOutcome> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.copy_locus(
        &req.design_id,
        &req.base,
        req.count,
        req.expected_version,
    )?))
}

async fn instantiate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InstantiateRequest>,
) -> ApiResult<DesignRef> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.instantiate(
        &req.design_id,
        &req.base,
        &req.name,
        req.mask,
        req.expected_version,
    )?))
}

async fn check_uniformity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UniformityRequest>,
) -> ApiResult<UniformityResult> {
    let engine = state.engine.read().await;
    Ok(Json(engine.check_uniformity(
        &req.design_id,
        &req.base,
        &req.child_a,
        &req.child_b,
    )?))
}

/// WebSocket handler for version notifications
async fn websocket_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward events until either side hangs up
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<DesignVersionEvent>) {
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(_) => break,
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ludics API listening");
    println!("Ludics API running on {}", addr);
    println!("  GET  /health            - Health check");
    println!("  POST /compile           - Compile moves");
    println!("  GET  /designs/:id       - Get design");
    println!("  POST /step              - Step designs");
    println!("  POST /loci/copy         - Copy locus");
    println!("  POST /loci/instantiate  - Instantiate locus");
    println!("  POST /uniformity/check  - Check uniformity");
    println!("  WS   /ws/designs        - Version updates");
    axum::serve(listener, router).await?;
    Ok(())
}
