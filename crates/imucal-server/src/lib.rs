//! imucal server - HTTP ingestion for a live calibration session
//!
//! Routes:
//! - `POST /api/sample/{stream}`: one `{"x":..,"y":..,"z":..}` reading
//! - `GET /api/status`: current calibration status
//! - `GET /api/mag`: buffered magnetometer samples, newest first
//!
//! Configuration pushes leave through an unbounded channel and are drained by
//! a background task, so request handlers never wait on the far side.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use imucal_core::{
    CalibrationConfig, CalibrationError, CalibrationEvent, CalibrationSession, CalibrationStatus,
    ConfigSink, RawSample, Sample3,
};
use nalgebra::Vector3;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Outbound channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundRequest {
    SampleRate(u32),
    GyroBias(Vector3<f64>),
}

/// Queues configuration requests for the outbound worker.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<OutboundRequest>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<OutboundRequest>) -> Self {
        Self { tx }
    }

    fn send(&self, req: OutboundRequest) -> Result<(), CalibrationError> {
        self.tx
            .send(req)
            .map_err(|_| CalibrationError::PushFailed("outbound worker stopped".into()))
    }
}

impl ConfigSink for ChannelSink {
    fn request_sample_rate(&mut self, hz: u32) -> Result<(), CalibrationError> {
        self.send(OutboundRequest::SampleRate(hz))
    }

    fn push_gyro_bias(&mut self, bias: &Vector3<f64>) -> Result<(), CalibrationError> {
        self.send(OutboundRequest::GyroBias(*bias))
    }
}

/// Drains queued requests until every sender is gone.
pub fn spawn_outbound_worker(mut rx: UnboundedReceiver<OutboundRequest>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(req) = rx.recv().await {
            match req {
                OutboundRequest::SampleRate(hz) => info!(hz, "outbound: sample rate"),
                OutboundRequest::GyroBias(b) => {
                    info!(x = b.x, y = b.y, z = b.z, "outbound: gyro bias")
                }
            }
            delivered += 1;
        }
        delivered
    })
}

// ---------------------------------------------------------------------------
// State & router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<CalibrationSession<ChannelSink>>>,
}

impl AppState {
    /// Starts a session wired to a fresh outbound channel. The receiver is
    /// returned for [`spawn_outbound_worker`].
    pub fn new(config: CalibrationConfig) -> (Self, UnboundedReceiver<OutboundRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = CalibrationSession::start(config, ChannelSink::new(tx));
        (
            Self {
                session: Arc::new(Mutex::new(session)),
            },
            rx,
        )
    }
}

/// Creates the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sample/{stream}", post(handle_sample))
        .route("/api/status", get(handle_status))
        .route("/api/mag", get(handle_mag))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Rejected(CalibrationError),
    SessionPoisoned,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Rejected(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::SessionPoisoned => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "calibration session unavailable".to_string(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

fn lock(
    state: &AppState,
) -> Result<std::sync::MutexGuard<'_, CalibrationSession<ChannelSink>>, ApiError> {
    state.session.lock().map_err(|_| {
        warn!("session mutex poisoned");
        ApiError::SessionPoisoned
    })
}

async fn handle_sample(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    Json(raw): Json<RawSample>,
) -> Result<Json<Option<CalibrationEvent>>, ApiError> {
    let mut session = lock(&state)?;
    let event = session
        .handle_tagged(&stream, raw)
        .map_err(ApiError::Rejected)?;
    Ok(Json(event))
}

async fn handle_status(State(state): State<AppState>) -> Result<Json<CalibrationStatus>, ApiError> {
    Ok(Json(lock(&state)?.status()))
}

async fn handle_mag(State(state): State<AppState>) -> Result<Json<Vec<Sample3>>, ApiError> {
    Ok(Json(lock(&state)?.mag().snapshot()))
}
