//! Local control API.
//!
//! Lets a ground-station UI push operator-side events, quick
//! announcements, preference changes and the calibration flag. Work that
//! touches the facade is forwarded over its inbound channel so events stay
//! single-consumer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::announcer::Announcer;
use crate::events::{EventKind, VehicleEvent};
use crate::facade::Inbound;
use crate::link::{CalibrationFlag, CalibrationState, LinkState};
use crate::prefs::{PeriodicField, PreferenceFlags, PreferenceStore, SharedPreferences};
use crate::scheduler::{PeriodicScheduler, SchedulerState};
use crate::vehicle::{SharedVehicle, VehicleSnapshot};

#[derive(Clone)]
pub struct ApiState {
    pub inbound: mpsc::Sender<Inbound>,
    pub prefs: Arc<SharedPreferences>,
    pub calibration: CalibrationFlag,
    pub vehicle: SharedVehicle,
    pub link: watch::Receiver<LinkState>,
    pub scheduler: PeriodicScheduler,
    pub announcer: Arc<Announcer>,
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct NotifyRequest {
    text: String,
}

#[derive(Deserialize)]
struct EventRequest {
    kind: EventKind,
}

#[derive(Deserialize)]
struct PrefsRequest {
    tts_enabled: Option<bool>,
    periodic_interval_secs: Option<u32>,
    periodic_fields: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct CalibrationRequest {
    active: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    link: LinkState,
    scheduler: SchedulerState,
    calibrating: bool,
    speech_available: bool,
    spoken: u64,
    dropped: u64,
    preferences: PreferenceFlags,
    vehicle: VehicleSnapshot,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

type Reply = (StatusCode, Json<SimpleResponse>);

fn ok(status: &str) -> Reply {
    (StatusCode::OK, Json(SimpleResponse::ok(status)))
}

fn bad_request(message: impl Into<String>) -> Reply {
    (StatusCode::BAD_REQUEST, Json(SimpleResponse::err(message)))
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/notify", post(handle_notify))
        .route("/event", post(handle_event))
        .route("/prefs", post(handle_prefs))
        .route("/calibration", post(handle_calibration))
        .with_state(state)
}

/// Start the control API as a background tokio task.
pub async fn start_api(state: ApiState, port: u16) {
    let addr = format!("127.0.0.1:{port}");
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind control API on {addr}: {e}");
            return;
        }
    };
    info!("Control API listening on {addr}");
    serve(listener, state);
}

fn serve(listener: TcpListener, state: ApiState) {
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Control API server error: {e}");
        }
    });
}

// --- Handlers ---

async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        link: *state.link.borrow(),
        scheduler: state.scheduler.state(),
        calibrating: state.calibration.is_calibrating(),
        speech_available: state.announcer.sink_available(),
        spoken: state.announcer.spoken_count(),
        dropped: state.announcer.dropped_count(),
        preferences: state.prefs.snapshot(),
        vehicle: state.vehicle.snapshot(),
    })
}

async fn forward(state: &ApiState, message: Inbound) -> Reply {
    match state.inbound.send(message).await {
        Ok(()) => ok("queued"),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleResponse::err("notification loop stopped")),
        ),
    }
}

async fn handle_notify(State(state): State<ApiState>, Json(req): Json<NotifyRequest>) -> Reply {
    if req.text.trim().is_empty() {
        return bad_request("text is empty");
    }
    forward(&state, Inbound::QuickNotify(req.text)).await
}

async fn handle_event(State(state): State<ApiState>, Json(req): Json<EventRequest>) -> Reply {
    if req.kind.is_link_event() {
        return bad_request(format!("{} comes from the telemetry link", req.kind));
    }
    let event = VehicleEvent::new(req.kind, state.vehicle.snapshot());
    forward(&state, Inbound::Event(event)).await
}

async fn handle_prefs(State(state): State<ApiState>, Json(req): Json<PrefsRequest>) -> Reply {
    let fields = match req.periodic_fields {
        Some(names) => {
            let mut fields = Vec::with_capacity(names.len());
            for name in &names {
                match PeriodicField::from_name(name) {
                    Some(field) => fields.push(field),
                    None => return bad_request(format!("unknown periodic field: {name}")),
                }
            }
            Some(fields)
        }
        None => None,
    };

    if let Some(enabled) = req.tts_enabled {
        info!("Speech {}", if enabled { "enabled" } else { "muted" });
        state.prefs.set_audible(enabled);
    }
    if let Some(fields) = fields {
        state.prefs.set_periodic_fields(fields);
    }
    if let Some(interval_secs) = req.periodic_interval_secs {
        let previous = state.prefs.periodic_interval_secs();
        state.prefs.set_periodic_interval(interval_secs);
        if previous != interval_secs {
            return forward(&state, Inbound::SetupPeriodic { interval_secs }).await;
        }
    }
    ok("updated")
}

async fn handle_calibration(
    State(state): State<ApiState>,
    Json(req): Json<CalibrationRequest>,
) -> Reply {
    info!("Calibration {}", if req.active { "started" } else { "finished" });
    state.calibration.set(req.active);
    ok(if req.active { "calibrating" } else { "idle" })
}
