//! HTTP handlers: the media-server webhook endpoint and the admin API.
//!
//! The webhook contract is one-way: any accepted callback is acknowledged
//! with a fixed plain-text `0` no matter what happens downstream. Only an
//! unknown action path is rejected. The admin API mirrors the bot commands
//! and replies with small JSON acknowledgements.

use crate::config::Config;
use crate::metrics;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use streamcast_core::chat::ChannelId;
use streamcast_core::event::{CallbackAction, CallbackPayload};
use streamcast_core::filter::FilterPolicy;
use streamcast_core::tracker::{AdminCommand, AdminReply, TrackerHandle};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Fixed acknowledgement body the media server expects.
const WEBHOOK_ACK: &str = "0";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Handle feeding the tracker task.
    pub tracker: TrackerHandle,
}

/// Build the application router.
pub fn app(tracker: TrackerHandle) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/admin/ping", get(admin_ping))
        .route("/admin/toggle", post(admin_toggle))
        .route("/admin/channel", post(admin_set_channel))
        .route("/admin/filter", get(admin_filter_view))
        .route("/admin/filter/add", post(admin_filter_add))
        .route("/admin/filter/remove", post(admin_filter_remove))
        .route("/admin/filter/policy", post(admin_filter_policy))
        .route("/:action", post(webhook_handler))
        .with_state(AppState { tracker })
}

/// Run the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config, tracker: TrackerHandle) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = app(tracker);

    // Bind and serve
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Streamcast listening on {}", addr);
    info!(
        "Webhook endpoint: http://{}/{{stream,on_publish,on_unpublish}}",
        addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Media-server callback handler for `POST /{action}`.
///
/// Takes the raw body so a malformed payload can still be acknowledged.
async fn webhook_handler(
    Path(action): Path<String>,
    State(state): State<AppState>,
    body: String,
) -> Response {
    if action.parse::<CallbackAction>().is_err() {
        metrics::record_webhook_rejected();
        return (StatusCode::BAD_REQUEST, "Invalid callback action").into_response();
    }

    match serde_json::from_str::<CallbackPayload>(&body) {
        Ok(payload) => {
            metrics::record_webhook_event(&payload.action);
            state.tracker.submit_event(payload.into());
        }
        Err(e) => {
            warn!(action = %action, error = %e, "Malformed webhook payload");
            metrics::record_webhook_malformed();
        }
    }

    (StatusCode::OK, WEBHOOK_ACK).into_response()
}

#[derive(Debug, Deserialize)]
struct ChannelRequest {
    channel_id: u64,
}

#[derive(Debug, Deserialize)]
struct StreamRequest {
    stream: String,
}

#[derive(Debug, Deserialize)]
struct PolicyRequest {
    policy: FilterPolicy,
}

async fn admin_ping(State(state): State<AppState>) -> Response {
    metrics::record_admin_command("ping");
    dispatch_admin(&state, AdminCommand::Ping).await
}

async fn admin_toggle(State(state): State<AppState>) -> Response {
    metrics::record_admin_command("toggle");
    dispatch_admin(&state, AdminCommand::ToggleMessages).await
}

async fn admin_set_channel(
    State(state): State<AppState>,
    Json(request): Json<ChannelRequest>,
) -> Response {
    metrics::record_admin_command("set_channel");
    dispatch_admin(&state, AdminCommand::SetChannel(ChannelId(request.channel_id))).await
}

async fn admin_filter_add(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Response {
    metrics::record_admin_command("filter_add");
    match validated_stream(request) {
        Ok(stream) => dispatch_admin(&state, AdminCommand::FilterAdd(stream)).await,
        Err(response) => response,
    }
}

async fn admin_filter_remove(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Response {
    metrics::record_admin_command("filter_remove");
    match validated_stream(request) {
        Ok(stream) => dispatch_admin(&state, AdminCommand::FilterRemove(stream)).await,
        Err(response) => response,
    }
}

async fn admin_filter_policy(
    State(state): State<AppState>,
    Json(request): Json<PolicyRequest>,
) -> Response {
    metrics::record_admin_command("filter_policy");
    dispatch_admin(&state, AdminCommand::FilterSet(request.policy)).await
}

async fn admin_filter_view(State(state): State<AppState>) -> Response {
    metrics::record_admin_command("filter_view");
    dispatch_admin(&state, AdminCommand::FilterView).await
}

fn validated_stream(request: StreamRequest) -> Result<String, Response> {
    let stream = request.stream.trim().to_string();
    if stream.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "detail": "Please provide a stream name"})),
        )
            .into_response());
    }
    Ok(stream)
}

async fn dispatch_admin(state: &AppState, command: AdminCommand) -> Response {
    match state.tracker.admin(command).await {
        Some(reply) => reply_response(reply),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "detail": "Tracker is not running"})),
        )
            .into_response(),
    }
}

fn reply_response(reply: AdminReply) -> Response {
    let body = match reply {
        AdminReply::Latency(latency) => {
            json!({"status": "ok", "detail": format!("Pong! Latency is {latency:?}")})
        }
        AdminReply::LatencyUnavailable(detail) => {
            json!({"status": "error", "detail": format!("Latency unavailable: {detail}")})
        }
        AdminReply::MessagesEnabled(enabled) => {
            let detail = if enabled {
                "Enabled stream messages"
            } else {
                "Disabled stream messages"
            };
            json!({"status": "ok", "detail": detail})
        }
        AdminReply::ChannelSet(channel) => {
            json!({"status": "ok", "detail": format!("Set channel to {channel}")})
        }
        AdminReply::FilterAdded(stream) => {
            json!({"status": "ok", "detail": format!("Added {stream} to the filter list")})
        }
        AdminReply::AlreadyListed(stream) => {
            json!({"status": "noop", "detail": format!("{stream} already in filter list")})
        }
        AdminReply::FilterRemoved(stream) => {
            json!({"status": "ok", "detail": format!("Removed {stream} from the filter list")})
        }
        AdminReply::NotListed(stream) => {
            json!({"status": "noop", "detail": format!("{stream} is not in the filter list")})
        }
        AdminReply::PolicySet(policy) => {
            json!({"status": "ok", "detail": format!("Set filter to {policy}")})
        }
        AdminReply::FilterView { policy, streams } => {
            json!({"status": "ok", "policy": policy, "streams": streams})
        }
    };
    Json(body).into_response()
}
