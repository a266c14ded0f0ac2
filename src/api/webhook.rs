//! Webhook handler for GitHub deployment events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::SharedState;
use crate::router::RouteOutcome;
use crate::signature::is_valid_gh_event;
use crate::webhook::WebhookEvent;

pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles the GitHub webhook POST request.
///
/// GitHub always gets a 200 back, whatever happens to the event: failures
/// are only visible in the logs.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let event = header_str(&headers, EVENT_HEADER).map(String::from);
    let signature = header_str(&headers, SIGNATURE_HEADER).map(String::from);
    let delivery_id = header_str(&headers, DELIVERY_HEADER)
        .map(String::from)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let span = info_span!(
        "webhook",
        event = event.as_deref().unwrap_or(""),
        delivery = %delivery_id
    );

    async move {
        // Retrieve the request JSON. If none can be interpreted, don't do anything.
        let payload: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                error!("Could not interpret the POST request: {}", e);
                return;
            }
        };

        if !is_valid_gh_event(
            &state.config.webhook_secret,
            signature.as_deref(),
            event.as_deref(),
            &body,
            &payload,
        ) {
            return;
        }

        let webhook_event = WebhookEvent {
            event_kind: event.unwrap_or_default(),
            delivery_id,
            signature_header: signature.unwrap_or_default(),
            raw_bytes: body.to_vec(),
            payload,
        };
        process_event(&state, &webhook_event).await;
    }
    .instrument(span)
    .await;

    StatusCode::OK
}

/// Route a validated event. Publish failures stop here.
pub async fn process_event(state: &SharedState, event: &WebhookEvent) {
    debug!("Received GitHub event: {}", event.event_kind);

    match state.router.route(&event.event_kind, &event.payload).await {
        Ok(RouteOutcome::Published(message_id)) => {
            info!(
                "Event '{}' for {} published as MessageId {}",
                event.event_kind,
                event.repository_full_name().unwrap_or("(unknown)"),
                message_id
            );
        }
        Ok(RouteOutcome::NoAction(reason)) => {
            debug!("No downstream action: {}", reason);
        }
        Err(e) => {
            error!(
                "Failed to trigger downstream job for delivery {}: {}",
                event.delivery_id, e
            );
        }
    }
}

/// Anything but POST.
pub async fn not_implemented() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}
