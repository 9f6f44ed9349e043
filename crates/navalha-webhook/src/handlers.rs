// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook server.
//!
//! The `POST /webhook` pipeline runs in a strict order: content-type check,
//! signature validation, schema validation, idempotency lookup, salon
//! resolution, raw persist, enqueue, idempotency mark. Nothing after schema
//! validation may run before the signature is verified, and no side effect
//! happens before the schema is accepted.
//!
//! Several outcomes intentionally collapse to `200` with an empty body on
//! the wire (duplicate, unknown salon): answering an error would make the
//! transport retry a delivery we have chosen to drop. The outcomes stay
//! distinguishable through per-outcome metrics labels and log events.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use navalha_core::{InboundMessage, JobPayload, MediaItem, MessageSid, normalize_phone};
use navalha_prometheus::{record_store_latency, record_webhook_request};
use navalha_storage::queries::{idempotency, inbound, queue};

use crate::server::WebhookState;

/// Budget for the idempotency lookup.
const IDEMPOTENCY_TIMEOUT: Duration = Duration::from_secs(2);
/// Budget for persisting the raw inbound message.
const PERSIST_TIMEOUT: Duration = Duration::from_secs(5);
/// Budget for enqueueing the processing job.
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// Twilio delivers at most 10 media items per message.
const MAX_MEDIA_ITEMS: usize = 10;

/// Terminal outcome of a webhook delivery, used as the metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Accepted,
    Duplicate,
    UnknownSalon,
    Invalid,
    Unauthorized,
    Error,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Duplicate => "duplicate",
            Outcome::UnknownSalon => "unknown_salon",
            Outcome::Invalid => "invalid",
            Outcome::Unauthorized => "unauthorized",
            Outcome::Error => "error",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Outcome::Accepted | Outcome::Duplicate | Outcome::UnknownSalon => StatusCode::OK,
            Outcome::Invalid => StatusCode::BAD_REQUEST,
            Outcome::Unauthorized => StatusCode::UNAUTHORIZED,
            Outcome::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Record the outcome and build the (empty-bodied) wire response.
fn finish(outcome: Outcome) -> Response {
    record_webhook_request(outcome.label());
    outcome.status().into_response()
}

/// POST /webhook
///
/// Twilio delivers inbound WhatsApp messages here as form posts. The reply
/// body is always empty; the conversational answer goes out later through
/// the provider API from the worker.
pub async fn post_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/x-www-form-urlencoded") {
        tracing::warn!(content_type, "webhook rejected: unsupported content type");
        return finish(Outcome::Invalid);
    }

    let params: BTreeMap<String, String> = match serde_urlencoded::from_str(&body) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!(error = %e, "webhook rejected: malformed form body");
            return finish(Outcome::Invalid);
        }
    };

    if !state.config.webhook.skip_signature_validation {
        match verify_signature(&state, &headers, &params) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("webhook rejected: signature mismatch");
                return finish(Outcome::Unauthorized);
            }
            Err(reason) => {
                tracing::warn!(reason, "webhook rejected: signature not verifiable");
                return finish(Outcome::Unauthorized);
            }
        }
    }

    let message = match parse_inbound(&params) {
        Ok(message) => message,
        Err(reason) => {
            tracing::warn!(reason, "webhook rejected: schema violation");
            return finish(Outcome::Invalid);
        }
    };
    let sid = message.sid.as_str().to_string();

    // Idempotency first: a redelivered sid must short-circuit before any
    // other store traffic.
    match tokio::time::timeout(
        IDEMPOTENCY_TIMEOUT,
        idempotency::is_processed(&state.db, &sid),
    )
    .await
    {
        Ok(Ok(true)) => {
            tracing::info!(sid, "webhook delivery already processed");
            return finish(Outcome::Duplicate);
        }
        Ok(Ok(false)) => {}
        Ok(Err(e)) => {
            tracing::error!(sid, error = %e, "idempotency lookup failed");
            return finish(Outcome::Error);
        }
        Err(_) => {
            tracing::error!(sid, "idempotency lookup timed out");
            return finish(Outcome::Error);
        }
    }

    let salon = match state
        .directory
        .salon_by_number(&normalize_phone(&message.to_phone))
        .await
    {
        Ok(Some(salon)) => salon,
        Ok(None) => {
            // Not an error on the wire: a 4xx/5xx would make the transport
            // retry a message no tenant will ever claim.
            tracing::warn!(sid, "webhook delivery for unknown recipient number");
            return finish(Outcome::UnknownSalon);
        }
        Err(e) => {
            tracing::error!(sid, error = %e, "salon resolution failed");
            return finish(Outcome::Error);
        }
    };

    let started = Instant::now();
    match tokio::time::timeout(PERSIST_TIMEOUT, inbound::insert(&state.db, &message)).await {
        Ok(Ok(true)) => record_store_latency(started.elapsed().as_secs_f64()),
        Ok(Ok(false)) => {
            // Raced with another delivery of the same sid that already
            // persisted (and will enqueue) this message.
            tracing::info!(sid, "inbound message already persisted");
            return finish(Outcome::Duplicate);
        }
        Ok(Err(e)) => {
            tracing::error!(sid, error = %e, "failed to persist inbound message");
            return finish(Outcome::Error);
        }
        Err(_) => {
            tracing::error!(sid, "inbound persist timed out");
            return finish(Outcome::Error);
        }
    }

    let payload = JobPayload {
        message,
        salon_id: salon.id,
    };
    let payload_json = match serde_json::to_string(&payload) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(sid, error = %e, "failed to serialize job payload");
            return finish(Outcome::Error);
        }
    };

    match tokio::time::timeout(
        ENQUEUE_TIMEOUT,
        queue::enqueue(&state.db, &payload_json, state.config.queue.max_attempts),
    )
    .await
    {
        Ok(Ok(job_id)) => {
            tracing::info!(sid, job_id, salon_id = salon.id, "inbound message enqueued");
        }
        Ok(Err(e)) => {
            tracing::error!(sid, error = %e, "failed to enqueue job");
            return finish(Outcome::Error);
        }
        Err(_) => {
            tracing::error!(sid, "enqueue timed out");
            return finish(Outcome::Error);
        }
    }

    // Marked only after the job exists. If this write fails the worst case
    // is one wasted redelivery, which the inbound sid insert dedupes.
    if let Err(e) = idempotency::mark_processed(
        &state.db,
        &sid,
        state.config.queue.idempotency_ttl_secs,
    )
    .await
    {
        tracing::warn!(sid, error = %e, "failed to mark idempotency key");
    }

    finish(Outcome::Accepted)
}

/// Resolve the exact public URL Twilio signed and verify the signature.
fn verify_signature(
    state: &WebhookState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<bool, &'static str> {
    let Some(auth_token) = state.config.twilio.auth_token.as_deref() else {
        return Err("twilio auth token not configured");
    };
    let Some(provided) = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return Err("missing X-Twilio-Signature header");
    };

    // Prefer the configured public URL: behind a proxy the Host header does
    // not match what Twilio signed.
    let url = match &state.config.webhook.public_url {
        Some(base) => format!("{}/webhook", base.trim_end_matches('/')),
        None => {
            let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
                return Err("missing Host header");
            };
            format!("https://{host}/webhook")
        }
    };

    Ok(navalha_twilio::signature::validate(
        auth_token,
        &url,
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        provided,
    ))
}

/// Validate the Twilio form schema and build the domain message.
///
/// Runs before any side effect; a violation means the request never touches
/// the store or the queue.
fn parse_inbound(params: &BTreeMap<String, String>) -> Result<InboundMessage, String> {
    let sid = params
        .get("MessageSid")
        .ok_or("missing MessageSid")?
        .as_str();
    let sid = MessageSid::parse(sid).ok_or_else(|| format!("malformed MessageSid: {sid:?}"))?;

    let from_phone = require_whatsapp_address(params, "From")?;
    let to_phone = require_whatsapp_address(params, "To")?;

    let num_media: usize = match params.get("NumMedia") {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("NumMedia is not a non-negative integer: {raw:?}"))?,
        None => 0,
    };
    // Twilio sends at most 10 media items; anything larger is not a real
    // delivery, and the count sizes an allocation below.
    if num_media > MAX_MEDIA_ITEMS {
        return Err(format!("NumMedia {num_media} exceeds the provider limit"));
    }
    let mut media = Vec::with_capacity(num_media);
    for i in 0..num_media {
        let content_type = params
            .get(&format!("MediaContentType{i}"))
            .ok_or_else(|| format!("missing MediaContentType{i}"))?;
        let url = params
            .get(&format!("MediaUrl{i}"))
            .ok_or_else(|| format!("missing MediaUrl{i}"))?;
        media.push(MediaItem {
            content_type: content_type.clone(),
            url: url.clone(),
        });
    }

    Ok(InboundMessage {
        sid,
        from_phone,
        to_phone,
        body: params.get("Body").cloned().unwrap_or_default(),
        media,
        profile_name: params.get("ProfileName").cloned(),
        received_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    })
}

fn require_whatsapp_address(
    params: &BTreeMap<String, String>,
    field: &str,
) -> Result<String, String> {
    let value = params.get(field).ok_or_else(|| format!("missing {field}"))?;
    if !value.starts_with("whatsapp:+") {
        return Err(format!("{field} is not a whatsapp:+ address"));
    }
    Ok(value.clone())
}

/// Query parameters for GET /webhook/health.
#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// When true, embed queue counts in the report.
    #[serde(default)]
    pub metrics: bool,
}

/// GET /webhook/health
///
/// 200 for healthy/degraded, 503 for unhealthy. The report never contains
/// secrets, connection strings, or customer data.
pub async fn get_health(
    State(state): State<WebhookState>,
    Query(query): Query<HealthQuery>,
) -> Response {
    state.health.respond(query.metrics).await
}

/// GET /metrics
///
/// Prometheus text exposition, when a recorder is installed.
pub async fn get_metrics(State(state): State<WebhookState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "MessageSid".to_string(),
                "SM0123456789abcdef0123456789abcdef".to_string(),
            ),
            ("From".to_string(), "whatsapp:+5511987654321".to_string()),
            ("To".to_string(), "whatsapp:+5511912345678".to_string()),
            ("Body".to_string(), "Quais serviços vocês oferecem?".to_string()),
            ("NumMedia".to_string(), "0".to_string()),
        ])
    }

    #[test]
    fn parse_inbound_accepts_valid_form() {
        let msg = parse_inbound(&base_params()).unwrap();
        assert_eq!(msg.sid.as_str(), "SM0123456789abcdef0123456789abcdef");
        assert_eq!(msg.from_phone, "whatsapp:+5511987654321");
        assert_eq!(msg.body, "Quais serviços vocês oferecem?");
        assert!(msg.media.is_empty());
    }

    #[test]
    fn parse_inbound_rejects_bad_sid() {
        let mut params = base_params();
        params.insert("MessageSid".to_string(), "XX123".to_string());
        let err = parse_inbound(&params).unwrap_err();
        assert!(err.contains("MessageSid"));
    }

    #[test]
    fn parse_inbound_rejects_missing_from() {
        let mut params = base_params();
        params.remove("From");
        assert!(parse_inbound(&params).unwrap_err().contains("From"));
    }

    #[test]
    fn parse_inbound_rejects_non_whatsapp_address() {
        let mut params = base_params();
        params.insert("From".to_string(), "+5511987654321".to_string());
        assert!(parse_inbound(&params).unwrap_err().contains("whatsapp"));
    }

    #[test]
    fn parse_inbound_rejects_negative_num_media() {
        let mut params = base_params();
        params.insert("NumMedia".to_string(), "-1".to_string());
        assert!(parse_inbound(&params).unwrap_err().contains("NumMedia"));
    }

    #[test]
    fn parse_inbound_rejects_num_media_above_provider_limit() {
        let mut params = base_params();
        params.insert("NumMedia".to_string(), "11".to_string());
        assert!(parse_inbound(&params).unwrap_err().contains("NumMedia"));

        // A count sized to overflow an allocation must fail the same way,
        // not take down the handler.
        params.insert("NumMedia".to_string(), usize::MAX.to_string());
        assert!(parse_inbound(&params).unwrap_err().contains("NumMedia"));
    }

    #[test]
    fn parse_inbound_requires_media_fields_per_index() {
        let mut params = base_params();
        params.insert("NumMedia".to_string(), "1".to_string());
        params.insert("MediaContentType0".to_string(), "image/jpeg".to_string());
        // MediaUrl0 missing.
        assert!(parse_inbound(&params).unwrap_err().contains("MediaUrl0"));

        params.insert(
            "MediaUrl0".to_string(),
            "https://api.twilio.com/media/ME123".to_string(),
        );
        let msg = parse_inbound(&params).unwrap();
        assert_eq!(msg.media.len(), 1);
        assert_eq!(msg.media[0].content_type, "image/jpeg");
    }

    #[test]
    fn parse_inbound_defaults_body_to_empty() {
        let mut params = base_params();
        params.remove("Body");
        let msg = parse_inbound(&params).unwrap();
        assert_eq!(msg.body, "");
    }

    #[test]
    fn outcome_statuses_collapse_drops_to_ok() {
        assert_eq!(Outcome::Accepted.status(), StatusCode::OK);
        assert_eq!(Outcome::Duplicate.status(), StatusCode::OK);
        assert_eq!(Outcome::UnknownSalon.status(), StatusCode::OK);
        assert_eq!(Outcome::Invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Outcome::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Outcome::Error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
