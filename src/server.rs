//! HTTP surface: webhook ingestion plus operational endpoints.

use akasha_core::{config::Config, message::OutboundDispatch, traits::MessagingGateway};
use akasha_llm::ProviderRouter;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::broadcast::{fan_out, format_passage_message, DailyBroadcast, PassageGenerator};
use crate::gateway::{webhook::WebhookPayload, Gateway};

type HmacSha256 = Hmac<Sha256>;
type WebhookRateLimiter = governor::DefaultKeyedRateLimiter<String>;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub router: Arc<ProviderRouter>,
    pub bridge: Arc<dyn MessagingGateway>,
    pub generator: Arc<PassageGenerator>,
    pub broadcast: Arc<DailyBroadcast>,
    pub config: Arc<Config>,
    pub limiter: Arc<WebhookRateLimiter>,
    pub scheduler_running: bool,
}

impl AppState {
    pub fn rate_limiter(per_minute: u32) -> Arc<WebhookRateLimiter> {
        let quota = governor::Quota::per_minute(
            NonZeroU32::new(per_minute.max(1)).unwrap_or(NonZeroU32::MIN),
        );
        Arc::new(WebhookRateLimiter::keyed(quota))
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    quoted_context: Option<String>,
    recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratePassageRequest {
    topic: Option<String>,
    recipient: Option<String>,
}

/// Constant-time string comparison to prevent timing attacks on
/// signature validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Verify an `X-Hub-Signature-256` header against the raw body.
fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
    constant_time_eq(signature, &expected)
}

/// `GET /`: service identity and feature toggles.
async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.config.akasha.name,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "WhatsApp AI gateway",
        "services": {
            "reply": state.config.reply.enabled,
            "summarizer": state.config.summarizer.enabled,
            "broadcast": state.config.broadcast.enabled,
        }
    }))
}

/// `GET /health`: bridge connectivity plus scheduler state.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let bridge_connected = state.bridge.check_health().await;
    let status = if bridge_connected && (state.scheduler_running || !state.config.broadcast.enabled)
    {
        "healthy"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "bridge_connected": bridge_connected,
        "scheduler_running": state.scheduler_running,
    }))
}

/// `POST /webhook`: GoWA event ingestion.
///
/// Returns 200 for anything past signature and rate-limit checks, even
/// unparseable payloads, so the bridge never retries. Processing runs
/// in a spawned task to stay inside the bridge's delivery timeout.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let secret = &state.config.server.webhook_secret;
    if !secret.is_empty() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature verification failed");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "invalid signature"})),
            ));
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("unparseable webhook payload: {e}");
            return Ok(Json(json!({"status": "ok"})));
        }
    };

    if !payload.from.is_empty() && state.limiter.check_key(&payload.from).is_err() {
        warn!("rate limit exceeded for {}", payload.from);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate limit exceeded"})),
        ));
    }

    let gateway = state.gateway.clone();
    tokio::spawn(async move {
        gateway.handle_event(payload).await;
    });

    Ok(Json(json!({"status": "ok"})))
}

/// `POST /reply/query`: run the reply agent directly.
async fn reply_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let completion = state
        .router
        .process(&request.query, request.quoted_context.as_deref(), None)
        .await
        .map_err(|e| {
            error!("reply query failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        })?;

    let mut sent_to = None;
    if let Some(recipient) = &request.recipient {
        let dispatch = OutboundDispatch {
            destination: recipient.clone(),
            body: completion.text.clone(),
            reply_to: None,
        };
        match state.bridge.send(&dispatch).await {
            Ok(_) => {
                info!("reply query response sent to {recipient}");
                sent_to = Some(recipient.clone());
            }
            Err(e) => error!("failed to send to {recipient}: {e}"),
        }
    }

    Ok(Json(json!({
        "response": completion.text,
        "sources_used": completion.sources,
        "sent_to": sent_to,
        "provider_used": state.router.primary_name(),
    })))
}

/// `GET /reply/status`: reply agent configuration snapshot.
async fn reply_status(State(state): State<AppState>) -> Json<Value> {
    let cfg = &state.config;
    Json(json!({
        "enabled": cfg.reply.enabled,
        "primary_provider": cfg.provider.primary,
        "fallback_enabled": cfg.provider.fallback_enabled,
        "trigger_phrase": state.gateway.trigger_phrase(),
        "gemini_configured": !cfg.provider.gemini.api_keys.is_empty(),
        "openai_configured": !cfg.provider.openai.api_keys.is_empty(),
        "web_search_configured": !cfg.search.api_key.is_empty() && !cfg.search.engine_id.is_empty(),
    }))
}

/// `POST /passage/generate`: generate a passage, optionally sending
/// it to one recipient or to all configured ones.
async fn passage_generate(
    State(state): State<AppState>,
    Json(request): Json<GeneratePassageRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let generated = state
        .generator
        .generate(request.topic.as_deref())
        .await
        .map_err(|e| {
            error!("passage generation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        })?;

    let recipients: Vec<String> = match &request.recipient {
        Some(r) => vec![r.clone()],
        None => state.config.broadcast.recipients.clone(),
    };

    let mut sent_to = Vec::new();
    if !recipients.is_empty() {
        let message = format_passage_message(&generated.passage);
        let (sent, failures) = fan_out(
            state.bridge.clone(),
            &recipients,
            &message,
            state.config.broadcast.max_concurrent_sends,
        )
        .await;
        for (recipient, e) in &failures {
            error!("failed to send passage to {recipient}: {e}");
        }
        sent_to = sent;
    }

    Ok(Json(json!({
        "passage": generated.passage,
        "topic": generated.topic,
        "generated_at": Utc::now(),
        "sent_to": sent_to,
    })))
}

/// `POST /passage/trigger`: run the daily job immediately.
async fn passage_trigger(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let today = Utc::now().date_naive();
    let report = state.broadcast.run_for(today).await.map_err(|e| {
        error!("triggered broadcast failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
    })?;

    Ok(Json(json!({
        "status": "triggered",
        "job_key": report.job_key,
        "topic": report.topic,
        "success_count": report.success_count,
        "failed": report.failures.len(),
    })))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .route("/reply/query", post(reply_query))
        .route("/reply/status", get(reply_status))
        .route("/passage/generate", post(passage_generate))
        .route("/passage/trigger", post(passage_trigger))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Start the HTTP server and block until shutdown.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;

    info!("server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let secret = "test-secret";
        let body = br#"{"from":"x"}"#;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_signature(secret, body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_tampering() {
        let secret = "test-secret";
        let body = br#"{"from":"x"}"#;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(!verify_signature(secret, br#"{"from":"y"}"#, &signature));
        assert!(!verify_signature("other-secret", body, &signature));
        assert!(!verify_signature(secret, body, "sha256=deadbeef"));
        assert!(!verify_signature(secret, body, ""));
    }

    #[test]
    fn test_rate_limiter_blocks_after_quota() {
        let limiter = AppState::rate_limiter(2);
        let key = "628@s.whatsapp.net".to_string();
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());
        // Other senders are unaffected.
        assert!(limiter.check_key(&"other@s.whatsapp.net".to_string()).is_ok());
    }
}
