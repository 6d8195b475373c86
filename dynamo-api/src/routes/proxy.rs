//! Upstream proxy handlers.
//!
//! Sequential pipeline per request: extract context → build upstream call → forward
//! (non-streaming or SSE) → reshape for the calling surface → fire-and-forget
//! `record_usage`/`commit_audit_log`. Grounded on the Ai-Link `proxy-handler.rs`'s
//! "forward, then fire-and-forget audit regardless of path" shape, adapted to two
//! surfaces and axum's `Sse` response type instead of a raw header-copying response.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use dynamo_core::{AuditContext, AuthContext, DynamoError};
use dynamo_llm::types::{MessageRequest, StreamEvent};
use dynamo_llm::AnthropicClient;
use dynamo_storage::{AuditEntry, AuditStatus, DbClient};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::UpstreamConfig;
use crate::middleware::body::read_json_body;
use crate::middleware::request_id::RequestId;
use crate::middleware::router::RouterContext;
use crate::surface::{self, Surface};

async fn build_request(
    request: Request,
    surface: Surface,
    default_max_tokens: i32,
) -> Result<(MessageRequest, AuthContext, AuditContext, String, String), DynamoError> {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.to_string())
        .unwrap_or_default();
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(DynamoError::auth_required)?;
    let audit = request
        .extensions()
        .get::<AuditContext>()
        .cloned()
        .ok_or_else(|| DynamoError::internal_error("audit context missing"))?;
    let router_ctx = request.extensions().get::<RouterContext>().cloned();

    let (_request, mut body) = read_json_body(request).await?;
    if let (Some(ctx), Value::Object(map)) = (&router_ctx, &mut body) {
        map.insert("model".to_string(), Value::String(ctx.resolved_model.clone()));
    }

    let mut upstream_request = surface::parse_request(&body, surface, default_max_tokens)
        .ok_or_else(|| DynamoError::invalid_request("messages must be a non-empty array"))?;

    if upstream_request.model.is_empty() {
        upstream_request.model = router_ctx
            .map(|c| c.resolved_model)
            .unwrap_or_else(|| dynamo_core::MODEL_SONNET.to_string());
    }

    Ok((upstream_request, auth, audit, request_id, surface_name(surface).to_string()))
}

fn surface_name(surface: Surface) -> &'static str {
    match surface {
        Surface::ChatCompletion => "chat_completion",
        Surface::Native => "native",
    }
}

fn category_str(category: dynamo_core::Category) -> &'static str {
    category.as_str()
}

#[derive(Clone)]
struct RequestMeta {
    request_id: String,
    auth: AuthContext,
    audit: AuditContext,
}

const RESPONSE_PREVIEW_CHARS: usize = 200;

fn response_preview(text: &str) -> String {
    let char_count = text.chars().count();
    let truncated: String = text.chars().take(RESPONSE_PREVIEW_CHARS).collect();
    if char_count > RESPONSE_PREVIEW_CHARS {
        format!("{truncated}...")
    } else {
        truncated
    }
}

#[allow(clippy::too_many_arguments)]
async fn finalize(
    db: &DbClient,
    meta: &RequestMeta,
    model: &str,
    input_tokens: i64,
    output_tokens: i64,
    latency_ms: i64,
    status: AuditStatus,
    response_text: &str,
) {
    let cost = dynamo_core::budget::estimate_cost(model, input_tokens.max(0) as u64, output_tokens.max(0) as u64);

    if let Some(user_id) = meta.auth.user_id.clone() {
        let user_email = meta.auth.user_email.clone().unwrap_or_default();
        let role = meta.auth.role;
        let model = model.to_string();
        let category = category_str(meta.audit.category);
        let db = db.clone();
        tokio::spawn(async move {
            if !db.is_configured() {
                return;
            }
            if let Err(e) = dynamo_storage::record_usage(
                &db,
                &user_id,
                &user_email,
                role,
                &model,
                input_tokens,
                output_tokens,
                cost,
                Some(category),
            )
            .await
            {
                tracing::warn!(error = %e, user_id = %user_id, "failed to record usage");
            }
        });
    }

    let entry = AuditEntry {
        request_id: meta.request_id.clone(),
        user_id: meta.auth.user_id.clone(),
        user_email: meta.auth.user_email.clone(),
        timestamp: chrono::Utc::now(),
        model: model.to_string(),
        input_tokens,
        output_tokens,
        cost_estimate: cost,
        request_category: Some(category_str(meta.audit.category).to_string()),
        source: meta.audit.source.as_str(),
        prompt_hash: meta.audit.prompt_hash.clone(),
        prompt_preview: meta.audit.prompt_preview.clone(),
        response_preview: response_preview(response_text),
        latency_ms,
        status,
    };
    let db = db.clone();
    tokio::spawn(async move {
        dynamo_storage::commit_audit_log(&db, &entry).await;
    });
}

async fn handle_non_streaming(
    upstream: &AnthropicClient,
    db: &DbClient,
    meta: RequestMeta,
    mut upstream_request: MessageRequest,
    surface: Surface,
) -> Result<Response, DynamoError> {
    let started = std::time::Instant::now();
    upstream_request.stream = Some(false);
    let model = upstream_request.model.clone();

    let result = upstream.send_message(upstream_request).await;
    let latency_ms = started.elapsed().as_millis() as i64;

    match result {
        Ok(response) => {
            let text = surface::joined_text(&response);
            finalize(
                db,
                &meta,
                &response.model,
                response.usage.input_tokens,
                response.usage.output_tokens,
                latency_ms,
                AuditStatus::Success,
                &text,
            )
            .await;

            let body = match surface {
                Surface::ChatCompletion => surface::to_chat_completion_response(&response, chrono::Utc::now().timestamp()),
                Surface::Native => serde_json::to_value(&response).unwrap_or(Value::Null),
            };
            Ok(Json(body).into_response())
        }
        Err(e) => {
            finalize(db, &meta, &model, 0, 0, latency_ms, AuditStatus::Error, "").await;
            Err(DynamoError::from(e))
        }
    }
}

async fn handle_streaming(
    upstream: Arc<AnthropicClient>,
    db: DbClient,
    meta: RequestMeta,
    mut upstream_request: MessageRequest,
    surface: Surface,
) -> Result<Response, DynamoError> {
    upstream_request.stream = Some(true);
    let requested_model = upstream_request.model.clone();
    let created = chrono::Utc::now().timestamp();
    let stream_id = uuid::Uuid::new_v4().to_string();

    let upstream_stream = upstream
        .stream_message(upstream_request)
        .await
        .map_err(DynamoError::from)?;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Event, Infallible>>();

    tokio::spawn(async move {
        let started = std::time::Instant::now();
        let mut model = requested_model;
        let mut input_tokens: i64 = 0;
        let mut output_tokens: i64 = 0;
        let mut text_buffer = String::new();
        let mut upstream_stream = Box::pin(upstream_stream);

        if surface == Surface::ChatCompletion {
            let chunk = surface::chat_completion_role_chunk(&stream_id, created, &model);
            let _ = tx.send(Ok(Event::default().data(chunk.to_string())));
        }

        while let Some(event) = upstream_stream.next().await {
            let event: StreamEvent = match event {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream read failed");
                    break;
                }
            };

            if let Some(tokens) = event.message_start_input_tokens() {
                input_tokens = tokens;
            }
            if let Some(m) = event.message_start_model() {
                model = m.to_string();
            }

            if let Some(text) = event.text_delta() {
                text_buffer.push_str(text);
                match surface {
                    Surface::ChatCompletion => {
                        let chunk = surface::chat_completion_chunk(&stream_id, created, &model, Some(text), None);
                        if tx.send(Ok(Event::default().data(chunk.to_string()))).is_err() {
                            return;
                        }
                    }
                    Surface::Native => {
                        if tx
                            .send(Ok(Event::default().event(event.event.clone()).data(event.data.to_string())))
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                continue;
            }

            if let Some(tokens) = event.message_delta_output_tokens() {
                output_tokens = tokens;
            }

            if event.event == "message_delta" {
                let finish_reason = surface::map_finish_reason(event.message_delta_stop_reason());
                match surface {
                    Surface::ChatCompletion => {
                        let chunk = surface::chat_completion_chunk(&stream_id, created, &model, None, finish_reason);
                        if tx.send(Ok(Event::default().data(chunk.to_string()))).is_err() {
                            return;
                        }
                    }
                    Surface::Native => {
                        if tx
                            .send(Ok(Event::default().event(event.event.clone()).data(event.data.to_string())))
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                continue;
            }

            if surface == Surface::Native {
                if tx
                    .send(Ok(Event::default().event(event.event.clone()).data(event.data.to_string())))
                    .is_err()
                {
                    return;
                }
            }
        }

        if surface == Surface::ChatCompletion {
            let _ = tx.send(Ok(Event::default().data("[DONE]")));
        }

        let latency_ms = started.elapsed().as_millis() as i64;
        finalize(
            &db,
            &meta,
            &model,
            input_tokens,
            output_tokens,
            latency_ms,
            AuditStatus::Success,
            &text_buffer,
        )
        .await;
    });

    let stream = UnboundedReceiverStream::new(rx);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}

async fn proxy(
    State(upstream): State<Arc<AnthropicClient>>,
    State(db): State<DbClient>,
    State(upstream_config): State<Arc<UpstreamConfig>>,
    surface: Surface,
    request: Request,
) -> Result<Response, DynamoError> {
    let (upstream_request, auth, audit, request_id, _surface_name) =
        build_request(request, surface, upstream_config.max_tokens).await?;

    let meta = RequestMeta { request_id, auth, audit };
    let is_streaming = upstream_request.stream.unwrap_or(false);

    if is_streaming {
        handle_streaming(upstream, db, meta, upstream_request, surface).await
    } else {
        handle_non_streaming(&upstream, &db, meta, upstream_request, surface).await
    }
}

pub async fn chat_completions(
    state_upstream: State<Arc<AnthropicClient>>,
    state_db: State<DbClient>,
    state_cfg: State<Arc<UpstreamConfig>>,
    request: Request,
) -> Result<Response, DynamoError> {
    proxy(state_upstream, state_db, state_cfg, Surface::ChatCompletion, request).await
}

pub async fn messages(
    state_upstream: State<Arc<AnthropicClient>>,
    state_db: State<DbClient>,
    state_cfg: State<Arc<UpstreamConfig>>,
    request: Request,
) -> Result<Response, DynamoError> {
    proxy(state_upstream, state_db, state_cfg, Surface::Native, request).await
}
