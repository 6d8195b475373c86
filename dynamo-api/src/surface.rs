//! Request/response shape translation between the two public surfaces and the
//! upstream native Messages API. Pure functions only - the HTTP plumbing lives in
//! `routes::proxy`.

use dynamo_llm::types::{ContentBlock, Message, MessageRequest, MessageResponse};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    ChatCompletion,
    Native,
}

/// Normalizes either surface's `content` field (plain string, or a list of
/// `{type:"text", text}` blocks) down to a single string.
fn content_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Builds the upstream `MessageRequest` from either surface's raw JSON body.
/// `messages` must be a non-empty array; in the native surface `max_tokens` is
/// mandatory (defaulted here only for the chat-completion surface).
pub fn parse_request(body: &Value, surface: Surface, default_max_tokens: i32) -> Option<MessageRequest> {
    let messages_json = body.get("messages")?.as_array()?;
    if messages_json.is_empty() {
        return None;
    }

    let mut system = body.get("system").and_then(Value::as_str).map(str::to_string);
    let mut messages = Vec::with_capacity(messages_json.len());
    for m in messages_json {
        let role = m.get("role")?.as_str()?.to_string();
        let text = content_to_text(m.get("content")?);
        if surface == Surface::ChatCompletion && role == "system" {
            system = Some(text);
            continue;
        }
        messages.push(Message { role, content: text });
    }

    let max_tokens = body
        .get("max_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .unwrap_or(default_max_tokens);

    if surface == Surface::Native && body.get("max_tokens").is_none() {
        return None;
    }

    Some(MessageRequest {
        model: body.get("model").and_then(Value::as_str).unwrap_or_default().to_string(),
        messages,
        max_tokens,
        system,
        temperature: body.get("temperature").and_then(Value::as_f64).map(|v| v as f32),
        top_p: body.get("top_p").and_then(Value::as_f64).map(|v| v as f32),
        top_k: body.get("top_k").and_then(Value::as_i64).map(|v| v as i32),
        stop_sequences: body
            .get("stop_sequences")
            .or_else(|| body.get("stop"))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        metadata: body.get("metadata").cloned(),
        stream: body.get("stream").and_then(Value::as_bool),
    })
}

/// Joins the prompt's user-visible text for the sensitive-data scanner, classifier,
/// and audit preview: the top-level `system` string (if any) prepended, then every
/// message's normalized content, newline-joined.
pub fn extract_prompt_text(body: &Value) -> String {
    let system = body.get("system").and_then(Value::as_str);
    let messages = body.get("messages").and_then(Value::as_array);

    let mut parts: Vec<String> = Vec::new();
    if let Some(system) = system {
        parts.push(system.to_string());
    }
    if let Some(messages) = messages {
        parts.extend(messages.iter().filter_map(|m| m.get("content")).map(content_to_text));
    }
    parts.join("\n")
}

pub fn map_finish_reason(stop_reason: Option<&str>) -> Option<&'static str> {
    match stop_reason {
        Some("end_turn") | Some("stop_sequence") => Some("stop"),
        Some("max_tokens") => Some("length"),
        _ => None,
    }
}

pub(crate) fn joined_text(response: &MessageResponse) -> String {
    response
        .content
        .iter()
        .map(|b| match b {
            ContentBlock::Text { text } => text.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Reshapes a non-streaming upstream response for the chat-completion surface.
/// `created` is the caller's own wall-clock unix timestamp (not re-derived here so
/// tests can pin it).
pub fn to_chat_completion_response(response: &MessageResponse, created: i64) -> Value {
    let finish_reason = map_finish_reason(response.stop_reason.as_deref());
    json!({
        "id": format!("chatcmpl-{}", response.id),
        "object": "chat.completion",
        "created": created,
        "model": response.model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": joined_text(response) },
            "finish_reason": finish_reason,
        }],
        "usage": {
            "prompt_tokens": response.usage.input_tokens,
            "completion_tokens": response.usage.output_tokens,
            "total_tokens": response.usage.input_tokens + response.usage.output_tokens,
        },
    })
}

pub fn chat_completion_chunk(id: &str, created: i64, model: &str, content: Option<&str>, finish_reason: Option<&str>) -> Value {
    let delta = match content {
        Some(text) => json!({ "content": text }),
        None => json!({}),
    };
    json!({
        "id": format!("chatcmpl-{id}"),
        "object": "chat.completion.chunk",
        "created": created,
        "model": model,
        "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }],
    })
}

pub fn chat_completion_role_chunk(id: &str, created: i64, model: &str) -> Value {
    json!({
        "id": format!("chatcmpl-{id}"),
        "object": "chat.completion.chunk",
        "created": created,
        "model": model,
        "choices": [{ "index": 0, "delta": { "role": "assistant" }, "finish_reason": null }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("end_turn")), Some("stop"));
        assert_eq!(map_finish_reason(Some("stop_sequence")), Some("stop"));
        assert_eq!(map_finish_reason(Some("max_tokens")), Some("length"));
        assert_eq!(map_finish_reason(Some("tool_use")), None);
        assert_eq!(map_finish_reason(None), None);
    }

    #[test]
    fn native_surface_requires_max_tokens() {
        let body = json!({ "messages": [{"role": "user", "content": "hi"}] });
        assert!(parse_request(&body, Surface::Native, 4096).is_none());
    }

    #[test]
    fn chat_completion_surface_defaults_max_tokens() {
        let body = json!({ "messages": [{"role": "user", "content": "hi"}] });
        let req = parse_request(&body, Surface::ChatCompletion, 4096).unwrap();
        assert_eq!(req.max_tokens, 4096);
    }

    #[test]
    fn empty_messages_rejected() {
        let body = json!({ "messages": [], "max_tokens": 10 });
        assert!(parse_request(&body, Surface::Native, 10).is_none());
    }

    #[test]
    fn system_role_lifted_out_of_messages_for_chat_surface() {
        let body = json!({
            "messages": [
                {"role": "system", "content": "be nice"},
                {"role": "user", "content": "hi"}
            ]
        });
        let req = parse_request(&body, Surface::ChatCompletion, 100).unwrap();
        assert_eq!(req.system.as_deref(), Some("be nice"));
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn content_blocks_join_with_newline() {
        let body = json!({
            "messages": [{"role": "user", "content": [{"type":"text","text":"a"},{"type":"text","text":"b"}]}],
            "max_tokens": 10
        });
        let req = parse_request(&body, Surface::Native, 10).unwrap();
        assert_eq!(req.messages[0].content, "a\nb");
    }

    #[test]
    fn extracts_prompt_text_from_all_messages() {
        let body = json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "second"}
            ]
        });
        assert_eq!(extract_prompt_text(&body), "first\nsecond");
    }

    #[test]
    fn extracts_prompt_text_prepends_system() {
        let body = json!({
            "system": "be careful",
            "messages": [{"role": "user", "content": "hi"}]
        });
        assert_eq!(extract_prompt_text(&body), "be careful\nhi");
    }
}
