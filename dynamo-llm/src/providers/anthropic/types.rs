//! Anthropic Messages API request/response/stream-event shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// `content` accepts either a plain string or a list of `{type:"text", text}` blocks;
/// both surfaces normalize down to this before the request is sent upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub role: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One parsed SSE event from the upstream `messages` stream. `raw` retains the
/// original `data:` JSON payload so the native surface can pass it through verbatim.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub event: String,
    pub data: Value,
}

impl StreamEvent {
    pub fn message_start_input_tokens(&self) -> Option<i64> {
        if self.event != "message_start" {
            return None;
        }
        self.data
            .get("message")?
            .get("usage")?
            .get("input_tokens")?
            .as_i64()
    }

    pub fn message_start_model(&self) -> Option<&str> {
        if self.event != "message_start" {
            return None;
        }
        self.data.get("message")?.get("model")?.as_str()
    }

    pub fn text_delta(&self) -> Option<&str> {
        if self.event != "content_block_delta" {
            return None;
        }
        let delta = self.data.get("delta")?;
        if delta.get("type")?.as_str()? != "text_delta" {
            return None;
        }
        delta.get("text")?.as_str()
    }

    pub fn message_delta_output_tokens(&self) -> Option<i64> {
        if self.event != "message_delta" {
            return None;
        }
        self.data.get("usage")?.get("output_tokens")?.as_i64()
    }

    pub fn message_delta_stop_reason(&self) -> Option<&str> {
        if self.event != "message_delta" {
            return None;
        }
        self.data.get("delta")?.get("stop_reason")?.as_str()
    }
}
