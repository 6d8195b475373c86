//! Client-side SSE parsing over the upstream byte stream.
//!
//! CALIBER's providers are request/response only, so there's no prior art for this
//! in that codebase. Parses the plain `event:`/`data:` framing that the
//! native-messages surface passes through verbatim, using `futures-util`/
//! `async-stream` rather than a dedicated SSE crate, since only decoding (not
//! reconnection/retry) is needed.

use futures_util::{Stream, StreamExt};
use reqwest::Response;

use crate::error::LlmError;
use crate::providers::anthropic::types::StreamEvent;

/// Turns the line-delimited `event: <type>\ndata: <json>\n\n` framing of an SSE
/// response body into a stream of parsed events. A blank line terminates a frame;
/// an `event:`-less frame (some upstreams omit it on `ping`) is skipped.
pub fn parse_sse_events(
    response: Response,
) -> impl Stream<Item = Result<StreamEvent, LlmError>> {
    async_stream::stream! {
        let mut bytes_stream = response.bytes_stream();
        let mut buf = String::new();
        let mut pending_event: Option<String> = None;
        let mut pending_data = String::new();

        loop {
            let chunk = match bytes_stream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    yield Err(LlmError::ProviderError { message: format!("stream read failed: {e}") });
                    return;
                }
                None => break,
            };

            buf.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(idx) = buf.find('\n') {
                let line = buf[..idx].trim_end_matches('\r').to_string();
                buf.drain(..=idx);

                if line.is_empty() {
                    if let Some(event) = pending_event.take() {
                        match serde_json::from_str(&pending_data) {
                            Ok(data) => yield Ok(StreamEvent { event, data }),
                            Err(e) => {
                                tracing::warn!(error = %e, "dropping malformed SSE frame");
                            }
                        }
                    }
                    pending_data.clear();
                    continue;
                }

                if let Some(rest) = line.strip_prefix("event:") {
                    pending_event = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    pending_data.push_str(rest.trim());
                }
            }
        }
    }
}
