//! SSE streaming for Gemini's `streamGenerateContent?alt=sse` endpoint.
//!
//! Gemini emits one complete `candidates[0].content.parts` array per SSE
//! `data:` line — no `tool_call.function.arguments` fragmentation like the
//! OpenAI-style wire format — so each parsed event already carries
//! complete `FunctionCall` parts (§4.1.3 path (a)).

use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_types::{ProviderError, StreamItem};

use crate::mapping::parse_response;

/// Turn a raw SSE byte stream into a stream of parsed [`StreamItem`]s.
pub fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    provider_tag: String,
) -> impl Stream<Item = StreamItem> + Send + 'static {
    async_stream::stream! {
        let mut buf = String::new();
        let mut bytes_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = match chunk {
                Ok(b) => b,
                Err(err) => {
                    yield Err(relay_provider::map_reqwest_error(err));
                    return;
                }
            };
            let Ok(text) = std::str::from_utf8(&chunk) else {
                yield Err(ProviderError::StreamError("invalid UTF-8 in SSE chunk".to_string()));
                return;
            };
            buf.push_str(text);

            while let Some(newline) = buf.find('\n') {
                let line = buf[..newline].trim_end_matches('\r').to_string();
                buf.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else { continue };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(data) {
                    Ok(value) => yield parse_response(&value, &provider_tag),
                    Err(err) => yield Err(ProviderError::StreamError(format!("malformed SSE JSON: {err}"))),
                }
            }
        }
    }
}
