//! SSE streaming for the Chat Completions `chat.completion.chunk` format.
//!
//! Only used for tool-free requests (§4.1.3 path (b) for the
//! tool-enabled case falls back to [`crate::client::OpenAiCompatibleProvider::generate_content_stream`]
//! calling the non-streaming endpoint once instead). Each `data:` event
//! carries an incremental `delta.content` text fragment, never a complete
//! message, so each parsed event becomes a single-`Text`-part response.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_types::{Candidate, Message, Part, ProviderError, ProviderResponse, Role, StreamItem};
use serde_json::Value;

/// Turn a raw SSE byte stream of `chat.completion.chunk` events into a
/// stream of parsed [`StreamItem`]s, one per text delta.
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
                match serde_json::from_str::<Value>(data) {
                    Ok(value) => yield parse_chunk(&value, &provider_tag),
                    Err(err) => yield Err(ProviderError::StreamError(format!("malformed SSE JSON: {err}"))),
                }
            }
        }
    }
}

fn parse_chunk(value: &Value, provider_tag: &str) -> Result<ProviderResponse, ProviderError> {
    let choice = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ProviderError::StreamError("chunk missing choices[0]".to_string()))?;

    let delta_text = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let finish_reason = choice.get("finish_reason").and_then(Value::as_str).map(str::to_string);

    let parts = if delta_text.is_empty() { Vec::new() } else { vec![Part::Text(delta_text.to_string())] };

    Ok(ProviderResponse {
        candidates: vec![Candidate { content: Message::new(Role::Model, parts), finish_reason }],
        usage: None,
        provider_tag: provider_tag.to_string(),
    })
}
