//! The Gemini [`Provider`] implementation: HTTP transport over the
//! mapping/streaming layers.

use std::future::Future;

use relay_context::{limits_for_model, TokenCounter};
use relay_provider::map_http_status;
use relay_types::{CompletionRequest, Message, Provider, ProviderError, ProviderResponse, StreamHandle};

use crate::mapping::{parse_response, to_api_request};
use crate::streaming::parse_sse_stream;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Extract the raw `Retry-After` header value, if present, before the
/// response body is consumed.
fn retry_after_header(response: &reqwest::Response) -> Option<String> {
    response.headers().get("retry-after").and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Gemini native function-calling adapter.
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    counter: TokenCounter,
}

impl GeminiProvider {
    /// Build a client for `model`, authenticating with `api_key`.
    #[must_use]
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            counter: TokenCounter::new(),
        }
    }

    /// Override the base URL (for testing against a local mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, streaming: bool) -> String {
        let method = if streaming { "streamGenerateContent" } else { "generateContent" };
        let alt = if streaming { "&alt=sse" } else { "" };
        format!(
            "{}/models/{}:{method}?key={}{alt}",
            self.base_url, self.model, self.api_key
        )
    }
}

impl Provider for GeminiProvider {
    fn initialize(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        async { Ok(()) }
    }

    fn generate_content(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        async move {
            let body = to_api_request(&request);
            let response = self
                .http
                .post(self.endpoint(false))
                .json(&body)
                .send()
                .await
                .map_err(relay_provider::map_reqwest_error)?;

            let status = response.status().as_u16();
            let retry_after = retry_after_header(&response);
            let text = response.text().await.map_err(relay_provider::map_reqwest_error)?;
            if !(200..300).contains(&status) {
                return Err(map_http_status(status, &text, retry_after.as_deref()));
            }

            let value: serde_json::Value =
                serde_json::from_str(&text).map_err(|err| ProviderError::InvalidRequest(err.to_string()))?;
            parse_response(&value, "gemini")
        }
    }

    fn generate_content_stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<StreamHandle, ProviderError>> + Send {
        async move {
            let body = to_api_request(&request);
            let response = self
                .http
                .post(self.endpoint(true))
                .json(&body)
                .send()
                .await
                .map_err(relay_provider::map_reqwest_error)?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let retry_after = retry_after_header(&response);
                let text = response.text().await.unwrap_or_default();
                return Err(map_http_status(status, &text, retry_after.as_deref()));
            }

            let chunks = parse_sse_stream(response.bytes_stream(), "gemini".to_string());
            Ok(StreamHandle::new(Box::pin(chunks)))
        }
    }

    fn count_tokens(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn context_limit(&self) -> usize {
        limits_for_model(&self.model).total
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_endpoint_uses_sse_and_stream_method() {
        let provider = GeminiProvider::new("gemini-2.0-flash-exp", "secret");
        let url = provider.endpoint(true);
        assert!(url.contains(":streamGenerateContent"));
        assert!(url.contains("alt=sse"));
    }

    #[test]
    fn non_streaming_endpoint_has_no_sse_param() {
        let provider = GeminiProvider::new("gemini-2.0-flash-exp", "secret");
        let url = provider.endpoint(false);
        assert!(url.contains(":generateContent"));
        assert!(!url.contains("alt=sse"));
    }

    #[test]
    fn context_limit_matches_the_model_table() {
        let provider = GeminiProvider::new("gemini-2.5-pro", "secret");
        assert_eq!(provider.context_limit(), 2_097_152);
    }
}
