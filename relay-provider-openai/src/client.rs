//! The OpenAI-compatible [`Provider`] implementation: HTTP transport over
//! the mapping/streaming layers, parameterized by [`crate::model_map`].

use std::future::Future;

use futures::stream;
use relay_context::{limits_for_model, TokenCounter};
use relay_provider::map_http_status;
use relay_types::{CompletionRequest, Message, Provider, ProviderError, ProviderResponse, StreamHandle};

use crate::mapping::{parse_response, to_api_request};
use crate::model_map::{profile_for, AuthStyle};
use crate::streaming::parse_sse_stream;

/// Extract the raw `Retry-After` header value, if present, before the
/// response body is consumed.
fn retry_after_header(response: &reqwest::Response) -> Option<String> {
    response.headers().get("retry-after").and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Moonshot/Kimi and peer OpenAI-compatible backends, selected by
/// `provider` name (one of [`crate::model_map::PROFILES`]).
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    auth_style: AuthStyle,
    api_key: String,
    provider: String,
    model: String,
    counter: TokenCounter,
}

impl OpenAiCompatibleProvider {
    /// Build a client for `provider` (e.g. `"moonshot"`), serving `model`.
    ///
    /// # Errors
    /// Returns [`ProviderError::ModelNotFound`] if `provider` isn't one of
    /// the known backends.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let provider = provider.into();
        let profile = profile_for(&provider)
            .ok_or_else(|| ProviderError::ModelNotFound(format!("unknown provider '{provider}'")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: profile.base_url.to_string(),
            auth_style: profile.auth_style,
            api_key: api_key.into(),
            provider,
            model: model.into(),
            counter: TokenCounter::new(),
        })
    }

    fn wire_model(&self) -> String {
        crate::model_map::map_model_name(&self.provider, &self.model)
    }

    fn request_builder(&self, streaming: bool, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body);
        if matches!(self.auth_style, AuthStyle::BearerWithReferer) {
            builder = builder
                .header("HTTP-Referer", "https://github.com/")
                .header("X-Title", "relay");
        }
        let _ = streaming;
        builder
    }
}

impl Provider for OpenAiCompatibleProvider {
    fn initialize(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        async { Ok(()) }
    }

    fn generate_content(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        async move {
            let body = to_api_request(&request, &self.wire_model());
            let response = self
                .request_builder(false, &body)
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
            parse_response(&value, &self.provider)
        }
    }

    /// Falls back to [`Self::generate_content`] wrapped as a one-item stream
    /// whenever `request.tools` is non-empty, so a `tool_call.function.arguments`
    /// fragment is never exposed half-parsed; tool-free requests stream real
    /// text deltas.
    fn generate_content_stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<StreamHandle, ProviderError>> + Send {
        async move {
            if !request.tools.is_empty() {
                let result = self.generate_content(request).await;
                let chunks = stream::once(async move { result });
                return Ok(StreamHandle::new(Box::pin(chunks)));
            }

            let mut body = to_api_request(&request, &self.wire_model());
            body["stream"] = serde_json::json!(true);
            let response = self
                .request_builder(true, &body)
                .send()
                .await
                .map_err(relay_provider::map_reqwest_error)?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let retry_after = retry_after_header(&response);
                let text = response.text().await.unwrap_or_default();
                return Err(map_http_status(status, &text, retry_after.as_deref()));
            }

            let chunks = parse_sse_stream(response.bytes_stream(), self.provider.clone());
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
