//! Request/response mapping between the neutral model and Gemini's
//! `generateContent`/`streamGenerateContent` wire format (§4.1.1, §6.2).

use std::time::{SystemTime, UNIX_EPOCH};

use relay_provider::clean_schema;
use relay_types::{
    CallId, Candidate, CompletionRequest, Message, Part, ProviderError, ProviderResponse, Role, SystemPrompt, Usage,
};
use serde_json::{Map, Value};

/// Schema keys Gemini's `functionDeclarations` accept; everything else is
/// stripped (§4.1.1): `minimum/maximum/default/additionalProperties/pattern/format`.
pub const ALLOWED_SCHEMA_KEYS: &[&str] = &["type", "description", "properties", "required", "items", "enum"];

/// Build the JSON body for `POST /v1beta/models/{model}:(stream)?GenerateContent`.
///
/// `model` is not included in the body (it's part of the URL); callers
/// build the endpoint path separately.
#[must_use]
pub fn to_api_request(req: &CompletionRequest) -> Value {
    let mut body = serde_json::json!({
        "contents": req.messages.iter().map(message_to_content).collect::<Vec<_>>(),
    });

    if !req.tools.is_empty() {
        let declarations: Vec<Value> = req
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": clean_schema(&tool.schema, ALLOWED_SCHEMA_KEYS),
                })
            })
            .collect();
        body["tools"] = serde_json::json!([{ "functionDeclarations": declarations }]);
    }

    if let Some(system) = &req.system {
        body["systemInstruction"] = system_instruction(system);
    }

    let mut generation_config = Map::new();
    if let Some(temperature) = req.temperature {
        generation_config.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = req.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = req.top_p {
        generation_config.insert("topP".to_string(), Value::from(top_p));
    }
    if let Some(top_k) = req.top_k {
        generation_config.insert("topK".to_string(), Value::from(top_k));
    }
    if !req.stop_sequences.is_empty() {
        generation_config.insert("stopSequences".to_string(), Value::from(req.stop_sequences.clone()));
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

/// Gemini has no `Tool`/`System` wire role; `Tool` folds into `user` (its
/// `FunctionResponse` parts are what a provider-level `role` distinguishes),
/// and inline `System` messages are skipped since `req.system` already
/// carries the system instruction via its dedicated parameter (§4.1.1).
fn message_to_content(message: &Message) -> Value {
    let role = match message.role {
        Role::User | Role::Tool => "user",
        Role::Model => "model",
        Role::System => "user",
    };
    serde_json::json!({
        "role": role,
        "parts": message.parts.iter().map(part_to_wire).collect::<Vec<_>>(),
    })
}

fn part_to_wire(part: &Part) -> Value {
    match part {
        Part::Text(text) => serde_json::json!({ "text": text }),
        Part::FunctionCall { id, name, args } => serde_json::json!({
            "functionCall": { "id": id.0, "name": name, "args": Value::Object(args.clone()) },
        }),
        Part::FunctionResponse { id, name, response } => serde_json::json!({
            "functionResponse": { "id": id.0, "name": name, "response": Value::Object(response.clone()) },
        }),
        Part::InlineData { mime_type, bytes } => serde_json::json!({
            "inlineData": { "mimeType": mime_type, "data": bytes },
        }),
        Part::FileData { mime_type, uri } => serde_json::json!({
            "fileData": { "mimeType": mime_type, "fileUri": uri },
        }),
    }
}

fn system_instruction(system: &SystemPrompt) -> Value {
    match system {
        SystemPrompt::Text(text) => serde_json::json!({ "parts": [{ "text": text }] }),
        SystemPrompt::Blocks(blocks) => {
            let parts: Vec<Value> = blocks.iter().map(|b| serde_json::json!({ "text": b.text })).collect();
            serde_json::json!({ "parts": parts })
        }
    }
}

/// Parse one complete Gemini response JSON object (a non-streaming
/// response, or one `streamGenerateContent` chunk) into the neutral shape.
pub fn parse_response(body: &Value, provider_tag: &str) -> Result<ProviderResponse, ProviderError> {
    let candidates = body
        .get("candidates")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidRequest("response has no 'candidates'".to_string()))?;

    let candidates = candidates
        .iter()
        .map(parse_candidate)
        .collect::<Result<Vec<_>, _>>()?;

    let usage = body.get("usageMetadata").map(|u| Usage {
        prompt: u.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0) as usize,
        completion: u.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0) as usize,
        total: u.get("totalTokenCount").and_then(Value::as_u64).unwrap_or(0) as usize,
    });

    Ok(ProviderResponse {
        candidates,
        usage,
        provider_tag: provider_tag.to_string(),
    })
}

fn parse_candidate(candidate: &Value) -> Result<Candidate, ProviderError> {
    let content = candidate
        .get("content")
        .ok_or_else(|| ProviderError::InvalidRequest("candidate has no 'content'".to_string()))?;
    let parts = content
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().map(parse_part).collect::<Vec<_>>())
        .unwrap_or_default();
    let finish_reason = candidate
        .get("finishReason")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Candidate {
        content: Message::new(Role::Model, parts),
        finish_reason,
    })
}

fn parse_part(part: &Value) -> Part {
    if let Some(text) = part.get("text").and_then(Value::as_str) {
        return Part::Text(text.to_string());
    }
    if let Some(call) = part.get("functionCall") {
        let name = call.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let id = call
            .get("id")
            .and_then(Value::as_str)
            .map(CallId::from)
            .unwrap_or_else(|| synth_call_id(&name));
        let args = call
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        return Part::FunctionCall { id, name, args };
    }
    if let Some(response) = part.get("functionResponse") {
        let name = response.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .map(CallId::from)
            .unwrap_or_else(|| synth_call_id(&name));
        let response_map = response
            .get("response")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        return Part::FunctionResponse {
            id,
            name,
            response: response_map,
        };
    }
    if let Some(inline) = part.get("inlineData") {
        return Part::InlineData {
            mime_type: inline.get("mimeType").and_then(Value::as_str).unwrap_or_default().to_string(),
            bytes: inline.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
        };
    }
    if let Some(file) = part.get("fileData") {
        return Part::FileData {
            mime_type: file.get("mimeType").and_then(Value::as_str).unwrap_or_default().to_string(),
            uri: file.get("fileUri").and_then(Value::as_str).unwrap_or_default().to_string(),
        };
    }
    Part::Text(String::new())
}

/// Synthesize a call id when the model omits one, per §3's `CallId` scheme.
fn synth_call_id(name: &str) -> CallId {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let hex: String = (0..6).map(|_| format!("{:x}", rand::random::<u8>() % 16)).collect();
    CallId::synthesize(name, unix_ms, &hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{Message as M, SystemBlock};

    #[test]
    fn schema_cleaning_strips_disallowed_keys() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "path": { "type": "string", "minLength": 1 } },
            "additionalProperties": false,
        });
        let cleaned = clean_schema(&schema, ALLOWED_SCHEMA_KEYS);
        assert_eq!(
            cleaned,
            serde_json::json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
            })
        );
    }

    #[test]
    fn request_carries_tools_and_generation_config() {
        let mut req = CompletionRequest {
            model: "gemini-2.0-flash-exp".to_string(),
            messages: vec![M::user("hi")],
            temperature: Some(0.5),
            ..Default::default()
        };
        req.system = Some("be nice".into());
        let body = to_api_request(&req);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be nice");
    }

    #[test]
    fn structured_system_blocks_map_to_parts() {
        let system = SystemPrompt::Blocks(vec![
            SystemBlock { text: "a".to_string(), cache_control: None },
            SystemBlock { text: "b".to_string(), cache_control: None },
        ]);
        let instr = system_instruction(&system);
        assert_eq!(instr["parts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn parses_text_response() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] }, "finishReason": "STOP" }],
        });
        let response = parse_response(&body, "gemini").unwrap();
        assert_eq!(response.text(), "hello");
    }

    #[test]
    fn parses_function_call_preserving_id() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "functionCall": { "id": "c1", "name": "list_directory", "args": { "path": "/" } } }] },
                "finishReason": "STOP",
            }],
        });
        let response = parse_response(&body, "gemini").unwrap();
        let calls = response.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id().unwrap().to_string(), "c1");
    }

    #[test]
    fn missing_id_is_synthesized() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "functionCall": { "name": "list_directory", "args": {} } }] },
            }],
        });
        let response = parse_response(&body, "gemini").unwrap();
        let calls = response.function_calls();
        assert!(calls[0].call_id().unwrap().to_string().starts_with("list_directory-"));
    }
}
