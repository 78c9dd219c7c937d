//! Request/response mapping to the OpenAI Chat Completions wire shape,
//! shared by every backend in [`crate::model_map`].

use relay_provider::clean_schema;
use relay_types::{
    CallId, Candidate, CompletionRequest, Message, Part, ProviderError, ProviderResponse, Role,
    SystemPrompt, ToolChoice, Usage,
};
use serde_json::{json, Map, Value};

/// Schema keys the OpenAI `tools` array accepts (superset of Gemini's, since
/// OpenAI passes JSON Schema through almost unmodified).
pub const ALLOWED_SCHEMA_KEYS: &[&str] = &[
    "type",
    "description",
    "properties",
    "required",
    "items",
    "enum",
    "additionalProperties",
];

/// Build a Chat Completions request body.
///
/// System prompts become a leading `developer` message; `FunctionCall` parts
/// on a `Model` message become `tool_calls`; `FunctionResponse` parts become
/// their own `tool` message carrying `tool_call_id`.
#[must_use]
pub fn to_api_request(req: &CompletionRequest, wire_model: &str) -> Value {
    let mut messages = Vec::new();

    if let Some(system) = &req.system {
        messages.push(json!({ "role": "system", "content": system_text(system) }));
    }

    for message in &req.messages {
        messages.extend(message_to_wire(message));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), json!(wire_model));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert("stream".to_string(), json!(req.stream));

    if !req.tools.is_empty() {
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": clean_schema(&tool.schema, ALLOWED_SCHEMA_KEYS),
                    }
                })
            })
            .collect();
        body.insert("tools".to_string(), Value::Array(tools));
        body.insert("tool_choice".to_string(), json!(tool_choice_wire(req.tool_choice.as_ref())));
    }
    if let Some(max_tokens) = req.max_tokens {
        body.insert("max_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = req.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = req.top_p {
        body.insert("top_p".to_string(), json!(top_p));
    }
    if !req.stop_sequences.is_empty() {
        body.insert("stop".to_string(), json!(req.stop_sequences));
    }

    Value::Object(body)
}

/// Render a [`ToolChoice`] into the wire shape `tool_choice` expects
/// (§4.1.2/§6.2: a bare string for `auto`/`none`/`required`, an object
/// naming the tool for `Specific`). Defaults to `"auto"` when unset, since
/// `to_api_request` only calls this when `tools` is non-empty.
fn tool_choice_wire(choice: Option<&ToolChoice>) -> Value {
    match choice {
        None | Some(ToolChoice::Auto) => json!("auto"),
        Some(ToolChoice::None) => json!("none"),
        Some(ToolChoice::Required) => json!("required"),
        Some(ToolChoice::Specific { name }) => json!({ "type": "function", "function": { "name": name } }),
    }
}

fn system_text(system: &SystemPrompt) -> String {
    match system {
        SystemPrompt::Text(text) => text.clone(),
        SystemPrompt::Blocks(blocks) => blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// One `relay_types::Message` can expand to several wire messages: an
/// assistant message carrying `tool_calls`, and one `tool` message per
/// `FunctionResponse` part (the OpenAI wire format has no room for more than
/// one tool result per message).
fn message_to_wire(message: &Message) -> Vec<Value> {
    match message.role {
        Role::System => vec![json!({ "role": "system", "content": message.text() })],
        Role::User => {
            let mut out = Vec::new();
            let text = message.text();
            if !text.is_empty() {
                out.push(json!({ "role": "user", "content": text }));
            }
            for part in &message.parts {
                if let Part::FunctionResponse { id, response, .. } = part {
                    out.push(json!({
                        "role": "tool",
                        "tool_call_id": id.to_string(),
                        "content": Value::Object(response.clone()).to_string(),
                    }));
                }
            }
            out
        }
        Role::Tool => message
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionResponse { id, response, .. } => Some(json!({
                    "role": "tool",
                    "tool_call_id": id.to_string(),
                    "content": Value::Object(response.clone()).to_string(),
                })),
                _ => None,
            })
            .collect(),
        Role::Model => {
            let text = message.text();
            let tool_calls: Vec<Value> = message
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::FunctionCall { id, name, args } => Some(json!({
                        "id": id.to_string(),
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": Value::Object(args.clone()).to_string(),
                        }
                    })),
                    _ => None,
                })
                .collect();

            let mut entry = Map::new();
            entry.insert("role".to_string(), json!("assistant"));
            if !text.is_empty() {
                entry.insert("content".to_string(), json!(text));
            } else {
                entry.insert("content".to_string(), Value::Null);
            }
            if !tool_calls.is_empty() {
                entry.insert("tool_calls".to_string(), Value::Array(tool_calls));
            }
            vec![Value::Object(entry)]
        }
    }
}

/// Parse a non-streaming `chat/completions` response body.
pub fn parse_response(body: &Value, provider_tag: &str) -> Result<ProviderResponse, ProviderError> {
    let choices = body
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Other(Box::new(std::io::Error::other("missing choices array"))))?;

    let candidates = choices
        .iter()
        .map(parse_choice)
        .collect::<Result<Vec<_>, _>>()?;

    let usage = body.get("usage").map(|usage| Usage {
        prompt: usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        completion: usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        total: usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
    });

    Ok(ProviderResponse { candidates, usage, provider_tag: provider_tag.to_string() })
}

fn parse_choice(choice: &Value) -> Result<Candidate, ProviderError> {
    let message = choice
        .get("message")
        .ok_or_else(|| ProviderError::Other(Box::new(std::io::Error::other("choice missing message"))))?;

    let mut parts = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            parts.push(Part::Text(text.to_string()));
        }
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in tool_calls {
            let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
            let function = call.get("function").cloned().unwrap_or_default();
            let name = function.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let args_str = function.get("arguments").and_then(Value::as_str).unwrap_or("{}");
            let args: Map<String, Value> = serde_json::from_str(args_str).unwrap_or_default();
            parts.push(Part::FunctionCall { id: CallId::from(id), name, args });
        }
    }

    let finish_reason = choice.get("finish_reason").and_then(Value::as_str).map(str::to_string);

    Ok(Candidate { content: Message::new(Role::Model, parts), finish_reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{Role, ToolDefinition};
    use serde_json::json;

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            display_name: name.to_string(),
            description: "a tool".to_string(),
            schema: json!({"type": "object", "properties": {"x": {"type": "string", "extra": 1}}}),
            is_read_only: false,
            can_stream_output: false,
            annotations: Default::default(),
        }
    }

    #[test]
    fn system_prompt_becomes_leading_system_message() {
        let mut req = CompletionRequest::default();
        req.system = Some(SystemPrompt::Text("be nice".to_string()));
        req.messages = vec![Message::user("hi")];
        let body = to_api_request(&req, "kimi-k2-instruct");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "be nice");
    }

    #[test]
    fn tool_schema_is_cleaned_in_tools_array() {
        let mut req = CompletionRequest::default();
        req.tools = vec![tool("search")];
        let body = to_api_request(&req, "kimi-k2-instruct");
        let schema = &body["tools"][0]["function"]["parameters"];
        assert!(schema["properties"]["x"].get("extra").is_none());
    }

    #[test]
    fn tools_present_defaults_tool_choice_to_auto() {
        let mut req = CompletionRequest::default();
        req.tools = vec![tool("search")];
        let body = to_api_request(&req, "kimi-k2-instruct");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn no_tools_means_no_tool_choice_field() {
        let req = CompletionRequest::default();
        let body = to_api_request(&req, "kimi-k2-instruct");
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn specific_tool_choice_becomes_a_named_function_object() {
        let mut req = CompletionRequest::default();
        req.tools = vec![tool("search")];
        req.tool_choice = Some(ToolChoice::Specific { name: "search".to_string() });
        let body = to_api_request(&req, "kimi-k2-instruct");
        assert_eq!(body["tool_choice"]["function"]["name"], "search");
    }

    #[test]
    fn model_function_calls_become_tool_calls_array() {
        let message = Message::model_function_calls(vec![Part::FunctionCall {
            id: CallId::from("call-1"),
            name: "search".to_string(),
            args: Map::new(),
        }]);
        let wire = message_to_wire(&message);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["tool_calls"][0]["function"]["name"], "search");
    }

    #[test]
    fn function_response_becomes_tool_role_message() {
        let mut response = Map::new();
        response.insert("output".to_string(), json!("42"));
        let message = Message {
            role: Role::Tool,
            parts: vec![Part::FunctionResponse {
                id: CallId::from("call-1"),
                name: "search".to_string(),
                response,
            }],
        };
        let wire = message_to_wire(&message);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], "tool");
        assert_eq!(wire[0]["tool_call_id"], "call-1");
    }

    #[test]
    fn parses_text_and_tool_call_choice() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "call-9",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"q\":\"rust\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let parsed = parse_response(&body, "moonshot").unwrap();
        let calls = parsed.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(parsed.usage.unwrap().total, 15);
    }
}
