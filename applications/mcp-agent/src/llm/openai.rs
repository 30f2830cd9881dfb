use crate::config::{LlmConfig, ProviderKind};
use crate::error::CompletionError;
use crate::llm::{CompletionProvider, TokenStream};
use crate::message::{Completion, Message, ToolCall, ToolSpec};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::RequestBuilder;
use reqwest_eventsource::{retry::Never, Error as SseError, Event, EventSource};
use serde_json::{json, Map, Value};
use std::pin::Pin;
use tracing::{debug, info, warn};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Chat-completions adapter for OpenAI and API-compatible hosts such as Groq.
pub struct OpenAiCompatible {
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl OpenAiCompatible {
    pub fn new(kind: ProviderKind, config: &LlmConfig) -> Result<Self, CompletionError> {
        let (default_base, default_model) = match kind {
            ProviderKind::OpenAi => (OPENAI_BASE_URL, OPENAI_MODEL),
            ProviderKind::Groq => (GROQ_BASE_URL, GROQ_MODEL),
            other => return Err(CompletionError::UnsupportedProvider(other.to_string())),
        };

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(default_base)
            .trim_end_matches('/')
            .to_string();
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        info!("{} client initialized with model: {}", kind, model);

        Ok(Self {
            kind,
            base_url,
            api_key: config.api_key.clone(),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http_client,
        })
    }

    fn request_body(&self, messages: &[Message], tools: &[ToolSpec], stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(messages),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(wire_tool).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }

    fn request(&self, body: &Value) -> RequestBuilder {
        self.http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
    }
}

/// Only role and content go over the wire: Groq rejects null or empty
/// `tool_calls` on assistant messages.
fn wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| json!({ "role": message.role, "content": message.content }))
        .collect()
}

fn wire_tool(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

/// Convert `choices[0].message.tool_calls` into provider-neutral calls.
///
/// Arguments may arrive as a JSON-encoded string or as an object. A call
/// whose arguments are not an object is dropped; a missing id is replaced
/// by the call's position.
pub fn normalize_tool_calls(raw: Option<&Value>) -> Vec<ToolCall> {
    let Some(calls) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    calls
        .iter()
        .enumerate()
        .filter_map(|(index, call)| {
            let function = call.get("function")?;
            let name = function.get("name").and_then(Value::as_str)?;

            let arguments = match function.get("arguments") {
                None | Some(Value::Null) => Some(Map::new()),
                Some(Value::String(text)) if text.trim().is_empty() => Some(Map::new()),
                Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                },
                Some(Value::Object(map)) => Some(map.clone()),
                Some(_) => None,
            };
            let Some(arguments) = arguments else {
                warn!(tool = %name, "Dropping tool call with unparseable arguments");
                return None;
            };

            let id = call
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());

            Some(ToolCall {
                id,
                name: name.to_string(),
                arguments,
            })
        })
        .collect()
}

fn parse_completion(body: &Value) -> Result<Completion, CompletionError> {
    let choice = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .ok_or_else(|| CompletionError::Decode("response has no choices".to_string()))?;
    let message = choice.get("message").unwrap_or(&Value::Null);

    Ok(Completion {
        content: message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        tool_calls: normalize_tool_calls(message.get("tool_calls")),
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Text carried by one streamed chunk, if any.
fn delta_content(data: &str) -> Result<Option<String>, CompletionError> {
    let chunk: Value =
        serde_json::from_str(data).map_err(|e| CompletionError::Decode(e.to_string()))?;
    Ok(chunk
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string))
}

enum SseState {
    Connect(RequestBuilder),
    Open(Pin<Box<EventSource>>),
    Done,
}

#[async_trait]
impl CompletionProvider for OpenAiCompatible {
    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError> {
        debug!(
            "Sending {} messages to {} with {} tools",
            messages.len(),
            self.kind,
            tools.len()
        );

        let response = self
            .request(&self.request_body(messages, tools, false))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        parse_completion(&body)
    }

    fn stream(&self, messages: &[Message], tools: &[ToolSpec]) -> TokenStream {
        let request = self.request(&self.request_body(messages, tools, true));

        stream::unfold(SseState::Connect(request), |mut state| async move {
            loop {
                match state {
                    SseState::Connect(request) => match EventSource::new(request) {
                        Ok(mut source) => {
                            source.set_retry_policy(Box::new(Never));
                            state = SseState::Open(Box::pin(source));
                        }
                        Err(e) => {
                            return Some((Err(CompletionError::Stream(e.to_string())), SseState::Done))
                        }
                    },
                    SseState::Open(mut source) => match source.next().await {
                        Some(Ok(Event::Open)) => state = SseState::Open(source),
                        Some(Ok(Event::Message(message))) => {
                            if message.data.trim() == "[DONE]" {
                                return None;
                            }
                            match delta_content(&message.data) {
                                Ok(Some(text)) => return Some((Ok(text), SseState::Open(source))),
                                Ok(None) => state = SseState::Open(source),
                                Err(e) => return Some((Err(e), SseState::Done)),
                            }
                        }
                        Some(Err(SseError::StreamEnded)) | None => return None,
                        Some(Err(SseError::InvalidStatusCode(status, response))) => {
                            let body = response.text().await.unwrap_or_default();
                            let err = CompletionError::Status {
                                status: status.as_u16(),
                                body,
                            };
                            return Some((Err(err), SseState::Done));
                        }
                        Some(Err(e)) => {
                            return Some((Err(CompletionError::Stream(e.to_string())), SseState::Done))
                        }
                    },
                    SseState::Done => return None,
                }
            }
        })
        .boxed()
    }
}
