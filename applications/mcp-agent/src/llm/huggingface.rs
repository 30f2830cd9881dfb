use crate::config::LlmConfig;
use crate::error::CompletionError;
use crate::llm::{CompletionProvider, TokenStream};
use crate::message::{Completion, Message, Role, ToolSpec};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tracing::{debug, info};

const BASE_URL: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

/// Text-generation inference adapter. Has no tool support: it never
/// reports tool calls and ignores the catalogue.
pub struct HuggingFace {
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl HuggingFace {
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(BASE_URL)
            .trim_end_matches('/');
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        info!("Hugging Face client initialized with model: {}", model);

        Ok(Self {
            endpoint: format!("{}/{}", base_url, model),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http_client,
        })
    }

    fn request(&self, messages: &[Message], stream: bool) -> RequestBuilder {
        let mut body = json!({
            "inputs": format_prompt(messages),
            "parameters": {
                "temperature": self.temperature,
                "max_new_tokens": self.max_tokens,
            }
        });
        if stream {
            body["stream"] = json!(true);
        }

        self.http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
    }
}

/// Flatten a conversation into a single `Role: text` prompt ending with an
/// open assistant turn.
pub(crate) fn format_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let label = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{}: {}\n\n", label, message.content));
    }
    prompt.push_str("Assistant: ");
    prompt
}

fn generated_text(body: &Value) -> String {
    let entry = match body {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    entry
        .get("generated_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Token text from one line of the streamed body. Lines may carry an SSE
/// `data:` prefix.
fn line_token(line: &str) -> Result<Option<String>, CompletionError> {
    let line = line.trim();
    let line = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: Value =
        serde_json::from_str(line).map_err(|e| CompletionError::Decode(e.to_string()))?;
    Ok(chunk
        .pointer("/token/text")
        .and_then(Value::as_str)
        .map(str::to_string))
}

enum LineState {
    Connect(RequestBuilder),
    Reading {
        body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
        buffer: Vec<u8>,
        ready: VecDeque<String>,
    },
    Done,
}

#[async_trait]
impl CompletionProvider for HuggingFace {
    async fn send(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError> {
        debug!("Sending {} messages to Hugging Face", messages.len());

        let response = self.request(messages, false).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        Ok(Completion::text(generated_text(&body)))
    }

    fn stream(&self, messages: &[Message], _tools: &[ToolSpec]) -> TokenStream {
        let request = self.request(messages, true);

        stream::unfold(LineState::Connect(request), |mut state| async move {
            loop {
                match state {
                    LineState::Connect(request) => {
                        let response = match request.send().await {
                            Ok(response) => response,
                            Err(e) => return Some((Err(CompletionError::from(e)), LineState::Done)),
                        };
                        let status = response.status();
                        if !status.is_success() {
                            let body = response.text().await.unwrap_or_default();
                            let err = CompletionError::Status {
                                status: status.as_u16(),
                                body,
                            };
                            return Some((Err(err), LineState::Done));
                        }
                        state = LineState::Reading {
                            body: response
                                .bytes_stream()
                                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                                .boxed(),
                            buffer: Vec::new(),
                            ready: VecDeque::new(),
                        };
                    }
                    LineState::Reading {
                        mut body,
                        mut buffer,
                        mut ready,
                    } => {
                        if let Some(token) = ready.pop_front() {
                            return Some((Ok(token), LineState::Reading { body, buffer, ready }));
                        }

                        match body.next().await {
                            Some(Ok(chunk)) => {
                                buffer.extend_from_slice(&chunk);
                                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                                    match line_token(&String::from_utf8_lossy(&line)) {
                                        Ok(Some(token)) => ready.push_back(token),
                                        Ok(None) => {}
                                        Err(e) => return Some((Err(e), LineState::Done)),
                                    }
                                }
                                state = LineState::Reading { body, buffer, ready };
                            }
                            Some(Err(e)) => {
                                return Some((Err(CompletionError::Stream(e.to_string())), LineState::Done))
                            }
                            None => {
                                // Last line may lack a trailing newline.
                                return match line_token(&String::from_utf8_lossy(&buffer)) {
                                    Ok(Some(token)) => Some((Ok(token), LineState::Done)),
                                    Ok(None) => None,
                                    Err(e) => Some((Err(e), LineState::Done)),
                                };
                            }
                        }
                    }
                    LineState::Done => return None,
                }
            }
        })
        .boxed()
    }
}
