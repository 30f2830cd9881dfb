use crate::client::ToolClient;
use crate::error::AgentError;
use crate::llm::{CompletionProvider, TokenStream};
use crate::message::{AgentReply, Completion, Message, ToolEnvelope, ToolSpec};
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to tools that can fetch data from JSONPlaceholder API.

You have access to the following tools:
- get_post(post_id): Get a specific post
- list_posts(user_id=None): List all posts or posts by a user
- get_comments_for_post(post_id): Get comments on a post
- get_user(user_id): Get user information
- list_users(): List all users

Always use tools to provide accurate information. Be conversational and helpful.
When using tools, briefly explain what you're doing before executing them.";

pub const EXECUTING_TOOLS_MARKER: &str = "🔧 Executing tools...\n";
pub const PROCESSING_RESULTS_MARKER: &str = "\n✅ Processing results...\n\n";
pub const ERROR_FRAGMENT_PREFIX: &str = "\n\n**Error**: ";

/// Drives one user turn between a completion backend and the tool server.
///
/// Holds no conversation state: history is passed in on every call and the
/// caller decides what to keep.
#[derive(Clone)]
pub struct AgentOrchestrator {
    llm: Arc<dyn CompletionProvider>,
    tools: Arc<dyn ToolClient>,
    system_prompt: String,
}

impl AgentOrchestrator {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        tools: Arc<dyn ToolClient>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn update_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
        info!("System prompt updated");
    }

    pub async fn validate_connection(&self) -> bool {
        self.tools.health_check().await
    }

    /// Run one turn to completion.
    pub async fn process_message(
        &self,
        user_message: &str,
        history: &[Message],
    ) -> Result<AgentReply, AgentError> {
        info!("Processing message with agent");

        let mut messages = self.build_context(user_message, history);
        let tools = self.fetch_tools().await;

        let first = self.llm.send(&messages, &tools).await.map_err(|e| {
            error!("First completion failed: {}", e);
            AgentError::from(e)
        })?;

        if first.tool_calls.is_empty() {
            debug!("No tool calls detected in LLM response");
            return Ok(AgentReply {
                content: first.content,
                tool_calls: None,
            });
        }

        info!("LLM requested {} tool calls", first.tool_calls.len());
        self.fold_tool_results(&mut messages, &first).await;

        let last = self.llm.send(&messages, &tools).await.map_err(|e| {
            error!("Final completion failed: {}", e);
            AgentError::from(e)
        })?;
        if !last.tool_calls.is_empty() {
            warn!(
                "Ignoring {} tool calls requested after tool execution",
                last.tool_calls.len()
            );
        }

        Ok(AgentReply {
            content: last.content,
            tool_calls: Some(first.tool_calls),
        })
    }

    /// Run one turn as a lazy stream of text fragments.
    ///
    /// Nothing happens until the stream is polled, and dropping it stops the
    /// turn at the next await point. Failures end the stream with an
    /// `**Error**` fragment.
    pub fn stream_message(
        &self,
        user_message: &str,
        history: &[Message],
    ) -> BoxStream<'static, String> {
        let turn = StreamingTurn {
            agent: self.clone(),
            pending: VecDeque::new(),
            phase: Phase::Plan(self.build_context(user_message, history)),
        };

        stream::unfold(turn, |mut turn| async move {
            loop {
                if let Some(fragment) = turn.pending.pop_front() {
                    return Some((fragment, turn));
                }

                match std::mem::replace(&mut turn.phase, Phase::Finished) {
                    Phase::Plan(messages) => turn.plan(messages).await,
                    Phase::Execute {
                        mut messages,
                        completion,
                    } => {
                        turn.agent.fold_tool_results(&mut messages, &completion).await;
                        turn.pending.push_back(PROCESSING_RESULTS_MARKER.to_string());
                        turn.phase = Phase::Relay(turn.agent.llm.stream(&messages, &[]));
                    }
                    Phase::Relay(mut tokens) => match tokens.next().await {
                        Some(Ok(token)) => {
                            turn.phase = Phase::Relay(tokens);
                            return Some((token, turn));
                        }
                        Some(Err(e)) => {
                            error!("Error streaming message: {}", e);
                            return Some((error_fragment(&e), turn));
                        }
                        None => return None,
                    },
                    Phase::Finished => return None,
                }
            }
        })
        .boxed()
    }

    fn build_context(&self, user_message: &str, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.extend_from_slice(history);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.push(Message::user(user_message));
        messages
    }

    async fn fetch_tools(&self) -> Vec<ToolSpec> {
        match self.tools.list_tools().await {
            Ok(tools) => {
                debug!("Got {} tools from MCP server", tools.len());
                tools
            }
            Err(e) => {
                warn!("Could not fetch tools, continuing without them: {}", e);
                Vec::new()
            }
        }
    }

    /// Execute every intent of `completion` and append the assistant
    /// placeholder plus one result message per call, in issue order.
    async fn fold_tool_results(&self, messages: &mut Vec<Message>, completion: &Completion) {
        let calls = completion.tool_calls.iter().map(|call| async move {
            info!(tool = %call.name, id = %call.id, "Executing tool");
            match self.tools.call_tool(&call.name, &call.arguments).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(tool = %call.name, "Tool execution failed: {}", e);
                    ToolEnvelope::failure(e.to_string())
                }
            }
        });
        let envelopes = join_all(calls).await;

        messages.push(
            Message::assistant(completion.content.clone())
                .with_tool_calls(completion.tool_calls.clone()),
        );
        messages.extend(envelopes.iter().map(tool_result_message));
    }
}

fn tool_result_message(envelope: &ToolEnvelope) -> Message {
    let encoded = serde_json::to_string(envelope)
        .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":\"{}\"}}", e));
    Message::user(format!("Tool result: {}", encoded))
}

fn error_fragment(err: &dyn std::fmt::Display) -> String {
    format!("{}{}", ERROR_FRAGMENT_PREFIX, err)
}

enum Phase {
    Plan(Vec<Message>),
    Execute {
        messages: Vec<Message>,
        completion: Completion,
    },
    Relay(TokenStream),
    Finished,
}

struct StreamingTurn {
    agent: AgentOrchestrator,
    pending: VecDeque<String>,
    phase: Phase,
}

impl StreamingTurn {
    async fn plan(&mut self, messages: Vec<Message>) {
        let tools = self.agent.fetch_tools().await;
        if tools.is_empty() {
            warn!("No MCP tools available, streaming without tool support");
            self.phase = Phase::Relay(self.agent.llm.stream(&messages, &[]));
            return;
        }

        // Intents only appear in a complete response.
        let completion = match self.agent.llm.send(&messages, &tools).await {
            Ok(completion) => completion,
            Err(e) => {
                error!("Error streaming message: {}", e);
                self.pending.push_back(error_fragment(&e));
                return;
            }
        };

        if completion.tool_calls.is_empty() {
            debug!("No tool calls detected, streaming response directly");
            self.phase = Phase::Relay(self.agent.llm.stream(&messages, &[]));
            return;
        }

        if !completion.content.is_empty() {
            self.pending.push_back(completion.content.clone());
            self.pending.push_back("\n\n".to_string());
        }
        self.pending.push_back(EXECUTING_TOOLS_MARKER.to_string());
        self.phase = Phase::Execute {
            messages,
            completion,
        };
    }
}
