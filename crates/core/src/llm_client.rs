use crate::message::{HistoryEntry, Sender};
use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use tokio::sync::Notify;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The external service that plays the partner and scores the user's turn.
///
/// Implementations return the raw JSON text of the reply; validating it
/// against the reply contract is the orchestrator's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationClient: Send + Sync {
    /// Makes a single, non-streaming call for one user turn.
    ///
    /// `history` is the conversation before `user_text`, oldest first.
    async fn evaluate_turn(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
        user_text: &str,
    ) -> Result<String>;
}

/// An implementation of `EvaluationClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    reply_schema: serde_json::Value,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `reply_schema` - JSON schema the model's structured output must follow.
    pub fn new(config: OpenAIConfig, model: String, reply_schema: serde_json::Value) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            reply_schema,
        }
    }
}

/// Maps the system prompt, prior conversation and the new user text onto chat
/// completion messages. Partner lines become assistant messages.
pub fn build_chat_messages(
    system_prompt: &str,
    history: &[HistoryEntry],
    user_text: &str,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into(),
    ];
    for entry in history {
        match entry.sender {
            Sender::User => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(entry.text.clone())
                    .build()?
                    .into(),
            ),
            Sender::SimulatedPartner => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(entry.text.clone())
                    .build()?
                    .into(),
            ),
        };
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_text)
            .build()?
            .into(),
    );
    Ok(messages)
}

#[async_trait]
impl EvaluationClient for OpenAICompatibleClient {
    async fn evaluate_turn(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
        user_text: &str,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(build_chat_messages(system_prompt, history, user_text)?)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "coaching_turn".to_string(),
                    description: Some(
                        "The partner's reply, the evaluation of the user's turn, and whether the conversation ends."
                            .to_string(),
                    ),
                    schema: Some(self.reply_schema.clone()),
                    strict: Some(false),
                },
            })
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;

        Ok(content)
    }
}

/// An `EvaluationClient` that replays canned replies in order.
///
/// Useful for integration tests and offline development: each call pops the
/// next scripted entry, `Ok` entries are returned verbatim as the raw reply
/// and `Err` entries become call failures.
#[derive(Default)]
pub struct ScriptedEvaluationClient {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedEvaluationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose calls each wait for one `notify_one` on `gate` before
    /// answering, so a turn can be held in flight.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Queues a raw reply body.
    pub fn push_reply(&self, raw: impl Into<String>) -> &Self {
        self.queue().push_back(Ok(raw.into()));
        self
    }

    /// Queues a call failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.queue().push_back(Err(message.into()));
        self
    }

    /// How many times `evaluate_turn` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        // A poisoned queue still holds valid replies.
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EvaluationClient for ScriptedEvaluationClient {
    async fn evaluate_turn(
        &self,
        _system_prompt: &str,
        _history: &[HistoryEntry],
        _user_text: &str,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.queue().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("No scripted reply left")),
        }
    }
}
