//! services/api/src/adapters/generation_llm.rs
//!
//! This module contains the adapter for the proposal-writing LLM.
//! It implements the `ProposalGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use proposal_core::ports::{PortError, PortResult, ProposalGenerationService};
use proposal_core::prompt::GenerationRequest;

/// Fixed sampling temperature for every proposal generation.
const TEMPERATURE: f32 = 0.7;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ProposalGenerationService` using an
/// OpenAI-compatible chat-completion model.
#[derive(Clone)]
pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerationAdapter {
    /// Creates a new `OpenAiGenerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Maps a client error to the port's provider error, forwarding an HTTP
/// status when the provider's error type implies one.
fn map_provider_error(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => {
            let status = match api.r#type.as_deref() {
                Some("insufficient_quota") | Some("rate_limit_exceeded") => Some(429),
                Some("invalid_request_error") => Some(400),
                Some("authentication_error") => Some(401),
                _ => None,
            };
            PortError::Provider {
                status,
                message: api.message,
            }
        }
        other => PortError::Provider {
            status: None,
            message: other.to_string(),
        },
    }
}

//=========================================================================================
// `ProposalGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProposalGenerationService for OpenAiGenerationAdapter {
    /// Sends the composed instructions as a single user message and returns
    /// whatever text came back. An absent completion maps to an empty string;
    /// the caller decides what an empty result means.
    async fn complete(&self, request: &GenerationRequest) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.instructions.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        )];

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(map_provider_error)?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(text)
    }
}
