//! Generated answers for the board.
//!
//! Wraps the genai client behind a small trait so callers only ever see an
//! infallible `generate` call: missing configuration and upstream failures
//! both collapse into a fixed fallback string, never an error.

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatRequest};
use genai::Client as GenAiClient;
use tracing::{info, warn};

/// Reply text used whenever no real answer could be produced.
pub const FALLBACK_ANSWER: &str =
    "I couldn't come up with an answer right now. Please try again later.";

#[derive(Clone, Debug)]
pub struct AiConfig {
    /// Model identifier passed to genai.
    pub model: String,
    /// System prompt framing the bot's answers.
    pub system_prompt: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            system_prompt: "You are @AnswerBot, a concise teaching assistant on a classroom \
                            Q&A board. Answer the question directly in a few sentences."
                .to_string(),
        }
    }
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produce an answer for the prompt. Never fails; degraded states
    /// return [`FALLBACK_ANSWER`].
    async fn generate(&self, prompt: &str) -> String;
}

pub struct GenAiReplyGenerator {
    config: AiConfig,
    client: GenAiClient,
}

impl GenAiReplyGenerator {
    pub fn new(config: AiConfig) -> Self {
        info!("[@AnswerBot] Using model: {}", config.model);
        Self {
            config,
            client: GenAiClient::default(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for GenAiReplyGenerator {
    async fn generate(&self, prompt: &str) -> String {
        let chat_req = ChatRequest::new(vec![
            ChatMessage::system(&self.config.system_prompt),
            ChatMessage::user(prompt),
        ]);

        match self.client.exec_chat(&self.config.model, chat_req, None).await {
            Ok(response) => response
                .first_text()
                .map(str::to_string)
                .unwrap_or_else(|| FALLBACK_ANSWER.to_string()),
            Err(e) => {
                warn!("[@AnswerBot] Generation failed: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}

/// Stand-in used when AI answers are disabled.
pub struct DisabledReplyGenerator;

#[async_trait]
impl ReplyGenerator for DisabledReplyGenerator {
    async fn generate(&self, _prompt: &str) -> String {
        FALLBACK_ANSWER.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_generator_falls_back() {
        let answer = DisabledReplyGenerator.generate("What is TCP?").await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }
}
