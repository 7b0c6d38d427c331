//! Generative text provider abstraction.
//!
//! The recommendation stage talks to a [`LlmProvider`] so the backend
//! (Gemini, any OpenAI-compatible API) can be swapped by configuration and
//! stubbed in tests.

mod gemini;
mod openai;
mod provider;
mod types;

pub use gemini::{GeminiProvider, GEMINI_API_BASE};
pub use openai::OpenAIProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};
