//! Text generation: the `Generator` seam, the Gemini client, and parsers for
//! the structured responses used by auto-select and atomic modes.

pub mod gemini;
pub mod json;
pub mod parse;

use async_trait::async_trait;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient};
pub use parse::{FileSelection, ParseTier, parse_atomic_changes, parse_file_selection};

use crate::change::CommitChange;
use crate::error::GenerationError;

/// Sampling temperature for commit and pull-request text.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// One call to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: String,
    pub model: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        system_instruction: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: system_instruction.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A remote text-generation service.
///
/// Implementations return the candidate text, or an error when the service
/// fails or produces no candidate text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Generate a single message, trimmed. An empty string means nothing usable came back.
pub async fn generate_message<G: Generator + ?Sized>(
    generator: &G,
    request: &GenerationRequest,
) -> Result<String, GenerationError> {
    let text = generator.generate(request).await?;
    Ok(text.trim().to_string())
}

/// One combined call returning a proposed file subset and its message.
pub async fn generate_with_file_selection<G: Generator + ?Sized>(
    generator: &G,
    request: &GenerationRequest,
) -> Result<FileSelection, GenerationError> {
    let text = generator.generate(request).await?;
    parse_file_selection(&text)
}

/// One call returning the change set split into atomic units.
pub async fn generate_atomic_changes<G: Generator + ?Sized>(
    generator: &G,
    request: &GenerationRequest,
) -> Result<Vec<CommitChange>, GenerationError> {
    let text = generator.generate(request).await?;
    parse_atomic_changes(&text)
}
