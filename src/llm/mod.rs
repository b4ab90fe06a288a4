//! Text generation: the [`TextGenerator`] seam and its HTTP implementation

pub mod client;
pub mod prompts;

use async_trait::async_trait;
pub use client::LlmService;
pub use prompts::PromptTemplate;
pub use prompts::PulsePrompts;

use crate::errors::Result;

/// A language model answering one prompt at a time
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free-text completion
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Completion constrained to a JSON object; the caller parses it
    async fn generate_json(&self, prompt: &str) -> Result<String>;
}

/// Strip a surrounding Markdown code fence (```json ... ```) if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line
    let inner = inner.split_once('\n').map_or("", |(_, rest)| rest);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
    }
}
