//! LLM API client for Gemini, OpenAI-compatible and Ollama endpoints

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::TextGenerator;
use crate::config::AppConfig;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::http;
use crate::http::Provider;

/// Requested response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    Text,
    Json,
}

/// HTTP-backed text generator
#[derive(Clone)]
pub struct LlmService {
    provider: Provider,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    system_instruction: Option<String>,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LlmService {
    /// Create a new LLM service from the `[llm]` section
    pub fn new(config: &AppConfig) -> Result<Self> {
        let llm = &config.llm;
        let system_instruction = Some(llm.system_instruction.clone()).filter(|s| !s.is_empty());
        Ok(Self {
            provider: llm.provider.parse()?,
            endpoint: llm.endpoint.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            model: llm.model.clone(),
            system_instruction,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            client: http::build_client(llm.timeout_secs)?,
        })
    }

    /// Same service without the persona instruction
    #[must_use]
    pub fn without_system_instruction(mut self) -> Self {
        self.system_instruction = None;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn require_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            PulseRagError::Config(format!("{} generation requires an API key", self.provider.name()))
        })
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        debug!(
            "LLM request ({}, {} chars, {:?})",
            self.provider.name(),
            prompt.len(),
            format
        );
        let text = match self.provider {
            Provider::Gemini => self.complete_gemini(prompt, format).await?,
            Provider::OpenAI => self.complete_openai(prompt, format).await?,
            Provider::Ollama => self.complete_ollama(prompt, format).await?,
        };
        debug!("LLM response: {} chars", text.len());
        Ok(text)
    }

    async fn complete_gemini(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        let api_key = self.require_key()?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<&'a str>,
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
            max_output_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_mime_type: Option<&'static str>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            system_instruction: Option<Content<'a>>,
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<ResponseContent>,
        }

        #[derive(Deserialize)]
        struct ResponseContent {
            #[serde(default)]
            parts: Vec<ResponsePart>,
        }

        #[derive(Deserialize)]
        struct ResponsePart {
            #[serde(default)]
            text: String,
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );

        let request = GeminiRequest {
            system_instruction: self.system_instruction.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
                response_mime_type: (format == ResponseFormat::Json).then_some("application/json"),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("gemini", &e))?;
        let response = http::ensure_success("gemini", response).await?;

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse Gemini response: {e}")))?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .ok_or_else(|| PulseRagError::Llm("Gemini returned no candidates".to_string()))?;
        Ok(text)
    }

    async fn complete_openai(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        let api_key = self.require_key()?;

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct JsonFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f32,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<JsonFormat>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            #[serde(default)]
            content: Option<String>,
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_instruction.as_deref() {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: (format == ResponseFormat::Json).then_some(JsonFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("openai", &e))?;
        let response = http::ensure_success("openai", response).await?;

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse OpenAI response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PulseRagError::Llm("OpenAI returned no choices".to_string()))
    }

    async fn complete_ollama(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        #[derive(Serialize)]
        struct Options {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            system: Option<&'a str>,
            stream: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            format: Option<&'static str>,
            options: Options,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: self.system_instruction.as_deref(),
            stream: false,
            format: (format == ResponseFormat::Json).then_some("json"),
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("ollama", &e))?;
        let response = http::ensure_success("ollama", response).await?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse Ollama response: {e}")))?;
        Ok(result.response)
    }
}

#[async_trait]
impl TextGenerator for LlmService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, ResponseFormat::Text).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, ResponseFormat::Json).await
    }
}
