/// LLM client: the evaluation oracle boundary.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// Every oracle interaction goes through `EvaluationOracle`, which lets the
/// pipeline swap in a scripted oracle under test.
///
/// Behaviour: each configured model is tried once, in order. The first success
/// wins; once every model has failed the last error is returned. No caching, no
/// rate limiting. Callers decide how to degrade.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MAX_TOKENS: u32 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}) from {model}: {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM response contained no JSON object")]
    NoJsonObject,

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No models configured")]
    NoModels,
}

/// The external text-generation service. `complete` returns raw model text,
/// which is expected (not guaranteed) to contain one JSON object.
#[async_trait]
pub trait EvaluationOracle: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenRouter chat-completions client with an ordered model cascade.
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    models: Vec<String>,
}

impl LlmClient {
    pub fn new(api_key: String, models: Vec<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            models,
        })
    }

    /// Same connection pool and key, different cascade.
    pub fn with_models(&self, models: Vec<String>) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            models,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn call_model(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                model: model.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        if let Some(usage) = &chat.usage {
            debug!(
                model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM call succeeded"
            );
        }

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl EvaluationOracle for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let mut last_error = None;

        for model in &self.models {
            match self.call_model(model, system, user).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(model = %model, error = %e, "LLM model failed, trying next in cascade");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::NoModels))
    }
}

/// Calls the oracle and deserializes the first balanced JSON object in its reply.
/// Surrounding prose and markdown fences are tolerated.
pub async fn call_json<T: DeserializeOwned>(
    oracle: &dyn EvaluationOracle,
    system: &str,
    user: &str,
) -> Result<T, LlmError> {
    let text = oracle.complete(system, user).await?;
    parse_json_reply(&text)
}

pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let object = extract_json_object(text).ok_or(LlmError::NoJsonObject)?;
    serde_json::from_str(object).map_err(LlmError::Parse)
}

/// Returns the first balanced `{...}` block in `text`. Braces inside JSON
/// strings (including escaped quotes) do not count towards the balance.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_plain_object() {
        let input = r#"{"key": "value"}"#;
        assert_eq!(extract_json_object(input), Some(input));
    }

    #[test]
    fn test_extract_from_fenced_prose() {
        let input = "Here you go:\n```json\n{\"cgpa\": \"9.1/10\"}\n```\nLet me know!";
        assert_eq!(extract_json_object(input), Some("{\"cgpa\": \"9.1/10\"}"));
    }

    #[test]
    fn test_extract_stops_at_first_balanced_block() {
        let input = r#"{"a": {"b": 1}} trailing {"c": 2}"#;
        assert_eq!(extract_json_object(input), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let input = r#"note {"text": "use } and { freely", "q": "say \"}\""} end"#;
        let block = extract_json_object(input).unwrap();
        let value: Value = serde_json::from_str(block).unwrap();
        assert_eq!(value["text"], "use } and { freely");
    }

    #[test]
    fn test_extract_unbalanced_is_none() {
        assert_eq!(extract_json_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_json_reply_reports_missing_object() {
        let result: Result<Value, _> = parse_json_reply("sorry, I can't help");
        assert!(matches!(result, Err(LlmError::NoJsonObject)));
    }

    #[test]
    fn test_parse_json_reply_reports_bad_shape() {
        #[derive(Debug, Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            n: u32,
        }
        let result: Result<Shape, _> = parse_json_reply(r#"{"n": "three"}"#);
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_empty_cascade_reports_no_models() {
        let client = LlmClient::new("key".to_string(), vec![]).unwrap();
        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(LlmError::NoModels)));
    }
}
