//! Oracle client: role-tagged prompt in, one completion text out.
//!
//! Every generation and repair step of the analysis loop is built on
//! [`Oracle::complete`]. The production implementation talks to an
//! OpenAI-compatible chat-completions endpoint with fixed sampling parameters.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::io::config::OracleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona and standing instructions.
    System,
    /// Task-specific content.
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Language-model completion service.
///
/// Errors are transport or service failures; they are not retried by the loop.
pub trait Oracle {
    fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    config: OracleConfig,
}

impl OpenAiOracle {
    /// Create a client, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} not set", config.api_key_env))?;
        Self::with_api_key(api_key, config.clone())
    }

    pub fn with_api_key(api_key: String, config: OracleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn build_request(&self, messages: &[Message]) -> Value {
        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "seed": self.config.seed,
            "max_tokens": self.config.max_tokens,
        })
    }
}

impl Oracle for OpenAiOracle {
    #[instrument(skip_all, fields(model = %self.config.model, messages = messages.len()))]
    fn complete(&self, messages: &[Message]) -> Result<String> {
        let body = self.build_request(messages);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("send chat completion request")?;

        let status = response.status();
        let payload: Value = response
            .json()
            .with_context(|| format!("decode chat completion response (status {status})"))?;
        if !status.is_success() {
            let detail = payload["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string());
            warn!(%status, "chat completion failed");
            bail!("chat completion failed with status {status}: {detail}");
        }

        let content = parse_completion(&payload)?;
        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }
}

/// Extract the first choice's message content from a chat-completions payload.
fn parse_completion(payload: &Value) -> Result<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("chat completion response has no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> OpenAiOracle {
        OpenAiOracle::with_api_key("test-key".to_string(), OracleConfig::default())
            .expect("client")
    }

    #[test]
    fn request_carries_fixed_sampling_parameters() {
        let body = oracle().build_request(&[Message::system("persona"), Message::user("task")]);
        assert_eq!(body["model"], "gpt-4-1106-preview");
        assert_eq!(body["seed"], 32526);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["top_p"], 0.1);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "task");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = OracleConfig {
            api_base: "http://localhost:8080/v1/".to_string(),
            ..OracleConfig::default()
        };
        let oracle = OpenAiOracle::with_api_key("k".to_string(), config).expect("client");
        assert_eq!(oracle.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn parses_first_choice_content() {
        let payload = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "contract A {}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        assert_eq!(parse_completion(&payload).expect("content"), "contract A {}");
    }

    #[test]
    fn null_content_is_an_error() {
        let payload = json!({"choices": [{"message": {"content": null}}]});
        let err = parse_completion(&payload).unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }

    #[test]
    fn missing_api_key_env_is_reported() {
        let config = OracleConfig {
            api_key_env: "AUDITOR_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..OracleConfig::default()
        };
        let err = OpenAiOracle::from_config(&config).err().expect("error");
        assert!(err.to_string().contains("AUDITOR_TEST_UNSET_KEY_VARIABLE"));
    }
}
