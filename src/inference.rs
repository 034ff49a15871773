//! Text generation against Amazon Bedrock.
//!
//! [`TextGenerator`] is the seam the [`Assistant`](crate::assistant::Assistant)
//! talks to. [`BedrockClient`] implements it with a single SigV4-signed
//! `InvokeModel` call per prompt:
//!
//! ```text
//! POST /model/<model_id>/invoke
//! {"prompt": "...", "max_gen_len": 512, "temperature": 0.3}
//! → {"generation": "...", ...}
//! ```
//!
//! No streaming, no retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aws::{self, AwsCredentials, CredentialsError, SigningRequest};
use crate::config::ModelConfig;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    #[error("cannot sign model request: {0}")]
    Credentials(Arc<CredentialsError>),
}

/// Sampling parameters sent with every prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.3,
        }
    }
}

impl From<&ModelConfig> for GenerationParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Turns a finished prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, InferenceError>;
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    prompt: &'a str,
    max_gen_len: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct InvokeResponse {
    generation: Option<String>,
}

/// Bedrock Runtime `InvokeModel` client for Llama-family models.
///
/// A client built [`without_credentials`](Self::without_credentials) still
/// serves the fallback path; each model call fails with
/// [`InferenceError::Credentials`] instead.
pub struct BedrockClient {
    client: reqwest::Client,
    url: reqwest::Url,
    host: String,
    region: String,
    credentials: Result<AwsCredentials, Arc<CredentialsError>>,
}

impl BedrockClient {
    pub fn new(config: &ModelConfig, credentials: AwsCredentials) -> Result<Self> {
        Self::build(config, Ok(credentials))
    }

    /// A client whose credential lookup failed at startup.
    pub fn without_credentials(config: &ModelConfig, error: CredentialsError) -> Result<Self> {
        Self::build(config, Err(Arc::new(error)))
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_ok()
    }

    fn build(
        config: &ModelConfig,
        credentials: Result<AwsCredentials, Arc<CredentialsError>>,
    ) -> Result<Self> {
        let base = config
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", config.region));
        let url_str = format!(
            "{}/model/{}/invoke",
            base.trim_end_matches('/'),
            aws::uri_encode(&config.model_id)
        );
        let url = reqwest::Url::parse(&url_str)
            .with_context(|| format!("Invalid model endpoint URL: {}", url_str))?;

        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => anyhow::bail!("Model endpoint URL has no host: {}", url_str),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            host,
            region: config.region.clone(),
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl TextGenerator for BedrockClient {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        let credentials = self
            .credentials
            .as_ref()
            .map_err(|e| InferenceError::Credentials(Arc::clone(e)))?;

        let body = serde_json::to_vec(&InvokeRequest {
            prompt,
            max_gen_len: params.max_tokens,
            temperature: params.temperature,
        })
        .map_err(|e| InferenceError::MalformedResponse(format!("encoding request: {}", e)))?;

        let signed = aws::sign(
            &SigningRequest {
                method: "POST",
                host: &self.host,
                path: self.url.path(),
                payload: &body,
                region: &self.region,
                service: "bedrock",
                headers: &[
                    ("accept", "application/json"),
                    ("content-type", "application/json"),
                ],
            },
            credentials,
            chrono::Utc::now(),
        );

        tracing::debug!(url = %self.url, bytes = body.len(), "invoking model");

        let mut request = self
            .client
            .post(self.url.clone())
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("authorization", &signed.authorization);
        if let Some(ref token) = signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "model invocation failed");
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        parse_generation(&text)
    }
}

fn parse_generation(body: &str) -> Result<String, InferenceError> {
    let parsed: InvokeResponse = serde_json::from_str(body)
        .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
    parsed
        .generation
        .ok_or_else(|| InferenceError::MalformedResponse("missing 'generation' field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        }
    }

    #[test]
    fn default_url_targets_regional_runtime() {
        let client = BedrockClient::new(&ModelConfig::default(), creds()).unwrap();
        assert_eq!(
            client.url(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/meta.llama3-8b-instruct-v1%3A0/invoke"
        );
        assert_eq!(client.host, "bedrock-runtime.us-east-1.amazonaws.com");
    }

    #[test]
    fn endpoint_override_keeps_port_in_host() {
        let config = ModelConfig {
            endpoint_url: Some("http://127.0.0.1:4010/".to_string()),
            ..ModelConfig::default()
        };
        let client = BedrockClient::new(&config, creds()).unwrap();
        assert_eq!(client.host, "127.0.0.1:4010");
        assert!(client.url().starts_with("http://127.0.0.1:4010/model/"));
    }

    #[test]
    fn params_follow_model_config() {
        let config = ModelConfig {
            max_tokens: 128,
            temperature: 0.7,
            ..ModelConfig::default()
        };
        let params = GenerationParams::from(&config);
        assert_eq!(params.max_tokens, 128);
        assert_eq!(GenerationParams::from(&ModelConfig::default()), GenerationParams::default());
    }

    #[tokio::test]
    async fn missing_credentials_fail_each_call_without_network() {
        let config = ModelConfig {
            endpoint_url: Some("http://127.0.0.1:9/".to_string()),
            ..ModelConfig::default()
        };
        let error = CredentialsError::NotFound {
            secrets_path: "./config/secrets.toml".into(),
            profile: "default".to_string(),
        };
        let client = BedrockClient::without_credentials(&config, error).unwrap();
        assert!(!client.has_credentials());

        let err = client
            .generate("prompt", &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Credentials(_)));
        assert!(err.to_string().contains("no AWS credentials found"));
    }

    #[test]
    fn parse_generation_reads_field() {
        let text = parse_generation(r#"{"generation":"Paris.","stop_reason":"stop"}"#).unwrap();
        assert_eq!(text, "Paris.");
    }

    #[test]
    fn parse_generation_rejects_missing_field() {
        let err = parse_generation(r#"{"outputs":[]}"#).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
        assert!(parse_generation("not json").is_err());
    }
}
