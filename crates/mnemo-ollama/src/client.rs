// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a local Ollama server.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::model::OllamaConfig;
use mnemo_core::types::{
    AdapterType, FragmentStream, GenerationRequest, HealthStatus, ModelInfo,
};
use mnemo_core::{GenerationBackend, MnemoError, PluginAdapter};
use tracing::{debug, info, warn};

use crate::ndjson;
use crate::types::{ChatOptions, ChatRequest, ErrorResponse, TagsResponse};

/// How long to give a freshly spawned `ollama serve` before re-probing.
const AUTOSTART_GRACE: Duration = Duration::from_secs(3);

fn provider_err(message: String, source: reqwest::Error) -> MnemoError {
    MnemoError::Provider {
        message,
        source: Some(Box::new(source)),
    }
}

/// Client for Ollama's native API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    autostart: bool,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, MnemoError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| provider_err(format!("failed to build HTTP client: {e}"), e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            autostart: config.autostart,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Checks that the server answers `/api/tags`.
    pub async fn probe(&self) -> Result<(), MnemoError> {
        self.fetch_tags().await.map(|_| ())
    }

    /// Probes the server, starting `ollama serve` once if it is not
    /// reachable and autostart is enabled.
    pub async fn ensure_running(&self) -> Result<(), MnemoError> {
        let first = match self.probe().await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if !self.autostart {
            return Err(first);
        }

        info!(error = %first, "ollama not reachable, starting `ollama serve`");
        let spawned = tokio::process::Command::new("ollama")
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();
        if let Err(e) = spawned {
            return Err(if e.kind() == std::io::ErrorKind::NotFound {
                MnemoError::Provider {
                    message: "Ollama binary not found. Install it from https://ollama.com"
                        .to_string(),
                    source: Some(Box::new(e)),
                }
            } else {
                MnemoError::Provider {
                    message: format!("failed to start ollama: {e}"),
                    source: Some(Box::new(e)),
                }
            });
        }

        tokio::time::sleep(AUTOSTART_GRACE).await;
        self.probe().await.map_err(|e| MnemoError::Provider {
            message: format!("cannot connect to Ollama: {e}"),
            source: None,
        })
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, MnemoError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| provider_err(format!("cannot reach Ollama at {}: {e}", self.base_url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MnemoError::Provider {
                message: format!("Ollama returned {status} for /api/tags"),
                source: None,
            });
        }
        response
            .json::<TagsResponse>()
            .await
            .map_err(|e| provider_err(format!("invalid /api/tags response: {e}"), e))
    }
}

#[async_trait]
impl PluginAdapter for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(match self.probe().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn stream_chat(&self, request: GenerationRequest) -> Result<FragmentStream, MnemoError> {
        let body = ChatRequest {
            model: request.model,
            messages: request.messages,
            stream: true,
            options: ChatOptions {
                num_ctx: request.context_window,
                temperature: request.temperature,
            },
        };
        debug!(model = %body.model, messages = body.messages.len(), "starting chat stream");

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_err(format!("cannot reach Ollama at {}: {e}", self.base_url), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|r| r.error)
                .unwrap_or(text);
            warn!(status = %status, detail = %detail, "chat request rejected");
            return Err(MnemoError::Provider {
                message: format!("Ollama returned {status}: {detail}"),
                source: None,
            });
        }

        Ok(ndjson::chat_fragments(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError> {
        let tags = self.fetch_tags().await?;
        Ok(tags.models.into_iter().map(ModelInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> OllamaConfig {
        OllamaConfig {
            base_url: base_url.to_string(),
            autostart: false,
            ..OllamaConfig::default()
        }
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let client = OllamaClient::new(&config("http://localhost:11434/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("/api/chat"), "http://localhost:11434/api/chat");
    }

    #[tokio::test]
    async fn unreachable_without_autostart_fails_fast() {
        // Port 9 (discard) is closed on test machines.
        let client = OllamaClient::new(&config("http://127.0.0.1:9")).unwrap();
        assert!(client.ensure_running().await.is_err());
        assert!(matches!(
            client.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
