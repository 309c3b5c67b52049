//! Ollama health checks

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::ollama::{service_unavailable_message, OllamaProvider};
use crate::{ProviderError, Result};

/// Probes give up quickly; a healthy daemon answers immediately
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Overall service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Healthy,
    ServiceNotRunning,
    ModelNotAvailable,
}

/// Snapshot of the Ollama daemon as seen from this process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaStatus {
    pub status: ServiceState,
    pub service_running: bool,
    pub required_model: String,
    pub required_model_available: bool,
    pub available_models: Vec<String>,
}

impl OllamaProvider {
    /// Daemon version from `GET /api/version`
    pub async fn version(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url("/api/version"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "version probe returned HTTP {}",
                response.status()
            )));
        }

        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(body.version)
    }

    pub async fn service_running(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                debug!("Ollama {} reachable at {}", version, self.base_url);
                true
            }
            Err(e) => {
                debug!("Ollama not reachable at {}: {}", self.base_url, e);
                false
            }
        }
    }

    /// Installed models from `GET /api/tags`
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "model listing returned HTTP {}",
                response.status()
            )));
        }

        let body: TagsResponse = response
            .json()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(body
            .models
            .into_iter()
            .filter_map(|m| m.model.or(m.name))
            .collect())
    }

    pub async fn model_available(&self, model: &str) -> bool {
        self.list_models()
            .await
            .map(|models| models.iter().any(|m| m == model))
            .unwrap_or(false)
    }

    /// Ensure the daemon is up and `model` is pulled
    pub async fn validate_setup(&self, model: &str) -> Result<()> {
        if !self.service_running().await {
            return Err(ProviderError::Unavailable(service_unavailable_message(
                &self.base_url,
            )));
        }

        let available = self.list_models().await.unwrap_or_default();
        if !available.iter().any(|m| m == model) {
            return Err(ProviderError::ModelNotFound {
                model: model.to_string(),
                available,
            });
        }

        info!(
            "Ollama health check passed - service running, model '{}' available",
            model
        );
        Ok(())
    }

    /// Collect a status snapshot without failing
    pub async fn status(&self, model: &str) -> OllamaStatus {
        let service_running = self.service_running().await;
        let available_models = if service_running {
            self.list_models().await.unwrap_or_default()
        } else {
            Vec::new()
        };
        let required_model_available = available_models.iter().any(|m| m == model);

        let status = if !service_running {
            ServiceState::ServiceNotRunning
        } else if !required_model_available {
            ServiceState::ModelNotAvailable
        } else {
            ServiceState::Healthy
        };

        OllamaStatus {
            status,
            service_running,
            required_model: model.to_string(),
            required_model_available,
            available_models,
        }
    }
}
