//! Model resolution: identifier → parameter-size summary plus metadata.
//!
//! Reads only metadata from the hub: the model info listing, `config.json`,
//! `tokenizer_config.json` and safetensors headers. Weights are never
//! downloaded.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::architecture::{Architecture, ModelConfig, CONFIG_FILE};
use super::options::HubOptions;
use super::repo_id::RepoId;
use super::safetensors::{read_layout, ParameterLayout};
use super::transport::{HttpTransport, HubTransport, RepoInfo};
use crate::error::{Result, VramError};
use crate::estimate::{estimate_all, MemoryEstimates, ParameterSizeSummary};

/// Tokenizer config that may embed a chat template
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// Standalone chat template file used by newer repositories
pub const CHAT_TEMPLATE_FILE: &str = "chat_template.jinja";

/// Where the parameter counts came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    /// Exact counts from safetensors headers
    Safetensors {
        /// Number of weight files read
        files: usize,
        /// Number of tensors
        tensors: usize,
        /// Stored dtype holding most parameters
        dtype: Option<String>,
    },
    /// Analytic estimate from `config.json` dimensions
    ConfigEstimate,
}

/// Everything the estimator and the CLI need about one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModel {
    /// Normalized repository identifier
    pub repo_id: String,
    /// Float32-reference parameter sizes
    pub summary: ParameterSizeSummary,
    /// Maximum context length, when the config declares one
    pub max_position_embeddings: Option<u64>,
    /// Whether the tokenizer ships a chat template
    pub has_chat_template: bool,
    /// How `summary` was obtained
    pub weight_source: WeightSource,
}

/// Resolves hub identifiers through a [`HubTransport`]
pub struct ModelResolver<T: HubTransport = HttpTransport> {
    transport: T,
}

impl ModelResolver<HttpTransport> {
    /// Resolver talking HTTP to the hub described by `options`
    pub fn new(options: HubOptions) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(options)?,
        })
    }
}

impl<T: HubTransport> ModelResolver<T> {
    /// Resolver over any transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve an identifier or hub URL
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or malformed identifiers, `GatedAccess` when
    /// credentials are missing or refused, `UnsupportedLibrary` when the
    /// repository has no `config.json`, `LoadError` otherwise.
    pub fn resolve(&self, identifier: &str) -> Result<ResolvedModel> {
        let repo = RepoId::parse(identifier)?;
        info!(repo = %repo, "resolving model");

        let repo_info = self.transport.model_info(&repo)?;
        if !repo_info.has_file(CONFIG_FILE) {
            return Err(VramError::UnsupportedLibrary {
                repo: repo.to_string(),
                library: repo_info.library_name.clone(),
            });
        }

        let config_body = self.transport.fetch_file(&repo, CONFIG_FILE)?;
        let config = ModelConfig::from_json(&repo, &config_body)?;
        debug!(model_type = ?config.model_type(), "config loaded");

        let (summary, weight_source) = self.parameter_summary(&repo, &repo_info, &config)?;
        let has_chat_template = self.has_chat_template(&repo, &repo_info)?;

        Ok(ResolvedModel {
            repo_id: repo.to_string(),
            summary,
            max_position_embeddings: config.max_position_embeddings(),
            has_chat_template,
            weight_source,
        })
    }

    fn parameter_summary(
        &self,
        repo: &RepoId,
        repo_info: &RepoInfo,
        config: &ModelConfig,
    ) -> Result<(ParameterSizeSummary, WeightSource)> {
        if let Some(layout) = read_layout(&self.transport, repo, repo_info)? {
            return Ok(from_layout(&layout));
        }

        info!(repo = %repo, "no safetensors weights, estimating from config");
        let arch = Architecture::from_config(config).ok_or_else(|| {
            VramError::load(
                repo.as_str(),
                format!(
                    "no safetensors weights and `{CONFIG_FILE}` lacks the dimensions needed to estimate the architecture{}",
                    config
                        .model_type()
                        .map(|t| format!(" (model_type: {t})"))
                        .unwrap_or_default()
                ),
            )
        })?;
        let summary = arch
            .summary()
            .ok_or_else(|| VramError::load(repo.as_str(), "parameter count overflows"))?;
        Ok((summary, WeightSource::ConfigEstimate))
    }

    fn has_chat_template(&self, repo: &RepoId, repo_info: &RepoInfo) -> Result<bool> {
        if repo_info.has_file(TOKENIZER_CONFIG_FILE) {
            let body = self.transport.fetch_file(repo, TOKENIZER_CONFIG_FILE)?;
            let tokenizer_config: Value = serde_json::from_slice(&body).map_err(|e| {
                VramError::load(
                    repo.as_str(),
                    format!("Failed to parse {TOKENIZER_CONFIG_FILE}: {e}"),
                )
            })?;
            if template_present(tokenizer_config.get("chat_template")) {
                return Ok(true);
            }
        }
        Ok(repo_info.has_file(CHAT_TEMPLATE_FILE))
    }
}

fn from_layout(layout: &ParameterLayout) -> (ParameterSizeSummary, WeightSource) {
    let source = WeightSource::Safetensors {
        files: layout.file_count,
        tensors: layout.tensor_count,
        dtype: layout.dominant_dtype().map(str::to_string),
    };
    (layout.summary(), source)
}

/// A chat template is a non-empty string or a non-empty list of named templates
fn template_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

/// Resolved model plus the four standard estimates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    /// Resolution result
    pub model: ResolvedModel,
    /// float32, float16/bfloat16, int8, int4 estimates
    pub memory: MemoryEstimates,
}

impl ModelReport {
    /// Resolve `identifier` and estimate all four precisions
    pub fn build<T: HubTransport>(resolver: &ModelResolver<T>, identifier: &str) -> Result<Self> {
        let model = resolver.resolve(identifier)?;
        let memory = estimate_all(&model.summary)?;
        Ok(Self { model, memory })
    }

    /// Maximum context length
    #[must_use]
    pub fn max_length(&self) -> Option<u64> {
        self.model.max_position_embeddings
    }

    /// Whether the tokenizer ships a chat template
    #[must_use]
    pub fn has_chat_template(&self) -> bool {
        self.model.has_chat_template
    }
}
