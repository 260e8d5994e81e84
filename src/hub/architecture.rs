//! Model configuration (`config.json`) and analytic parameter estimates.
//!
//! Configs name the same dimension differently across families
//! (`hidden_size` / `n_embd` / `d_model`), so fields are looked up by a list
//! of aliases, first at the root and then in a nested `text_config`.

use serde_json::{Map, Value};

use super::repo_id::RepoId;
use crate::error::{Result, VramError};
use crate::estimate::ParameterSizeSummary;

/// Config file every transformers repository carries
pub const CONFIG_FILE: &str = "config.json";

const MAX_POSITIONS_KEYS: &[&str] = &["max_position_embeddings", "n_positions", "max_sequence_length"];
const HIDDEN_KEYS: &[&str] = &["hidden_size", "n_embd", "d_model"];
const LAYER_KEYS: &[&str] = &["num_hidden_layers", "n_layer", "num_layers"];
const INTERMEDIATE_KEYS: &[&str] = &["intermediate_size", "n_inner", "ffn_dim"];
const HEAD_KEYS: &[&str] = &["num_attention_heads", "n_head"];
const KV_HEAD_KEYS: &[&str] = &["num_key_value_heads"];
const EXPERT_KEYS: &[&str] = &["num_local_experts", "num_experts"];

/// Families whose MLP has gate, up and down projections
const GATED_MLP_FAMILIES: &[&str] = &[
    "llama", "mistral", "mixtral", "qwen2", "qwen2_moe", "qwen3", "gemma", "gemma2", "gemma3_text",
    "phi3", "olmo", "olmo2", "cohere", "deepseek", "internlm2", "yi",
];

/// Parsed `config.json`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelConfig {
    raw: Map<String, Value>,
}

impl ModelConfig {
    /// Parse a config body
    pub fn from_json(repo: &RepoId, body: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(raw)) => Ok(Self { raw }),
            Ok(_) => Err(VramError::load(
                repo.as_str(),
                format!("`{CONFIG_FILE}` is not a JSON object"),
            )),
            Err(e) => Err(VramError::load(
                repo.as_str(),
                format!("Failed to parse {CONFIG_FILE}: {e}"),
            )),
        }
    }

    fn text_config(&self) -> Option<&Map<String, Value>> {
        self.raw.get("text_config").and_then(Value::as_object)
    }

    fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        find_key(&self.raw, keys).or_else(|| self.text_config().and_then(|m| find_key(m, keys)))
    }

    fn lookup_u64(&self, keys: &[&str]) -> Option<u64> {
        self.lookup(keys).and_then(Value::as_u64)
    }

    /// `model_type` (root, else from `text_config`)
    #[must_use]
    pub fn model_type(&self) -> Option<&str> {
        self.lookup(&["model_type"]).and_then(Value::as_str)
    }

    /// Declared architecture class names
    #[must_use]
    pub fn architectures(&self) -> Vec<&str> {
        self.raw
            .get("architectures")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Maximum context length
    #[must_use]
    pub fn max_position_embeddings(&self) -> Option<u64> {
        self.lookup_u64(MAX_POSITIONS_KEYS)
    }

    /// Hidden (embedding) width
    #[must_use]
    pub fn hidden_size(&self) -> Option<u64> {
        self.lookup_u64(HIDDEN_KEYS)
    }

    /// Number of transformer blocks
    #[must_use]
    pub fn num_layers(&self) -> Option<u64> {
        self.lookup_u64(LAYER_KEYS)
    }

    /// Feed-forward width
    #[must_use]
    pub fn intermediate_size(&self) -> Option<u64> {
        self.lookup_u64(INTERMEDIATE_KEYS)
    }

    /// Vocabulary size
    #[must_use]
    pub fn vocab_size(&self) -> Option<u64> {
        self.lookup_u64(&["vocab_size"])
    }

    /// Attention heads
    #[must_use]
    pub fn num_attention_heads(&self) -> Option<u64> {
        self.lookup_u64(HEAD_KEYS)
    }

    /// Key/value heads (grouped-query attention)
    #[must_use]
    pub fn num_key_value_heads(&self) -> Option<u64> {
        self.lookup_u64(KV_HEAD_KEYS)
    }

    /// Experts per MoE layer
    #[must_use]
    pub fn num_experts(&self) -> Option<u64> {
        self.lookup_u64(EXPERT_KEYS)
    }

    /// Whether the output head shares the embedding matrix (default true)
    #[must_use]
    pub fn tie_word_embeddings(&self) -> bool {
        self.lookup(&["tie_word_embeddings"])
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

fn find_key<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

/// Analytic transformer layout derived from a config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Architecture {
    /// Gated-MLP decoder (Llama, Mistral, Qwen2, Gemma, ...)
    Llama {
        num_layers: u64,
        hidden_size: u64,
        intermediate_size: u64,
        kv_hidden_size: u64,
        vocab_size: u64,
        num_experts: u64,
        tie_word_embeddings: bool,
    },
    /// GPT-2 style decoder with learned positions and biases
    Gpt2 {
        num_layers: u64,
        hidden_size: u64,
        intermediate_size: u64,
        vocab_size: u64,
        max_positions: u64,
        tie_word_embeddings: bool,
    },
}

impl Architecture {
    /// Derive a layout, or `None` when the config lacks the dimensions
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Option<Self> {
        let num_layers = config.num_layers()?;
        let hidden_size = config.hidden_size()?;
        let vocab_size = config.vocab_size()?;
        let intermediate_size = config
            .intermediate_size()
            .unwrap_or(hidden_size.saturating_mul(4));
        let tie_word_embeddings = config.tie_word_embeddings();

        let gated = config
            .model_type()
            .is_some_and(|t| GATED_MLP_FAMILIES.contains(&t));
        if gated {
            let heads = config.num_attention_heads().unwrap_or(1).max(1);
            let kv_heads = config.num_key_value_heads().unwrap_or(heads);
            Some(Self::Llama {
                num_layers,
                hidden_size,
                intermediate_size,
                kv_hidden_size: (hidden_size / heads).saturating_mul(kv_heads),
                vocab_size,
                num_experts: config.num_experts().unwrap_or(1).max(1),
                tie_word_embeddings,
            })
        } else {
            Some(Self::Gpt2 {
                num_layers,
                hidden_size,
                intermediate_size,
                vocab_size,
                max_positions: config.max_position_embeddings().unwrap_or(0),
                tie_word_embeddings,
            })
        }
    }

    /// Parameters in one transformer block, `None` on overflow
    #[must_use]
    pub fn block_param_count(&self) -> Option<u64> {
        match *self {
            Self::Llama {
                hidden_size: h,
                intermediate_size: i,
                kv_hidden_size: kv,
                num_experts,
                ..
            } => {
                let attn = mul(&[2, h, h])?.checked_add(mul(&[2, h, kv])?)?;
                let mlp = mul(&[3, h, i, num_experts])?;
                let router = if num_experts > 1 { mul(&[h, num_experts])? } else { 0 };
                sum(&[attn, mlp, router, mul(&[2, h])?])
            }
            Self::Gpt2 {
                hidden_size: h,
                intermediate_size: i,
                ..
            } => {
                let attn = sum(&[mul(&[4, h, h])?, mul(&[4, h])?])?;
                let mlp = sum(&[mul(&[2, h, i])?, i, h])?;
                sum(&[attn, mlp, mul(&[4, h])?])
            }
        }
    }

    /// Parameters in the token (and position) embeddings, `None` on overflow
    #[must_use]
    pub fn embedding_param_count(&self) -> Option<u64> {
        match *self {
            Self::Llama {
                hidden_size,
                vocab_size,
                ..
            } => mul(&[vocab_size, hidden_size]),
            Self::Gpt2 {
                hidden_size,
                vocab_size,
                max_positions,
                ..
            } => mul(&[vocab_size.checked_add(max_positions)?, hidden_size]),
        }
    }

    /// Estimate total parameter count, `None` on overflow
    #[must_use]
    pub fn param_count(&self) -> Option<u64> {
        let (num_layers, hidden_size, vocab_size, tied) = match *self {
            Self::Llama {
                num_layers,
                hidden_size,
                vocab_size,
                tie_word_embeddings,
                ..
            }
            | Self::Gpt2 {
                num_layers,
                hidden_size,
                vocab_size,
                tie_word_embeddings,
                ..
            } => (num_layers, hidden_size, vocab_size, tie_word_embeddings),
        };
        let head = if tied { 0 } else { mul(&[vocab_size, hidden_size])? };
        // RMSNorm has no bias; LayerNorm does
        let final_norm = match self {
            Self::Llama { .. } => hidden_size,
            Self::Gpt2 { .. } => mul(&[2, hidden_size])?,
        };
        sum(&[
            self.embedding_param_count()?,
            mul(&[num_layers, self.block_param_count()?])?,
            final_norm,
            head,
        ])
    }

    /// Float32-reference summary; the largest layer is a block or the embeddings
    ///
    /// `None` when the declared dimensions overflow a parameter count.
    #[must_use]
    pub fn summary(&self) -> Option<ParameterSizeSummary> {
        let block = self.block_param_count()?;
        let embeddings = self.embedding_param_count()?;
        let (name, largest) = if embeddings >= block {
            ("embeddings", embeddings)
        } else {
            ("transformer block", block)
        };
        Some(
            ParameterSizeSummary::from_param_counts(self.param_count()?, largest)
                .with_largest_layer_name(name),
        )
    }
}

fn mul(factors: &[u64]) -> Option<u64> {
    factors.iter().try_fold(1u64, |acc, &f| acc.checked_mul(f))
}

fn sum(terms: &[u64]) -> Option<u64> {
    terms.iter().try_fold(0u64, |acc, &t| acc.checked_add(t))
}
