//! Resolver tests against an in-memory hub.

use super::*;
use crate::error::{ErrorKind, Result, VramError};
use serde_json::json;
use std::cell::RefCell;
use std::collections::BTreeMap;

// =========================================================================
// In-memory hub
// =========================================================================

#[derive(Default)]
struct FakeHub {
    repo: String,
    files: BTreeMap<String, Vec<u8>>,
    library_name: Option<String>,
    gated: bool,
    requests: RefCell<Vec<String>>,
}

impl FakeHub {
    fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            ..Self::default()
        }
    }

    fn file(mut self, name: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), body.into());
        self
    }

    fn json(self, name: &str, value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).unwrap();
        self.file(name, body)
    }

    fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    fn check_repo(&self, repo: &RepoId) -> Result<()> {
        if repo.as_str() == self.repo {
            Ok(())
        } else {
            Err(classify_status(repo.as_str(), RequestTarget::Info, 401, Some("RepoNotFound"), ""))
        }
    }

    fn body(&self, repo: &RepoId, file: &str) -> Result<&Vec<u8>> {
        self.check_repo(repo)?;
        if self.gated {
            return Err(classify_status(repo.as_str(), RequestTarget::File(file), 403, Some("GatedRepo"), ""));
        }
        self.files.get(file).ok_or_else(|| {
            classify_status(repo.as_str(), RequestTarget::File(file), 404, Some("EntryNotFound"), "")
        })
    }

    fn requested(&self, needle: &str) -> bool {
        self.requests.borrow().iter().any(|r| r.contains(needle))
    }
}

impl HubTransport for FakeHub {
    fn model_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        self.requests.borrow_mut().push(format!("info {repo}"));
        self.check_repo(repo)?;
        Ok(RepoInfo {
            sha: Some("0123abcd".into()),
            library_name: self.library_name.clone(),
            gated: self.gated,
            files: self.files.keys().cloned().collect(),
        })
    }

    fn fetch_file(&self, repo: &RepoId, file: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(format!("file {file}"));
        self.body(repo, file).cloned()
    }

    fn fetch_range(&self, repo: &RepoId, file: &str, start: u64, len: u64) -> Result<Vec<u8>> {
        self.requests
            .borrow_mut()
            .push(format!("range {file} {start}+{len}"));
        let body = self.body(repo, file)?;
        let start = (start as usize).min(body.len());
        let end = (start + len as usize).min(body.len());
        Ok(body[start..end].to_vec())
    }
}

/// Safetensors bytes with a header only; the data section is never read
fn safetensors(tensors: &[(&str, &str, &[u64])]) -> Vec<u8> {
    let mut header = serde_json::Map::new();
    header.insert("__metadata__".into(), json!({"format": "pt"}));
    for (name, dtype, shape) in tensors {
        header.insert(
            (*name).to_string(),
            json!({"dtype": dtype, "shape": shape, "data_offsets": [0, 0]}),
        );
    }
    let header = serde_json::to_vec(&header).unwrap();
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(&header);
    bytes
}

fn llama_config() -> serde_json::Value {
    json!({
        "architectures": ["LlamaForCausalLM"],
        "model_type": "llama",
        "hidden_size": 64,
        "intermediate_size": 128,
        "num_attention_heads": 4,
        "num_hidden_layers": 2,
        "vocab_size": 1000,
        "max_position_embeddings": 4096
    })
}

fn single_file_hub() -> FakeHub {
    FakeHub::new("org/tiny")
        .json("config.json", &llama_config())
        .json(
            "tokenizer_config.json",
            &json!({"chat_template": "{% for message in messages %}{{ message.content }}{% endfor %}"}),
        )
        .file(
            "model.safetensors",
            safetensors(&[
                ("model.embed_tokens.weight", "BF16", &[1000, 64]),
                ("model.layers.0.self_attn.q_proj.weight", "BF16", &[64, 64]),
                ("model.layers.0.mlp.up_proj.weight", "BF16", &[128, 64]),
                ("model.layers.1.self_attn.q_proj.weight", "BF16", &[64, 64]),
                ("model.norm.weight", "BF16", &[64]),
            ]),
        )
}

// =========================================================================
// Successful Resolution
// =========================================================================

#[test]
fn test_resolve_single_file() {
    let resolver = ModelResolver::with_transport(single_file_hub());
    let model = resolver.resolve("org/tiny").unwrap();

    let total_params = 64_000 + 4096 + 8192 + 4096 + 64;
    assert_eq!(model.repo_id, "org/tiny");
    assert_eq!(model.summary.total_size_bytes, f64::from(total_params) * 4.0);
    assert_eq!(model.summary.largest_layer_size_bytes, 64_000.0 * 4.0);
    assert_eq!(model.summary.largest_layer_name.as_deref(), Some("model.embed_tokens"));
    assert_eq!(model.max_position_embeddings, Some(4096));
    assert!(model.has_chat_template);
    assert_eq!(
        model.weight_source,
        WeightSource::Safetensors {
            files: 1,
            tensors: 5,
            dtype: Some("BF16".into())
        }
    );
}

#[test]
fn test_resolve_reads_headers_only() {
    let resolver = ModelResolver::with_transport(single_file_hub());
    resolver.resolve("org/tiny").unwrap();
    let hub = resolver.transport();
    assert!(hub.requested("range model.safetensors 0+8"));
    assert!(!hub.requested("file model.safetensors"));
}

#[test]
fn test_resolve_sharded() {
    let hub = FakeHub::new("org/sharded")
        .json("config.json", &llama_config())
        .json(
            "model.safetensors.index.json",
            &json!({
                "metadata": {"total_size": 0},
                "weight_map": {
                    "model.embed_tokens.weight": "model-00001-of-00002.safetensors",
                    "model.layers.0.mlp.up_proj.weight": "model-00001-of-00002.safetensors",
                    "model.layers.1.mlp.up_proj.weight": "model-00002-of-00002.safetensors"
                }
            }),
        )
        .file(
            "model-00001-of-00002.safetensors",
            safetensors(&[
                ("model.embed_tokens.weight", "F16", &[10, 10]),
                ("model.layers.0.mlp.up_proj.weight", "F16", &[20, 10]),
            ]),
        )
        .file(
            "model-00002-of-00002.safetensors",
            safetensors(&[("model.layers.1.mlp.up_proj.weight", "F16", &[30, 10])]),
        );

    let resolver = ModelResolver::with_transport(hub);
    let model = resolver.resolve("org/sharded").unwrap();
    assert_eq!(model.summary.total_size_bytes, 600.0 * 4.0);
    assert_eq!(model.summary.largest_layer_name.as_deref(), Some("model.layers.1"));
    assert!(matches!(model.weight_source, WeightSource::Safetensors { files: 2, .. }));
    assert!(!model.has_chat_template);
}

#[test]
fn test_resolve_from_url_with_llama_alias() {
    let hub = FakeHub::new("meta-llama/Llama-2-7b-hf")
        .json("config.json", &llama_config())
        .file("model.safetensors", safetensors(&[("lm_head.weight", "F16", &[4, 4])]));
    let resolver = ModelResolver::with_transport(hub);
    let model = resolver
        .resolve("https://huggingface.co/meta-llama/Llama-2-7b")
        .unwrap();
    assert_eq!(model.repo_id, "meta-llama/Llama-2-7b-hf");
}

#[test]
fn test_resolve_config_fallback_without_safetensors() {
    let hub = FakeHub::new("org/legacy")
        .json("config.json", &llama_config())
        .file("pytorch_model.bin", vec![0_u8; 16]);
    let resolver = ModelResolver::with_transport(hub);
    let model = resolver.resolve("org/legacy").unwrap();

    let arch = Architecture::from_config(&ModelConfig::from_json(
        &RepoId::parse("org/legacy").unwrap(),
        &serde_json::to_vec(&llama_config()).unwrap(),
    )
    .unwrap())
    .unwrap();
    assert_eq!(model.weight_source, WeightSource::ConfigEstimate);
    assert_eq!(model.summary.total_size_bytes, arch.param_count().unwrap() as f64 * 4.0);
    assert!(!resolver.transport().requested("pytorch_model.bin"));
}

#[test]
fn test_chat_template_from_jinja_file() {
    let hub = single_file_hub()
        .json("tokenizer_config.json", &json!({"bos_token": "<s>"}))
        .file("chat_template.jinja", "{{ messages }}");
    let model = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap();
    assert!(model.has_chat_template);
}

#[test]
fn test_no_tokenizer_config_means_no_template() {
    let mut hub = single_file_hub();
    hub.files.remove("tokenizer_config.json");
    let model = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap();
    assert!(!model.has_chat_template);
}

#[test]
fn test_model_report_has_four_estimates() {
    let resolver = ModelResolver::with_transport(single_file_hub());
    let report = ModelReport::build(&resolver, "org/tiny").unwrap();
    assert_eq!(report.memory.len(), 4);
    assert_eq!(report.max_length(), Some(4096));
    assert!(report.has_chat_template());
    let map = report.memory.as_map();
    assert_eq!(map[0].0, "float32");
    assert_eq!(map[3].0, "int4");
    assert!(map[0].1 > map[3].1);
}

// =========================================================================
// Error Classification
// =========================================================================

#[test]
fn test_unknown_repo_is_not_found() {
    let resolver = ModelResolver::with_transport(single_file_hub());
    let err = resolver.resolve("org/missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("org/missing"));
}

#[test]
fn test_malformed_identifier_never_hits_the_hub() {
    let resolver = ModelResolver::with_transport(single_file_hub());
    let err = resolver.resolve("not a/valid/id").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(resolver.transport().requests.borrow().is_empty());
}

#[test]
fn test_gated_repo() {
    let resolver = ModelResolver::with_transport(single_file_hub().gated());
    let err = resolver.resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatedAccess);
    assert!(err.to_string().contains("access token"));
}

#[test]
fn test_missing_config_is_unsupported_library() {
    let mut hub = single_file_hub();
    hub.files.remove("config.json");
    hub.library_name = Some("diffusers".into());
    let err = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedLibrary);
    assert!(matches!(
        err,
        VramError::UnsupportedLibrary { library: Some(ref l), .. } if l == "diffusers"
    ));
}

#[test]
fn test_corrupt_header_is_load_error() {
    let mut bytes = 1_000_u64.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{\"truncated\":");
    let hub = single_file_hub().file("model.safetensors", bytes);
    let err = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("truncated"));
}

#[test]
fn test_oversized_header_is_load_error() {
    let bytes = (MAX_HEADER_SIZE + 1).to_le_bytes().to_vec();
    let hub = single_file_hub().file("model.safetensors", bytes);
    let err = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
}

#[test]
fn test_shard_listed_but_missing_is_load_error() {
    let hub = FakeHub::new("org/broken")
        .json("config.json", &llama_config())
        .json(
            "model.safetensors.index.json",
            &json!({"weight_map": {"a.weight": "model-00001-of-00001.safetensors"}}),
        );
    let err = ModelResolver::with_transport(hub).resolve("org/broken").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("model-00001-of-00001.safetensors"));
}

#[test]
fn test_config_without_dimensions_and_no_weights() {
    let hub = FakeHub::new("org/odd").json("config.json", &json!({"model_type": "custom"}));
    let err = ModelResolver::with_transport(hub).resolve("org/odd").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("model_type: custom"));
}

#[test]
fn test_malformed_config_is_load_error() {
    let hub = single_file_hub().file("config.json", "{not json");
    let err = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn test_overflowing_tensor_shape_is_load_error() {
    let hub = single_file_hub().file(
        "model.safetensors",
        safetensors(&[("model.layers.0.mlp.up_proj.weight", "F32", &[u64::MAX / 2, 4])]),
    );
    let err = ModelResolver::with_transport(hub).resolve("org/tiny").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("parameter count overflows"));
}

#[test]
fn test_overflowing_config_dimensions_are_load_error() {
    let mut config = llama_config();
    config["hidden_size"] = json!(4_294_967_296_u64);
    config["intermediate_size"] = json!(4_294_967_296_u64);
    let hub = FakeHub::new("org/huge").json("config.json", &config);
    let err = ModelResolver::with_transport(hub).resolve("org/huge").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadError);
    assert!(err.to_string().contains("parameter count overflows"));
}
