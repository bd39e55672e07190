//! stk-config
//!
//! Layered YAML configuration: documents are merged in order (later
//! documents override earlier ones), hashed over their canonical JSON, and
//! extracted into a typed [`EngineConfig`]. Every key has a default, so an
//! empty document is a valid configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use stk_reconcile::ValidationLimits;

/// Secret-looking prefixes. Tokens belong in the environment; config only
/// names the variable (`backend.token_env`).
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI / Stripe style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "eyJ",        // JWT
];

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub validation: ValidationLimits,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Name of the env var holding the bearer token, if the backend wants one.
    pub token_env: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
            token_env: None,
        }
    }
}

impl BackendConfig {
    /// Resolve the bearer token from the configured env var. Unset var or no
    /// `token_env` both mean "no token".
    pub fn token(&self) -> Option<String> {
        let var = self.token_env.as_deref()?;
        std::env::var(var).ok().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: EngineConfig =
            serde_json::from_value(v.clone()).context("CONFIG_INVALID: config does not match schema")?;
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<()> {
        let v = &self.validation;
        if v.max_quantity <= 0 {
            bail!("CONFIG_INVALID: validation.max_quantity must be positive");
        }
        if v.option_significant_units < 0 || v.aggregate_significant_units < 0 {
            bail!("CONFIG_INVALID: significance unit thresholds must be >= 0");
        }
        for (key, ratio) in [
            ("option_significant_ratio", v.option_significant_ratio),
            ("aggregate_significant_ratio", v.aggregate_significant_ratio),
        ] {
            if !ratio.is_finite() || ratio <= 0.0 {
                bail!("CONFIG_INVALID: validation.{key} must be a positive number");
            }
        }
        if self.backend.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID: backend.base_url must not be empty");
        }
        if self.backend.timeout_secs == 0 {
            bail!("CONFIG_INVALID: backend.timeout_secs must be positive");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn engine(&self) -> Result<EngineConfig> {
        EngineConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // Empty documents parse as null; treat them as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON with keys sorted recursively, so the hash does not depend on
/// the order keys appeared in the YAML layers.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sort_keys(v)).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}
