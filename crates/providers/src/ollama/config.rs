use directories::BaseDirs;
use oml_core::api::{normalize_host, DEFAULT_HOST};
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::{debug, warn};

pub const DEFAULT_MODELS: [&str; 4] = ["gemma", "llama2", "mistral", "codellama"];
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OllamaFileConfig {
    pub host: Option<String>,
    pub model: Option<String>,
    pub models: Option<Vec<String>>,
    pub connect_timeout_ms: Option<u64>,
    pub max_line_bytes: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    host: String,
    pub model: String,
    pub models: Vec<String>,
    pub connect_timeout: Duration,
    /// Longest response line accepted before the stream is abandoned.
    pub max_line_bytes: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODELS[0].to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            connect_timeout: Duration::from_secs(10),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl OllamaConfig {
    pub fn with_host(host: impl AsRef<str>) -> Self {
        let mut cfg = Self::default();
        cfg.set_host(host);
        cfg
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The only runtime-mutable setting. Trailing slashes are dropped; no
    /// other validation is applied.
    pub fn set_host(&mut self, host: impl AsRef<str>) {
        self.host = normalize_host(host.as_ref()).to_string();
    }

    /// Defaults, then `config.toml`, then `OML_API_HOST` / `OLLAMA_HOST` and
    /// `OML_MODEL` from the environment.
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(path) = Self::config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(text) => {
                        if let Err(e) = cfg.apply_toml(&text) {
                            warn!(target: "providers::ollama", "ignoring invalid config {}: {}", path.display(), e);
                        }
                    }
                    Err(e) => warn!(target: "providers::ollama", "cannot read config {}: {}", path.display(), e),
                }
            }
        }

        cfg.apply_env(|key| env::var(key).ok());
        debug!(target: "providers::ollama", "config host={} model={}", cfg.host, cfg.model);
        Ok(cfg)
    }

    /// Apply a `config.toml` document. Nothing changes if it does not parse.
    pub fn apply_toml(&mut self, text: &str) -> Result<(), toml::de::Error> {
        let file_cfg = toml::from_str::<OllamaFileConfig>(text)?;
        self.apply_file(file_cfg);
        Ok(())
    }

    /// Apply environment overrides read through `get`. Blank values are
    /// ignored; `OML_API_HOST` wins over `OLLAMA_HOST`.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = non_blank("OML_API_HOST").or_else(|| non_blank("OLLAMA_HOST")) {
            self.set_host(with_scheme(&host));
        }
        if let Some(model) = non_blank("OML_MODEL") {
            self.model = model.trim().to_string();
        }
    }

    pub fn apply_file(&mut self, file_cfg: OllamaFileConfig) {
        if let Some(h) = file_cfg.host {
            self.set_host(h);
        }
        if let Some(m) = file_cfg.model {
            self.model = m;
        }
        if let Some(ms) = file_cfg.models {
            self.models = ms;
        }
        if let Some(t) = file_cfg.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(t);
        }
        if let Some(n) = file_cfg.max_line_bytes {
            self.max_line_bytes = n.max(1);
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("oml").join("config.toml"))
    }
}

// OLLAMA_HOST is commonly set as a bare `host:port`.
fn with_scheme(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_server() {
        let cfg = OllamaConfig::default();
        assert_eq!(cfg.host(), "http://localhost:11434");
        assert_eq!(cfg.model, "gemma");
        assert_eq!(cfg.models, vec!["gemma", "llama2", "mistral", "codellama"]);
        assert_eq!(cfg.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    }

    #[test]
    fn set_host_trims_trailing_slash() {
        let mut cfg = OllamaConfig::default();
        cfg.set_host("http://10.0.0.5:11434/");
        assert_eq!(cfg.host(), "http://10.0.0.5:11434");
        cfg.set_host("no-scheme-is-kept///");
        assert_eq!(cfg.host(), "no-scheme-is-kept");
    }

    #[test]
    fn file_values_override_defaults() {
        let file_cfg: OllamaFileConfig = toml::from_str(
            r#"
            host = "http://gpu-box:11434/"
            model = "mistral"
            models = ["mistral", "phi"]
            connect_timeout_ms = 2500
            max_line_bytes = 0
            "#,
        )
        .expect("parse toml");
        let mut cfg = OllamaConfig::default();
        cfg.apply_file(file_cfg);
        assert_eq!(cfg.host(), "http://gpu-box:11434");
        assert_eq!(cfg.model, "mistral");
        assert_eq!(cfg.models, vec!["mistral", "phi"]);
        assert_eq!(cfg.connect_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.max_line_bytes, 1);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file_cfg: OllamaFileConfig = toml::from_str(r#"model = "llama2""#).expect("parse");
        let mut cfg = OllamaConfig::default();
        cfg.apply_file(file_cfg);
        assert_eq!(cfg.model, "llama2");
        assert_eq!(cfg.host(), DEFAULT_HOST);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn oml_host_wins_over_ollama_host() {
        let mut cfg = OllamaConfig::default();
        cfg.apply_env(vars(&[
            ("OML_API_HOST", "http://first:11434/"),
            ("OLLAMA_HOST", "http://second:11434"),
        ]));
        assert_eq!(cfg.host(), "http://first:11434");
    }

    #[test]
    fn ollama_host_used_when_oml_host_blank() {
        let mut cfg = OllamaConfig::default();
        cfg.apply_env(vars(&[("OML_API_HOST", "  "), ("OLLAMA_HOST", "0.0.0.0:11435")]));
        assert_eq!(cfg.host(), "http://0.0.0.0:11435");
    }

    #[test]
    fn env_model_overrides_unless_blank() {
        let mut cfg = OllamaConfig::default();
        cfg.apply_env(vars(&[("OML_MODEL", " ")]));
        assert_eq!(cfg.model, "gemma");
        cfg.apply_env(vars(&[("OML_MODEL", " codellama ")]));
        assert_eq!(cfg.model, "codellama");
    }

    #[test]
    fn empty_env_keeps_defaults() {
        let mut cfg = OllamaConfig::default();
        cfg.apply_env(vars(&[]));
        assert_eq!(cfg, OllamaConfig::default());
    }

    #[test]
    fn env_applies_over_file_values() {
        let mut cfg = OllamaConfig::default();
        cfg.apply_toml("host = \"http://from-file:11434\"\nmodel = \"mistral\"")
            .expect("valid toml");
        cfg.apply_env(vars(&[("OLLAMA_HOST", "env-box:11434")]));
        assert_eq!(cfg.host(), "http://env-box:11434");
        assert_eq!(cfg.model, "mistral");
    }

    #[test]
    fn unparsable_toml_leaves_defaults() {
        let mut cfg = OllamaConfig::default();
        assert!(cfg.apply_toml("host = [unterminated").is_err());
        assert!(cfg.apply_toml("model = 42").is_err());
        assert_eq!(cfg, OllamaConfig::default());
    }

    #[test]
    fn bare_host_port_gets_http_scheme() {
        assert_eq!(with_scheme("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(with_scheme("https://remote"), "https://remote");
    }
}
