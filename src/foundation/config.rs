use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{MemecapError, MemecapResult};

/// Default export width in pixels when a request does not name one.
pub const DEFAULT_OUTPUT_WIDTH: u32 = 1200;

/// Ordered display/sans fallback list used to pick the caption face.
pub const DEFAULT_FONT_FAMILIES: &[&str] = &[
    "Impact",
    "Anton",
    "Arial Black",
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
];

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(default)]
/// Top-level application configuration, usually read from a TOML file.
pub struct AppConfig {
    /// Layer compositor settings.
    pub compositor: CompositorConfig,
    /// Gateway HTTP server settings.
    pub gateway: GatewayConfig,
    /// External chat-completion service settings.
    pub upstream: UpstreamConfig,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(default)]
/// Settings for [`crate::Compositor`].
pub struct CompositorConfig {
    /// Output width used when an export request leaves it unset.
    pub default_output_width: u32,
    /// Directories scanned recursively (a few levels deep) for font files.
    pub font_dirs: Vec<PathBuf>,
    /// Family names tried in order when picking the caption face.
    pub font_families: Vec<String>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            default_output_width: DEFAULT_OUTPUT_WIDTH,
            font_dirs: vec![PathBuf::from("fonts"), PathBuf::from("/usr/share/fonts")],
            font_families: DEFAULT_FONT_FAMILIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(default)]
/// Settings for the gateway HTTP server.
pub struct GatewayConfig {
    /// Socket address the server binds to.
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(default)]
/// Settings for the chat-completion upstream.
pub struct UpstreamConfig {
    /// API base, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    /// Per-request transport timeout.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl UpstreamConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        non_empty_env(&self.api_key_env)
    }
}

impl AppConfig {
    /// Load configuration from `path` when given, otherwise start from
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> MemecapResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(src: &str) -> MemecapResult<Self> {
        toml::from_str(src).map_err(|e| MemecapError::serde(format!("invalid config: {e}")))
    }

    fn from_toml_file(path: &Path) -> MemecapResult<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_toml_str(&src)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = non_empty_env("MEMECAP_UPSTREAM_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = non_empty_env("MEMECAP_UPSTREAM_MODEL") {
            self.upstream.model = v;
        }
        if let Some(v) = non_empty_env("MEMECAP_BIND") {
            self.gateway.bind = v;
        }
    }

    /// Check value constraints that serde defaults cannot express.
    pub fn validate(&self) -> MemecapResult<()> {
        if self.compositor.default_output_width == 0 {
            return Err(MemecapError::validation(
                "compositor.default_output_width must be > 0",
            ));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(MemecapError::validation("upstream.base_url must be non-empty"));
        }
        if self.upstream.model.trim().is_empty() {
            return Err(MemecapError::validation("upstream.model must be non-empty"));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
