//! PromptBoost configuration: `~/.promptboost/config.toml`.
//!
//! The file is merged over built-in defaults, so partial files are fine.
//! Environment overrides are applied by [`PromptBoostConfig::load`] only and
//! are never written back.

use pb_llm::{Mode, OutputFormat, Provider, RequestSettings, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_VERSION: &str = "1.0.0";
pub const ENV_DEFAULT_PROVIDER: &str = "PROMPTBOOST_DEFAULT_PROVIDER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBoostConfig {
    pub version: String,
    pub default_provider: String,
    pub settings: Settings,
    pub providers: BTreeMap<String, Provider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_ms: u64,
    pub retries: u32,
    pub output_format: OutputFormat,
    pub default_mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            timeout_ms: 30_000,
            retries: 3,
            output_format: OutputFormat::Plain,
            default_mode: Mode::Medium,
        }
    }
}

/// Partial update for one provider entry; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProviderUpdate {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for PromptBoostConfig {
    fn default() -> Self {
        let providers = Vendor::ALL
            .into_iter()
            .map(|v| (v.name().to_string(), default_provider_entry(v)))
            .collect();
        Self {
            version: CONFIG_VERSION.to_string(),
            default_provider: Vendor::OpenAi.name().to_string(),
            settings: Settings::default(),
            providers,
        }
    }
}

fn default_provider_entry(vendor: Vendor) -> Provider {
    let (model, base_url) = match vendor {
        Vendor::OpenAi => ("gpt-4.1-mini", "https://api.openai.com/v1"),
        Vendor::Anthropic => ("claude-4-sonnet-20250514", "https://api.anthropic.com"),
        Vendor::Grok => ("grok-3", "https://api.x.ai/v1"),
        Vendor::Google => ("gemini-2.5-flash", "https://generativelanguage.googleapis.com"),
    };
    Provider {
        name: vendor.name().to_string(),
        api_key: String::new(),
        model: model.to_string(),
        base_url: base_url.to_string(),
        enabled: false,
    }
}

fn env_key_var(vendor: Vendor) -> String {
    format!("PROMPTBOOST_{}_KEY", vendor.name().to_ascii_uppercase())
}

impl PromptBoostConfig {
    /// Reads the file (creating it with defaults when missing), then applies
    /// environment overrides and validates.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut cfg = Self::load_file(path).await?;
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// File contents merged over defaults, without environment overrides.
    pub async fn load_file(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save(&path).await?;
                tracing::info!(path = %path.display(), "created default configuration file");
                return Ok(cfg);
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };
        let cfg = Self::parse(&contents)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(cfg)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let file: toml::Value = toml::from_str(contents)?;
        let mut merged = toml::Value::try_from(Self::default())?;
        merge_toml_value(&mut merged, file);
        Ok(merged.try_into()?)
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("create config dir {}: {e}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| anyhow::anyhow!("write config {}: {e}", path.display()))?;
        restrict_permissions(path).await?;
        Ok(())
    }

    pub(crate) fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        for vendor in Vendor::ALL {
            let Some(key) = env(&env_key_var(vendor)).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let entry = self
                .providers
                .entry(vendor.name().to_string())
                .or_insert_with(|| default_provider_entry(vendor));
            entry.api_key = key;
            entry.enabled = true;
        }
        if let Some(v) = env(ENV_DEFAULT_PROVIDER).filter(|v| !v.trim().is_empty()) {
            self.default_provider = v.trim().to_string();
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_provider.trim().is_empty() {
            return Err(anyhow::anyhow!("default_provider is required"));
        }
        if self.settings.timeout_ms == 0 {
            return Err(anyhow::anyhow!("settings.timeout_ms must be > 0"));
        }
        if self.settings.max_tokens == 0 {
            return Err(anyhow::anyhow!("settings.max_tokens must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.settings.temperature) {
            return Err(anyhow::anyhow!(
                "settings.temperature must be between 0 and 2, got {}",
                self.settings.temperature
            ));
        }
        Ok(())
    }

    pub fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    /// Built-in vendors first, in their canonical order, then any extra
    /// entries from the file by name.
    pub fn ordered_providers(&self) -> Vec<(&str, &Provider)> {
        let builtin = Vendor::ALL
            .iter()
            .filter_map(|v| self.providers.get_key_value(v.name()));
        let extra = self
            .providers
            .iter()
            .filter(|(name, _)| !Vendor::ALL.iter().any(|v| v.name() == name.as_str()));
        builtin
            .chain(extra)
            .map(|(name, p)| (name.as_str(), p))
            .collect()
    }

    /// Providers that are enabled and have a key, in configuration order.
    pub fn enabled_providers(&self) -> Vec<&Provider> {
        self.ordered_providers()
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| p.is_configured())
            .collect()
    }

    /// Applies `update` to a known provider. Setting a key also enables the
    /// provider, and the first provider to get a key becomes the default.
    /// Returns whether the default provider changed.
    pub fn set_provider(&mut self, name: &str, update: ProviderUpdate) -> anyhow::Result<bool> {
        let first_configured = update.api_key.is_some() && self.enabled_providers().is_empty();
        let entry = self
            .providers
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider: {name}"))?;
        if let Some(key) = update.api_key {
            entry.api_key = key;
            entry.enabled = true;
        }
        if let Some(model) = update.model {
            entry.model = model;
        }
        if let Some(base_url) = update.base_url {
            entry.base_url = base_url;
        }
        if first_configured {
            self.default_provider = name.to_string();
        }
        Ok(first_configured)
    }

    pub fn set_default_provider(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.providers.contains_key(name) {
            return Err(anyhow::anyhow!("Unknown provider: {name}"));
        }
        self.default_provider = name.to_string();
        Ok(())
    }

    /// Clears the key and disables the provider. The entry itself stays.
    pub fn remove_provider(&mut self, name: &str) -> anyhow::Result<()> {
        let entry = self
            .providers
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider: {name}"))?;
        entry.api_key.clear();
        entry.enabled = false;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn request_settings(&self) -> RequestSettings {
        RequestSettings {
            timeout: Duration::from_millis(self.settings.timeout_ms),
            max_retries: self.settings.retries,
            ..RequestSettings::default()
        }
    }
}

fn merge_toml_value(target: &mut toml::Value, patch: toml::Value) {
    match (target, patch) {
        (toml::Value::Table(target_map), toml::Value::Table(patch_map)) => {
            for (key, value) in patch_map {
                match target_map.get_mut(&key) {
                    Some(entry) => merge_toml_value(entry, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_value, patch_value) => {
            *target_value = patch_value;
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| anyhow::anyhow!("chmod config {}: {e}", path.display()))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".promptboost").join("config.toml")
}
