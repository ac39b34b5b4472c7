use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for probe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Discovery document on disk; takes precedence over `server`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Control-plane API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Extra mapping-key terms, matched as case-insensitive substrings
    #[serde(default)]
    pub extra_keys: Vec<String>,

    /// Extra content regexes; each match is replaced
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            file: None,
            server: None,
            token_env: default_token_env(),
            refresh_secs: default_refresh_secs(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_tls_verify: false,
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_token_env() -> String {
    "PROBE_TOKEN".to_string()
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    17474
}

impl DiscoveryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bearer token from the configured environment variable, if set
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it is missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("dev", "probe", "probe") {
            dirs.config_dir().join("probe.toml")
        } else {
            PathBuf::from("~/.probe/probe.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mcp.port, 17474);
        assert_eq!(config.discovery.refresh_interval(), Duration::from_secs(300));
        assert!(config.discovery.file.is_none());
        assert!(config.redaction.extra_patterns.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.discovery.token_env, config.discovery.token_env);
        assert_eq!(parsed.mcp.host, config.mcp.host);
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [discovery]
            server = "https://10.0.0.1:6443"
            timeout_secs = 5

            [redaction]
            extra_keys = ["session"]
            extra_patterns = ['acct-\d{6}']
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.server.as_deref(), Some("https://10.0.0.1:6443"));
        assert_eq!(config.discovery.timeout(), Duration::from_secs(5));
        assert_eq!(config.discovery.refresh_secs, 300);
        assert_eq!(config.redaction.extra_keys, vec!["session"]);
        assert_eq!(config.mcp.port, 17474);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: Config = toml::from_str(
            r#"
            [mcp]
            port = 9000
            read_only = false
            "#,
        )
        .unwrap();
        assert_eq!(config.mcp.port, 9000);
    }

    #[test]
    fn test_load_from_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("probe.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.mcp.port, 17474);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.discovery.timeout_secs, config.discovery.timeout_secs);
    }

    #[test]
    fn test_load_from_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "[mcp\nport = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_token_from_env() {
        let config = DiscoveryConfig {
            token_env: "PROBE_CONFIG_TEST_UNSET_TOKEN".to_string(),
            ..DiscoveryConfig::default()
        };
        assert!(config.token().is_none());
    }
}
