// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading and validation.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Port the proxy listens on.
    pub port: u16,

    /// Base URL of the backend every request is forwarded to.
    pub backend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Port the documentation server listens on.
    pub port: u16,

    /// Cap on distinct examples kept per schema path (default: 10)
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,

    /// Field names whose values are stored as "REDACTED", matched
    /// case-insensitively against JSON fields, headers and query parameters.
    #[serde(default)]
    pub redacted_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the analyzer snapshot (default: docurift-data)
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Seconds between snapshot saves (default: 10)
    #[serde(default = "default_frequency")]
    pub frequency: u64,
}

fn default_max_examples() -> usize {
    10
}

fn default_storage_path() -> String {
    "docurift-data".to_string()
}

fn default_frequency() -> u64 {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            frequency: default_frequency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// TOML format:
    ///
    /// ```toml
    /// [proxy]
    /// port = 8080
    /// backend_url = "http://localhost:9000"
    ///
    /// [analyzer]
    /// port = 8081
    /// max_examples = 10
    /// redacted_fields = ["Authorization"]
    ///
    /// [storage]
    /// path = "docurift-data"
    /// frequency = 10
    /// ```
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.proxy.port == 0 {
            anyhow::bail!("proxy port must be positive");
        }
        if self.analyzer.port == 0 {
            anyhow::bail!("analyzer port must be positive");
        }
        if self.proxy.port == self.analyzer.port {
            anyhow::bail!("proxy and analyzer ports must differ");
        }
        if self.proxy.backend_url.is_empty() {
            anyhow::bail!("backend URL is required");
        }
        if self.analyzer.max_examples == 0 {
            anyhow::bail!("max examples must be positive");
        }
        if self.storage.frequency == 0 {
            anyhow::bail!("storage frequency must be positive");
        }
        Ok(())
    }
}
