//! CLI Configuration

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Path to keypair file
    pub keypair_path: Option<String>,
    /// Default output format
    pub output_format: OutputFormat,
    /// Percolator program id
    pub program_id: Option<String>,
    /// Default slab address
    pub slab: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            keypair_path: None,
            output_format: OutputFormat::Text,
            program_id: None,
            slab: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("percolator")
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed config at {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Effective settings after applying command-line overrides to the file
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub keypair_path: Option<String>,
    pub output: OutputFormat,
    pub program_id: Option<String>,
    pub slab: Option<String>,
    pub assume_yes: bool,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub keypair_path: Option<String>,
    pub output: Option<OutputFormat>,
    pub program_id: Option<String>,
    pub slab: Option<String>,
    pub assume_yes: bool,
}

impl Settings {
    pub fn resolve(config: Config, overrides: Overrides) -> Self {
        Self {
            rpc_url: overrides.rpc_url.unwrap_or(config.rpc_url),
            keypair_path: overrides.keypair_path.or(config.keypair_path),
            output: overrides.output.unwrap_or(config.output_format),
            program_id: overrides.program_id.or(config.program_id),
            slab: overrides.slab.or(config.slab),
            assume_yes: overrides.assume_yes,
        }
    }

    pub fn keypair_path(&self) -> Result<&str> {
        self.keypair_path
            .as_deref()
            .ok_or_else(|| anyhow!("No keypair specified. Use --keypair, KEYPAIR_PATH or 'percolator config set-keypair'"))
    }

    pub fn program_id(&self) -> Result<&str> {
        self.program_id
            .as_deref()
            .ok_or_else(|| anyhow!("No program id specified. Use --program-id or 'percolator config set-program'"))
    }

    pub fn slab(&self) -> Result<&str> {
        self.slab
            .as_deref()
            .ok_or_else(|| anyhow!("No slab specified. Use --slab or 'percolator config set-slab'"))
    }
}

/// Get home directory for config
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".config")))
    }
}
