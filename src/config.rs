use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for notegate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotegateConfig {
    /// Directory holding the queue file and approval records
    pub data_dir: String,
    /// Draft generation settings
    pub generation: GenerationConfig,
    /// Approval reconciliation settings
    pub reconcile: ReconcileConfig,
    /// Publish dispatch settings
    pub publish: PublishConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Daily generation times, HH:MM on the local clock
    pub times: Vec<String>,
    /// Keyword pool fed to the generation capability
    pub keywords: Vec<String>,
    /// Content style hint
    pub style: String,
    /// Target audience hint
    pub audience: String,
    /// Author name stamped on generated drafts
    pub author: String,
    /// Command invoked as the generation capability (JSON over stdio)
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Seconds between pull cycles against the approval surface
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Failed attempts tolerated before an item is parked
    pub max_retries: u32,
    /// Seconds between dispatcher sweeps
    pub sweep_interval_secs: u64,
    /// Command invoked as the publish capability (JSON over stdio)
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON-structured logs instead of human-readable ones
    pub json_logs: bool,
}

impl Default for NotegateConfig {
    fn default() -> Self {
        Self {
            data_dir: ".notegate".to_string(),
            generation: GenerationConfig {
                times: vec![
                    "09:00".to_string(),
                    "14:00".to_string(),
                    "19:00".to_string(),
                ],
                keywords: Vec::new(),
                style: "casual".to_string(),
                audience: "young professionals".to_string(),
                author: "notegate".to_string(),
                command: None,
            },
            reconcile: ReconcileConfig {
                poll_interval_secs: 300,
            },
            publish: PublishConfig {
                max_retries: 3,
                sweep_interval_secs: 600,
                command: None,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}

impl NotegateConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. notegate.toml in the working directory
    /// 3. Environment variables (NOTEGATE_*, `__` for nesting)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("notegate.toml").exists() {
            builder = builder.add_source(File::with_name("notegate"));
        }

        builder = builder.add_source(
            Environment::with_prefix("NOTEGATE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("generation.times")
                .with_list_parse_key("generation.keywords"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn queue_path(&self) -> std::path::PathBuf {
        Path::new(&self.data_dir).join("queue.json")
    }

    pub fn approval_path(&self) -> std::path::PathBuf {
        Path::new(&self.data_dir).join("approval.json")
    }
}
