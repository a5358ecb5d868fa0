use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResultConfig {
    pub page_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub results: ResultConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL (e.g. http://localhost:8000/api/v1)
    #[arg(long)]
    pub server: Option<String>,

    /// Username for login
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for login
    #[arg(short, long)]
    pub password: Option<String>,

    /// Database id to run the question against
    #[arg(short, long)]
    pub database: Option<String>,

    /// Natural-language question to submit
    #[arg(short, long)]
    pub question: Option<String>,

    /// Consult the RAG knowledge source during SQL generation
    #[arg(long, default_value_t = false)]
    pub use_rag: bool,

    /// Generate a visual report from the execution result
    #[arg(long, default_value_t = false)]
    pub report: bool,
}

impl ClientConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder();

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/nl-console/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        let mut config: ClientConfig = config_builder
            .set_default("server.base_url", "http://localhost:8000/api/v1")?
            .set_default("server.timeout_secs", 60)?
            .set_default("results.page_size", 50)?
            .build()?
            .try_deserialize()?;

        // Override with command line args if provided
        if let Some(server) = &args.server {
            config.server.base_url = server.clone();
        }

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8000/api/v1".to_string(),
                timeout_secs: 60,
            },
            results: ResultConfig { page_size: 50 },
        }
    }
}
