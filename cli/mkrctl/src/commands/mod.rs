//! CLI commands.

mod apply;
mod auth;
mod metadata;
mod schema;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mkr_provider::{Provider, ProviderConfig};

use crate::config::{Config, Credentials};
use crate::output::OutputFormat;

/// mkr - Manage Mackerel service metadata declaratively.
#[derive(Debug, Parser)]
#[command(name = "mkr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Mackerel API endpoint.
    #[arg(long, global = true, env = "MACKEREL_API_BASE")]
    api_base: Option<String>,

    /// Mackerel API key.
    #[arg(long, global = true, env = "MACKEREL_APIKEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Save, show, or clear the API key.
    Auth(auth::AuthCommand),

    /// Manage services.
    Services(services::ServicesCommand),

    /// Manage service metadata documents directly.
    Metadata(metadata::MetadataCommand),

    /// Converge remote metadata to a manifest.
    Apply(apply::ApplyCommand),

    /// Delete every document tracked in the state file.
    Destroy(apply::DestroyCommand),

    /// Show resource attribute schemas.
    Schema(schema::SchemaCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;
        let credentials = Credentials::load()?;

        let ctx = CommandContext {
            config,
            credentials,
            format: self.format,
            api_base: self.api_base,
            api_key: self.api_key,
        };

        match self.command {
            Commands::Auth(cmd) => cmd.run(ctx).await,
            Commands::Services(cmd) => cmd.run(ctx).await,
            Commands::Metadata(cmd) => cmd.run(ctx).await,
            Commands::Apply(cmd) => cmd.run(ctx).await,
            Commands::Destroy(cmd) => cmd.run(ctx).await,
            Commands::Schema(cmd) => cmd.run(ctx),
            Commands::Version => {
                println!("mkr {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub credentials: Option<Credentials>,
    pub format: OutputFormat,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl CommandContext {
    /// Resolve provider settings: flags and environment first, then the saved
    /// credentials and config file, then defaults.
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::from_env();

        if let Some(key) = self
            .api_key
            .clone()
            .or_else(|| config.api_key.take())
            .or_else(|| self.credentials.as_ref().map(|c| c.api_key.clone()))
        {
            config = config.with_api_key(key);
        }

        if let Some(base) = self.api_base.as_ref().or(self.config.api_base.as_ref()) {
            config = config.with_api_base(base.clone());
        }

        config
    }

    /// Get a configured provider.
    pub fn provider(&self) -> Result<Provider> {
        Ok(Provider::from_config(&self.provider_config())?)
    }
}
