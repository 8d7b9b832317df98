//! Authentication commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use mkr_provider::Provider;

use crate::config::Credentials;
use crate::output::{print_info, print_success};

use super::CommandContext;

/// Authentication commands.
#[derive(Debug, Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuthSubcommand {
    /// Validate and save an API key.
    Login(LoginArgs),

    /// Remove the saved API key.
    Logout,

    /// Show current authentication status.
    Status,
}

#[derive(Debug, Args)]
struct LoginArgs {
    /// API key to save. Defaults to the global `--api-key` / MACKEREL_APIKEY.
    #[arg(long = "key")]
    key: Option<String>,
}

impl AuthCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AuthSubcommand::Login(args) => login(ctx, args).await,
            AuthSubcommand::Logout => logout(),
            AuthSubcommand::Status => status(ctx),
        }
    }
}

/// Save an API key after checking it against the API.
async fn login(ctx: CommandContext, args: LoginArgs) -> Result<()> {
    let Some(key) = args.key.or_else(|| ctx.api_key.clone()) else {
        print_info("Pass --key <KEY> or set MACKEREL_APIKEY.");
        return Ok(());
    };

    // Validate the key by listing services.
    let config = ctx.provider_config().with_api_key(key.clone());
    let provider = Provider::from_config(&config)?;
    provider
        .service()
        .list()
        .await
        .context("API key was rejected")?;

    let creds = Credentials::new(key);
    creds.save()?;

    print_success(&format!("Saved API key {}.", creds.masked_key()));
    Ok(())
}

fn logout() -> Result<()> {
    Credentials::delete()?;
    print_success("Logged out successfully.");
    Ok(())
}

fn status(ctx: CommandContext) -> Result<()> {
    let config = ctx.provider_config();
    println!("  Endpoint: {}", config.api_base);

    if ctx.api_key.is_some() {
        println!("{} Using API key from --api-key or MACKEREL_APIKEY", "Status:".green().bold());
        return Ok(());
    }

    match ctx.credentials {
        Some(creds) => {
            println!("{} Authenticated", "Status:".green().bold());
            println!("  API key: {}", creds.masked_key());
            if let Some(saved_at) = creds.saved_at {
                println!("  Saved: {}", saved_at);
            }
        }
        None if config.api_key.is_some() => {
            println!("{} Using API key from the environment", "Status:".green().bold());
        }
        None => {
            println!("{} Not authenticated", "Status:".red().bold());
            println!("\nRun {} to save a key.", "mkr auth login --key <KEY>".cyan());
        }
    }

    Ok(())
}
