//! Service commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use mkr_client::Service;
use mkr_id::ServiceName;
use mkr_provider::ServiceConfig;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Service commands.
#[derive(Debug, Args)]
pub struct ServicesCommand {
    #[command(subcommand)]
    command: ServicesSubcommand,
}

#[derive(Debug, Subcommand)]
enum ServicesSubcommand {
    /// List services.
    List,

    /// Create a service.
    Create(CreateServiceArgs),

    /// Delete a service and all metadata under it.
    Delete(DeleteServiceArgs),
}

#[derive(Debug, Args)]
struct CreateServiceArgs {
    /// Service name.
    name: ServiceName,

    /// Optional memo.
    #[arg(long, default_value = "")]
    memo: String,
}

#[derive(Debug, Args)]
struct DeleteServiceArgs {
    /// Service name.
    name: ServiceName,
}

impl ServicesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ServicesSubcommand::List => list_services(ctx).await,
            ServicesSubcommand::Create(args) => create_service(ctx, args).await,
            ServicesSubcommand::Delete(args) => delete_service(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct ServiceRow {
    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Memo")]
    memo: String,

    #[tabled(rename = "Roles")]
    roles: String,
}

impl From<Service> for ServiceRow {
    fn from(service: Service) -> Self {
        Self {
            name: service.name.into_inner(),
            memo: service.memo,
            roles: if service.roles.is_empty() {
                "-".to_string()
            } else {
                service.roles.join(", ")
            },
        }
    }
}

async fn list_services(ctx: CommandContext) -> Result<()> {
    let services = ctx.provider()?.service().list().await?;

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<ServiceRow> = services.into_iter().map(ServiceRow::from).collect();
            print_output(&rows, ctx.format);
        }
        OutputFormat::Json => print_single(&services),
    }
    Ok(())
}

async fn create_service(ctx: CommandContext, args: CreateServiceArgs) -> Result<()> {
    let desired = ServiceConfig {
        name: args.name,
        memo: args.memo,
    };
    let service = ctx.provider()?.service().create(&desired).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&service),
        OutputFormat::Table => print_success(&format!("Created service {}.", service.name)),
    }
    Ok(())
}

async fn delete_service(ctx: CommandContext, args: DeleteServiceArgs) -> Result<()> {
    ctx.provider()?.service().delete(&args.name).await?;
    print_success(&format!("Deleted service {}.", args.name));
    Ok(())
}
