//! Service metadata commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use mkr_id::{Namespace, ServiceMetadataId, ServiceName};
use mkr_provider::{MetadataDocument, ServiceMetadata};
use serde::Serialize;
use tabled::Tabled;

use crate::manifest::validate_address;
use crate::output::{print_output, print_single, print_success, OutputFormat};
use crate::state::State;

use super::CommandContext;

/// Service metadata commands.
#[derive(Debug, Args)]
pub struct MetadataCommand {
    #[command(subcommand)]
    command: MetadataSubcommand,
}

#[derive(Debug, Subcommand)]
enum MetadataSubcommand {
    /// Print a metadata document.
    Get(KeyArgs),

    /// Write a metadata document, replacing any existing one.
    Put(PutArgs),

    /// Delete a metadata document.
    Delete(KeyArgs),

    /// List namespaces holding metadata under a service.
    Namespaces(NamespacesArgs),

    /// Read an existing document by `<service>/<namespace>`, optionally
    /// recording it in a state file.
    Import(ImportArgs),
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// Service name.
    service: ServiceName,

    /// Metadata namespace.
    namespace: Namespace,
}

#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("source").required(true).args(["json", "file"]))]
struct PutArgs {
    #[command(flatten)]
    key: KeyArgs,

    /// Document as an inline JSON object.
    #[arg(long)]
    json: Option<String>,

    /// Read the document from a file.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct NamespacesArgs {
    /// Service name.
    service: ServiceName,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Import ID, `<service>/<namespace>`.
    id: String,

    /// Record the document at this address in the state file.
    #[arg(long)]
    address: Option<String>,

    /// State file to record into.
    #[arg(long, default_value = "mkr.state.json", requires = "address")]
    state: PathBuf,
}

impl MetadataCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            MetadataSubcommand::Get(args) => get_metadata(ctx, args).await,
            MetadataSubcommand::Put(args) => put_metadata(ctx, args).await,
            MetadataSubcommand::Delete(args) => delete_metadata(ctx, args).await,
            MetadataSubcommand::Namespaces(args) => list_namespaces(ctx, args).await,
            MetadataSubcommand::Import(args) => import_metadata(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct MetadataRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Metadata")]
    metadata_json: String,
}

impl From<&ServiceMetadata> for MetadataRow {
    fn from(metadata: &ServiceMetadata) -> Self {
        Self {
            id: metadata.id().to_string(),
            metadata_json: metadata.metadata_json.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
}

fn print_metadata(metadata: &ServiceMetadata, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_output(&[MetadataRow::from(metadata)], format),
        OutputFormat::Json => print_single(&serde_json::json!({
            "id": metadata.id(),
            "service": metadata.service,
            "namespace": metadata.namespace,
            "metadata": metadata.metadata_json.to_value(),
        })),
    }
}

async fn get_metadata(ctx: CommandContext, args: KeyArgs) -> Result<()> {
    let metadata = ctx
        .provider()?
        .service_metadata_data_source()
        .read(&args.service, &args.namespace)
        .await?;
    print_metadata(&metadata, ctx.format);
    Ok(())
}

async fn put_metadata(ctx: CommandContext, args: PutArgs) -> Result<()> {
    let raw = match (args.json, args.file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("pass --json or --file"),
    };
    let document = MetadataDocument::parse(&raw)?;
    let metadata = ServiceMetadata::new(args.key.service, args.key.namespace, document);

    let id = ctx.provider()?.service_metadata().create(&metadata).await?;
    print_success(&format!("Wrote service metadata {id}."));
    Ok(())
}

async fn delete_metadata(ctx: CommandContext, args: KeyArgs) -> Result<()> {
    let id = ServiceMetadataId::new(args.service, args.namespace);
    ctx.provider()?.service_metadata().delete(&id).await?;
    print_success(&format!("Deleted service metadata {id}."));
    Ok(())
}

async fn list_namespaces(ctx: CommandContext, args: NamespacesArgs) -> Result<()> {
    let namespaces = ctx
        .provider()?
        .service_metadata_data_source()
        .namespaces(&args.service)
        .await?;

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<NamespaceRow> = namespaces
                .into_iter()
                .map(|ns| NamespaceRow {
                    namespace: ns.into_inner(),
                })
                .collect();
            print_output(&rows, ctx.format);
        }
        OutputFormat::Json => print_single(&namespaces),
    }
    Ok(())
}

async fn import_metadata(ctx: CommandContext, args: ImportArgs) -> Result<()> {
    if let Some(address) = &args.address {
        validate_address(address)?;
    }

    let metadata = ctx.provider()?.service_metadata().import(&args.id).await?;

    if let Some(address) = &args.address {
        record_import(&args.state, address, &metadata)?;
        print_success(&format!(
            "Imported {} as service_metadata.{address}.",
            metadata.id()
        ));
    }

    print_metadata(&metadata, ctx.format);
    Ok(())
}

/// Track `metadata` at `address`. Fails if another address tracks its key.
fn record_import(path: &Path, address: &str, metadata: &ServiceMetadata) -> Result<()> {
    let mut state = State::load(path)?;
    if let Some(existing) = state.address_of(&metadata.id()).filter(|a| *a != address) {
        anyhow::bail!("'{}' is already tracked at service_metadata.{existing}", metadata.id());
    }
    state.set(address, Some(metadata.clone()));
    state.save(path)
}
