//! Apply and destroy commands.
//!
//! `apply` refreshes every address recorded in the state file, plans each
//! address against the manifest, then executes the plan in phases:
//! deletes, then replacements, then creates and updates. Addresses within a
//! phase run concurrently. A key released by one address and claimed by
//! another is therefore always free before it is written.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures_util::stream::{self, StreamExt};
use mkr_client::ApiClient;
use mkr_id::ServiceMetadataId;
use mkr_provider::{Action, Lifecycle, ServiceMetadata};
use mkr_reconcile::{plan, PlanSummary};
use serde::Serialize;
use tabled::Tabled;

use crate::manifest::{load_manifest, Manifest};
use crate::output::{print_info, print_output, print_single, print_success, print_warning, OutputFormat};
use crate::state::State;

use super::CommandContext;

const DEFAULT_PARALLELISM: usize = 10;

/// Converge remote metadata to a manifest.
#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Manifest file.
    #[arg(short = 'f', long, default_value = "mkr.toml")]
    manifest: PathBuf,

    #[command(flatten)]
    run: RunArgs,
}

/// Delete every document recorded in the state file.
#[derive(Debug, Args)]
pub struct DestroyCommand {
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// State file.
    #[arg(long, default_value = "mkr.state.json")]
    state: PathBuf,

    /// Print the plan without changing anything.
    #[arg(long)]
    dry_run: bool,

    /// Maximum number of addresses applied at once.
    #[arg(long, default_value_t = DEFAULT_PARALLELISM)]
    parallelism: usize,
}

impl RunArgs {
    /// Zero would never poll anything.
    fn parallelism(&self) -> usize {
        self.parallelism.max(1)
    }
}

impl ApplyCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let manifest = load_manifest(&self.manifest)?;
        execute(&ctx, &manifest, &self.run).await
    }
}

impl DestroyCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        execute(&ctx, &Manifest::default(), &self.run).await
    }
}

/// One address in a plan.
#[derive(Debug, Clone)]
struct Change {
    address: String,
    action: Action,
    prior: Option<ServiceMetadata>,
    desired: Option<ServiceMetadata>,
}

impl Change {
    fn id(&self) -> Option<ServiceMetadataId> {
        self.desired.as_ref().or(self.prior.as_ref()).map(ServiceMetadata::id)
    }

    /// Execution phase; lower phases finish before higher ones start.
    fn phase(&self) -> usize {
        match self.action {
            Action::Delete => 0,
            Action::Replace => 1,
            Action::Create | Action::Update | Action::Noop => 2,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Address")]
    address: String,

    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Action")]
    action: String,
}

impl From<&Change> for PlanRow {
    fn from(change: &Change) -> Self {
        let id = match (&change.action, &change.prior, &change.desired) {
            (Action::Replace, Some(prior), Some(desired)) => format!("{} -> {}", prior.id(), desired.id()),
            _ => change.id().map(|id| id.to_string()).unwrap_or_default(),
        };
        Self {
            address: format!("service_metadata.{}", change.address),
            id,
            action: change.action.to_string(),
        }
    }
}

/// Plan every address in either the refreshed state or the manifest.
fn build_plan(refreshed: &BTreeMap<String, Option<ServiceMetadata>>, manifest: &Manifest) -> Vec<Change> {
    let addresses: BTreeSet<&String> = refreshed
        .keys()
        .chain(manifest.service_metadata.keys())
        .collect();

    addresses
        .into_iter()
        .map(|address| {
            let prior = refreshed.get(address).cloned().flatten();
            let desired = manifest.service_metadata.get(address).cloned();
            Change {
                address: address.clone(),
                action: plan(prior.as_ref(), desired.as_ref()),
                prior,
                desired,
            }
        })
        .collect()
}

/// Reject plans whose replacements hand keys to each other. Phase ordering
/// cannot sequence two replacements that release and claim the same key.
fn check_conflicts(changes: &[Change]) -> Result<()> {
    let mut released: HashMap<ServiceMetadataId, &str> = HashMap::new();
    for change in changes.iter().filter(|c| c.action == Action::Replace) {
        if let Some(prior) = &change.prior {
            released.insert(prior.id(), &change.address);
        }
    }

    for change in changes.iter().filter(|c| c.action == Action::Replace) {
        let Some(desired) = &change.desired else {
            continue;
        };
        if let Some(owner) = released.get(&desired.id()).filter(|a| **a != change.address) {
            anyhow::bail!(
                "service_metadata.{} claims '{}', which service_metadata.{owner} is moving away from; apply the two changes separately",
                change.address,
                desired.id()
            );
        }
    }
    Ok(())
}

/// Key a change gives up before it can succeed.
fn released_key(change: &Change) -> Option<ServiceMetadataId> {
    match change.action {
        Action::Delete | Action::Replace => change.prior.as_ref().map(ServiceMetadata::id),
        _ => None,
    }
}

/// Address still holding the key `change` wants to write, if any.
fn blocked_by<'a>(change: &Change, held: &'a HashMap<ServiceMetadataId, String>) -> Option<&'a str> {
    let desired = change.desired.as_ref()?;
    held.get(&desired.id())
        .filter(|holder| **holder != change.address)
        .map(String::as_str)
}

async fn execute(ctx: &CommandContext, manifest: &Manifest, args: &RunArgs) -> Result<()> {
    let mut state = State::load(&args.state)?;
    let lifecycle = ctx.provider()?.lifecycle();

    let refreshed = refresh(&lifecycle, &state, args.parallelism()).await?;
    let changes = build_plan(&refreshed, manifest);
    check_conflicts(&changes)?;

    let summary = PlanSummary::from_actions(changes.iter().map(|c| &c.action));
    let pending: Vec<&Change> = changes.iter().filter(|c| c.action.is_change()).collect();

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<PlanRow> = pending.iter().copied().map(PlanRow::from).collect();
            print_output(&rows, ctx.format);
            print_info(&format!("Plan: {summary}."));
        }
        OutputFormat::Json => {
            let rows: Vec<PlanRow> = pending.iter().copied().map(PlanRow::from).collect();
            print_single(&serde_json::json!({ "plan": rows, "summary": summary, "dry_run": args.dry_run }));
        }
    }

    // Drift found by refresh is recorded even when nothing else changes.
    for (address, current) in &refreshed {
        state.set(address, current.clone());
    }

    if args.dry_run {
        return Ok(());
    }
    if summary.is_empty() {
        state.save(&args.state)?;
        if ctx.format == OutputFormat::Table {
            print_success("No changes. Remote metadata matches the manifest.");
        }
        return Ok(());
    }

    let mut failed = Vec::new();
    // Keys a failed change may still hold remotely, by address.
    let mut held: HashMap<ServiceMetadataId, String> = HashMap::new();
    for phase in 0..3 {
        let (batch, blocked): (Vec<Change>, Vec<Change>) = changes
            .iter()
            .filter(|c| c.action.is_change() && c.phase() == phase)
            .cloned()
            .partition(|c| blocked_by(c, &held).is_none());

        for change in blocked {
            if let Some(holder) = blocked_by(&change, &held) {
                print_warning(&format!(
                    "skipped {} of service_metadata.{}: service_metadata.{holder} failed to release its key",
                    change.action, change.address
                ));
            }
            failed.push(change.address);
        }

        let lifecycle = &lifecycle;
        let results: Vec<_> = stream::iter(batch)
            .map(|change| async move {
                let result = lifecycle
                    .apply(change.prior.as_ref(), change.desired.as_ref())
                    .await
                    .with_context(|| format!("failed to {} service_metadata.{}", change.action, change.address));
                (change, result)
            })
            .buffer_unordered(args.parallelism())
            .collect()
            .await;

        for (change, result) in results {
            match result {
                Ok(applied) => state.set(&change.address, applied.state),
                Err(e) => {
                    print_warning(&format!("{e:#}"));
                    if let Some(key) = released_key(&change) {
                        held.insert(key, change.address.clone());
                    }
                    failed.push(change.address);
                }
            }
        }
    }

    state.save(&args.state)?;

    if !failed.is_empty() {
        failed.sort();
        anyhow::bail!("{} of {} changes failed: {}", failed.len(), pending.len(), failed.join(", "));
    }

    if ctx.format == OutputFormat::Table {
        print_success(&format!("Applied: {summary}."));
    }
    Ok(())
}

/// Re-read every recorded address. Addresses deleted out of band map to `None`.
async fn refresh(
    lifecycle: &Lifecycle<ApiClient>,
    state: &State,
    parallelism: usize,
) -> Result<BTreeMap<String, Option<ServiceMetadata>>> {
    let results: Vec<_> = stream::iter(state.resources.iter())
        .map(|(address, prior)| async move {
            let current = lifecycle
                .refresh(Some(prior))
                .await
                .with_context(|| format!("failed to refresh service_metadata.{address}"));
            (address.clone(), current)
        })
        .buffer_unordered(parallelism)
        .collect()
        .await;

    results
        .into_iter()
        .map(|(address, current)| Ok((address, current?)))
        .collect()
}
