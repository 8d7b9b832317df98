//! Schema command.

use anyhow::Result;
use clap::Args;
use mkr_provider::schema::{Mutability, Schema};
use mkr_provider::{SERVICE_METADATA_SCHEMA, SERVICE_SCHEMA};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_single, OutputFormat};

use super::CommandContext;

/// Show resource attribute schemas.
#[derive(Debug, Args)]
pub struct SchemaCommand {
    /// Resource type to show. Shows all when omitted.
    resource_type: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct AttributeRow {
    #[tabled(rename = "Resource")]
    resource: &'static str,

    #[tabled(rename = "Attribute")]
    name: &'static str,

    #[tabled(rename = "Change")]
    mutability: &'static str,

    #[tabled(rename = "Description")]
    description: &'static str,
}

const SCHEMAS: [&Schema; 2] = [&SERVICE_METADATA_SCHEMA, &SERVICE_SCHEMA];

impl SchemaCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let selected: Vec<&Schema> = match self.resource_type.as_deref() {
            Some(name) => {
                let schema = SCHEMAS
                    .into_iter()
                    .find(|s| s.type_name == name)
                    .ok_or_else(|| anyhow::anyhow!("unknown resource type '{name}'"))?;
                vec![schema]
            }
            None => SCHEMAS.to_vec(),
        };

        match ctx.format {
            OutputFormat::Json => print_single(&selected),
            OutputFormat::Table => {
                let rows: Vec<AttributeRow> = selected.iter().flat_map(|s| rows(s)).collect();
                print_output(&rows, ctx.format);
            }
        }
        Ok(())
    }
}

fn rows(schema: &Schema) -> impl Iterator<Item = AttributeRow> + '_ {
    schema.attributes.iter().map(|a| AttributeRow {
        resource: schema.type_name,
        name: a.name,
        mutability: match a.mutability {
            Mutability::ForceReplacement => "replace",
            Mutability::Updatable => "update",
            Mutability::Computed => "computed",
        },
        description: a.description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_rows_mark_key_fields_for_replacement() {
        let rows: Vec<_> = rows(&SERVICE_METADATA_SCHEMA).collect();
        let replace: Vec<_> = rows
            .iter()
            .filter(|r| r.mutability == "replace")
            .map(|r| r.name)
            .collect();
        assert_eq!(replace, ["service", "namespace"]);
        assert!(rows.iter().all(|r| r.resource == "mackerel_service_metadata"));
    }
}
