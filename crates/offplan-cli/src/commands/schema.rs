use clap::Args;
use serde_json::Value;

use offplan_core::schema;

use crate::input;

/// Arguments for migrating a stored input document
#[derive(Args)]
pub struct MigrateArgs {
    /// Path to a JSON/YAML input document of any supported version
    #[arg(long)]
    pub input: Option<String>,
}

/// Load, migrate and re-stamp an input document at the current version.
pub fn run_migrate(args: MigrateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let document = input::read_input(args.input.as_deref(), "schema migration")?;
    let inputs = schema::load(document)?;
    Ok(serde_json::to_value(schema::stamp(&inputs)?)?)
}
