//! Schema command implementation.

use crate::cli::SchemaArgs;
use crate::commands::select_profile;
use crate::config::AppConfig;
use crate::error::Result;
use citescrape_extractor::Pipeline;
use std::path::Path;

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs, config: &AppConfig, config_path: &Path) -> Result<()> {
    let profile = select_profile(args.profile.as_deref(), config, config_path)?;
    let schema = Pipeline::schema_for(&profile.request)?;
    println!("{}", schema.json_schema_pretty());
    Ok(())
}
