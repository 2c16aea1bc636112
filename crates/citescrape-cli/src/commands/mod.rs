//! Command implementations.

pub mod run;
pub mod schema;
pub mod templates;

pub use self::run::{execute_run, results_dir, run_until_cancelled};
pub use self::schema::execute_schema;
pub use self::templates::execute_templates;

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::profile::{load_profile, locate_profile, ResolvedProfile};
use std::path::Path;
use tracing::info;

/// Load the profile named on the command line, else the configured one.
pub fn select_profile(
    selector: Option<&str>,
    config: &AppConfig,
    config_path: &Path,
) -> Result<ResolvedProfile> {
    let selector = selector.or(config.profile.as_deref()).ok_or_else(|| {
        CliError::Config(
            "No profile selected. Pass --profile or set 'profile' in the configuration".to_string(),
        )
    })?;
    let path = locate_profile(selector, &AppConfig::profiles_dir(config_path));
    info!(profile = %path.display(), "Loading profile");
    load_profile(&path)
}
