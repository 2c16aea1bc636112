//! Run command implementation.

use crate::cli::RunArgs;
use crate::commands::select_profile;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::profile::ResolvedProfile;
use citescrape_engines::build_engine;
use citescrape_extractor::{ExtractionEngine, Pipeline, PipelineOutcome};
use citescrape_llm::build_provider;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Hex characters in a run directory name
const RUN_ID_LEN: usize = 10;

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &AppConfig, config_path: &Path) -> Result<()> {
    let profile = select_profile(args.profile.as_deref(), config, config_path)?;

    let llm = build_provider(&config.llm.main)?;
    let planner = config.llm.planner.as_ref().map(build_provider).transpose()?;
    let engine = build_engine(profile.kind, &config.engines, llm, planner)?;

    let base = args
        .output
        .or_else(|| config.output_path.clone())
        .or_else(|| profile.output_path.clone());
    let dir = base.map(|base| results_dir(&base, &profile.name));

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Cannot listen for Ctrl-C, the run can only be stopped by killing it");
            std::future::pending::<()>().await;
        }
    };
    let outcome = run_until_cancelled(engine, &profile, dir, interrupted).await?;

    let formatter = Formatter::new(args.format.into(), !args.no_color);
    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}

/// Run a resolved profile until it finishes or `cancel` resolves
///
/// The engine is closed either way. A cancelled run writes nothing.
pub async fn run_until_cancelled<C>(
    engine: Arc<dyn ExtractionEngine>,
    profile: &ResolvedProfile,
    results_dir: Option<PathBuf>,
    cancel: C,
) -> Result<PipelineOutcome>
where
    C: Future<Output = ()>,
{
    let mut ctx = profile.run_context();
    if let Some(dir) = results_dir {
        info!(dir = %dir.display(), "Results directory");
        ctx = ctx.with_results_dir(dir);
    }

    let pipeline = Pipeline::new(engine.clone());
    let result = tokio::select! {
        result = pipeline.run(&profile.request, &ctx) => result,
        _ = cancel => {
            warn!(engine = engine.name(), "Run interrupted, closing the engine");
            engine.close().await;
            return Err(CliError::Cancelled);
        }
    };

    engine.close().await;
    Ok(result?)
}

/// A fresh results directory path: `<base>/<profile>/<10 hex chars>`
///
/// The directory itself is created when something is written to it.
pub fn results_dir(base: &Path, profile: &str) -> PathBuf {
    loop {
        let candidate = base.join(profile).join(run_id());
        if !candidate.exists() {
            return candidate;
        }
    }
}

fn run_id() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    hex[hex.len() - RUN_ID_LEN..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_shape() {
        let id = run_id();
        assert_eq!(id.len(), RUN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_results_dir_is_fresh() {
        let base = tempfile::tempdir().unwrap();
        let first = results_dir(base.path(), "films");
        assert_eq!(first.parent(), Some(base.path().join("films").as_path()));
        assert!(!first.exists());

        std::fs::create_dir_all(&first).unwrap();
        let second = results_dir(base.path(), "films");
        assert_ne!(first, second);
    }
}
