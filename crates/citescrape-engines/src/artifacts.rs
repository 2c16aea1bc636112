//! Files engines leave under the results directory
//!
//! Every write here is best effort: a failure is logged and the run goes on.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Page snapshots, one `webpage-<n>` directory per visited page
pub const LOCAL_DIR: &str = "local";

/// Directory holding the browser trace
pub const TRACE_DIR: &str = "trace";

/// Browser trace file name
pub const TRACE_FILE: &str = "trace.json";

/// Files downloaded by the browser agent
pub const DOWNLOADS_DIR: &str = "downloads";

/// Proxy request and response records
pub const MCP_LOG_DIR: &str = "mcp_logs";

/// Write `value` as pretty JSON to `dir/file`, creating `dir`
pub(crate) fn write_json(dir: &Path, file: &str, value: &Value) -> Option<PathBuf> {
    let path = dir.join(file);
    let written = std::fs::create_dir_all(dir).and_then(|_| {
        let body = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, body)
    });
    match written {
        Ok(()) => {
            debug!(path = %path.display(), "Artifact written");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not write artifact");
            None
        }
    }
}

/// Write `text` to `dir/file`, creating `dir`
pub(crate) fn write_text(dir: &Path, file: &str, text: &str) -> Option<PathBuf> {
    let path = dir.join(file);
    match std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, text)) {
        Ok(()) => {
            debug!(path = %path.display(), "Artifact written");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not write artifact");
            None
        }
    }
}
