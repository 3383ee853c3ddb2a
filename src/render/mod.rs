/// External render process invocation
///
/// Wraps the image-processing executable behind an async call: success is
/// exit code 0 with the output file on disk, failure carries the first line
/// of captured stderr. Also owns the timestamped output naming for the
/// full-resolution apply path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::process::Command;

use crate::error::EngineError;

/// Last epoch-millisecond stamp handed out for an apply output.
/// Guards path uniqueness when two applies land in the same millisecond.
static LAST_STAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Handle to the external render executable.
#[derive(Debug, Clone)]
pub struct RenderEngine {
    executable: String,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new("magick")
    }
}

impl RenderEngine {
    /// Create an engine invoking the given executable
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Run one render to completion.
    ///
    /// # Arguments
    /// * `args` - Full argument list from the filter mapper
    /// * `output` - Path the command is expected to write
    ///
    /// # Returns
    /// * `Ok(())` - Process exited 0 and the output file exists
    /// * `Err(RenderFailed)` - Spawn failure or nonzero exit
    /// * `Err(WriteFailed)` - Clean exit but no output file written
    pub async fn render(&self, args: &[String], output: &Path) -> Result<(), EngineError> {
        let result = Command::new(&self.executable)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                EngineError::RenderFailed(format!("failed to spawn {}: {}", self.executable, e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr.lines().next().unwrap_or("no diagnostic output");
            return Err(EngineError::RenderFailed(format!(
                "{} exited with {}: {}",
                self.executable, result.status, detail
            )));
        }

        if !output.exists() {
            return Err(EngineError::WriteFailed(format!(
                "render produced no output at {}",
                output.display()
            )));
        }

        Ok(())
    }
}

/// Build a fresh output path for a full-resolution apply.
///
/// Pattern: `processed-wallpaper-<epoch-ms>.<ext>`, extension taken from the
/// source (jpg fallback). The timestamp is forced strictly increasing across
/// calls, so every apply gets a unique path and downstream consumers caching
/// by filename can never serve a stale artifact for a new filter combination.
pub fn timestamped_output_path(cache_dir: &Path, source: &Path) -> PathBuf {
    let now = Utc::now().timestamp_millis();
    let stamp = LAST_STAMP_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .map(|last| now.max(last + 1))
        .unwrap_or(now);

    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "jpg".to_string());

    cache_dir.join(format!("processed-wallpaper-{}.{}", stamp, ext))
}
