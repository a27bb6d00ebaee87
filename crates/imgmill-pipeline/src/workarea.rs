//! Per-request working directories.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};

/// Disjoint input and output directories owned by one request.
///
/// Created under the configured work root with uuid-suffixed names so
/// concurrent requests never collide. The orchestrator removes both
/// directories on every exit path.
#[derive(Debug)]
pub struct WorkArea {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl WorkArea {
    /// Create the input and output directories for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created; anything
    /// created before the failure is removed again so nothing leaks.
    pub fn create(work_root: &Path, request_id: Uuid) -> PipelineResult<Self> {
        let input_dir = work_root.join(format!("input-{request_id}"));
        let output_dir = work_root.join(format!("output-{request_id}"));
        fs::create_dir_all(&input_dir)
            .map_err(|source| PipelineError::io("workarea.create_input", &input_dir, source))?;
        if let Err(source) = fs::create_dir_all(&output_dir) {
            // A half-created area has no owner, so nobody else can remove it.
            let _ = fs::remove_dir_all(&input_dir);
            return Err(PipelineError::io(
                "workarea.create_output",
                &output_dir,
                source,
            ));
        }
        Ok(Self {
            input_dir,
            output_dir,
        })
    }

    /// Directory holding materialized uploads.
    #[must_use]
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Directory holding rendered variants.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Remove both directories, best effort.
    ///
    /// Returns the paths that could not be removed so the caller can log and
    /// emit events; removal failures are never escalated.
    #[must_use]
    pub fn cleanup(self) -> Vec<PathBuf> {
        let mut failed = Vec::new();
        for dir in [self.input_dir, self.output_dir] {
            if dir.exists() && fs::remove_dir_all(&dir).is_err() {
                failed.push(dir);
            }
        }
        failed
    }
}
