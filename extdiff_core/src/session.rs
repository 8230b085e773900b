use crate::enumerator::{ChangeEnumerator, ChangeSet};
use crate::invoker::{invoke, sync_back};
use crate::staging::StagingArea;
use extdiff_common::{AppConfig, ChangedEntry, CommandTemplate, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// One comparison operation: the two roots and the tool template to run on
/// the staged copies.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub left: PathBuf,
    pub right: PathBuf,
    pub template: CommandTemplate,
}

/// What a completed session did, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub changed: Vec<ChangedEntry>,
    pub notes: Vec<String>,
    /// Exit code of the external tool; None when it was killed by a signal.
    pub tool_status: Option<i32>,
}

/// Stage the changed pairs, run the external tool on the staging subtrees,
/// sync every staged file back over its original, and tear the staging area
/// down.
///
/// Teardown happens on every exit path: the explicit `close` on the paths
/// below, and the staging area's drop for anything that escapes them.
/// Sync-back runs whenever the tool invocation returned, regardless of the
/// tool's own exit status. A cleanup failure is logged and only surfaced
/// when nothing else went wrong.
pub fn stage_and_invoke(
    entries: &[ChangedEntry],
    template: &CommandTemplate,
) -> Result<Option<i32>> {
    let staging = StagingArea::create()?;

    let pipeline = || -> Result<Option<i32>> {
        staging.materialize(entries)?;
        let status = invoke(template, staging.left_root(), staging.right_root())?;
        sync_back(entries, staging.left_root(), staging.right_root())?;
        Ok(status.code())
    };

    match pipeline() {
        Ok(code) => {
            staging.close()?;
            Ok(code)
        }
        Err(err) => {
            // never mask the original failure with a cleanup failure
            if let Err(cleanup) = staging.close() {
                warn!("Staging cleanup failed after error: {}", cleanup);
            }
            Err(err)
        }
    }
}

/// Run the whole pipeline for one request: enumerate, stage, invoke,
/// sync back, clean up.
pub fn run_session(config: &AppConfig, request: &SessionRequest) -> Result<SessionReport> {
    let set: ChangeSet =
        ChangeEnumerator::new(config.clone()).enumerate(&request.left, &request.right)?;

    info!(
        "Enumerated {} changed pair(s) between {} and {}",
        set.entries.len(),
        request.left.display(),
        request.right.display()
    );

    let tool_status = stage_and_invoke(&set.entries, &request.template)?;

    Ok(SessionReport {
        changed: set.entries,
        notes: set.notes,
        tool_status,
    })
}
