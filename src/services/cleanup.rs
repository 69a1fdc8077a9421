//! Cleanup executor: delete CMS entries classified as migration leftovers.
//!
//! Deciding *whether* to delete happens upstream (classifier + workflow
//! gating); this only performs the deletions it is handed.

use super::cms::CmsApi;
use crate::{
    errors::{SyncError, SyncResult},
    models::action::{ActionOutcome, ReconciliationAction, display_folder},
};
use tracing::{error, info};

pub struct CleanupExecutor<'a> {
    cms: &'a dyn CmsApi,
}

impl<'a> CleanupExecutor<'a> {
    pub fn new(cms: &'a dyn CmsApi) -> Self {
        Self { cms }
    }

    /// Delete every listed entry. A fatal error stops the batch and is
    /// returned.
    pub async fn apply(&self, actions: &[ReconciliationAction]) -> SyncResult<Vec<ActionOutcome>> {
        let mut outcomes = Vec::new();
        for action in actions {
            let ReconciliationAction::DeleteEntry {
                entry_id,
                name,
                folder_path,
            } = action
            else {
                continue;
            };
            // The log line is the only record of what was removed.
            info!(
                "deleting entry id={} name=`{}` folder=`{}`",
                entry_id,
                name,
                display_folder(folder_path)
            );
            let outcome = match self.cms.delete_file(*entry_id).await {
                Ok(()) => ActionOutcome::succeeded(action),
                Err(SyncError::NotFound(_)) => {
                    info!("entry {} `{}` was already gone", entry_id, name);
                    ActionOutcome::skipped(action, "already deleted")
                }
                Err(err) if err.is_fatal() => {
                    error!("stopping cleanup at {}: {}", action.target(), err);
                    return Err(err);
                }
                Err(err) => {
                    error!("failed to delete {}: {}", action.target(), err);
                    ActionOutcome::failed(action, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
