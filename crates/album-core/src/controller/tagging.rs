use std::collections::HashMap;

use tracing::{info, warn};

use super::Controller;
use crate::api::AlbumApi;
use crate::model::MediaId;
use crate::state::Notice;
use crate::undo::{TaggingAction, UndoOutcome};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchTagReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl<A: AlbumApi> Controller<A> {
    pub async fn quick_tag(&mut self, id: MediaId) -> bool {
        let tag_names = self.state.active_tags().to_vec();
        if tag_names.is_empty() {
            warn!("[QuickTag] No active tags.");
            self.state
                .notify(Notice::warning("No active tags selected for tagging."));
            return false;
        }
        let prior = self.state.item(id).map(|item| item.tags.clone());

        info!("[QuickTag] media {id}: {:?}", tag_names);
        match self.api.apply_tags(id, &tag_names).await {
            Ok(tags) => {
                let patched = self.state.patch_tags(id, tags);
                if let (true, Some(prior)) = (patched, prior) {
                    self.state
                        .set_undo(Some(TaggingAction::single(id, tag_names, prior)));
                }
                true
            }
            Err(err) => {
                self.report(err, "Error tagging media");
                false
            }
        }
    }

    /// Applies the active tags to each selected item, one request at a time.
    /// Earlier successes stand when a later item fails.
    pub async fn batch_tag(&mut self) -> BatchTagReport {
        let ids = self.state.selection().to_vec();
        let tag_names = self.state.active_tags().to_vec();
        if ids.is_empty() || tag_names.is_empty() {
            self.state
                .notify(Notice::warning("Select photos & active tags."));
            return BatchTagReport::default();
        }

        let prior_tags: HashMap<MediaId, Vec<String>> = ids
            .iter()
            .filter_map(|id| self.state.item(*id).map(|item| (*id, item.tags.clone())))
            .collect();

        let mut report = BatchTagReport::default();
        let mut affected = Vec::new();
        for id in &ids {
            match self.api.apply_tags(*id, &tag_names).await {
                Ok(tags) => {
                    report.succeeded += 1;
                    affected.push(*id);
                    self.state.patch_tags(*id, tags);
                }
                Err(err) => {
                    warn!("[Batch] media {id} failed: {err}");
                    report.failed += 1;
                }
            }
        }

        info!(
            "[Batch] {} success, {} failed",
            report.succeeded, report.failed
        );
        let notice = format!(
            "Batch: {} success, {} failed.",
            report.succeeded, report.failed
        );
        if report.failed == 0 {
            self.state.notify(Notice::info(notice));
        } else {
            self.state.notify(Notice::warning(notice));
        }

        if report.succeeded > 0 {
            let prior_tags = affected
                .iter()
                .filter_map(|id| prior_tags.get(id).map(|tags| (*id, tags.clone())))
                .collect();
            self.state
                .set_undo(Some(TaggingAction::batch(affected, tag_names, prior_tags)));
        }
        report
    }

    /// Removes one tag from one item. The chip stays dimmed while the
    /// request is in flight and is restored if it fails.
    pub async fn remove_tag(&mut self, id: MediaId, tag_name: &str) -> bool {
        self.state
            .set_pending_removal(Some((id, tag_name.to_string())));
        let result = self.api.remove_tag(id, tag_name).await;
        self.state.set_pending_removal(None);
        match result {
            Ok(tags) => {
                info!("removed '{tag_name}' from media {id}");
                self.state.patch_tags(id, tags);
                true
            }
            Err(err) => {
                self.report(err, &format!("Failed to remove tag '{tag_name}'"));
                false
            }
        }
    }

    /// Restores the tag lists captured by the last tagging action. The
    /// record is kept when any item fails, so the user can retry.
    pub async fn undo(&mut self) -> UndoOutcome {
        let Some(action) = self.state.pending_undo().cloned() else {
            self.state.notify(Notice::info("Nothing to undo."));
            return UndoOutcome::NothingToUndo;
        };

        info!("[Undo] reverting {}", action.describe());
        let mut reverted = 0;
        let mut failed = 0;
        for (id, tags) in action.restore_plan() {
            match self.api.replace_tags(id, &tags).await {
                Ok(tags) => {
                    reverted += 1;
                    self.state.patch_tags(id, tags);
                }
                Err(err) => {
                    warn!("[Undo] media {id} failed: {err}");
                    failed += 1;
                }
            }
        }

        if failed == 0 {
            self.state.set_undo(None);
            self.state.notify(Notice::info("Undo successful."));
            UndoOutcome::Reverted { items: reverted }
        } else if reverted > 0 {
            self.state.notify(Notice::warning(format!(
                "Undo partially failed for {failed} items."
            )));
            UndoOutcome::PartiallyFailed { failed, reverted }
        } else {
            self.state.notify(Notice::error("Undo failed."));
            UndoOutcome::Failed
        }
    }
}
