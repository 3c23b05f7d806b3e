use tracing::{info, warn};

use super::Controller;
use crate::api::AlbumApi;
use crate::model::DeleteResponse;
use crate::state::Notice;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteOutcome {
    NothingSelected,
    Cancelled,
    Failed,
    Completed {
        deleted: u64,
        failed: usize,
        refreshed: bool,
    },
}

impl<A: AlbumApi> Controller<A> {
    /// Sends the whole selection as one delete request once the user
    /// confirms. Failed ids are reported, never retried.
    pub async fn delete_selected(&mut self, confirm: impl FnOnce(&str) -> bool) -> DeleteOutcome {
        let ids = self.state.selection().to_vec();
        if ids.is_empty() {
            self.state.notify(Notice::warning("No photos selected."));
            return DeleteOutcome::NothingSelected;
        }
        let prompt = format!(
            "Are you sure you want to delete {} selected photo(s)? This will move them to the archive.",
            ids.len()
        );
        if !confirm(&prompt) {
            return DeleteOutcome::Cancelled;
        }

        info!("[Delete] {} items: {:?}", ids.len(), ids);
        let response = match self.api.delete_media(&ids).await {
            Ok(response) => response,
            Err(err) => {
                self.report(err, "Error deleting media");
                return DeleteOutcome::Failed;
            }
        };

        let failed = response.summary.failures.len();
        for failure in &response.summary.failures {
            warn!("[Delete] {} failed: {}", failure.id_label(), failure.reason);
        }
        self.state.notify(delete_notice(&response));

        let refreshed = response.ok || response.summary.success_count > 0;
        if refreshed {
            self.deep_refresh().await;
        }
        DeleteOutcome::Completed {
            deleted: response.summary.success_count,
            failed,
            refreshed,
        }
    }

    /// Rescan, then reload page 1, the tag panel and the path list. A failed
    /// scan is reported but does not stop the reload.
    pub async fn deep_refresh(&mut self) {
        match self.api.trigger_scan().await {
            Ok(message) => info!("scan: {message}"),
            Err(err) => {
                warn!("scan before refresh failed: {err}");
                self.state.notify(Notice::warning(format!(
                    "Rescan failed: {}",
                    err.user_message()
                )));
            }
        }
        self.state.reset_context();
        self.load_page(1, self.state.sort_by(), self.state.sort_order())
            .await;
        self.refresh_tags().await;
        self.refresh_org_paths().await;
    }
}

fn delete_notice(response: &DeleteResponse) -> Notice {
    let summary = &response.summary;
    let mut text = summary
        .message
        .clone()
        .or_else(|| summary.error.clone())
        .unwrap_or_else(|| format!("Deleted {} item(s).", summary.success_count));
    let failed = summary.failures.len();
    if failed > 0 {
        let details: Vec<String> = summary
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.id_label(), f.reason))
            .collect();
        text.push_str(&format!(" ({failed} failed: {})", details.join("; ")));
    }

    if !response.ok && summary.success_count == 0 {
        Notice::error(text)
    } else if failed > 0 {
        Notice::warning(text)
    } else {
        Notice::info(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DeleteOutcome;
    use crate::controller::fake::{controller_with, Call, FakeApi};
    use crate::model::{DeleteResponse, DeleteSummary};
    use crate::selection::ClickModifiers;
    use crate::state::NoticeLevel;

    #[tokio::test]
    async fn empty_selection_or_declined_prompt_sends_nothing() {
        let mut controller = controller_with(FakeApi::with_items(3));
        controller.start().await;
        let before = controller.api().calls().len();

        assert_eq!(
            controller.delete_selected(|_| true).await,
            DeleteOutcome::NothingSelected
        );
        controller.click(0, ClickModifiers::plain()).await;
        let mut asked = String::new();
        let outcome = controller
            .delete_selected(|prompt| {
                asked = prompt.to_string();
                false
            })
            .await;
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert!(asked.starts_with("Are you sure you want to delete 1 selected photo(s)?"));
        assert_eq!(controller.api().calls().len(), before);
        assert_eq!(controller.state().selection().len(), 1);
    }

    #[tokio::test]
    async fn partial_delete_still_deep_refreshes_and_counts_failures() {
        let api = FakeApi::with_items(5);
        let summary: DeleteSummary = serde_json::from_value(json!({
            "message": "Deleted 2 items.",
            "success_count": 2,
            "failures": [{"id": 3, "reason": "File missing on disk"}]
        }))
        .unwrap();
        api.script_delete(DeleteResponse { ok: true, summary });
        let mut controller = controller_with(api);
        controller.start().await;
        controller.toggle_active_tag("x");
        controller.click(0, ClickModifiers::plain()).await;
        controller.click(2, ClickModifiers::shift()).await;

        let outcome = controller.delete_selected(|_| true).await;
        assert_eq!(
            outcome,
            DeleteOutcome::Completed {
                deleted: 2,
                failed: 1,
                refreshed: true
            }
        );

        let calls = controller.api().calls();
        let delete_at = calls
            .iter()
            .position(|c| *c == Call::DeleteMedia(vec![1, 2, 3]))
            .expect("one batch request");
        assert_eq!(calls[delete_at + 1], Call::TriggerScan);
        assert!(matches!(&calls[delete_at + 2], Call::ListMedia(q) if q.page == 1));
        assert!(calls[delete_at..].contains(&Call::ListTags));
        assert!(calls[delete_at..].contains(&Call::ListOrgPaths));

        assert!(controller.state().selection().is_empty());
        assert!(controller.state().active_tags().is_empty());
        let notices = controller.take_notices();
        let notice = notices
            .iter()
            .find(|n| n.text.starts_with("Deleted 2 items."))
            .expect("server message surfaced");
        assert!(notice.text.contains("1 failed"));
        assert_eq!(notice.level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn total_failure_reports_without_refresh() {
        let api = FakeApi::with_items(2);
        let summary: DeleteSummary = serde_json::from_value(json!({
            "message": "No media deleted.",
            "success_count": 0,
            "failures": [{"id": 1, "reason": "Not found in DB"}]
        }))
        .unwrap();
        api.script_delete(DeleteResponse { ok: false, summary });
        let mut controller = controller_with(api);
        controller.start().await;
        controller.click(0, ClickModifiers::plain()).await;

        let outcome = controller.delete_selected(|_| true).await;
        assert_eq!(
            outcome,
            DeleteOutcome::Completed {
                deleted: 0,
                failed: 1,
                refreshed: false
            }
        );
        assert!(!controller.api().calls().contains(&Call::TriggerScan));
        assert_eq!(controller.state().selection().len(), 1);
    }

    #[tokio::test]
    async fn deep_refresh_reloads_even_when_scan_fails() {
        let api = FakeApi::with_items(3);
        api.fail_scan();
        let mut controller = controller_with(api);
        controller.start().await;
        controller.click(1, ClickModifiers::plain()).await;

        assert_eq!(
            controller.delete_selected(|_| true).await,
            DeleteOutcome::Completed {
                deleted: 1,
                failed: 0,
                refreshed: true
            }
        );
        assert_eq!(controller.state().items().len(), 2);
        assert!(controller
            .take_notices()
            .iter()
            .any(|n| n.text.starts_with("Rescan failed")));
    }
}
