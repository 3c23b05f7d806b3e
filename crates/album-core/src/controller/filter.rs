use tracing::{info, warn};

use super::Controller;
use crate::api::AlbumApi;
use crate::error::AlbumError;
use crate::state::Notice;

impl<A: AlbumApi> Controller<A> {
    /// Replaces the editor text. Nothing is sent until `apply_filter`.
    pub fn set_filter_text(&mut self, text: impl Into<String>) {
        self.state.set_filter_text(text.into());
    }

    /// Sends the editor text as the server's active filter, then shows
    /// page 1 of the filtered listing.
    pub async fn apply_filter(&mut self) -> bool {
        let code = self.state.filter_text().to_string();
        info!("applying filter ({} bytes)", code.len());
        match self.api.set_filter(&code).await {
            Ok(()) => {
                self.filter_succeeded("Filter applied!").await;
                true
            }
            Err(err) => {
                self.filter_failed(err);
                false
            }
        }
    }

    pub async fn clear_filter(&mut self) -> bool {
        match self.api.clear_filter().await {
            Ok(()) => {
                self.state.set_filter_text(String::new());
                self.filter_succeeded("Filter cleared!").await;
                true
            }
            Err(err) => {
                self.filter_failed(err);
                false
            }
        }
    }

    pub fn save_favorite(&mut self) -> bool {
        let snippet = self.state.filter_text().to_string();
        match self.favorites.add(&snippet) {
            Ok(true) => {
                self.state.notify(Notice::info("Saved to favorites."));
                true
            }
            Ok(false) => {
                self.state
                    .notify(Notice::warning("Cannot save an empty filter snippet."));
                false
            }
            Err(err) => {
                self.report(err, "Failed to save favorite");
                false
            }
        }
    }

    pub fn load_favorite(&mut self, index: usize) -> bool {
        match self.favorites.get(index) {
            Ok(Some(snippet)) => {
                self.state.set_filter_text(snippet);
                true
            }
            Ok(None) => {
                self.state
                    .notify(Notice::warning(format!("No favorite at position {}.", index + 1)));
                false
            }
            Err(err) => {
                self.report(err, "Failed to read favorites");
                false
            }
        }
    }

    pub fn delete_favorite(&mut self, index: usize) -> Option<String> {
        match self.favorites.delete(index) {
            Ok(removed) => removed,
            Err(err) => {
                self.report(err, "Failed to delete favorite");
                None
            }
        }
    }

    async fn filter_succeeded(&mut self, text: &str) {
        self.state.set_filter_status(Some(Notice::info(text)));
        self.state.notify(Notice::info(text));
        self.state.reset_context();
        self.load_page(1, self.state.sort_by(), self.state.sort_order())
            .await;
    }

    fn filter_failed(&mut self, err: AlbumError) {
        warn!("filter request failed: {err}");
        let text = if err.is_transport() {
            "Network error.".to_string()
        } else {
            format!("Error: {}", err.user_message())
        };
        self.state.set_filter_status(Some(Notice::error(text.clone())));
        self.state.notify(Notice::error(text));
    }
}
