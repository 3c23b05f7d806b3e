use tracing::{debug, info, warn};

use super::Controller;
use crate::api::{media_listing_path, AlbumApi};
use crate::error::AlbumError;
use crate::layout::{items_per_page, GRID_GAP};
use crate::model::{MediaQuery, SortBy, SortOrder};
use crate::state::Notice;

impl<A: AlbumApi> Controller<A> {
    pub async fn start(&mut self) {
        self.load_page(1, self.state.sort_by(), self.state.sort_order())
            .await;
        self.refresh_org_paths().await;
        self.refresh_tags().await;
    }

    /// Fetches one page sized to the viewport and replaces the cached items.
    /// Changing page, sort or page size resets selection, active tags and
    /// the undo record; reloading the same view does not.
    pub async fn load_page(&mut self, page: u32, sort_by: SortBy, sort_order: SortOrder) -> bool {
        let page = page.max(1);
        let per_page = self.current_page_size();
        let previous = self.state.pagination();
        let changed = page != previous.current_page
            || sort_by != self.state.sort_by()
            || sort_order != self.state.sort_order()
            || (previous.items_per_page != 0 && per_page != previous.items_per_page);
        if changed {
            self.state.reset_context();
        }
        self.state.set_sort(sort_by, sort_order);

        let query = MediaQuery {
            page,
            per_page,
            sort_by,
            sort_order,
        };
        info!("Fetching: {}", media_listing_path(&query));
        match self.api.list_media(&query).await {
            Ok(listing) => {
                debug!(
                    "page {}/{} with {} items",
                    listing.current_page,
                    listing.total_pages,
                    listing.media.len()
                );
                self.state.replace_page(
                    listing.media,
                    listing.current_page,
                    listing.total_pages,
                    per_page,
                );
                true
            }
            Err(err) => {
                warn!("listing failed: {err}");
                let message = match &err {
                    AlbumError::Status {
                        status, message, ..
                    } => format!("{status}: {message}"),
                    other => other.to_string(),
                };
                self.state.fail_page(message);
                false
            }
        }
    }

    /// Re-shows the current page. Selection and undo survive unless the
    /// viewport now asks for a different page size.
    pub async fn refresh(&mut self) -> bool {
        let page = self.state.pagination().current_page;
        self.load_page(page, self.state.sort_by(), self.state.sort_order())
            .await
    }

    pub async fn next_page(&mut self) -> bool {
        let pagination = self.state.pagination();
        if pagination.current_page >= pagination.total_pages {
            return false;
        }
        self.state.reset_context();
        self.load_page(
            pagination.current_page + 1,
            self.state.sort_by(),
            self.state.sort_order(),
        )
        .await
    }

    pub async fn prev_page(&mut self) -> bool {
        let pagination = self.state.pagination();
        if pagination.current_page <= 1 {
            return false;
        }
        self.state.reset_context();
        self.load_page(
            pagination.current_page - 1,
            self.state.sort_by(),
            self.state.sort_order(),
        )
        .await
    }

    pub async fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) -> bool {
        self.state.reset_context();
        self.load_page(1, sort_by, sort_order).await
    }

    pub async fn set_columns(&mut self, columns: u32) -> bool {
        if columns == 0 {
            self.state
                .notify(Notice::warning("Column count must be a positive number."));
            return false;
        }
        self.state.set_columns(columns);
        self.state.reset_context();
        self.load_page(1, self.state.sort_by(), self.state.sort_order())
            .await
    }

    pub async fn refresh_tags(&mut self) {
        match self.api.list_tags().await {
            Ok(tags) => self.state.set_tags(tags),
            Err(err) => {
                warn!("tag list failed: {err}");
                self.state.fail_tags();
            }
        }
    }

    pub async fn refresh_org_paths(&mut self) {
        match self.api.list_org_paths().await {
            Ok(paths) => self.state.set_org_paths(paths),
            Err(err) => debug!("org path list failed: {err}"),
        }
    }

    /// Asks the server to rescan its media roots, then reloads from page 1.
    /// Nothing is reloaded when the scan fails.
    pub async fn rescan(&mut self) -> bool {
        match self.api.trigger_scan().await {
            Ok(message) => {
                info!("scan: {message}");
                self.state.notify(Notice::info(message));
            }
            Err(err) => {
                self.report(err, "Scan Error");
                return false;
            }
        }
        self.state.reset_context();
        self.load_page(1, self.state.sort_by(), self.state.sort_order())
            .await;
        self.refresh_org_paths().await;
        self.refresh_tags().await;
        true
    }

    pub async fn create_tag(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.state.notify(Notice::warning("Empty tag."));
            return false;
        }
        match self.api.create_tag(name).await {
            Ok(tag) => {
                self.state
                    .notify(Notice::info(format!("Created tag '{}'.", tag.name)));
                self.refresh_tags().await;
                true
            }
            Err(err) => {
                self.report(err, "Error");
                false
            }
        }
    }

    pub async fn delete_tag(&mut self, tag_id: i64, confirm: impl FnOnce(&str) -> bool) -> bool {
        let name = self
            .state
            .tags()
            .iter()
            .find(|tag| tag.id == tag_id)
            .map(|tag| tag.name.clone())
            .unwrap_or_else(|| format!("#{tag_id}"));
        if !confirm(&format!("Delete '{name}'?")) {
            return false;
        }
        match self.api.delete_tag(tag_id).await {
            Ok(()) => {
                self.state.active_tags_mut().remove(&name);
                self.state
                    .notify(Notice::info(format!("Tag '{name}' deleted.")));
                self.refresh_tags().await;
                self.refresh().await;
                true
            }
            Err(err) => {
                self.report(err, "Error");
                false
            }
        }
    }

    fn current_page_size(&self) -> u32 {
        items_per_page(self.state.columns(), self.state.viewport(), GRID_GAP)
    }
}
