mod deletion;
mod filter;
mod gallery;
mod tagging;

#[cfg(test)]
mod fake;

use tracing::debug;

use crate::api::AlbumApi;
use crate::config::AlbumConfig;
use crate::error::AlbumError;
use crate::favorites::FilterFavorites;
use crate::layout::Viewport;
use crate::lightbox::LightboxView;
use crate::model::MediaId;
use crate::selection::{select_range, ClickMode, ClickModifiers};
use crate::state::{AppState, Notice};
use crate::view::{
    favorites_view, grid_view, pagination_view, tag_panel_view, undo_view, FavoritesView,
    GridView, PaginationView, TagPanelView, UndoView,
};

pub use deletion::DeleteOutcome;
pub use tagging::BatchTagReport;

/// Owns the application state and is the only thing that talks to the
/// server. Requests run one at a time, in the order they are awaited.
pub struct Controller<A> {
    api: A,
    state: AppState,
    favorites: FilterFavorites,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppView {
    pub grid: GridView,
    pub pagination: PaginationView,
    pub tag_panel: TagPanelView,
    pub undo: UndoView,
    pub lightbox: Option<LightboxView>,
    pub org_paths: Vec<String>,
    pub selected_count: usize,
    pub active_tags: Vec<String>,
}

impl<A: AlbumApi> Controller<A> {
    pub fn new(api: A, config: &AlbumConfig, favorites: FilterFavorites) -> Self {
        Self {
            api,
            state: AppState::new(config),
            favorites,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.state.take_notices()
    }

    pub fn view(&self) -> AppView {
        let state = &self.state;
        AppView {
            grid: grid_view(
                state.items(),
                state.selection(),
                state.pending_removal(),
                state.load_error(),
            ),
            pagination: pagination_view(state.pagination()),
            tag_panel: tag_panel_view(state.tags(), state.active_tags(), state.tags_error()),
            undo: undo_view(state.pending_undo()),
            lightbox: state.lightbox().view(state.items()),
            org_paths: state.org_paths().to_vec(),
            selected_count: state.selection().len(),
            active_tags: state.active_tags().to_vec(),
        }
    }

    pub fn favorites_view(&mut self) -> FavoritesView {
        match self.favorites.list() {
            Ok(list) => favorites_view(&list),
            Err(err) => {
                self.report(err, "Failed to read favorites");
                favorites_view(&[])
            }
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.set_viewport(viewport);
    }

    pub async fn click(&mut self, index: usize, modifiers: ClickModifiers) -> Option<ClickMode> {
        let id = self.state.items().get(index)?.id;
        let mode = ClickMode::resolve(modifiers, self.state.anchor(), self.state.items().len());
        match mode {
            ClickMode::Toggle => {
                let selected = self.state.selection_mut().toggle(id);
                debug!("media {id} selected={selected}");
            }
            ClickMode::View => {
                self.open_lightbox(id);
            }
            ClickMode::QuickTag => {
                self.quick_tag(id).await;
            }
            ClickMode::Range { anchor } => {
                let (selection, items) = self.state.split_selection();
                let added = select_range(selection, items, anchor, index);
                debug!("range {anchor}..={index} added {added}");
            }
        }
        if mode.moves_anchor() {
            self.state.set_anchor(Some(index));
        }
        Some(mode)
    }

    pub fn toggle_active_tag(&mut self, name: &str) -> bool {
        self.state.active_tags_mut().toggle(name.to_string())
    }

    pub fn clear_selection(&mut self) {
        self.state.selection_mut().clear();
    }

    pub fn open_lightbox(&mut self, id: MediaId) -> bool {
        let (lightbox, items) = self.state.lightbox_mut();
        lightbox.open(items, id)
    }

    pub fn lightbox_prev(&mut self) -> bool {
        let (lightbox, _) = self.state.lightbox_mut();
        lightbox.prev()
    }

    pub fn lightbox_next(&mut self) -> bool {
        let (lightbox, items) = self.state.lightbox_mut();
        let len = items.len();
        lightbox.next(len)
    }

    pub fn close_lightbox(&mut self) {
        let (lightbox, _) = self.state.lightbox_mut();
        lightbox.close();
    }

    fn report(&mut self, err: AlbumError, context: &str) {
        let text = if err.is_transport() {
            format!("{context}: network error ({err})")
        } else {
            format!("{context}: {}", err.user_message())
        };
        self.state.notify(Notice::error(text));
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{controller_with, FakeApi};
    use crate::layout::Viewport;
    use crate::selection::{ClickMode, ClickModifiers};

    #[tokio::test]
    async fn view_click_opens_lightbox_and_moves_anchor_only() {
        let mut controller = controller_with(FakeApi::with_items(5));
        controller.start().await;
        controller.click(0, ClickModifiers::plain()).await;

        assert_eq!(
            controller.click(2, ClickModifiers::view()).await,
            Some(ClickMode::View)
        );
        assert!(controller.state().lightbox().is_open());
        assert_eq!(controller.view().lightbox.map(|view| view.media_id), Some(3));
        assert_eq!(controller.state().selection().to_vec(), vec![1]);
        assert_eq!(controller.state().anchor(), Some(2));
    }

    #[tokio::test]
    async fn repeated_shift_clicks_keep_the_first_anchor() {
        let mut controller = controller_with(FakeApi::with_items(6));
        controller.start().await;

        controller.click(1, ClickModifiers::plain()).await;
        assert_eq!(
            controller.click(3, ClickModifiers::shift()).await,
            Some(ClickMode::Range { anchor: 1 })
        );
        assert_eq!(controller.state().selection().to_vec(), vec![2, 3, 4]);
        assert_eq!(controller.state().anchor(), Some(1));

        assert_eq!(
            controller.click(0, ClickModifiers::shift()).await,
            Some(ClickMode::Range { anchor: 1 })
        );
        assert_eq!(controller.state().selection().to_vec(), vec![2, 3, 4, 1]);
        assert_eq!(controller.state().anchor(), Some(1));
    }

    #[tokio::test]
    async fn next_page_closes_the_lightbox() {
        let mut controller = controller_with(FakeApi::with_items(40));
        controller.set_viewport(Viewport::new(1040.0, 850.0));
        controller.start().await;
        controller.click(0, ClickModifiers::view()).await;
        assert!(controller.view().lightbox.is_some());

        assert!(controller.next_page().await);
        assert!(!controller.state().lightbox().is_open());
        assert!(controller.view().lightbox.is_none());
        assert_eq!(controller.state().pagination().current_page, 2);
    }
}
