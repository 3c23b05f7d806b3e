use crate::api::file_path;
use crate::model::{MediaId, MediaItem};

/// Cursor into the loaded page. Never crosses into another page.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Lightbox {
    cursor: Option<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LightboxView {
    pub media_id: MediaId,
    pub caption: String,
    pub image_path: String,
    pub position: usize,
    pub total: usize,
    pub show_prev: bool,
    pub show_next: bool,
}

impl Lightbox {
    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn open(&mut self, items: &[MediaItem], id: MediaId) -> bool {
        match items.iter().position(|item| item.id == id) {
            Some(idx) => {
                self.cursor = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn prev(&mut self) -> bool {
        match self.cursor {
            Some(idx) if idx > 0 => {
                self.cursor = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    pub fn next(&mut self, len: usize) -> bool {
        match self.cursor {
            Some(idx) if idx + 1 < len => {
                self.cursor = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    pub fn close(&mut self) {
        self.cursor = None;
    }

    pub fn view(&self, items: &[MediaItem]) -> Option<LightboxView> {
        let idx = self.cursor?;
        let item = items.get(idx)?;
        Some(LightboxView {
            media_id: item.id,
            caption: item.filename.clone(),
            image_path: file_path(item.id),
            position: idx + 1,
            total: items.len(),
            show_prev: idx > 0,
            show_next: idx + 1 < items.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Lightbox;
    use crate::model::MediaItem;

    fn page() -> Vec<MediaItem> {
        vec![
            MediaItem::new(10, "a.jpg", Vec::new()),
            MediaItem::new(11, "b.jpg", Vec::new()),
            MediaItem::new(12, "c.jpg", Vec::new()),
        ]
    }

    #[test]
    fn navigation_clamps_and_hides_controls_at_bounds() {
        let items = page();
        let mut lightbox = Lightbox::default();
        assert!(lightbox.open(&items, 10));

        let first = lightbox.view(&items).unwrap();
        assert!(!first.show_prev);
        assert!(first.show_next);
        assert_eq!(first.image_path, "/api/media/file/10");
        assert!(!lightbox.prev());

        assert!(lightbox.next(items.len()));
        assert!(lightbox.next(items.len()));
        assert!(!lightbox.next(items.len()));
        let last = lightbox.view(&items).unwrap();
        assert_eq!(last.caption, "c.jpg");
        assert!(last.show_prev);
        assert!(!last.show_next);
        assert_eq!((last.position, last.total), (3, 3));
    }

    #[test]
    fn unknown_id_keeps_lightbox_closed() {
        let items = page();
        let mut lightbox = Lightbox::default();
        assert!(!lightbox.open(&items, 99));
        assert!(!lightbox.is_open());
        assert!(lightbox.view(&items).is_none());
    }

    #[test]
    fn close_dismisses() {
        let items = page();
        let mut lightbox = Lightbox::default();
        lightbox.open(&items, 11);
        lightbox.close();
        assert!(lightbox.view(&items).is_none());
    }
}
