//! In-memory album server for controller tests.

use std::cell::RefCell;
use std::collections::HashSet;

use super::Controller;
use crate::api::AlbumApi;
use crate::config::AlbumConfig;
use crate::error::AlbumError;
use crate::favorites::FilterFavorites;
use crate::model::{
    DeleteResponse, DeleteSummary, MediaId, MediaItem, MediaPage, MediaQuery, TagInfo,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    ListMedia(MediaQuery),
    ApplyTags(MediaId, Vec<String>),
    ReplaceTags(MediaId, Vec<String>),
    RemoveTag(MediaId, String),
    ListTags,
    CreateTag(String),
    DeleteTag(i64),
    ListOrgPaths,
    TriggerScan,
    SetFilter(String),
    ClearFilter,
    DeleteMedia(Vec<MediaId>),
    FetchThumbnail(MediaId),
    FetchFile(MediaId),
}

#[derive(Default)]
struct Server {
    items: Vec<MediaItem>,
    tags: Vec<TagInfo>,
    next_tag_id: i64,
    org_paths: Vec<String>,
    calls: Vec<Call>,
    failing_media: HashSet<MediaId>,
    fail_listing: bool,
    fail_scan: bool,
    filter_error: Option<String>,
    delete_response: Option<DeleteResponse>,
}

#[derive(Default)]
pub struct FakeApi {
    server: RefCell<Server>,
}

fn status(url: &str, code: u16, message: &str) -> AlbumError {
    AlbumError::Status {
        url: url.to_string(),
        status: code,
        message: message.to_string(),
    }
}

impl FakeApi {
    pub fn with_items(n: i64) -> Self {
        let items = (1..=n)
            .map(|id| MediaItem::new(id, format!("img_{id:03}.jpg"), Vec::new()))
            .collect();
        Self {
            server: RefCell::new(Server {
                items,
                next_tag_id: 1,
                org_paths: vec!["/photos".to_string()],
                ..Server::default()
            }),
        }
    }

    pub fn set_tags(&self, id: MediaId, tags: Vec<String>) {
        let mut server = self.server.borrow_mut();
        if let Some(item) = server.items.iter_mut().find(|item| item.id == id) {
            item.tags = tags;
        }
    }

    pub fn server_tags(&self, id: MediaId) -> Vec<String> {
        self.server
            .borrow()
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.tags.clone())
            .unwrap_or_default()
    }

    pub fn add_tag(&self, name: &str) -> TagInfo {
        let mut server = self.server.borrow_mut();
        let tag = TagInfo {
            id: server.next_tag_id,
            name: name.to_string(),
        };
        server.next_tag_id += 1;
        server.tags.push(tag.clone());
        tag
    }

    /// Tag writes for `id` answer 500 until `heal`.
    pub fn fail_media(&self, id: MediaId) {
        self.server.borrow_mut().failing_media.insert(id);
    }

    pub fn heal(&self) {
        let mut server = self.server.borrow_mut();
        server.failing_media.clear();
        server.fail_listing = false;
        server.fail_scan = false;
        server.filter_error = None;
    }

    pub fn fail_listing(&self) {
        self.server.borrow_mut().fail_listing = true;
    }

    pub fn fail_scan(&self) {
        self.server.borrow_mut().fail_scan = true;
    }

    pub fn reject_filter(&self, message: &str) {
        self.server.borrow_mut().filter_error = Some(message.to_string());
    }

    pub fn script_delete(&self, response: DeleteResponse) {
        self.server.borrow_mut().delete_response = Some(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.server.borrow().calls.clone()
    }

    pub fn last_query(&self) -> Option<MediaQuery> {
        self.server
            .borrow()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::ListMedia(query) => Some(*query),
                _ => None,
            })
    }

    fn record(&self, call: Call) {
        self.server.borrow_mut().calls.push(call);
    }

    fn write_tags(
        &self,
        id: MediaId,
        url: &str,
        update: impl FnOnce(&mut Vec<String>),
    ) -> Result<Vec<String>, AlbumError> {
        let mut server = self.server.borrow_mut();
        if server.failing_media.contains(&id) {
            return Err(status(url, 500, "tag write failed"));
        }
        let item = server
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| status(url, 404, "Media not found."))?;
        update(&mut item.tags);
        Ok(item.tags.clone())
    }
}

impl AlbumApi for FakeApi {
    async fn list_media(&self, query: &MediaQuery) -> Result<MediaPage, AlbumError> {
        self.record(Call::ListMedia(*query));
        let server = self.server.borrow();
        if server.fail_listing {
            return Err(status("/api/media", 500, "database offline"));
        }
        let total = server.items.len();
        let per_page = if query.per_page == 0 {
            total.max(1)
        } else {
            query.per_page as usize
        };
        let total_pages = total.div_ceil(per_page).max(1) as u32;
        let start = (query.page.max(1) as usize - 1) * per_page;
        let media = server.items.iter().skip(start).take(per_page).cloned().collect();
        Ok(MediaPage {
            media,
            current_page: query.page,
            total_pages,
            total_items: Some(total as u64),
        })
    }

    async fn apply_tags(
        &self,
        id: MediaId,
        tag_names: &[String],
    ) -> Result<Vec<String>, AlbumError> {
        self.record(Call::ApplyTags(id, tag_names.to_vec()));
        self.write_tags(id, "apply", |tags| {
            for name in tag_names {
                if !tags.contains(name) {
                    tags.push(name.clone());
                }
            }
        })
    }

    async fn replace_tags(
        &self,
        id: MediaId,
        tag_names: &[String],
    ) -> Result<Vec<String>, AlbumError> {
        self.record(Call::ReplaceTags(id, tag_names.to_vec()));
        self.write_tags(id, "replace", |tags| *tags = tag_names.to_vec())
    }

    async fn remove_tag(&self, id: MediaId, tag_name: &str) -> Result<Vec<String>, AlbumError> {
        self.record(Call::RemoveTag(id, tag_name.to_string()));
        self.write_tags(id, "remove", |tags| tags.retain(|t| t != tag_name))
    }

    async fn list_tags(&self) -> Result<Vec<TagInfo>, AlbumError> {
        self.record(Call::ListTags);
        Ok(self.server.borrow().tags.clone())
    }

    async fn create_tag(&self, name: &str) -> Result<TagInfo, AlbumError> {
        self.record(Call::CreateTag(name.to_string()));
        if self.server.borrow().tags.iter().any(|tag| tag.name == name) {
            return Err(status("/api/tags", 409, "Tag already exists."));
        }
        Ok(self.add_tag(name))
    }

    async fn delete_tag(&self, tag_id: i64) -> Result<(), AlbumError> {
        self.record(Call::DeleteTag(tag_id));
        let mut server = self.server.borrow_mut();
        let Some(pos) = server.tags.iter().position(|tag| tag.id == tag_id) else {
            return Err(status("/api/tags", 404, "Tag not found."));
        };
        let removed = server.tags.remove(pos);
        for item in &mut server.items {
            item.tags.retain(|t| *t != removed.name);
        }
        Ok(())
    }

    async fn list_org_paths(&self) -> Result<Vec<String>, AlbumError> {
        self.record(Call::ListOrgPaths);
        Ok(self.server.borrow().org_paths.clone())
    }

    async fn trigger_scan(&self) -> Result<String, AlbumError> {
        self.record(Call::TriggerScan);
        if self.server.borrow().fail_scan {
            return Err(status("/api/scan/trigger", 500, "scanner busy"));
        }
        Ok("Scan completed.".to_string())
    }

    async fn set_filter(&self, filter_code: &str) -> Result<(), AlbumError> {
        self.record(Call::SetFilter(filter_code.to_string()));
        match &self.server.borrow().filter_error {
            Some(message) => Err(status("/api/media/filter_config", 400, message)),
            None => Ok(()),
        }
    }

    async fn clear_filter(&self) -> Result<(), AlbumError> {
        self.record(Call::ClearFilter);
        Ok(())
    }

    async fn delete_media(&self, ids: &[MediaId]) -> Result<DeleteResponse, AlbumError> {
        self.record(Call::DeleteMedia(ids.to_vec()));
        let mut server = self.server.borrow_mut();
        if let Some(response) = server.delete_response.take() {
            return Ok(response);
        }
        let before = server.items.len();
        server.items.retain(|item| !ids.contains(&item.id));
        let deleted = (before - server.items.len()) as u64;
        Ok(DeleteResponse {
            ok: true,
            summary: DeleteSummary {
                message: Some(format!("Deleted {deleted} item(s).")),
                success_count: deleted,
                ..Default::default()
            },
        })
    }

    async fn fetch_thumbnail(&self, id: MediaId) -> Result<Vec<u8>, AlbumError> {
        self.record(Call::FetchThumbnail(id));
        Ok(Vec::new())
    }

    async fn fetch_file(&self, id: MediaId) -> Result<Vec<u8>, AlbumError> {
        self.record(Call::FetchFile(id));
        Ok(Vec::new())
    }
}

pub fn controller_with(api: FakeApi) -> Controller<FakeApi> {
    Controller::new(api, &AlbumConfig::default(), FilterFavorites::in_memory())
}
