use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AlbumError;
use crate::model::{
    DeleteResponse, DeleteSummary, MediaId, MediaPage, MediaQuery, TagInfo,
};

/// The album server's JSON API. Every call is one request; nothing retries.
#[allow(async_fn_in_trait)]
pub trait AlbumApi {
    async fn list_media(&self, query: &MediaQuery) -> Result<MediaPage, AlbumError>;
    async fn apply_tags(&self, id: MediaId, tag_names: &[String])
        -> Result<Vec<String>, AlbumError>;
    async fn replace_tags(
        &self,
        id: MediaId,
        tag_names: &[String],
    ) -> Result<Vec<String>, AlbumError>;
    async fn remove_tag(&self, id: MediaId, tag_name: &str) -> Result<Vec<String>, AlbumError>;
    async fn list_tags(&self) -> Result<Vec<TagInfo>, AlbumError>;
    async fn create_tag(&self, name: &str) -> Result<TagInfo, AlbumError>;
    async fn delete_tag(&self, tag_id: i64) -> Result<(), AlbumError>;
    async fn list_org_paths(&self) -> Result<Vec<String>, AlbumError>;
    async fn trigger_scan(&self) -> Result<String, AlbumError>;
    async fn set_filter(&self, filter_code: &str) -> Result<(), AlbumError>;
    async fn clear_filter(&self) -> Result<(), AlbumError>;
    async fn delete_media(&self, ids: &[MediaId]) -> Result<DeleteResponse, AlbumError>;
    async fn fetch_thumbnail(&self, id: MediaId) -> Result<Vec<u8>, AlbumError>;
    async fn fetch_file(&self, id: MediaId) -> Result<Vec<u8>, AlbumError>;
}

pub fn media_listing_path(query: &MediaQuery) -> String {
    format!(
        "/api/media?page={}&per_page={}&sort_by={}&sort_order={}",
        query.page, query.per_page, query.sort_by, query.sort_order
    )
}

pub fn thumbnail_path(id: MediaId) -> String {
    format!("/api/media/thumbnail/{id}")
}

pub fn file_path(id: MediaId) -> String {
    format!("/api/media/file/{id}")
}

fn media_tags_path(id: MediaId) -> String {
    format!("/api/media/{id}/tags")
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HttpApi {
    base: String,
    client: Client,
}

impl HttpApi {
    pub fn new(server: &str) -> Result<Self, AlbumError> {
        let base = server.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(AlbumError::InvalidServerUrl { url: base });
        }
        let client = Client::builder()
            .build()
            .map_err(|source| AlbumError::Transport {
                url: base.clone(),
                source,
            })?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, req: RequestBuilder, url: &str) -> Result<(StatusCode, Vec<u8>), AlbumError> {
        let resp = req.send().await.map_err(|source| AlbumError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|source| AlbumError::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!("{} -> {}", url, status);
        Ok((status, body.to_vec()))
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
    ) -> Result<T, AlbumError> {
        let (status, body) = self.send(req, url).await?;
        if !status.is_success() {
            return Err(status_error(url, status, &body));
        }
        serde_json::from_slice(&body).map_err(|source| AlbumError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn call_unit(&self, req: RequestBuilder, url: &str) -> Result<(), AlbumError> {
        let (status, body) = self.send(req, url).await?;
        if !status.is_success() {
            return Err(status_error(url, status, &body));
        }
        Ok(())
    }

    async fn call_bytes(&self, req: RequestBuilder, url: &str) -> Result<Vec<u8>, AlbumError> {
        let (status, body) = self.send(req, url).await?;
        if !status.is_success() {
            return Err(status_error(url, status, &body));
        }
        Ok(body)
    }
}

impl AlbumApi for HttpApi {
    async fn list_media(&self, query: &MediaQuery) -> Result<MediaPage, AlbumError> {
        let url = self.url(&media_listing_path(query));
        self.call_json(self.client.get(&url), &url).await
    }

    async fn apply_tags(
        &self,
        id: MediaId,
        tag_names: &[String],
    ) -> Result<Vec<String>, AlbumError> {
        let url = self.url(&media_tags_path(id));
        let req = self.client.post(&url).json(&json!({ "tag_names": tag_names }));
        let resp: TagsResponse = self.call_json(req, &url).await?;
        Ok(resp.tags)
    }

    async fn replace_tags(
        &self,
        id: MediaId,
        tag_names: &[String],
    ) -> Result<Vec<String>, AlbumError> {
        let url = self.url(&media_tags_path(id));
        let req = self.client.put(&url).json(&json!({ "tag_names": tag_names }));
        let resp: TagsResponse = self.call_json(req, &url).await?;
        Ok(resp.tags)
    }

    async fn remove_tag(&self, id: MediaId, tag_name: &str) -> Result<Vec<String>, AlbumError> {
        let url = self.url(&format!(
            "{}/{}",
            media_tags_path(id),
            urlencoding::encode(tag_name)
        ));
        let resp: TagsResponse = self.call_json(self.client.delete(&url), &url).await?;
        Ok(resp.tags)
    }

    async fn list_tags(&self) -> Result<Vec<TagInfo>, AlbumError> {
        let url = self.url("/api/tags");
        self.call_json(self.client.get(&url), &url).await
    }

    async fn create_tag(&self, name: &str) -> Result<TagInfo, AlbumError> {
        let url = self.url("/api/tags");
        let req = self.client.post(&url).json(&json!({ "name": name }));
        self.call_json(req, &url).await
    }

    async fn delete_tag(&self, tag_id: i64) -> Result<(), AlbumError> {
        let url = self.url(&format!("/api/tags/{tag_id}"));
        self.call_unit(self.client.delete(&url), &url).await
    }

    async fn list_org_paths(&self) -> Result<Vec<String>, AlbumError> {
        let url = self.url("/api/org_paths");
        self.call_json(self.client.get(&url), &url).await
    }

    async fn trigger_scan(&self) -> Result<String, AlbumError> {
        let url = self.url("/api/scan/trigger");
        let resp: MessageResponse = self.call_json(self.client.post(&url), &url).await?;
        Ok(resp.message.unwrap_or_else(|| "Scan completed.".to_string()))
    }

    async fn set_filter(&self, filter_code: &str) -> Result<(), AlbumError> {
        let url = self.url("/api/media/filter_config");
        let req = self
            .client
            .post(&url)
            .json(&json!({ "filter_code": filter_code }));
        self.call_unit(req, &url).await
    }

    async fn clear_filter(&self) -> Result<(), AlbumError> {
        let url = self.url("/api/media/filter_config");
        self.call_unit(self.client.delete(&url), &url).await
    }

    async fn delete_media(&self, ids: &[MediaId]) -> Result<DeleteResponse, AlbumError> {
        let url = self.url("/api/media/delete_selected");
        let req = self.client.post(&url).json(&json!({ "media_ids": ids }));
        let (status, body) = self.send(req, &url).await?;
        decode_delete_response(&url, status, &body)
    }

    async fn fetch_thumbnail(&self, id: MediaId) -> Result<Vec<u8>, AlbumError> {
        let url = self.url(&thumbnail_path(id));
        self.call_bytes(self.client.get(&url), &url).await
    }

    async fn fetch_file(&self, id: MediaId) -> Result<Vec<u8>, AlbumError> {
        let url = self.url(&file_path(id));
        self.call_bytes(self.client.get(&url), &url).await
    }
}

fn decode_delete_response(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<DeleteResponse, AlbumError> {
    match serde_json::from_slice::<DeleteSummary>(body) {
        Ok(summary) => Ok(DeleteResponse {
            ok: status.is_success(),
            summary,
        }),
        Err(_) if !status.is_success() => Err(status_error(url, status, body)),
        Err(source) => Err(AlbumError::Decode {
            url: url.to_string(),
            source,
        }),
    }
}

fn status_error(url: &str, status: StatusCode, body: &[u8]) -> AlbumError {
    AlbumError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message: error_message(status, body),
    }
}

/// Pulls the `{error}` field out of a failure body, falling back to the raw
/// text and then to the status reason.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(body) {
        if let Some(Value::String(err)) = obj.get("error") {
            if !err.trim().is_empty() {
                return err.clone();
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() && text.len() <= 200 {
        return text.to_string();
    }
    status
        .canonical_reason()
        .map(ToString::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
