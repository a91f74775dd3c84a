use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::multipart::related_body;
use crate::core::auth::Session;
use crate::core::discovery::{ApiDescription, DiscoveryError, Endpoint};
use crate::core::publish::{
    DriveApi, DriveError, FileId, Media, NewFile, RemoteFailure, RemoteFile,
};

/// Drive v2 REST client. Endpoints come from the discovery description; every
/// request carries the session's bearer token.
pub struct GoogleDriveClient {
    client: Client,
    api: ApiDescription,
}

impl GoogleDriveClient {
    pub fn new(api: ApiDescription, session: &Session) -> Result<Self, DriveError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", session.access_token))
                .map_err(|e| DriveError::Transport(e.to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("drive-publisher/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DriveError::Transport(e.to_string()))?;

        Ok(Self { client, api })
    }

    fn request(&self, endpoint: &Endpoint) -> Result<RequestBuilder, DriveError> {
        let method = Method::from_bytes(endpoint.http_method.as_bytes()).map_err(|_| {
            DiscoveryError::UnknownMethod(format!("unsupported HTTP method {}", endpoint.http_method))
        })?;
        Ok(self.client.request(method, &endpoint.url))
    }

    /// Send and turn any non-success status into `fail(RemoteFailure)`.
    async fn execute(
        request: RequestBuilder,
        fail: fn(RemoteFailure) -> DriveError,
    ) -> Result<Response, DriveError> {
        let response = request
            .send()
            .await
            .map_err(|e| DriveError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %body, "Drive API call failed");
            return Err(fail(RemoteFailure::from_response(status.as_u16(), body)));
        }

        Ok(response)
    }

    async fn upload(
        &self,
        endpoint: &Endpoint,
        metadata: serde_json::Value,
        media: &Media,
        fail: fn(RemoteFailure) -> DriveError,
    ) -> Result<RemoteFile, DriveError> {
        let body = related_body(&metadata, &media.mime_type, &media.bytes);
        let request = self
            .request(endpoint)?
            .query(&[("uploadType", "multipart"), ("alt", "json")])
            .header(CONTENT_TYPE, body.content_type)
            .body(body.bytes);

        let response = Self::execute(request, fail).await?;
        decode_file(response).await
    }
}

/// Drive query literal: single quotes and backslashes are escaped.
fn quote_query(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

async fn decode_file(response: Response) -> Result<RemoteFile, DriveError> {
    let file: ApiFile = response
        .json()
        .await
        .map_err(|e| DriveError::Decode(e.to_string()))?;
    Ok(file.into_remote())
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn list_by_title(&self, parent_id: &str, title: &str) -> Result<Vec<FileId>, DriveError> {
        let endpoint = self
            .api
            .endpoint("children", "list", &[("folderId", parent_id)])?;
        let query = format!("title={} and trashed = false", quote_query(title));

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.request(&endpoint)?.query(&[("q", query.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::execute(request, DriveError::Lookup).await?;
            let page: ApiChildList = response
                .json()
                .await
                .map_err(|e| DriveError::Decode(e.to_string()))?;
            ids.extend(page.items.into_iter().map(|child| FileId::new(child.id)));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(parent_id, title, matches = ids.len(), "Listed folder by title");
        Ok(ids)
    }

    async fn insert(&self, file: &NewFile, media: &Media) -> Result<RemoteFile, DriveError> {
        let endpoint = self.api.upload_endpoint("files", "insert", &[])?;
        let metadata = json!({
            "title": file.title,
            "description": file.description,
            "mimeType": file.mime_type,
            "parents": [{ "id": file.parent_id }],
        });

        self.upload(&endpoint, metadata, media, DriveError::Upload).await
    }

    async fn copy(&self, source: &FileId, title: &str, parent_id: &str) -> Result<RemoteFile, DriveError> {
        let endpoint = self
            .api
            .endpoint("files", "copy", &[("fileId", source.as_str())])?;
        let request = self.request(&endpoint)?.json(&json!({
            "title": title,
            "parents": [{ "id": parent_id }],
        }));

        let response = Self::execute(request, DriveError::Copy).await?;
        decode_file(response).await
    }

    async fn update_content(&self, file_id: &FileId, media: &Media) -> Result<RemoteFile, DriveError> {
        let endpoint = self
            .api
            .upload_endpoint("files", "update", &[("fileId", file_id.as_str())])?;

        self.upload(&endpoint, json!({}), media, DriveError::Update).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiChildList {
    #[serde(default)]
    items: Vec<ApiChildReference>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChildReference {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    parents: Vec<ApiParentReference>,
}

#[derive(Debug, Deserialize)]
struct ApiParentReference {
    id: String,
}

impl ApiFile {
    fn into_remote(self) -> RemoteFile {
        RemoteFile {
            id: FileId::new(self.id),
            title: self.title.unwrap_or_default(),
            description: self.description,
            mime_type: self.mime_type,
            parent_id: self.parents.into_iter().next().map(|p| p.id),
        }
    }
}
