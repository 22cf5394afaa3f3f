//! Google Drive API connector implementation
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{ListFilter, RemoteFile, RemoteStore};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::GoogleDriveError;
use crate::types::{
    AboutResponse, CreatedFile, DriveFile, FilesListResponse, NewFileMetadata, FOLDER_MIME_TYPE,
};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload endpoint base URL
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,md5Checksum,parents,trashed";

/// Attempts per request before a retryable failure is surfaced
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff
const BACKOFF_BASE_MS: u64 = 100;

/// Timeout for metadata calls; transfers use the client default
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest payload sent as one multipart request. Drive recommends
/// resumable sessions above 5 MB.
const MULTIPART_LIMIT: usize = 5 * 1024 * 1024;

/// Bytes per resumable chunk; Drive requires a multiple of 256 KiB
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Timeout for one resumable chunk
const CHUNK_TIMEOUT: Duration = Duration::from_secs(300);

/// Status Drive returns for an accepted chunk of an unfinished session
const RESUME_INCOMPLETE: u16 = 308;

/// Google Drive API connector
///
/// Implements `RemoteStore` for Google Drive API v3.
///
/// # Features
///
/// - Paginated child listing with MIME prefix filtering
/// - Multipart uploads carrying name, parent and MIME type
/// - Chunked resumable sessions for payloads above the multipart limit
/// - Folder lookup-or-create scoped to one parent
/// - Exponential backoff on 429 and 5xx responses
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::{ListFilter, RemoteStore};
///
/// let connector = GoogleDriveConnector::new(http_client, access_token);
/// connector.verify_session().await?;
/// let (files, next) = connector
///     .list_children("1SourceFolderId", &ListFilter::images_and_videos(), None)
///     .await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token with `drive` scope
    access_token: String,

    /// Payloads larger than this go through a resumable session
    multipart_limit: usize,

    chunk_size: usize,
}

impl GoogleDriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            multipart_limit: MULTIPART_LIMIT,
            chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }

    /// Override the multipart cutoff and the resumable chunk size.
    ///
    /// Drive rejects chunks that are not a multiple of 256 KiB, except the
    /// last one of a session.
    pub fn with_upload_limits(mut self, multipart_limit: usize, chunk_size: usize) -> Self {
        self.multipart_limit = multipart_limit;
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Parse RFC 3339 timestamp to Unix timestamp
    fn parse_timestamp(rfc3339: &str) -> Option<i64> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).timestamp())
    }

    /// Convert DriveFile to RemoteFile
    fn convert_file(drive_file: DriveFile) -> RemoteFile {
        RemoteFile {
            is_folder: drive_file.mime_type == FOLDER_MIME_TYPE,
            id: drive_file.id,
            name: drive_file.name,
            mime_type: Some(drive_file.mime_type),
            size: drive_file.size.and_then(|s| s.parse().ok()),
            modified_at: drive_file
                .modified_time
                .as_deref()
                .and_then(Self::parse_timestamp),
            parent_ids: drive_file.parents,
            md5_checksum: drive_file.md5_checksum,
        }
    }

    /// Escape a value for use inside a single-quoted Drive query literal.
    fn escape_query_value(value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "\\'")
    }

    /// Build the `q` parameter for a child listing.
    fn build_list_query(folder_id: &str, filter: &ListFilter) -> String {
        let mut clauses = vec![format!(
            "'{}' in parents",
            Self::escape_query_value(folder_id)
        )];

        if !filter.mime_prefixes.is_empty() {
            let mime_clauses: Vec<String> = filter
                .mime_prefixes
                .iter()
                .map(|prefix| {
                    format!("mimeType contains '{}'", Self::escape_query_value(prefix))
                })
                .collect();
            clauses.push(format!("({})", mime_clauses.join(" or ")));
        }

        if !filter.include_trashed {
            clauses.push("trashed=false".to_string());
        }

        clauses.join(" and ")
    }

    /// Build the `q` parameter that finds a folder by name under a parent.
    fn build_folder_query(parent_folder_id: &str, name: &str) -> String {
        format!(
            "mimeType='{}' and name='{}' and '{}' in parents and trashed=false",
            FOLDER_MIME_TYPE,
            Self::escape_query_value(name),
            Self::escape_query_value(parent_folder_id)
        )
    }

    /// Assemble a `multipart/related` body: JSON metadata followed by media.
    ///
    /// Returns the body and its boundary.
    fn build_multipart_body(
        metadata: &NewFileMetadata<'_>,
        data: &[u8],
        mime_type: Option<&str>,
    ) -> Result<(Bytes, String)> {
        let boundary = format!("media_sorter_{}", Uuid::new_v4().simple());
        let metadata_json = serde_json::to_vec(metadata).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to encode upload metadata: {}", e))
        })?;

        let mut body = BytesMut::with_capacity(data.len() + metadata_json.len() + 256);
        body.put_slice(format!("--{}\r\n", boundary).as_bytes());
        body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.put_slice(&metadata_json);
        body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        body.put_slice(
            format!(
                "Content-Type: {}\r\n\r\n",
                mime_type.unwrap_or("application/octet-stream")
            )
            .as_bytes(),
        );
        body.put_slice(data);
        body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Ok((body.freeze(), boundary))
    }

    /// Map a non-success status to a provider error.
    fn status_error(response: &HttpResponse, resource: &str) -> GoogleDriveError {
        let message = String::from_utf8_lossy(&response.body).to_string();
        match response.status {
            401 => GoogleDriveError::AuthenticationFailed(message),
            404 => GoogleDriveError::FileNotFound {
                file_id: resource.to_string(),
            },
            429 => GoogleDriveError::RateLimitExceeded {
                retry_after_seconds: response
                    .headers
                    .get("retry-after")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0),
            },
            status_code => GoogleDriveError::ApiError {
                status_code,
                message,
            },
        }
    }

    /// `Content-Range` value for bytes `start..end` of a `total`-byte upload.
    fn content_range(start: usize, end: usize, total: usize) -> String {
        if start >= end {
            format!("bytes */{}", total)
        } else {
            format!("bytes {}-{}/{}", start, end - 1, total)
        }
    }

    /// Bytes the server has persisted, from the `Range` header of a 308.
    /// No header means nothing was kept.
    fn confirmed_length(response: &HttpResponse) -> usize {
        response
            .headers
            .get("range")
            .and_then(|range| range.trim().strip_prefix("bytes=0-"))
            .and_then(|last| last.parse::<usize>().ok())
            .map_or(0, |last| last + 1)
    }

    /// Execute API request with retry logic, accepting any 2xx status.
    async fn execute_with_retry(&self, request: HttpRequest, resource: &str) -> Result<HttpResponse> {
        self.execute_accepting(request, resource, is_2xx).await
    }

    /// Execute API request with retry logic
    ///
    /// Retries 429 and 5xx responses and transport errors with exponential
    /// backoff. Statuses for which `accept` holds are returned as `Ok`; other
    /// failures are returned immediately. The HTTP client is asked for a
    /// single attempt so a body is never re-sent by two layers.
    #[instrument(skip(self, request, accept), fields(method = ?request.method, url = %request.url))]
    async fn execute_accepting(
        &self,
        request: HttpRequest,
        resource: &str,
        accept: fn(u16) -> bool,
    ) -> Result<HttpResponse> {
        let request = request.bearer_token(self.access_token.as_str());
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self
                .http_client
                .execute_with_retry(request.clone(), RetryPolicy::single_attempt())
                .await
            {
                Ok(response) if accept(response.status) => {
                    debug!(status = response.status, attempt, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let backoff_ms = BACKOFF_BASE_MS * 2u64.pow(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): status={}, retrying in {}ms",
                        attempt, MAX_ATTEMPTS, response.status, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Ok(response) => {
                    warn!(status = response.status, attempt, "API request failed");
                    return Err(Self::status_error(&response, resource).into());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let backoff_ms = BACKOFF_BASE_MS * 2u64.pow(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, MAX_ATTEMPTS, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    warn!("API request failed after {} attempts: {}", MAX_ATTEMPTS, e);
                    return Err(e);
                }
            }
        }
    }

    fn parse_body<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }

    async fn find_folder(&self, parent_folder_id: &str, name: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/files?q={}&pageSize=1&fields=files(id,name,mimeType)",
            DRIVE_API_BASE,
            urlencoding::encode(&Self::build_folder_query(parent_folder_id, name))
        );
        let request = HttpRequest::get(url).timeout(METADATA_TIMEOUT);
        let response = self.execute_with_retry(request, parent_folder_id).await?;
        let list: FilesListResponse = Self::parse_body(&response, "folder lookup")?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, parent_folder_id: &str, name: &str) -> Result<String> {
        let metadata = NewFileMetadata {
            name,
            parents: vec![parent_folder_id],
            mime_type: Some(FOLDER_MIME_TYPE),
        };
        let request = HttpRequest::post(format!("{}/files?fields=id", DRIVE_API_BASE))
            .json(&metadata)?
            .timeout(METADATA_TIMEOUT);
        let response = self.execute_with_retry(request, parent_folder_id).await?;
        let created: CreatedFile = Self::parse_body(&response, "folder create response")?;

        Ok(created.id)
    }

    /// Open a resumable upload session and return its session URI.
    async fn start_upload_session(
        &self,
        metadata: &NewFileMetadata<'_>,
        mime_type: Option<&str>,
        total: usize,
    ) -> Result<String> {
        let request = HttpRequest::post(format!(
            "{}/files?uploadType=resumable&fields=id",
            DRIVE_UPLOAD_BASE
        ))
        .json(metadata)?
        .header(
            "X-Upload-Content-Type",
            mime_type.unwrap_or("application/octet-stream"),
        )
        .header("X-Upload-Content-Length", total.to_string())
        .timeout(METADATA_TIMEOUT);

        let response = self
            .execute_with_retry(request, metadata.name)
            .await?;

        response.headers.get("location").cloned().ok_or_else(|| {
            GoogleDriveError::ParseError("Upload session response has no Location header".to_string())
                .into()
        })
    }

    /// Send `data` through a resumable session in `chunk_size` pieces.
    ///
    /// Each 308 reply says how much the server kept; the next chunk starts
    /// there. A retried chunk re-sends only that chunk.
    async fn upload_resumable(
        &self,
        data: Bytes,
        metadata: &NewFileMetadata<'_>,
        mime_type: Option<&str>,
    ) -> Result<String> {
        let total = data.len();
        let session_uri = self.start_upload_session(metadata, mime_type, total).await?;

        let mut offset = 0;
        let mut stalled = 0;

        loop {
            let end = (offset + self.chunk_size).min(total);
            let request = HttpRequest::new(HttpMethod::Put, session_uri.as_str())
                .header("Content-Range", Self::content_range(offset, end, total))
                .body(data.slice(offset..end))
                .timeout(CHUNK_TIMEOUT);

            let response = self
                .execute_accepting(request, metadata.name, accepts_chunk)
                .await?;

            if response.status != RESUME_INCOMPLETE {
                let created: CreatedFile = Self::parse_body(&response, "upload response")?;
                return Ok(created.id);
            }

            let confirmed = Self::confirmed_length(&response).min(total);
            if confirmed <= offset {
                stalled += 1;
                if stalled >= MAX_ATTEMPTS {
                    return Err(GoogleDriveError::ApiError {
                        status_code: RESUME_INCOMPLETE,
                        message: format!("Upload session stopped advancing at byte {}", offset),
                    }
                    .into());
                }
            } else {
                stalled = 0;
            }

            debug!(confirmed, total, "Chunk accepted");
            offset = confirmed;
        }
    }
}

fn is_2xx(status: u16) -> bool {
    (200..300).contains(&status)
}

fn accepts_chunk(status: u16) -> bool {
    is_2xx(status) || status == RESUME_INCOMPLETE
}

#[async_trait]
impl RemoteStore for GoogleDriveConnector {
    #[instrument(skip(self))]
    async fn verify_session(&self) -> Result<()> {
        let request = HttpRequest::get(format!("{}/about?fields=user", DRIVE_API_BASE))
            .timeout(METADATA_TIMEOUT);
        let response = self.execute_with_retry(request, "about").await?;
        let about: AboutResponse = Self::parse_body(&response, "about response")?;

        let user = about
            .user
            .and_then(|u| u.display_name.or(u.email_address))
            .unwrap_or_default();
        info!(user = %redact_if_sensitive("user", &user), "Google Drive session verified");
        Ok(())
    }

    #[instrument(skip(self, filter), fields(folder_id = %folder_id, has_page_token = page_token.is_some()))]
    async fn list_children(
        &self,
        folder_id: &str,
        filter: &ListFilter,
        page_token: Option<String>,
    ) -> Result<(Vec<RemoteFile>, Option<String>)> {
        let query = Self::build_list_query(folder_id, filter);

        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields=nextPageToken,files({})",
            DRIVE_API_BASE,
            urlencoding::encode(&query),
            MAX_PAGE_SIZE,
            FILE_FIELDS
        );

        if let Some(page_token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&page_token)));
        }

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .timeout(METADATA_TIMEOUT);
        let response = self.execute_with_retry(request, folder_id).await?;
        let list_response: FilesListResponse = Self::parse_body(&response, "files list response")?;

        let files: Vec<RemoteFile> = list_response
            .files
            .into_iter()
            .map(Self::convert_file)
            .collect();

        debug!("Listed {} files from Google Drive", files.len());

        Ok((files, list_response.next_page_token))
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn download(&self, file_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/files/{}?alt=media",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );
        let response = self
            .execute_with_retry(HttpRequest::get(url), file_id)
            .await?;

        debug!("Downloaded {} bytes", response.body.len());
        Ok(response.body)
    }

    #[instrument(skip(self, data), fields(parent = %parent_folder_id, name = %name, bytes = data.len()))]
    async fn upload(
        &self,
        data: Bytes,
        parent_folder_id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> Result<String> {
        let metadata = NewFileMetadata {
            name,
            parents: vec![parent_folder_id],
            mime_type,
        };

        if data.len() > self.multipart_limit {
            debug!(size = data.len(), "Using resumable upload session (large file)");
            let id = self.upload_resumable(data, &metadata, mime_type).await?;
            debug!(file_id = %id, "Upload finished");
            return Ok(id);
        }

        let (body, boundary) = Self::build_multipart_body(&metadata, &data, mime_type)?;

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!(
                "{}/files?uploadType=multipart&fields=id",
                DRIVE_UPLOAD_BASE
            ),
        )
        .header(
            "Content-Type",
            format!("multipart/related; boundary={}", boundary),
        )
        .body(body);

        let response = self.execute_with_retry(request, parent_folder_id).await?;
        let created: CreatedFile = Self::parse_body(&response, "upload response")?;

        debug!(file_id = %created.id, "Upload finished");
        Ok(created.id)
    }

    #[instrument(skip(self), fields(parent = %parent_folder_id, name = %name))]
    async fn resolve_or_create_folder(
        &self,
        parent_folder_id: &str,
        name: &str,
    ) -> Result<String> {
        if let Some(id) = self.find_folder(parent_folder_id, name).await? {
            debug!(folder_id = %id, "Reusing existing folder");
            return Ok(id);
        }

        let id = self.create_folder(parent_folder_id, name).await?;
        info!(folder_id = %id, "Created folder");
        Ok(id)
    }
}
