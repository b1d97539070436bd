// ImageFileService - conditional, streamed delivery of stored images

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{require_session, FileStorage, Session},
};

pub const CACHE_CONTROL_VALUE: &str = "max-age=60";

const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type for a file extension, matched case-insensitively
pub fn mime_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "webp" => "image/webp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "avif" => "image/avif",
        _ => FALLBACK_MIME,
    }
}

/// Extension after the last `.` of a name, if any
fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Weak validator built from size and modification time in milliseconds
pub fn weak_etag(size: u64, modified: SystemTime) -> String {
    let millis = match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_millis() as i128,
        Err(before) => -(before.duration().as_millis() as i128),
    };
    format!("W/\"{}-{}\"", size, millis)
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Headers and byte stream of a file being delivered
pub struct FileBody {
    pub etag: String,
    pub content_type: &'static str,
    pub content_length: u64,
    pub last_modified: String,
    pub stream: ReaderStream<File>,
}

/// Outcome of serving a file
pub enum FileResponse {
    NotFound,
    NotModified,
    Ok(FileBody),
}

impl FileResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            FileResponse::NotFound => StatusCode::NOT_FOUND,
            FileResponse::NotModified => StatusCode::NOT_MODIFIED,
            FileResponse::Ok(_) => StatusCode::OK,
        }
    }
}

impl IntoResponse for FileResponse {
    fn into_response(self) -> Response {
        match self {
            FileResponse::NotFound => StatusCode::NOT_FOUND.into_response(),
            FileResponse::NotModified => StatusCode::NOT_MODIFIED.into_response(),
            FileResponse::Ok(file) => {
                // Read errors after headers are sent abort the connection; log them here.
                let stream = file
                    .stream
                    .inspect_err(|e| error!("Failed while streaming file: {}", e));

                let mut response = Response::new(Body::from_stream(stream));
                let headers = response.headers_mut();
                if let Ok(etag) = HeaderValue::from_str(&file.etag) {
                    headers.insert(header::ETAG, etag);
                }
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(file.content_type),
                );
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.content_length));
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static(CACHE_CONTROL_VALUE),
                );
                if let Ok(last_modified) = HeaderValue::from_str(&file.last_modified) {
                    headers.insert(header::LAST_MODIFIED, last_modified);
                }
                response
            }
        }
    }
}

#[derive(Clone)]
pub struct ImageFileService {
    storage: Arc<FileStorage>,
    chunk_size: usize,
}

impl ImageFileService {
    pub fn new(storage: Arc<FileStorage>, chunk_size: usize) -> Self {
        Self {
            storage,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Serve `name` from the storage root, honoring `If-None-Match`.
    ///
    /// A file that disappears between the stat and the open surfaces as an IO error.
    pub async fn serve(&self, name: &str, if_none_match: Option<&str>) -> AppResult<FileResponse> {
        let Some(stored) = self.storage.stat(name).await? else {
            debug!("Image {:?} not found", name);
            return Ok(FileResponse::NotFound);
        };

        let etag = weak_etag(stored.size, stored.modified);
        if if_none_match == Some(etag.as_str()) {
            return Ok(FileResponse::NotModified);
        }

        let file = self.storage.open(&stored).await?;
        let content_type = extension_of(name).map(mime_for).unwrap_or(FALLBACK_MIME);

        Ok(FileResponse::Ok(FileBody {
            etag,
            content_type,
            content_length: stored.size,
            last_modified: http_date(stored.modified),
            stream: ReaderStream::with_capacity(file, self.chunk_size),
        }))
    }

    /// Store an uploaded image under a fresh name and return that name
    pub async fn upload(
        &self,
        session: Option<&Session>,
        original_name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let session = require_session(session)
            .inspect_err(|_| warn!("Rejected upload_image without a session"))?;

        let extension = extension_of(original_name)
            .map(str::to_ascii_lowercase)
            .filter(|ext| mime_for(ext) != FALLBACK_MIME)
            .ok_or_else(|| {
                AppError::Validation(format!("Unsupported image type: {:?}", original_name))
            })?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        self.storage.save(&name, bytes).await?;
        info!("{} uploaded image {} ({} bytes)", session.user, name, bytes.len());
        Ok(name)
    }
}
