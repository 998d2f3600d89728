use crate::AppState;
use crate::api::error::AppError;
use crate::utils::validation::base_name;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, Uri, header, uri::Scheme},
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

/// Name of the multipart field carrying the file
pub const FILE_FIELD: &str = "file";

const EXPIRES_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub expires: String,
    #[serde(rename = "isImage")]
    pub is_image: bool,
}

/// Multipart body accepted by `POST /upload`
#[derive(ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data", description = "Single file upload"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or oversized file", body = ErrorResponse),
        (status = 500, description = "File could not be stored", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected multipart request: {}", e);
        AppError::missing_file()
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Browsers send an empty filename when no file was picked
        let Some(original_name) = field
            .file_name()
            .map(base_name)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let declared_size = declared_size(&field);

        let body_with_io_error = field.map_err(std::io::Error::other);
        let reader = StreamReader::new(body_with_io_error);

        let stored = state
            .uploads
            .accept(&original_name, declared_size, reader)
            .await?;

        let scheme = request_scheme(&uri, &headers, state.config.trust_forwarded_proto);
        let host = request_host(&uri, &headers, state.config.port);
        let url = format!(
            "{}://{}/{}/{}",
            scheme, host, state.config.public_prefix, stored.stored_name
        );

        return Ok(Json(UploadResponse {
            success: true,
            filename: stored.original_name,
            url,
            expires: stored.expires_at.format(EXPIRES_FORMAT).to_string(),
            is_image: stored.is_image,
        }));
    }

    Err(AppError::missing_file())
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::file_too_large()
    } else {
        tracing::debug!("Malformed multipart payload: {}", err);
        AppError::missing_file()
    }
}

/// Size announced in the part's own `Content-Length` header, if the client sent one
fn declared_size(field: &Field<'_>) -> Option<u64> {
    field
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// `https` only when the request reached us over TLS, or a trusted proxy says so
pub fn request_scheme(uri: &Uri, headers: &HeaderMap, trust_forwarded_proto: bool) -> &'static str {
    if trust_forwarded_proto {
        let forwarded = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim);
        if forwarded.is_some_and(|proto| proto.eq_ignore_ascii_case("https")) {
            return "https";
        }
    }

    if uri.scheme() == Some(&Scheme::HTTPS) {
        "https"
    } else {
        "http"
    }
}

pub fn request_host(uri: &Uri, headers: &HeaderMap, port: u16) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| format!("localhost:{}", port))
}
