use crate::config::RelayConfig;
use crate::services::storage::{LocalStorage, StorageError};
use crate::utils::validation::{
    FileTooLarge, file_extension, generate_stored_name, is_image_extension, validate_file_size,
};
use chrono::{DateTime, Local, TimeDelta};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const HEADER_PEEK_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    TooLarge(#[from] FileTooLarge),

    #[error("failed to open upload stream: {0}")]
    Open(#[source] io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("retention of {retention:?} cannot be expressed as an expiry time")]
    Retention { retention: Duration },
}

/// Outcome of a successful upload
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_name: String,
    pub size: u64,
    pub expires_at: DateTime<Local>,
    pub is_image: bool,
}

pub struct UploadService {
    storage: Arc<LocalStorage>,
    config: RelayConfig,
}

impl UploadService {
    pub fn new(storage: Arc<LocalStorage>, config: RelayConfig) -> Self {
        Self { storage, config }
    }

    /// Stores one uploaded file under a freshly generated name.
    ///
    /// `declared_size` is the size announced by the client, if any; it is checked
    /// before a single byte of the stream is consumed.
    pub async fn accept<R>(
        &self,
        original_name: &str,
        declared_size: Option<u64>,
        mut reader: R,
    ) -> Result<StoredUpload, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let limit = self.config.max_upload_size as u64;

        if let Some(size) = declared_size {
            validate_file_size(size, limit)?;
        }
        let retention = self.retention()?;

        // Open the stream: the first read surfaces a broken upload before anything touches disk.
        let mut header_buffer = [0u8; HEADER_PEEK_SIZE];
        let n = reader
            .read(&mut header_buffer)
            .await
            .map_err(UploadError::Open)?;
        let header_cursor = io::Cursor::new(header_buffer[..n].to_vec());
        let chained_reader = header_cursor.chain(reader);

        let ext = file_extension(original_name);
        let stored_name = generate_stored_name(original_name);

        let size = self
            .storage
            .write_atomic(&stored_name, chained_reader, limit)
            .await?;

        let expires_at = Local::now()
            .checked_add_signed(retention)
            .ok_or(UploadError::Retention {
                retention: self.config.retention,
            })?;

        tracing::info!(
            original = %original_name,
            stored = %stored_name,
            bytes = size,
            "📦 Stored upload"
        );

        Ok(StoredUpload {
            original_name: original_name.to_string(),
            stored_name,
            size,
            expires_at,
            is_image: is_image_extension(ext),
        })
    }

    /// Retention as a calendar offset; refused up front if no expiry could be computed from it
    fn retention(&self) -> Result<TimeDelta, UploadError> {
        let retention = self.config.retention;
        TimeDelta::from_std(retention)
            .ok()
            .filter(|delta| Local::now().checked_add_signed(*delta).is_some())
            .ok_or(UploadError::Retention { retention })
    }
}
