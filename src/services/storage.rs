use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Prefix of in-flight uploads. Dot-prefixed so they never collide with generated names.
pub const TEMP_UPLOAD_PREFIX: &str = ".upload-";
pub const TEMP_UPLOAD_SUFFIX: &str = ".part";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create destination file: {0}")]
    Create(#[source] io::Error),

    #[error("failed to read upload stream: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write destination file: {0}")]
    Write(#[source] io::Error),

    #[error("stream exceeded limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to move upload into place: {0}")]
    Persist(#[source] io::Error),
}

/// Flat directory used as a key-value store: key = generated file name, value = file bytes.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Creates the storage directory if it does not exist yet
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Streams `reader` into the store under `name`.
    ///
    /// Bytes land in a hidden temp file in the storage directory and are renamed
    /// to `name` only once the whole stream has been written and flushed, so a
    /// reader of the directory never observes a truncated file. The rename refuses
    /// to replace an existing entry. On any failure the temp file is removed.
    ///
    /// Returns the number of bytes stored.
    pub async fn write_atomic<R>(
        &self,
        name: &str,
        mut reader: R,
        limit: u64,
    ) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let temp_file = tempfile::Builder::new()
            .prefix(TEMP_UPLOAD_PREFIX)
            .suffix(TEMP_UPLOAD_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(StorageError::Create)?;

        let mut file = tokio::fs::File::from_std(
            temp_file
                .as_file()
                .try_clone()
                .map_err(StorageError::Create)?,
        );

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total_size: u64 = 0;

        // Dropping `temp_file` on an early return deletes it from disk.
        loop {
            let n = reader.read(&mut buffer).await.map_err(StorageError::Read)?;
            if n == 0 {
                break;
            }

            total_size += n as u64;
            if total_size > limit {
                return Err(StorageError::TooLarge { limit });
            }

            file.write_all(&buffer[..n])
                .await
                .map_err(StorageError::Write)?;
        }

        file.flush().await.map_err(StorageError::Write)?;
        file.sync_all().await.map_err(StorageError::Write)?;
        drop(file);

        temp_file
            .persist_noclobber(self.path_for(name))
            .map_err(|e| StorageError::Persist(e.error))?;

        tracing::debug!(file = %name, bytes = total_size, "upload persisted");

        Ok(total_size)
    }
}

/// Whether a directory entry is an in-flight upload rather than a stored file
pub fn is_temp_upload_name(name: &str) -> bool {
    name.starts_with(TEMP_UPLOAD_PREFIX) && name.ends_with(TEMP_UPLOAD_SUFFIX)
}
