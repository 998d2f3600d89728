use thiserror::Error;
use uuid::Uuid;

/// Extensions (with leading dot) reported as images. Matching is case-sensitive.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Longest extension kept on a generated name, dot included
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("file size {size} bytes exceeds maximum allowed {limit} bytes")]
pub struct FileTooLarge {
    pub size: u64,
    pub limit: u64,
}

/// Validates file size against maximum limit
pub fn validate_file_size(size: u64, limit: u64) -> Result<(), FileTooLarge> {
    if size > limit {
        return Err(FileTooLarge { size, limit });
    }
    Ok(())
}

/// Final path component of a client-supplied file name.
///
/// Both `/` and `\` count as separators and trailing separators are ignored,
/// so `some/dir/cat.png` yields `cat.png`.
pub fn base_name(filename: &str) -> &str {
    filename
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
}

/// Returns the extension of the last path component, leading dot included.
///
/// The suffix starts at the last `.` of the component, so `archive.tar.gz`
/// yields `.gz` and `.bashrc` yields `.bashrc`. Both `/` and `\` count as
/// separators. Suffixes carrying anything but ASCII alphanumerics, `-` or `_`
/// are discarded so they can be used verbatim in a file name and a URL.
pub fn file_extension(filename: &str) -> &str {
    let base = base_name(filename);

    let Some(dot) = base.rfind('.') else {
        return "";
    };
    let ext = &base[dot..];

    let safe = ext.len() > 1
        && ext.len() <= MAX_EXTENSION_LEN
        && ext[1..]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if safe { ext } else { "" }
}

/// Generates the storage name for an upload: a random UUID plus the original extension
pub fn generate_stored_name(original_filename: &str) -> String {
    format!("{}{}", Uuid::new_v4(), file_extension(original_filename))
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}
