#![allow(dead_code)]

use axum::{Router, body::Body, http::Request};
use std::path::Path;
use tmp_relay::config::RelayConfig;
use tmp_relay::services::storage::LocalStorage;
use tmp_relay::{AppState, create_app};
use std::sync::Arc;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";
pub const HOST: &str = "relay.test:3003";

pub fn app_with_config(config: RelayConfig) -> Router {
    let storage = Arc::new(LocalStorage::new(&config.storage_dir));
    create_app(AppState::new(storage, config))
}

pub fn app(storage_dir: &Path) -> Router {
    app_with_config(RelayConfig::with_storage_dir(storage_dir))
}

/// One multipart part. `filename: None` makes it a plain form value.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub extra_headers: &'a [(&'a str, String)],
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            extra_headers: &[],
            content,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
        for (name, value) in part.extra_headers {
            body.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Host", HOST)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn stored_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
