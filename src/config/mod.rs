use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum accepted request body and file size: 50 MiB
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

pub const DEFAULT_PORT: u16 = 3003;

/// How long a stored file lives. Also used for the `expires` field of upload responses.
pub const RETENTION_PERIOD: Duration = Duration::from_secs(60 * 60);

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Upper bound for minute-based settings: 100 years
pub const MAX_MINUTES: u64 = 100 * 365 * 24 * 60;

pub const DEFAULT_STORAGE_DIR: &str = "tmp";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_PUBLIC_PREFIX: &str = "tmp";

/// Runtime configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the listener to (default: 0.0.0.0)
    pub host: IpAddr,

    /// Listen port (default: 3003)
    pub port: u16,

    /// Maximum request body and file size in bytes (default: 50 MiB)
    pub max_upload_size: usize,

    /// Flat directory holding uploaded files (default: "tmp")
    pub storage_dir: PathBuf,

    /// Directory holding `index.html` (default: "static")
    pub static_dir: PathBuf,

    /// URL path segment stored files are served under (default: "tmp")
    pub public_prefix: String,

    /// Age after which stored files are purged (default: 60 minutes)
    pub retention: Duration,

    /// Pause between two sweep cycles (default: 10 minutes)
    pub sweep_interval: Duration,

    /// Honor `X-Forwarded-Proto` when building public URLs (default: false)
    pub trust_forwarded_proto: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_upload_size: MAX_UPLOAD_SIZE,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            retention: RETENTION_PERIOD,
            sweep_interval: SWEEP_INTERVAL,
            trust_forwarded_proto: false,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            host: env::var("HOST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.host),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.static_dir),

            public_prefix: env::var("PUBLIC_PREFIX")
                .ok()
                .map(|v| normalize_prefix(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(default.public_prefix),

            retention: env::var("RETENTION_MINUTES")
                .ok()
                .and_then(|v| parse_minutes(&v))
                .unwrap_or(default.retention),

            sweep_interval: env::var("SWEEP_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| parse_minutes(&v))
                .unwrap_or(default.sweep_interval),

            trust_forwarded_proto: env::var("TRUST_FORWARDED_PROTO")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.trust_forwarded_proto),
        }
    }

    /// Config rooted at the given storage directory, everything else default
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    /// Path of the index page served at `/`
    pub fn index_page(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }

    /// Route under which stored files are served, e.g. `/tmp`
    pub fn public_route(&self) -> String {
        format!("/{}", self.public_prefix)
    }
}

/// Positive whole minutes up to [`MAX_MINUTES`]. Anything else is rejected.
fn parse_minutes(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|&minutes| minutes > 0 && minutes <= MAX_MINUTES)
        .and_then(|minutes| minutes.checked_mul(60))
        .map(Duration::from_secs)
}

fn normalize_prefix(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}
