use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;
/// Lowest cost bcrypt accepts.
const TEST_BCRYPT_COST: u32 = 4;

/// Server settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub reaper_interval: Duration,
    pub password_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let bind_addr = dotenvy::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let data_dir = PathBuf::from(
            dotenvy::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
        );
        let upload_dir = dotenvy::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("uploads"));

        let max_upload_bytes = match dotenvy::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a byte count, got {raw:?}"))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let reaper_secs = match dotenvy::var("REAPER_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("REAPER_INTERVAL_SECS must be seconds, got {raw:?}"))?,
            Err(_) => DEFAULT_REAPER_INTERVAL_SECS,
        };

        let password_cost = match dotenvy::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("BCRYPT_COST must be a number, got {raw:?}"))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            upload_dir,
            max_upload_bytes,
            reaper_interval: Duration::from_secs(reaper_secs.max(1)),
            password_cost,
        })
    }

    /// Settings rooted at `dir` with the cheapest password hashing, for tests.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            upload_dir: data_dir.join("uploads"),
            data_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
            password_cost: TEST_BCRYPT_COST,
        }
    }

    pub fn documents_file(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn calls_file(&self) -> PathBuf {
        self.data_dir.join("calls.json")
    }
}
