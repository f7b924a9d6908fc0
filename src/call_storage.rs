use crate::call_models::Call;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub struct CallStorage {
    path: PathBuf,
    calls: RwLock<Vec<Call>>,
}

impl CallStorage {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let calls = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read calls file")?;
            serde_json::from_str(&data).context("Failed to parse calls file")?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create data directory")?;
            }
            Vec::new()
        };

        Ok(Self {
            path,
            calls: RwLock::new(calls),
        })
    }

    pub async fn add_call(&self, call: Call) -> Result<Call> {
        let mut calls = self.calls.write().await;
        calls.push(call.clone());
        if let Err(e) = save_to_disk(&self.path, &calls) {
            calls.pop();
            return Err(e);
        }
        Ok(call)
    }

    /// Owner's calls, newest first, optionally capped at `limit`.
    pub async fn calls_for_owner(&self, owner: &str, limit: Option<usize>) -> Vec<Call> {
        let calls = self.calls.read().await;
        let mut owned: Vec<Call> = calls.iter().filter(|c| c.owner == owner).cloned().collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            owned.truncate(limit);
        }
        owned
    }
}

fn save_to_disk(path: &Path, calls: &[Call]) -> Result<()> {
    let json = serde_json::to_string_pretty(calls).context("Failed to serialize calls")?;
    fs::write(path, json).context("Failed to write calls file")?;
    Ok(())
}
