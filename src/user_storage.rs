use crate::user_models::User;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

/// User accounts on disk plus bearer sessions in memory.
pub struct UserStorage {
    path: PathBuf,
    users: RwLock<Vec<User>>,
    sessions: RwLock<HashMap<String, String>>,
}

impl UserStorage {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read users file")?;
            serde_json::from_str(&data).context("Failed to parse users file")?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create data directory")?;
            }
            Vec::new()
        };

        Ok(Self {
            path,
            users: RwLock::new(users),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username == user.username) {
            bail!("Username already exists");
        }

        users.push(user.clone());
        if let Err(e) = save_users_to_disk(&self.path, &users) {
            users.pop();
            return Err(e);
        }
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let users = self.users.read().await;
        users.iter().find(|u| u.username == username).cloned()
    }

    /// Opens a session for `user_id` and returns its bearer token.
    pub async fn start_session(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), user_id.to_string());
        token
    }

    pub async fn session_user(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn end_session(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

fn save_users_to_disk(path: &Path, users: &[User]) -> Result<()> {
    let json = serde_json::to_string_pretty(users).context("Failed to serialize users")?;
    fs::write(path, json).context("Failed to write to users file")?;
    Ok(())
}
