use crate::models::{normalize_tags, Document};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// JSON-file backed document records.
///
/// Every lookup that takes an `owner` matches on `(id, owner)` together, and
/// records flagged `pending_delete` are invisible to owner queries.
pub struct DocumentStorage {
    path: PathBuf,
    documents: RwLock<Vec<Document>>,
}

impl DocumentStorage {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let documents = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read documents file")?;
            serde_json::from_str(&data).context("Failed to parse documents file")?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create data directory")?;
            }
            Vec::new()
        };

        Ok(Self {
            path,
            documents: RwLock::new(documents),
        })
    }

    pub async fn insert(&self, document: Document) -> Result<Document> {
        let mut documents = self.documents.write().await;
        let mut next = documents.clone();
        next.push(document.clone());
        save_to_disk(&self.path, &next)?;
        *documents = next;
        Ok(document)
    }

    /// Owner's documents, newest first.
    pub async fn list_for_owner(&self, owner: &str) -> Vec<Document> {
        let documents = self.documents.read().await;
        let mut owned: Vec<Document> = documents
            .iter()
            .filter(|d| d.owner == owner && !d.pending_delete)
            .cloned()
            .collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned
    }

    pub async fn get(&self, id: &str, owner: &str) -> Option<Document> {
        let documents = self.documents.read().await;
        documents
            .iter()
            .find(|d| is_visible(d, id, owner))
            .cloned()
    }

    /// Applies whichever of `name` and `tags` are present. `Ok(None)` when the
    /// owner has no such document.
    pub async fn update(
        &self,
        id: &str,
        owner: &str,
        name: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<Option<Document>> {
        self.modify(id, owner, |doc| {
            if let Some(name) = name {
                doc.name = name;
            }
            if let Some(tags) = tags {
                doc.tags = normalize_tags(tags);
            }
        })
        .await
    }

    pub async fn set_processed(&self, id: &str, owner: &str, processed: bool) -> Result<Option<Document>> {
        self.modify(id, owner, |doc| doc.processed = processed).await
    }

    /// Tombstones a document so it disappears from owner queries before its
    /// file and record are removed.
    pub async fn mark_pending_delete(&self, id: &str, owner: &str) -> Result<Option<Document>> {
        self.modify(id, owner, |doc| doc.pending_delete = true).await
    }

    /// Drops a tombstoned record for good.
    pub async fn purge(&self, id: &str, owner: &str) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        let next: Vec<Document> = documents
            .iter()
            .filter(|d| !(d.id == id && d.owner == owner && d.pending_delete))
            .cloned()
            .collect();

        if next.len() == before {
            return Ok(false);
        }

        save_to_disk(&self.path, &next)?;
        *documents = next;
        Ok(true)
    }

    pub async fn pending_deletes(&self) -> Vec<Document> {
        let documents = self.documents.read().await;
        documents.iter().filter(|d| d.pending_delete).cloned().collect()
    }

    async fn modify<F>(&self, id: &str, owner: &str, apply: F) -> Result<Option<Document>>
    where
        F: FnOnce(&mut Document),
    {
        let mut documents = self.documents.write().await;
        let Some(index) = documents.iter().position(|d| is_visible(d, id, owner)) else {
            return Ok(None);
        };

        let mut next = documents.clone();
        apply(&mut next[index]);
        save_to_disk(&self.path, &next)?;

        let updated = next[index].clone();
        *documents = next;
        Ok(Some(updated))
    }
}

fn is_visible(doc: &Document, id: &str, owner: &str) -> bool {
    doc.id == id && doc.owner == owner && !doc.pending_delete
}

fn save_to_disk(path: &Path, documents: &[Document]) -> Result<()> {
    let json = serde_json::to_string_pretty(documents).context("Failed to serialize documents")?;
    fs::write(path, json).context("Failed to write documents file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn storage() -> (DocumentStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = DocumentStorage::new(dir.path().join("documents.json")).unwrap();
        (storage, dir)
    }

    fn link(owner: &str, name: &str) -> Document {
        Document::new_link(owner.into(), name.into(), "https://example.com".into(), vec![])
    }

    #[tokio::test]
    async fn lookups_are_owner_scoped() {
        let (storage, _dir) = storage();
        let doc = storage.insert(link("alice", "Playbook")).await.unwrap();

        assert!(storage.get(&doc.id, "alice").await.is_some());
        assert!(storage.get(&doc.id, "bob").await.is_none());
        assert!(storage.list_for_owner("bob").await.is_empty());
        assert!(storage
            .update(&doc.id, "bob", Some("stolen".into()), None)
            .await
            .unwrap()
            .is_none());
        assert!(storage.mark_pending_delete(&doc.id, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (storage, _dir) = storage();
        let mut older = link("alice", "older");
        older.created_at = older.created_at - Duration::minutes(5);
        storage.insert(older).await.unwrap();
        storage.insert(link("alice", "newer")).await.unwrap();

        let names: Vec<String> = storage
            .list_for_owner("alice")
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn update_touches_only_supplied_fields() {
        let (storage, _dir) = storage();
        let doc = storage.insert(link("alice", "Playbook")).await.unwrap();

        let updated = storage
            .update(&doc.id, "alice", None, Some(vec!["a".into()]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.tags, vec!["a"]);
        assert_eq!(updated.name, doc.name);
        assert_eq!(updated.created_at, doc.created_at);
        assert_eq!(updated.location, doc.location);
    }

    #[tokio::test]
    async fn tombstoned_records_are_hidden_until_purged() {
        let (storage, _dir) = storage();
        let doc = storage.insert(link("alice", "Playbook")).await.unwrap();

        storage.mark_pending_delete(&doc.id, "alice").await.unwrap().unwrap();
        assert!(storage.get(&doc.id, "alice").await.is_none());
        assert_eq!(storage.pending_deletes().await.len(), 1);

        assert!(storage.purge(&doc.id, "alice").await.unwrap());
        assert!(storage.pending_deletes().await.is_empty());
        assert!(!storage.purge(&doc.id, "alice").await.unwrap());
    }

    #[tokio::test]
    async fn records_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let doc = {
            let storage = DocumentStorage::new(&path).unwrap();
            storage.insert(link("alice", "Playbook")).await.unwrap()
        };

        let reloaded = DocumentStorage::new(&path).unwrap();
        assert_eq!(reloaded.get(&doc.id, "alice").await, Some(doc));
    }
}
