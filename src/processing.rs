use crate::models::Document;
use anyhow::Result;
use async_trait::async_trait;

/// Post-upload work on a freshly stored document (text extraction and the
/// like). Returns whether the document is now considered processed.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(&self, document: &Document) -> Result<bool>;
}

/// Marks every upload processed as soon as it is stored.
pub struct ImmediateProcessor;

#[async_trait]
impl DocumentProcessor for ImmediateProcessor {
    async fn process(&self, _document: &Document) -> Result<bool> {
        Ok(true)
    }
}
