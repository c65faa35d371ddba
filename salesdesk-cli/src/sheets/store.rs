//! Document store
//!
//! The spreadsheet remains the system of record; the store only knows how
//! to fetch and put back whole documents by id. The production store maps
//! ids onto a directory of xlsx files.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use super::workbook::Workbook;
use super::xlsx;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self, document_id: &str) -> Result<Workbook>;
    async fn save(&self, document_id: &str, workbook: &Workbook) -> Result<()>;
}

/// Directory of `<id>.xlsx` files.
pub struct XlsxStore {
    root: PathBuf,
}

impl XlsxStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, document_id: &str) -> Result<PathBuf> {
        let id = document_id.trim();
        if id.is_empty() {
            bail!("Document id is empty");
        }
        // Ids are opaque keys, not paths.
        if id.contains(['/', '\\']) || id.contains("..") {
            bail!("Invalid document id: {id}");
        }
        Ok(self.root.join(format!("{id}.xlsx")))
    }
}

#[async_trait]
impl DocumentStore for XlsxStore {
    async fn load(&self, document_id: &str) -> Result<Workbook> {
        let path = self.path_for(document_id)?;
        let id = document_id.to_string();
        tokio::task::spawn_blocking(move || {
            xlsx::read_workbook(&path).with_context(|| format!("Failed to load document {id}"))
        })
        .await
        .context("Workbook load task failed")?
    }

    async fn save(&self, document_id: &str, workbook: &Workbook) -> Result<()> {
        let path = self.path_for(document_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }
        let id = document_id.to_string();
        let workbook = workbook.clone();
        tokio::task::spawn_blocking(move || {
            xlsx::write_workbook(&workbook, &path)
                .with_context(|| format!("Failed to save document {id}"))
        })
        .await
        .context("Workbook save task failed")?
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct MemoryStore {
    documents: std::sync::Mutex<std::collections::HashMap<String, Workbook>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn with_document(document_id: &str, workbook: Workbook) -> Self {
        let store = Self::new();
        store
            .documents
            .lock()
            .unwrap()
            .insert(document_id.to_string(), workbook);
        store
    }

    pub fn insert(&self, document_id: &str, workbook: Workbook) {
        self.documents
            .lock()
            .unwrap()
            .insert(document_id.to_string(), workbook);
    }

    pub fn snapshot(&self, document_id: &str) -> Option<Workbook> {
        self.documents.lock().unwrap().get(document_id).cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, document_id: &str) -> Result<Workbook> {
        self.documents
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .with_context(|| format!("Unknown document: {document_id}"))
    }

    async fn save(&self, document_id: &str, workbook: &Workbook) -> Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(document_id.to_string(), workbook.clone());
        Ok(())
    }
}
