use crate::error::StoreError;
use crate::record::ComponentRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Source of component records
///
/// Implementations may be slow or fail per id; callers treat every
/// failure as local to the requested component.
#[allow(async_fn_in_trait)]
pub trait ComponentStore {
    async fn fetch_component(&self, id: &str) -> Result<ComponentRecord, StoreError>;
}

/// In-memory store for testing
///
/// Counts fetches per id, and can be told to fail specific ids or to
/// delay every fetch.
#[derive(Default)]
pub struct MemoryStore {
    records: HashMap<String, ComponentRecord>,
    failures: HashMap<String, StoreError>,
    delay: Option<Duration>,
    fetch_counts: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ComponentRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn with(mut self, record: ComponentRecord) -> Self {
        self.insert(record);
        self
    }

    /// Make every fetch of `id` fail with `error`
    pub fn fail(&mut self, id: impl Into<String>, error: StoreError) {
        self.failures.insert(id.into(), error);
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.fetch_counts
            .lock()
            .map(|counts| counts.get(id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetch_counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }
}

impl ComponentStore for MemoryStore {
    async fn fetch_component(&self, id: &str) -> Result<ComponentRecord, StoreError> {
        if let Ok(mut counts) = self.fetch_counts.lock() {
            *counts.entry(id.to_string()).or_insert(0) += 1;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(id) {
            return Err(error.clone());
        }

        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}

/// Store reading `<root>/<id>.json` files
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        // Ids name files directly; anything that could escape the root is refused
        if id.is_empty()
            || id.contains('/')
            || id.contains('\\')
            || id.starts_with('.')
        {
            return None;
        }
        Some(self.root.join(format!("{}.json", id)))
    }
}

impl ComponentStore for DirectoryStore {
    async fn fetch_component(&self, id: &str) -> Result<ComponentRecord, StoreError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Err(e) => {
                return Err(StoreError::Unavailable {
                    id: id.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let mut record: ComponentRecord =
            serde_json::from_str(&contents).map_err(|e| StoreError::Malformed {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        if record.id.is_empty() {
            record.id = id.to_string();
        }

        tracing::debug!(id = %id, path = %path.display(), "loaded component record");
        Ok(record)
    }
}
