//! Artifact Store - newest-first, in-memory
//!
//! Two mutations only: insert at head (capture) and update by id
//! (enrichment). Both take the same lock; cloning the store clones the
//! handle, not the contents.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::artifact::Artifact;

#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<Mutex<Vec<Artifact>>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Artifact>> {
        // The list stays consistent even if a holder panicked mid-read.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_head(&self, artifact: Artifact) {
        self.lock().insert(0, artifact);
    }

    /// Read-modify-write of one artifact under a single lock.
    /// Returns the updated copy, or `None` if the id is unknown.
    pub fn update<F>(&self, id: &str, f: F) -> Option<Artifact>
    where
        F: FnOnce(&mut Artifact),
    {
        let mut items = self.lock();
        let artifact = items.iter_mut().find(|a| a.id == id)?;
        f(&mut *artifact);
        Some(artifact.clone())
    }

    pub fn get(&self, id: &str) -> Option<Artifact> {
        self.lock().iter().find(|a| a.id == id).cloned()
    }

    /// Most recent capture.
    pub fn head(&self) -> Option<Artifact> {
        self.lock().first().cloned()
    }

    /// Copy of every artifact, newest first.
    pub fn snapshot(&self) -> Vec<Artifact> {
        self.lock().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().iter().map(|a| a.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
