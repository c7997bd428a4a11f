//! Lock-guarded store handle for front ends that share one graph.
//!
//! # Invariants
//! - Mutations are serialized through one write lock per store.
//! - Readers hold the read lock only while cloning the snapshot, so long
//!   analytics runs never block writers.

use crate::content::note_files::{FsNoteFileStore, NoteFileStore};
use crate::model::snapshot::GraphSnapshot;
use crate::repo::snapshot_repo::{JsonFileSnapshotRepository, SnapshotRepository};
use crate::service::graph_store::{GraphStore, StoreError, StoreResult};
use std::sync::{Arc, RwLock};

/// Cloneable handle to one [`GraphStore`].
pub struct SharedGraphStore<R = JsonFileSnapshotRepository, F = FsNoteFileStore> {
    inner: Arc<RwLock<GraphStore<R, F>>>,
}

impl<R, F> Clone for SharedGraphStore<R, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: SnapshotRepository, F: NoteFileStore> SharedGraphStore<R, F> {
    pub fn new(store: GraphStore<R, F>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Runs `f` with exclusive access.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut GraphStore<R, F>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut guard)
    }

    /// Runs `f` with shared access.
    pub fn read<T>(&self, f: impl FnOnce(&GraphStore<R, F>) -> T) -> StoreResult<T> {
        let guard = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Clones the committed snapshot for lock-free analysis.
    pub fn snapshot(&self) -> StoreResult<GraphSnapshot> {
        self.read(|store| store.snapshot().clone())
    }
}
