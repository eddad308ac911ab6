//! Ordered in-memory collection of compute entities.

use std::sync::Arc;

use remote_compute_core::{ComputeEntity, ComputeId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::DuplicateComputeError;

/// One entity plus the lock that orders operations on it.
pub(crate) struct ComputeSlot {
    pub(crate) id: ComputeId,
    pub(crate) state: RwLock<ComputeEntity>,
    ops: Arc<Mutex<()>>,
}

impl ComputeSlot {
    fn new(entity: ComputeEntity) -> Self {
        Self {
            id: entity.id.clone(),
            state: RwLock::new(entity),
            ops: Arc::new(Mutex::new(())),
        }
    }

    /// Clone of the current entity state.
    pub(crate) async fn snapshot(&self) -> ComputeEntity {
        self.state.read().await.clone()
    }

    /// Wait for earlier operations on this entity to finish.
    ///
    /// Waiters are served in arrival order.
    pub(crate) async fn lock_ops(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.ops).lock_owned().await
    }
}

/// Insertion-ordered registry keyed by compute id.
#[derive(Default)]
pub(crate) struct ComputeRegistry {
    slots: RwLock<Vec<Arc<ComputeSlot>>>,
}

impl ComputeRegistry {
    /// Append an entity unless its id is taken.
    ///
    /// `build` only runs once the id is known to be free.
    pub(crate) async fn insert_with<F>(
        &self,
        id: ComputeId,
        build: F,
    ) -> Result<Arc<ComputeSlot>, DuplicateComputeError>
    where
        F: FnOnce(ComputeId) -> ComputeEntity,
    {
        let mut slots = self.slots.write().await;
        if slots.iter().any(|s| s.id == id) {
            return Err(DuplicateComputeError(id));
        }

        let slot = Arc::new(ComputeSlot::new(build(id)));
        slots.push(Arc::clone(&slot));
        Ok(slot)
    }

    pub(crate) async fn get(&self, id: &str) -> Option<Arc<ComputeSlot>> {
        self.slots
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .map(Arc::clone)
    }

    /// Remove this exact slot. Returns `false` if it was already gone.
    pub(crate) async fn remove(&self, slot: &Arc<ComputeSlot>) -> bool {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|s| !Arc::ptr_eq(s, slot));
        slots.len() != before
    }

    pub(crate) async fn slots(&self) -> Vec<Arc<ComputeSlot>> {
        self.slots.read().await.clone()
    }

    pub(crate) async fn ids(&self) -> Vec<ComputeId> {
        self.slots.read().await.iter().map(|s| s.id.clone()).collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Drop every slot, returning how many there were.
    pub(crate) async fn clear(&self) -> usize {
        let mut slots = self.slots.write().await;
        let removed = slots.len();
        slots.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn insert(registry: &ComputeRegistry, id: &str) -> Arc<ComputeSlot> {
        registry
            .insert_with(id.to_string(), |id| ComputeEntity::new(id, None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_keeps_order_and_rejects_duplicates() {
        let registry = ComputeRegistry::default();
        insert(&registry, "b").await;
        insert(&registry, "a").await;

        let mut built = false;
        let err = registry
            .insert_with("b".to_string(), |id| {
                built = true;
                ComputeEntity::new(id, None)
            })
            .await
            .err();

        assert_eq!(err, Some(DuplicateComputeError("b".to_string())));
        assert!(!built);
        assert_eq!(registry.ids().await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_remove_is_by_identity() {
        let registry = ComputeRegistry::default();
        let first = insert(&registry, "a").await;
        assert!(registry.remove(&first).await);
        assert!(!registry.remove(&first).await);

        // A new slot with the same id is a different entity.
        insert(&registry, "a").await;
        assert!(!registry.remove(&first).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = ComputeRegistry::default();
        insert(&registry, "a").await;
        insert(&registry, "b").await;
        assert_eq!(registry.clear().await, 2);
        assert!(registry.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_ops_lock_is_exclusive() {
        let registry = ComputeRegistry::default();
        let slot = insert(&registry, "a").await;

        let guard = slot.lock_ops().await;
        assert!(slot.ops.try_lock().is_err());
        drop(guard);
        assert!(slot.ops.try_lock().is_ok());
    }
}
