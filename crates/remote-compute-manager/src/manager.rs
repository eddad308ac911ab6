//! Compute manager for orchestrating remote inference sessions.
//!
//! Every session operation follows the same shape: look the compute up,
//! wait for its earlier operations, call the inference server, and only
//! then write the outcome into the entity. A failed remote call leaves the
//! entity exactly as it was.

use std::sync::Arc;

use futures::future::join_all;
use remote_compute_core::{
    CleanupOperation, ClientError, ComputeEntity, ComputeEvent, ComputeId, ComputeStatus,
    CreateSessionRequest, EventLog, GridPositionProvider, HealthInfo, InferenceClient,
    NameGenerator, Position3D, PositionProvider, SessionConfig, SessionData,
    SessionStatusSnapshot, UuidNameGenerator,
};
use serde::{Deserialize, Serialize};

use crate::error::{DuplicateComputeError, SessionError};
use crate::registry::{ComputeRegistry, ComputeSlot};

/// Outcome of tearing down every compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Computes dropped from the collection.
    pub removed: usize,
    /// Computes whose remote session could not be confirmed deleted.
    pub failed: Vec<ComputeId>,
}

/// Manager owning a collection of computes and their remote sessions.
///
/// Operations on one compute run one at a time, in the order they were
/// called. Operations on different computes never wait on each other.
pub struct ComputeManager<C>
where
    C: InferenceClient,
{
    client: C,
    names: Arc<dyn NameGenerator>,
    positions: Arc<dyn PositionProvider>,
    computes: ComputeRegistry,
    events: EventLog,
}

#[cfg(feature = "http")]
impl ComputeManager<remote_compute_client::HttpInferenceClient> {
    /// Create a manager talking to the configured inference server.
    ///
    /// # Errors
    /// Returns error if the configured server URL is invalid.
    pub fn from_config(config: &remote_compute_core::ManagerConfig) -> Result<Self, ClientError> {
        let client = remote_compute_client::HttpInferenceClient::from_config(config)?;
        tracing::info!("Using inference server at {}", config.inference_server_url);
        Ok(Self::new(client))
    }
}

impl<C> ComputeManager<C>
where
    C: InferenceClient,
{
    /// Create a manager with the default naming and grid placement.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self::with_collaborators(
            client,
            Arc::new(UuidNameGenerator),
            Arc::new(GridPositionProvider::default()),
        )
    }

    /// Create a manager with custom naming and placement.
    #[must_use]
    pub fn with_collaborators(
        client: C,
        names: Arc<dyn NameGenerator>,
        positions: Arc<dyn PositionProvider>,
    ) -> Self {
        Self {
            client,
            names,
            positions,
            computes: ComputeRegistry::default(),
            events: EventLog::new(),
        }
    }

    /// Event log of collection changes.
    #[must_use]
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// Create a compute.
    ///
    /// A missing id is generated, a missing position comes from the
    /// position provider.
    ///
    /// # Errors
    /// Returns error if a compute with the same id already exists. No
    /// remote call is made in any case.
    pub async fn create_compute(
        &self,
        id: Option<String>,
        name: Option<String>,
        position: Option<Position3D>,
    ) -> Result<ComputeEntity, DuplicateComputeError> {
        let id = id.unwrap_or_else(|| self.names.generate());

        let slot = self
            .computes
            .insert_with(id, |id| {
                let mut entity = ComputeEntity::new(id, name);
                entity.position = position.unwrap_or_else(|| self.positions.next_position());
                entity
            })
            .await?;

        let entity = slot.snapshot().await;
        let total = self.computes.len().await;
        tracing::info!(
            "Created compute {} at ({:.1}, {:.1}, {:.1}). Total computes: {total}",
            entity.id,
            entity.position.x,
            entity.position.y,
            entity.position.z,
        );
        self.events.publish(ComputeEvent::ComputeCreated {
            compute_id: entity.id.clone(),
        });

        Ok(entity)
    }

    /// Get a snapshot of a compute.
    pub async fn get_compute(&self, id: &str) -> Option<ComputeEntity> {
        match self.computes.get(id).await {
            Some(slot) => Some(slot.snapshot().await),
            None => None,
        }
    }

    /// Snapshot of every compute, in creation order.
    pub async fn computes(&self) -> Vec<ComputeEntity> {
        let mut entities = Vec::new();
        for slot in self.computes.slots().await {
            entities.push(slot.snapshot().await);
        }
        entities
    }

    pub async fn compute_count(&self) -> usize {
        self.computes.len().await
    }

    /// Computes whose inference is running.
    pub async fn running_computes(&self) -> Vec<ComputeEntity> {
        self.computes()
            .await
            .into_iter()
            .filter(ComputeEntity::is_running)
            .collect()
    }

    /// Rename a compute. Returns `false` if it does not exist.
    pub async fn rename_compute(&self, id: &str, name: impl Into<String>) -> bool {
        let Some(slot) = self.computes.get(id).await else {
            return false;
        };
        slot.state.write().await.name = name.into();
        true
    }

    /// Move a compute. Returns `false` if it does not exist.
    pub async fn set_position(&self, id: &str, position: Position3D) -> bool {
        let Some(slot) = self.computes.get(id).await else {
            return false;
        };
        slot.state.write().await.position = position;
        true
    }

    /// Remove a compute after a best-effort stop and delete of its session.
    ///
    /// Unknown ids are ignored. The compute is always dropped locally; if
    /// cleanup failed the remote session may still be live.
    pub async fn remove_compute(&self, id: &str) {
        let Some(slot) = self.computes.get(id).await else {
            return;
        };

        self.cleanup(id).await;

        if self.computes.remove(&slot).await {
            let remaining = self.computes.len().await;
            tracing::info!("Removed compute {id}. Remaining computes: {remaining}");
            self.events.publish(ComputeEvent::ComputeRemoved {
                compute_id: id.to_string(),
            });
        }
    }

    /// Create a remote session for a compute.
    ///
    /// On success the compute becomes `Ready` and records the config and
    /// the rooms the server allocated.
    ///
    /// # Errors
    /// Returns error if the compute does not exist or the server call fails.
    /// On failure the compute is left untouched.
    pub async fn create_session(
        &self,
        compute_id: &str,
        config: SessionConfig,
    ) -> Result<SessionData, SessionError> {
        let slot = self.slot(compute_id).await?;
        let _op = slot.lock_ops().await;

        let request = CreateSessionRequest::from(&config);
        let data = self
            .client
            .create_session(&request)
            .await
            .map_err(|e| remote_failure(compute_id, "create session", e))?;

        let session_id = config.session_id.clone();
        let from = {
            let mut entity = slot.state.write().await;
            if let Some(previous) = entity.session_id.as_deref() {
                tracing::warn!(
                    "Compute {compute_id} replaced session {previous}; it may still be live remotely"
                );
            }
            let from = entity.status;
            entity.attach_session(config, data.clone());
            from
        };

        self.events.publish(ComputeEvent::SessionCreated {
            compute_id: compute_id.to_string(),
            session_id,
        });
        self.status_changed(compute_id, from, ComputeStatus::Ready);

        Ok(data)
    }

    /// Start inference on a compute's session.
    ///
    /// # Errors
    /// Returns error if there is no session or the server call fails.
    pub async fn start_session(&self, compute_id: &str) -> Result<(), SessionError> {
        let slot = self.slot(compute_id).await?;
        let _op = slot.lock_ops().await;
        let session_id = session_of(&slot, "start").await?;

        self.client
            .start_inference(&session_id)
            .await
            .map_err(|e| remote_failure(compute_id, "start session", e))?;

        self.set_status(&slot, ComputeStatus::Running).await;
        Ok(())
    }

    /// Stop inference on a compute's session.
    ///
    /// # Errors
    /// Returns error if there is no session or the server call fails.
    pub async fn stop_session(&self, compute_id: &str) -> Result<(), SessionError> {
        let slot = self.slot(compute_id).await?;
        let _op = slot.lock_ops().await;
        let session_id = session_of(&slot, "stop").await?;

        self.client
            .stop_inference(&session_id)
            .await
            .map_err(|e| remote_failure(compute_id, "stop session", e))?;

        self.set_status(&slot, ComputeStatus::Stopped).await;
        Ok(())
    }

    /// Delete a compute's session and return it to `Disconnected`.
    ///
    /// Deleting when there is no session (or no such compute) succeeds
    /// without calling the server.
    ///
    /// # Errors
    /// Returns error if the server call fails; the compute is left untouched.
    pub async fn delete_session(&self, compute_id: &str) -> Result<(), SessionError> {
        let Some(slot) = self.computes.get(compute_id).await else {
            return Ok(());
        };
        let _op = slot.lock_ops().await;
        let Some(session_id) = slot.state.read().await.session_id.clone() else {
            return Ok(());
        };

        self.client
            .delete_session(&session_id)
            .await
            .map_err(|e| remote_failure(compute_id, "delete session", e))?;

        let from = {
            let mut entity = slot.state.write().await;
            let from = entity.status;
            entity.clear_session();
            from
        };

        self.events.publish(ComputeEvent::SessionDeleted {
            compute_id: compute_id.to_string(),
            session_id,
        });
        self.status_changed(compute_id, from, ComputeStatus::Disconnected);

        Ok(())
    }

    /// Query the server for a session's state.
    ///
    /// The server is authoritative: the compute takes whatever status it
    /// reports, even one that moves the local state machine backwards.
    ///
    /// # Errors
    /// Returns error if there is no session or the server call fails.
    pub async fn get_session_status(
        &self,
        compute_id: &str,
    ) -> Result<SessionStatusSnapshot, SessionError> {
        let slot = self.slot(compute_id).await?;
        let _op = slot.lock_ops().await;
        let session_id = session_of(&slot, "query").await?;

        let snapshot = self
            .client
            .get_session_status(&session_id)
            .await
            .map_err(|e| remote_failure(compute_id, "get session status", e))?
            .normalized();

        self.set_status(&slot, snapshot.status).await;
        Ok(snapshot)
    }

    /// Check the inference server's health.
    ///
    /// Detailed health is only requested once the availability probe
    /// reports the server up.
    ///
    /// # Errors
    /// Returns error if the server is down or either call fails.
    pub async fn check_server_health(&self) -> Result<HealthInfo, SessionError> {
        let healthy = self.client.is_healthy().await.map_err(|e| {
            tracing::error!("Failed to check inference server health: {e}");
            SessionError::Remote(e)
        })?;
        if !healthy {
            tracing::warn!("Inference server is not healthy");
            return Err(SessionError::Unhealthy);
        }

        self.client.get_health().await.map_err(|e| {
            tracing::error!("Failed to fetch inference server health: {e}");
            SessionError::Remote(e)
        })
    }

    /// Tear down every compute.
    ///
    /// Cleans up all sessions concurrently, waits for every cleanup to
    /// settle, then empties the collection. Never fails; computes whose
    /// session could not be confirmed deleted are listed in the report.
    pub async fn destroy(&self) -> TeardownReport {
        let ids = self.computes.ids().await;

        let outcomes = join_all(ids.iter().map(|id| async move {
            let clean = self.cleanup(id).await;
            (id, clean)
        }))
        .await;

        let failed: Vec<ComputeId> = outcomes
            .into_iter()
            .filter(|(_, clean)| !clean)
            .map(|(id, _)| id.clone())
            .collect();
        let removed = self.computes.clear().await;

        if failed.is_empty() {
            tracing::info!("Destroyed {removed} computes");
        } else {
            tracing::warn!(
                "Destroyed {removed} computes; {} sessions could not be confirmed deleted: {}",
                failed.len(),
                failed.join(", ")
            );
        }
        self.events.publish(ComputeEvent::ManagerCleared {
            removed,
            failed: failed.len(),
        });

        TeardownReport { removed, failed }
    }

    /// Best-effort stop then delete. Returns whether no session is left.
    async fn cleanup(&self, compute_id: &str) -> bool {
        match self.stop_session(compute_id).await {
            Ok(()) | Err(SessionError::NoSession { .. } | SessionError::ComputeNotFound(_)) => {}
            Err(e) => self.cleanup_failed(compute_id, CleanupOperation::Stop, &e),
        }

        match self.delete_session(compute_id).await {
            Ok(()) => true,
            Err(e) => {
                self.cleanup_failed(compute_id, CleanupOperation::Delete, &e);
                false
            }
        }
    }

    fn cleanup_failed(&self, compute_id: &str, operation: CleanupOperation, error: &SessionError) {
        tracing::warn!("Cleanup of compute {compute_id} failed during {operation:?}: {error}");
        self.events.publish(ComputeEvent::CleanupFailed {
            compute_id: compute_id.to_string(),
            operation,
            error: error.to_string(),
        });
    }

    async fn slot(&self, compute_id: &str) -> Result<Arc<ComputeSlot>, SessionError> {
        self.computes
            .get(compute_id)
            .await
            .ok_or_else(|| SessionError::ComputeNotFound(compute_id.to_string()))
    }

    async fn set_status(&self, slot: &ComputeSlot, status: ComputeStatus) {
        let from = std::mem::replace(&mut slot.state.write().await.status, status);
        self.status_changed(&slot.id, from, status);
    }

    fn status_changed(&self, compute_id: &str, from: ComputeStatus, to: ComputeStatus) {
        if from == to {
            return;
        }
        tracing::info!("Compute {compute_id}: {from} -> {to}");
        self.events.publish(ComputeEvent::StatusChanged {
            compute_id: compute_id.to_string(),
            from,
            to,
        });
    }
}

async fn session_of(slot: &ComputeSlot, action: &'static str) -> Result<String, SessionError> {
    slot.state
        .read()
        .await
        .session_id
        .clone()
        .ok_or_else(|| SessionError::NoSession {
            compute_id: slot.id.clone(),
            action,
        })
}

fn remote_failure(compute_id: &str, action: &str, error: ClientError) -> SessionError {
    tracing::error!("Failed to {action} for compute {compute_id}: {error}");
    SessionError::Remote(error)
}
