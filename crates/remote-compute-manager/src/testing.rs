//! Scripted inference client for manager tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use remote_compute_core::{
    ClientError, ComputeStatus, CreateSessionRequest, HealthInfo, InferenceClient, SessionData,
    SessionStats, SessionStatusSnapshot,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Create,
    Start,
    Stop,
    Delete,
    Status,
    IsHealthy,
    Health,
}

/// A recorded client call and the session it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub session_id: Option<String>,
}

pub struct FakeClient {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<(CallKind, Option<String>)>>,
    gates: Mutex<HashMap<CallKind, Arc<Notify>>>,
    healthy: AtomicBool,
    remote_status: Mutex<ComputeStatus>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            healthy: AtomicBool::new(true),
            remote_status: Mutex::new(ComputeStatus::Ready),
        }
    }

    /// Fail every call of `kind`.
    pub fn fail(&self, kind: CallKind) {
        self.failures.lock().unwrap().insert((kind, None));
    }

    /// Fail calls of `kind` that target `session_id`.
    pub fn fail_for(&self, kind: CallKind, session_id: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((kind, Some(session_id.to_string())));
    }

    pub fn recover(&self, kind: CallKind) {
        self.failures.lock().unwrap().retain(|(k, _)| *k != kind);
    }

    /// Park calls of `kind` until the returned handle is notified.
    pub fn hold(&self, kind: CallKind) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(kind, Arc::clone(&gate));
        gate
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_remote_status(&self, status: ComputeStatus) {
        *self.remote_status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CallKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind == kind).count()
    }

    /// Yield until a call of `kind` has been made.
    pub async fn entered(&self, kind: CallKind) {
        while self.count(kind) == 0 {
            tokio::task::yield_now().await;
        }
    }

    async fn call(&self, kind: CallKind, session_id: Option<&str>) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call {
            kind,
            session_id: session_id.map(str::to_string),
        });

        let gate = self.gates.lock().unwrap().get(&kind).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failures = self.failures.lock().unwrap();
        let failing = failures.contains(&(kind, None))
            || session_id.is_some_and(|s| failures.contains(&(kind, Some(s.to_string()))));
        if failing {
            return Err(ClientError::Status {
                status: 500,
                body: format!("{kind:?} failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InferenceClient for FakeClient {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionData, ClientError> {
        self.call(CallKind::Create, Some(&request.session_id)).await?;
        Ok(SessionData {
            workspace_id: request
                .workspace_id
                .clone()
                .unwrap_or_else(|| "ws-1".to_string()),
            camera_room_ids: request
                .camera_names
                .iter()
                .map(|c| (c.clone(), format!("room-{c}")))
                .collect(),
            joint_input_room_id: "joints-in".to_string(),
            joint_output_room_id: "joints-out".to_string(),
        })
    }

    async fn start_inference(&self, session_id: &str) -> Result<(), ClientError> {
        self.call(CallKind::Start, Some(session_id)).await
    }

    async fn stop_inference(&self, session_id: &str) -> Result<(), ClientError> {
        self.call(CallKind::Stop, Some(session_id)).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.call(CallKind::Delete, Some(session_id)).await
    }

    async fn get_session_status(
        &self,
        session_id: &str,
    ) -> Result<SessionStatusSnapshot, ClientError> {
        self.call(CallKind::Status, Some(session_id)).await?;
        Ok(SessionStatusSnapshot {
            session_id: session_id.to_string(),
            status: *self.remote_status.lock().unwrap(),
            policy_path: "p".to_string(),
            camera_names: vec!["cam0".to_string()],
            workspace_id: "ws-1".to_string(),
            rooms: SessionData::default(),
            stats: SessionStats {
                inference_count: 4,
                ..SessionStats::default()
            },
            inference_stats: None,
            error_message: None,
        })
    }

    async fn is_healthy(&self) -> Result<bool, ClientError> {
        self.call(CallKind::IsHealthy, None).await?;
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn get_health(&self) -> Result<HealthInfo, ClientError> {
        self.call(CallKind::Health, None).await?;
        Ok(HealthInfo {
            status: "healthy".to_string(),
            ..HealthInfo::default()
        })
    }
}
