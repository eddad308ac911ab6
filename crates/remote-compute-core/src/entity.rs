//! Compute entities and the session data they mirror.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of a compute entity within a manager.
pub type ComputeId = String;

/// Lifecycle status of a compute entity's session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeStatus {
    /// No remote session exists.
    #[default]
    Disconnected,
    /// The remote session is loading its policy.
    Initializing,
    /// Session created and ready to run inference.
    Ready,
    /// Inference is running.
    Running,
    /// Inference was stopped; the session still exists.
    Stopped,
}

impl ComputeStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ComputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in 3-D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Configuration used to create a remote session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session identifier requested from the inference server.
    pub session_id: String,
    /// Policy to load (hub path or local path on the server).
    pub policy_path: String,
    /// Cameras the policy consumes, one room per camera.
    pub camera_names: Vec<String>,
    /// Endpoint of the transport server the session streams through.
    pub transport_server_url: String,
    /// Existing workspace to join; the server allocates one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl SessionConfig {
    /// Create a config without a preset workspace.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        policy_path: impl Into<String>,
        camera_names: Vec<String>,
        transport_server_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            policy_path: policy_path.into(),
            camera_names,
            transport_server_url: transport_server_url.into(),
            workspace_id: None,
        }
    }

    /// Join an existing workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }
}

/// Remote resources assigned to a session at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub workspace_id: String,
    /// Camera name to room identifier.
    pub camera_room_ids: HashMap<String, String>,
    pub joint_input_room_id: String,
    pub joint_output_room_id: String,
}

/// Body of a create-session call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: String,
    pub policy_path: String,
    pub camera_names: Vec<String>,
    pub arena_server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl From<&SessionConfig> for CreateSessionRequest {
    fn from(config: &SessionConfig) -> Self {
        Self {
            session_id: config.session_id.clone(),
            policy_path: config.policy_path.clone(),
            camera_names: config.camera_names.clone(),
            arena_server_url: config.transport_server_url.clone(),
            // An empty workspace id means "let the server pick".
            workspace_id: config.workspace_id.clone().filter(|w| !w.is_empty()),
        }
    }
}

/// Operational counters reported by a running session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub inference_count: u64,
    pub commands_sent: u64,
    pub joints_received: u64,
    /// Images received per camera.
    #[serde(default)]
    pub images_received: HashMap<String, u64>,
    pub errors: u64,
    pub actions_in_queue: u64,
}

/// Model performance figures, present once the policy is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub inference_count: u64,
    /// Seconds spent in inference in total.
    pub total_inference_time: f64,
    pub average_inference_time: f64,
    pub average_fps: f64,
    pub is_loaded: bool,
    /// Compute device the model runs on (e.g. `cuda`, `cpu`).
    pub device: String,
}

/// Point-in-time view of a remote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusSnapshot {
    pub session_id: String,
    pub status: ComputeStatus,
    pub policy_path: String,
    pub camera_names: Vec<String>,
    pub workspace_id: String,
    pub rooms: SessionData,
    pub stats: SessionStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_stats: Option<InferenceStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionStatusSnapshot {
    /// Drop an empty error message so callers only see real errors.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.error_message.as_deref().is_some_and(str::is_empty) {
            self.error_message = None;
        }
        self
    }
}

/// Detailed health report from the inference server.
///
/// Only `status` is interpreted; the rest is kept as reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInfo {
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Local handle to one remote inference session.
///
/// Lifecycle fields are only written by the manager; callers get clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeEntity {
    pub id: ComputeId,
    pub name: String,
    pub position: Position3D,
    pub status: ComputeStatus,
    pub session_id: Option<String>,
    pub session_config: Option<SessionConfig>,
    pub session_data: Option<SessionData>,
}

impl ComputeEntity {
    /// Create a disconnected entity. The name defaults to the id.
    #[must_use]
    pub fn new(id: impl Into<ComputeId>, name: Option<String>) -> Self {
        let id = id.into();
        Self {
            name: name.unwrap_or_else(|| id.clone()),
            id,
            position: Position3D::default(),
            status: ComputeStatus::Disconnected,
            session_id: None,
            session_config: None,
            session_data: None,
        }
    }

    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == ComputeStatus::Running
    }

    /// Record a freshly created session.
    pub fn attach_session(&mut self, config: SessionConfig, data: SessionData) {
        self.session_id = Some(config.session_id.clone());
        self.session_config = Some(config);
        self.session_data = Some(data);
        self.status = ComputeStatus::Ready;
    }

    /// Forget the session and return to `Disconnected`.
    pub fn clear_session(&mut self) {
        self.session_id = None;
        self.session_config = None;
        self.session_data = None;
        self.status = ComputeStatus::Disconnected;
    }
}

impl PartialEq for ComputeEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComputeEntity {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new("s1", "p", vec!["cam0".to_string()], "ws://x")
    }

    #[test]
    fn test_new_entity_is_disconnected() {
        let entity = ComputeEntity::new("robot-1", None);
        assert_eq!(entity.name, "robot-1");
        assert_eq!(entity.status, ComputeStatus::Disconnected);
        assert!(!entity.has_session());
        assert!(entity.session_config.is_none());
        assert!(entity.session_data.is_none());
    }

    #[test]
    fn test_equality_is_by_id() {
        let mut a = ComputeEntity::new("robot-1", Some("left arm".to_string()));
        let b = ComputeEntity::new("robot-1", None);
        a.status = ComputeStatus::Running;
        assert_eq!(a, b);
        assert_ne!(a, ComputeEntity::new("robot-2", None));
    }

    #[test]
    fn test_attach_and_clear_session() {
        let mut entity = ComputeEntity::new("robot-1", None);
        entity.attach_session(config(), SessionData::default());
        assert_eq!(entity.session_id.as_deref(), Some("s1"));
        assert_eq!(entity.status, ComputeStatus::Ready);

        entity.clear_session();
        assert!(entity.session_id.is_none());
        assert!(entity.session_config.is_none());
        assert!(entity.session_data.is_none());
        assert_eq!(entity.status, ComputeStatus::Disconnected);
    }

    #[test]
    fn test_request_from_config() {
        let request = CreateSessionRequest::from(&config().with_workspace(""));
        assert_eq!(request.arena_server_url, "ws://x");
        assert!(request.workspace_id.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("workspace_id").is_none());
        assert_eq!(json["camera_names"][0], "cam0");
    }

    #[test]
    fn test_snapshot_parses_server_payload() {
        let payload = serde_json::json!({
            "session_id": "s1",
            "status": "initializing",
            "policy_path": "p",
            "camera_names": ["cam0"],
            "workspace_id": "w",
            "rooms": {
                "workspace_id": "w",
                "camera_room_ids": {"cam0": "r0"},
                "joint_input_room_id": "ji",
                "joint_output_room_id": "jo"
            },
            "stats": {
                "inference_count": 3,
                "commands_sent": 2,
                "joints_received": 5,
                "images_received": {"cam0": 7},
                "errors": 0,
                "actions_in_queue": 1
            },
            "error_message": ""
        });

        let snapshot: SessionStatusSnapshot = serde_json::from_value(payload).unwrap();
        let snapshot = snapshot.normalized();
        assert_eq!(snapshot.status, ComputeStatus::Initializing);
        assert_eq!(snapshot.stats.images_received["cam0"], 7);
        assert!(snapshot.inference_stats.is_none());
        assert!(snapshot.error_message.is_none());
    }
}
