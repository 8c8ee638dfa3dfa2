//! Supporting types for the TesseraDB CRD

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

string_enum! {
    /// How the database is brought up the first time
    pub enum InitPolicy {
        /// Create a new database in communal storage
        Create => "Create",
        /// Create a new database without installing default packages
        CreateSkipPackageInstall => "CreateSkipPackageInstall",
        /// Revive an existing database from communal storage
        Revive => "Revive",
        /// Only schedule pods; the database is managed out of band
        ScheduleOnly => "ScheduleOnly",
    }
    default = Create;
}

impl InitPolicy {
    /// Returns true when the operator never touches database state
    pub fn is_schedule_only(&self) -> bool {
        matches!(self, Self::ScheduleOnly)
    }
}

string_enum! {
    /// Requested upgrade strategy when the image changes
    pub enum UpgradePolicy {
        /// Stop the whole cluster, swap the image, restart
        Offline => "Offline",
        /// Restart one subcluster at a time while routing around it
        Online => "Online",
        /// Upgrade a replicated sandbox copy, then promote it
        Replicated => "Replicated",
        /// Pick the best policy the running version supports
        Auto => "Auto",
    }
    default = Auto;
}

string_enum! {
    /// Kubernetes service type of a subcluster's client service
    pub enum ServiceType {
        /// Cluster-internal virtual IP
        ClusterIp => "ClusterIP",
        /// Exposed on a static port of every node
        NodePort => "NodePort",
        /// Exposed through a cloud load balancer
        LoadBalancer => "LoadBalancer",
        /// CNAME to an external DNS name
        ExternalName => "ExternalName",
    }
    default = ClusterIp;
}

impl ServiceType {
    /// Returns true if node ports may be set for this service type
    pub fn allows_node_port(&self) -> bool {
        matches!(self, Self::NodePort | Self::LoadBalancer)
    }
}

string_enum! {
    /// Server-side encryption applied to S3 communal storage
    pub enum SseMode {
        /// Keys managed by S3
        SseS3 => "SSE-S3",
        /// Keys managed by AWS KMS; requires a key id
        SseKms => "SSE-KMS",
        /// Customer-provided key; requires a key secret
        SseC => "SSE-C",
    }
    default = SseS3;
}

string_enum! {
    /// Volume kind backing the depot
    pub enum DepotVolume {
        /// Share the persistent volume with the data path
        PersistentVolume => "PersistentVolume",
        /// Node-local ephemeral storage
        EmptyDir => "EmptyDir",
    }
    default = PersistentVolume;
}

impl DepotVolume {
    /// Returns true if the depot does not survive a pod restart
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::EmptyDir)
    }
}

// =============================================================================
// Pod-level overrides
// =============================================================================

/// Subset of the pod security context that the database cares about
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    /// UID the server process runs as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,

    /// Group owning mounted volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_group: Option<i64>,
}

/// Command executed inside the container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ExecAction {
    /// Command line, first element is the executable
    #[serde(default)]
    pub command: Vec<String>,
}

/// HTTP GET against the container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetAction {
    /// Request path
    #[serde(default)]
    pub path: String,
    /// Target port
    pub port: i32,
    /// HTTP or HTTPS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// TCP connect or gRPC health check against a port
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PortAction {
    /// Target port
    pub port: i32,
}

/// User override of one of the server container probes
///
/// Unset fields keep the generated probe's value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOverride {
    /// Exec handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,
    /// HTTP GET handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetAction>,
    /// TCP socket handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<PortAction>,
    /// gRPC handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<PortAction>,
    /// Seconds before the first probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i32>,
    /// Seconds between probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,
    /// Seconds before a probe times out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    /// Consecutive failures before the probe is considered failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i32>,
}

impl ProbeOverride {
    /// Number of handler kinds set
    pub fn handler_count(&self) -> usize {
        [
            self.exec.is_some(),
            self.http_get.is_some(),
            self.tcp_socket.is_some(),
            self.grpc.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Extra container run beside the server in every pod
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Sidecar {
    /// Container name, unique within the pod
    pub name: String,
    /// Container image
    #[serde(default)]
    pub image: String,
}

// =============================================================================
// Conditions
// =============================================================================

/// Set once the database has been created or revived
pub const CONDITION_DB_INITIALIZED: &str = "DBInitialized";
/// Set while any upgrade is in progress
pub const CONDITION_UPGRADE_IN_PROGRESS: &str = "UpgradeInProgress";
/// Set while an online or replicated upgrade is in progress
pub const CONDITION_ONLINE_UPGRADE_IN_PROGRESS: &str = "OnlineUpgradeInProgress";
/// Set while a TLS certificate rotation is in progress
pub const CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS: &str = "TLSConfigUpdateInProgress";
/// Set when a rotation failed and must be rolled back
pub const CONDITION_TLS_CERT_ROLLBACK_NEEDED: &str = "TLSCertRollbackNeeded";
/// Set while a failed rotation is being rolled back
pub const CONDITION_TLS_CERT_ROLLBACK_IN_PROGRESS: &str = "TLSCertRollbackInProgress";

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition reported by the reconciler
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., DBInitialized)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Returns true if the condition status is True
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}
