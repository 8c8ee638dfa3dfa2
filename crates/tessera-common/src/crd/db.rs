//! TesseraDB Custom Resource Definition
//!
//! A TesseraDB describes one sharded analytical database: its subclusters,
//! optional sandboxes, storage locations and the TLS settings of its two
//! trust domains. The status is written only by the reconciler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::sandbox::Sandbox;
use super::storage::{CommunalStorage, LocalStorage};
use super::subcluster::{Subcluster, SubclusterType, TemporarySubclusterRouting};
use super::tls::{TlsConfigSpec, TlsDomain};
use super::types::{
    Condition, InitPolicy, PodSecurityContext, ProbeOverride, Sidecar, UpgradePolicy,
};
use crate::annotations::DbAnnotations;

/// Literal enabling encryption of spread traffic
pub const ENCRYPT_SPREAD_COMM_VERTICA: &str = "vertica";
/// Literal explicitly disabling encryption of spread traffic
pub const ENCRYPT_SPREAD_COMM_DISABLED: &str = "disabled";

/// Specification for a TesseraDB
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "tessera.dev",
    version = "v1",
    kind = "TesseraDB",
    plural = "tesseradbs",
    shortname = "tdb",
    status = "TesseraDBStatus",
    namespaced,
    derive = "PartialEq",
    derive = "Default",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Database","type":"string","jsonPath":".spec.dbName"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TesseraDBSpec {
    /// Server image
    #[serde(default)]
    pub image: String,

    /// Database name
    #[serde(default)]
    pub db_name: String,

    /// Number of shards; fixed once the database exists
    #[serde(default)]
    pub shard_count: i32,

    /// How the database is brought up the first time
    #[serde(default)]
    pub init_policy: InitPolicy,

    /// Requested upgrade strategy
    #[serde(default)]
    pub upgrade_policy: UpgradePolicy,

    /// Shared object storage
    #[serde(default)]
    pub communal: CommunalStorage,

    /// Per-pod storage
    #[serde(default)]
    pub local: LocalStorage,

    /// Subclusters, in order
    #[serde(default)]
    pub subclusters: Vec<Subcluster>,

    /// Sandboxes, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sandboxes: Vec<Sandbox>,

    /// Traffic routing while subclusters restart during an upgrade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_subcluster_routing: Option<TemporarySubclusterRouting>,

    /// Secret holding the Kerberos keytab and krb5.conf
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_secret: String,

    /// Base certificate secret used before per-domain TLS is configured
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_secret: String,

    /// TLS for internal HTTPS control traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_tls: Option<TlsConfigSpec>,

    /// TLS for client to server traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_server_tls: Option<TlsConfigSpec>,

    /// Spread encryption: `vertica`, `disabled`, or unset for the server default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_spread_comm: Option<String>,

    /// Security context applied to every pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_context: Option<PodSecurityContext>,

    /// Override of the server readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe_override: Option<ProbeOverride>,

    /// Override of the server liveness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe_override: Option<ProbeOverride>,

    /// Override of the server startup probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_probe_override: Option<ProbeOverride>,

    /// Extra containers run beside the server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidecars: Vec<Sidecar>,

    /// Labels added to every generated object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl TesseraDBSpec {
    /// TLS block of a trust domain
    pub fn tls(&self, domain: TlsDomain) -> Option<&TlsConfigSpec> {
        match domain {
            TlsDomain::Https => self.https_tls.as_ref(),
            TlsDomain::ClientServer => self.client_server_tls.as_ref(),
        }
    }

    /// Mutable TLS block of a trust domain
    pub fn tls_mut(&mut self, domain: TlsDomain) -> &mut Option<TlsConfigSpec> {
        match domain {
            TlsDomain::Https => &mut self.https_tls,
            TlsDomain::ClientServer => &mut self.client_server_tls,
        }
    }

    /// Returns true if any subcluster is secondary
    pub fn has_secondary_subclusters(&self) -> bool {
        self.subclusters.iter().any(|sc| sc.type_.is_secondary())
    }

    /// Returns true if the routing template asks for a transient subcluster
    pub fn requires_transient_subcluster(&self) -> bool {
        self.temporary_subcluster_routing
            .as_ref()
            .and_then(|r| r.template.as_ref())
            .is_some_and(|t| !t.name.is_empty() && t.size > 0)
    }

    /// Probe overrides with their spec field names
    pub fn probe_overrides(&self) -> [(&'static str, Option<&ProbeOverride>); 3] {
        [
            ("readinessProbeOverride", self.readiness_probe_override.as_ref()),
            ("livenessProbeOverride", self.liveness_probe_override.as_ref()),
            ("startupProbeOverride", self.startup_probe_override.as_ref()),
        ]
    }
}

impl TesseraDB {
    /// Typed view over `metadata.annotations`
    pub fn db_annotations(&self) -> DbAnnotations<'_> {
        DbAnnotations::new(self.metadata.annotations.as_ref())
    }

    /// Object name, empty when unset
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of one subcluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterStatus {
    /// Subcluster name
    pub name: String,

    /// Nodes currently up
    #[serde(default)]
    pub up_node_count: i32,

    /// Nodes that have been added to the database
    #[serde(default, rename = "addedToDBCount")]
    pub added_to_db_count: i32,

    /// Subcluster is currently shut down
    #[serde(default)]
    pub shutdown: bool,

    /// Effective type as seen by the database
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<SubclusterType>,
}

/// Observed state of one sandbox
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SandboxStatus {
    /// Sandbox name
    pub name: String,

    /// Member subclusters currently sandboxed
    #[serde(default)]
    pub subclusters: Vec<String>,

    /// Progress of an upgrade running in the sandbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_state: Option<String>,
}

/// Observed TLS state of one trust domain
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfigStatus {
    /// Trust domain name (`httpsTLS` or `clientServerTLS`)
    pub name: String,

    /// Secret currently installed
    #[serde(default)]
    pub secret: String,

    /// Mode currently in effect
    #[serde(default)]
    pub mode: String,

    /// Time of the last rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rotation: Option<DateTime<Utc>>,

    /// Time of the next scheduled rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rotation: Option<DateTime<Utc>>,
}

/// Status for a TesseraDB
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TesseraDBStatus {
    /// Per-subcluster observed state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclusters: Vec<SubclusterStatus>,

    /// Per-sandbox observed state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sandboxes: Vec<SandboxStatus>,

    /// Per-trust-domain observed TLS state
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "tlsConfigs")]
    pub tls_configs: Vec<TlsConfigStatus>,

    /// Conditions reported by the reconciler
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl TesseraDBStatus {
    /// Returns true if the named condition is present with status True
    pub fn is_condition_true(&self, type_: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == type_ && c.is_true())
    }

    /// Observed TLS state of a trust domain
    pub fn tls_config(&self, domain: TlsDomain) -> Option<&TlsConfigStatus> {
        self.tls_configs
            .iter()
            .find(|t| t.name == domain.status_name())
    }

    /// Secret in use by a trust domain, if any
    pub fn tls_secret_in_use(&self, domain: TlsDomain) -> Option<&str> {
        self.tls_config(domain)
            .map(|t| t.secret.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Set a condition, replacing any existing one of the same type
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.retain(|c| c.type_ != condition.type_);
        self.conditions.push(condition);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::types::{ConditionStatus, CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS};
    use kube::CustomResourceExt;

    fn sample_yaml() -> &'static str {
        r#"
apiVersion: tessera.dev/v1
kind: TesseraDB
metadata:
  name: analytics
  annotations:
    tessera.dev/version: v24.4.0
spec:
  image: tessera/server:24.4.0
  dbName: analytics
  shardCount: 6
  communal:
    path: s3://bucket/analytics
    endpoint: https://s3.amazonaws.com
  subclusters:
    - name: main
      size: 3
    - name: reporting
      size: 2
      type: secondary
  httpsTls:
    secret: https-cert
    mode: VERIFY_CA
"#
    }

    // ==========================================================================
    // Story Tests: Reading a TesseraDB
    // ==========================================================================

    /// Story: A user manifest deserializes with every omitted field defaulted
    #[test]
    fn story_manifest_deserializes_with_defaults() {
        let db: TesseraDB = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(db.name(), "analytics");
        assert_eq!(db.spec.init_policy, InitPolicy::Create);
        assert_eq!(db.spec.upgrade_policy, UpgradePolicy::Auto);
        assert_eq!(db.spec.local.data_path, "/data");
        assert!(db.spec.subclusters[0].type_.is_primary());
        assert!(db.spec.has_secondary_subclusters());
        assert_eq!(db.db_annotations().version(), Some("v24.4.0"));
        assert_eq!(
            db.spec.tls(TlsDomain::Https).map(|t| t.mode.as_str()),
            Some("VERIFY_CA")
        );
        assert!(db.spec.tls(TlsDomain::ClientServer).is_none());
        assert!(db.status.is_none());
    }

    /// Story: The reconciler's conditions are read, never written, by admission
    #[test]
    fn story_status_conditions_and_tls_lookup() {
        let status = TesseraDBStatus {
            tls_configs: vec![TlsConfigStatus {
                name: "httpsTLS".to_string(),
                secret: "https-cert".to_string(),
                mode: "verify_ca".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
        .with_condition(Condition::new(
            CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS,
            ConditionStatus::True,
            "Rotating",
            "",
        ));

        assert!(status.is_condition_true(CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS));
        assert!(!status.is_condition_true("DBInitialized"));
        assert_eq!(status.tls_secret_in_use(TlsDomain::Https), Some("https-cert"));
        assert_eq!(status.tls_secret_in_use(TlsDomain::ClientServer), None);

        let status = status.with_condition(Condition::new(
            CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS,
            ConditionStatus::False,
            "Done",
            "",
        ));
        assert_eq!(status.conditions.len(), 1);
        assert!(!status.is_condition_true(CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS));
    }

    #[test]
    fn test_status_wire_names() {
        let status = SubclusterStatus {
            name: "main".to_string(),
            added_to_db_count: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["addedToDBCount"], 3);
        assert_eq!(json["upNodeCount"], 0);
    }

    #[test]
    fn test_crd_metadata() {
        let crd = TesseraDB::crd();
        assert_eq!(crd.spec.group, "tessera.dev");
        assert_eq!(crd.spec.names.kind, "TesseraDB");
        assert_eq!(crd.spec.names.plural, "tesseradbs");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn test_requires_transient_subcluster() {
        let mut spec = TesseraDBSpec::default();
        assert!(!spec.requires_transient_subcluster());
        spec.temporary_subcluster_routing = Some(TemporarySubclusterRouting {
            names: vec![],
            template: Some(crate::crd::subcluster::SubclusterTemplate {
                name: "transient".to_string(),
                size: 1,
                type_: None,
            }),
        });
        assert!(spec.requires_transient_subcluster());
    }
}
