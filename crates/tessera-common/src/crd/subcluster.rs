//! Subclusters: independently sized compute groups of a TesseraDB

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::canonical_name;
use super::types::ServiceType;
use crate::annotations;

string_enum! {
    /// Role of a subcluster
    ///
    /// Literals are case-sensitive. `"Primary"` is not a primary subcluster,
    /// it is an unknown type that validation rejects.
    pub enum SubclusterType {
        /// Holds catalog authority and counts toward k-safety
        Primary => "primary",
        /// Read scale-out
        Secondary => "secondary",
        /// Primary of a sandbox; was a secondary before entering it
        SandboxPrimary => "sandboxprimary",
        /// Short-lived subcluster created from the routing template during upgrades
        Transient => "transient",
    }
    default = Primary;
}

impl SubclusterType {
    /// Returns true for `primary`
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary)
    }

    /// Returns true for `secondary`
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Secondary)
    }

    /// Returns true for `sandboxprimary`
    pub fn is_sandbox_primary(&self) -> bool {
        matches!(self, Self::SandboxPrimary)
    }

    /// Returns true for `transient`
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Resource requests and limits of the proxy container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ProxyResources {
    /// Minimum resources, e.g. `cpu: 100m`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,

    /// Maximum resources
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl ProxyResources {
    /// Returns true if no request or limit is set
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

/// Client proxy deployed in front of a subcluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ProxySpec {
    /// Number of proxy pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Proxy container resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ProxyResources>,
}

/// Replica count given to a proxy when none is set
pub const DEFAULT_PROXY_REPLICAS: i32 = 1;

impl ProxySpec {
    /// Returns true if every field is unset or holds its default
    pub fn holds_only_defaults(&self) -> bool {
        matches!(self.replicas, None | Some(DEFAULT_PROXY_REPLICAS))
            && self.resources.as_ref().is_none_or(ProxyResources::is_empty)
    }
}

/// A named compute group
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subcluster {
    /// Subcluster name; `_` is allowed and maps to `-` in object names
    pub name: String,

    /// Number of nodes
    #[serde(default)]
    pub size: i32,

    /// Role of the subcluster
    #[serde(default, rename = "type")]
    pub type_: SubclusterType,

    /// Stop every node of the subcluster
    #[serde(default)]
    pub shutdown: bool,

    /// Client proxy settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySpec>,

    /// Name of the client service; defaults to the canonical subcluster name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Kubernetes type of the client service
    #[serde(default)]
    pub service_type: ServiceType,

    /// Node port for client connections; 0 means assigned by Kubernetes
    #[serde(default)]
    pub client_node_port: i32,

    /// Node port for the HTTPS interface; 0 means assigned by Kubernetes
    #[serde(default)]
    pub http_node_port: i32,

    /// External IPs of the client service
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "externalIPs")]
    pub external_ips: Vec<String>,

    /// Static IP requested from the load balancer
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "loadBalancerIP")]
    pub load_balancer_ip: String,

    /// Annotations copied onto the client service
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_annotations: BTreeMap<String, String>,

    /// Subcluster-scoped annotations (replica group, statefulset name override)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Subcluster {
    /// Name with `_` replaced by `-`, as used for Kubernetes object names
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }

    /// Service name, falling back to the canonical subcluster name
    pub fn effective_service_name(&self) -> String {
        match &self.service_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.canonical_name(),
        }
    }

    /// User-chosen StatefulSet name, if any
    pub fn statefulset_name_override(&self) -> Option<&str> {
        self.annotations
            .get(annotations::STATEFULSET_NAME_OVERRIDE)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Replica group this subcluster joins during an upgrade, if marked
    pub fn replica_group(&self) -> Option<&str> {
        self.annotations
            .get(annotations::REPLICA_GROUP)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Shape of the transient subcluster created during upgrades
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterTemplate {
    /// Name given to the transient subcluster
    #[serde(default)]
    pub name: String,

    /// Number of nodes
    #[serde(default)]
    pub size: i32,

    /// Role; must be secondary, defaulted when unset
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<SubclusterType>,
}

/// Where client traffic goes while subclusters restart during an upgrade
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporarySubclusterRouting {
    /// Existing subclusters to route to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Transient subcluster to create and route to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<SubclusterTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subcluster(name: &str) -> Subcluster {
        Subcluster {
            name: name.to_string(),
            size: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_type_is_case_sensitive() {
        let sc: Subcluster = serde_json::from_str(r#"{"name":"a","type":"Primary"}"#).unwrap();
        assert_eq!(sc.type_, SubclusterType::Other("Primary".to_string()));
        assert!(!sc.type_.is_primary());

        let sc: Subcluster = serde_json::from_str(r#"{"name":"a"}"#).unwrap();
        assert!(sc.type_.is_primary());
    }

    #[test]
    fn test_service_name_falls_back_to_canonical_name() {
        let mut sc = subcluster("default_subcluster");
        assert_eq!(sc.canonical_name(), "default-subcluster");
        assert_eq!(sc.effective_service_name(), "default-subcluster");

        sc.service_name = Some("shared".to_string());
        assert_eq!(sc.effective_service_name(), "shared");
    }

    #[test]
    fn test_subcluster_annotations() {
        let mut sc = subcluster("sc1");
        assert_eq!(sc.statefulset_name_override(), None);
        sc.annotations.insert(
            annotations::STATEFULSET_NAME_OVERRIDE.to_string(),
            "custom-sts".to_string(),
        );
        sc.annotations
            .insert(annotations::REPLICA_GROUP.to_string(), "b".to_string());
        assert_eq!(sc.statefulset_name_override(), Some("custom-sts"));
        assert_eq!(sc.replica_group(), Some("b"));
    }

    #[test]
    fn test_proxy_default_detection() {
        assert!(ProxySpec::default().holds_only_defaults());
        let proxy = ProxySpec {
            replicas: Some(1),
            resources: Some(ProxyResources::default()),
        };
        assert!(proxy.holds_only_defaults());
        let proxy = ProxySpec {
            replicas: Some(2),
            resources: None,
        };
        assert!(!proxy.holds_only_defaults());
    }
}
