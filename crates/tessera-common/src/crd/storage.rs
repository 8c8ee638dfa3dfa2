//! Communal (object store) and local (per-pod) storage settings

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{DepotVolume, SseMode};

/// Path prefix selecting S3-compatible communal storage
pub const S3_PREFIX: &str = "s3://";
/// Path prefix selecting Google Cloud Storage
pub const GCLOUD_PREFIX: &str = "gs://";

/// Region used for S3 when none is given
pub const DEFAULT_S3_REGION: &str = "us-east-1";
/// Region used for Google Cloud Storage when none is given
pub const DEFAULT_GCLOUD_REGION: &str = "US-EAST1";
/// Endpoint used for Google Cloud Storage when none is given
pub const DEFAULT_GCLOUD_ENDPOINT: &str = "https://storage.googleapis.com";

/// Key in `additionalConfig` naming the KMS key for SSE-KMS
pub const SSE_KMS_KEY_ID: &str = "S3SseKmsKeyId";

/// Shared object storage holding the database
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommunalStorage {
    /// Location of the database, e.g. `s3://bucket/db`
    #[serde(default)]
    pub path: String,

    /// Object store endpoint including its `http://` or `https://` scheme
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    /// Secret holding the access credentials
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credential_secret: String,

    /// Object store region
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// S3 server-side encryption mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<SseMode>,

    /// Secret holding the customer key for SSE-C
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sse_customer_key_secret: String,

    /// Extra server configuration parameters applied at bootstrap
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_config: BTreeMap<String, String>,

    /// Kerberos realm used to reach HDFS
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_realm: String,

    /// Kerberos service principal name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_service_name: String,
}

impl CommunalStorage {
    /// Returns true if the path points at S3
    pub fn is_s3(&self) -> bool {
        self.path.starts_with(S3_PREFIX)
    }

    /// Returns true if the path points at Google Cloud Storage
    pub fn is_gcloud(&self) -> bool {
        self.path.starts_with(GCLOUD_PREFIX)
    }
}

/// Per-pod storage paths
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorage {
    /// Storage class of the per-pod persistent volume
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,

    /// Directory holding local data
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Directory holding the depot cache
    #[serde(default = "default_depot_path")]
    pub depot_path: String,

    /// Directory holding the catalog; `dataPath` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,

    /// Volume kind backing the depot
    #[serde(default)]
    pub depot_volume: DepotVolume,
}

fn default_data_path() -> String {
    "/data".to_string()
}

fn default_depot_path() -> String {
    "/depot".to_string()
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self {
            storage_class: String::new(),
            data_path: default_data_path(),
            depot_path: default_depot_path(),
            catalog_path: None,
            depot_volume: DepotVolume::default(),
        }
    }
}

impl LocalStorage {
    /// Effective catalog path
    pub fn effective_catalog_path(&self) -> &str {
        self.catalog_path.as_deref().unwrap_or(&self.data_path)
    }

    /// Returns true if the depot path differs from both data and catalog paths
    pub fn is_depot_path_unique(&self) -> bool {
        self.depot_path != self.data_path && self.depot_path != self.effective_catalog_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_communal_backend_detection() {
        let mut communal = CommunalStorage {
            path: "s3://bucket/db".to_string(),
            ..Default::default()
        };
        assert!(communal.is_s3());
        assert!(!communal.is_gcloud());

        communal.path = "gs://bucket/db".to_string();
        assert!(communal.is_gcloud());

        communal.path = "/mnt/communal".to_string();
        assert!(!communal.is_s3() && !communal.is_gcloud());
    }

    #[test]
    fn test_catalog_path_falls_back_to_data_path() {
        let mut local = LocalStorage::default();
        assert_eq!(local.effective_catalog_path(), "/data");
        assert!(local.is_depot_path_unique());

        local.catalog_path = Some("/catalog".to_string());
        assert_eq!(local.effective_catalog_path(), "/catalog");

        local.depot_path = "/catalog".to_string();
        assert!(!local.is_depot_path_unique());
    }

    #[test]
    fn test_local_storage_defaults_when_omitted() {
        let local: LocalStorage = serde_json::from_str("{}").unwrap();
        assert_eq!(local, LocalStorage::default());
    }
}
