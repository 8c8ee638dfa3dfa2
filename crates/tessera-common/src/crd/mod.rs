//! Custom Resource Definitions for Tessera
//!
//! This module contains the TesseraDB CRD and the naming helpers shared by
//! the defaulting and validation code.

#[macro_use]
mod macros;

mod db;
mod sandbox;
mod storage;
mod subcluster;
mod tls;
mod types;

pub use db::{
    SandboxStatus, SubclusterStatus, TesseraDB, TesseraDBSpec, TesseraDBStatus, TlsConfigStatus,
    ENCRYPT_SPREAD_COMM_DISABLED, ENCRYPT_SPREAD_COMM_VERTICA,
};
pub use sandbox::{Sandbox, SandboxMemberType, SandboxSubcluster};
pub use storage::{
    CommunalStorage, LocalStorage, DEFAULT_GCLOUD_ENDPOINT, DEFAULT_GCLOUD_REGION,
    DEFAULT_S3_REGION, GCLOUD_PREFIX, S3_PREFIX, SSE_KMS_KEY_ID,
};
pub use subcluster::{
    ProxyResources, ProxySpec, Subcluster, SubclusterTemplate, SubclusterType,
    TemporarySubclusterRouting, DEFAULT_PROXY_REPLICAS,
};
pub use tls::{AutoRotate, TlsConfigSpec, TlsDomain, TlsMode, TlsModeKind, DEFAULT_TLS_MODE};
pub use types::{
    Condition, ConditionStatus, DepotVolume, ExecAction, HttpGetAction, InitPolicy,
    PodSecurityContext, PortAction, ProbeOverride, ServiceType, Sidecar, SseMode, UpgradePolicy,
    CONDITION_DB_INITIALIZED, CONDITION_ONLINE_UPGRADE_IN_PROGRESS,
    CONDITION_TLS_CERT_ROLLBACK_IN_PROGRESS, CONDITION_TLS_CERT_ROLLBACK_NEEDED,
    CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS, CONDITION_UPGRADE_IN_PROGRESS,
};

// =============================================================================

/// Maximum length of a DNS label
pub const DNS_LABEL_MAX_LEN: usize = 63;

/// Maximum length of a DNS subdomain
pub const DNS_SUBDOMAIN_MAX_LEN: usize = 253;

/// Map a user-facing name to the form used in Kubernetes object names
///
/// `default_subcluster` and `default-subcluster` share the canonical name
/// `default-subcluster` and therefore collide.
pub fn canonical_name(name: &str) -> String {
    name.replace('_', "-")
}

/// Validate a DNS-1123 label: lowercase alphanumerics and `-`, starting and
/// ending with an alphanumeric, at most 63 characters.
pub fn validate_dns1123_label(s: &str) -> Result<(), String> {
    validate_label(s, |c| c.is_ascii_lowercase() || c.is_ascii_digit(), "alphanumeric character")
}

/// Validate a DNS-1035 label: like DNS-1123 but must start with a letter.
pub fn validate_dns1035_label(s: &str) -> Result<(), String> {
    validate_label(s, |c| c.is_ascii_lowercase(), "lowercase letter")
}

/// Validate a DNS-1123 subdomain: dot-separated DNS-1123 labels, at most
/// 253 characters in total.
pub fn validate_dns1123_subdomain(s: &str) -> Result<(), String> {
    if s.len() > DNS_SUBDOMAIN_MAX_LEN {
        return Err(format!(
            "must be no more than {} characters",
            DNS_SUBDOMAIN_MAX_LEN
        ));
    }
    s.split('.').try_for_each(validate_dns1123_label)
}

fn validate_label(s: &str, first_ok: fn(char) -> bool, first_desc: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.len() > DNS_LABEL_MAX_LEN {
        return Err(format!("must be no more than {} characters", DNS_LABEL_MAX_LEN));
    }

    let mut chars = s.chars();
    match chars.next() {
        Some(c) if first_ok(c) => {}
        _ => return Err(format!("must start with a {}: {}", first_desc, s)),
    }

    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return Err(format!(
                "must consist of lowercase alphanumeric characters or '-', got '{}' in {}",
                c, s
            ));
        }
    }

    if s.ends_with('-') {
        return Err(format!("must end with an alphanumeric character: {}", s));
    }

    Ok(())
}
