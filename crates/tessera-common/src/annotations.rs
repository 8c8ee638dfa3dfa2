//! Typed access to the TesseraDB annotation bag
//!
//! Annotations are a loosely-typed side channel for settings that have not
//! earned a spec field: the server version, k-safety mode, timeouts and
//! feature flags. Every key is read through one accessor on [`DbAnnotations`]
//! that documents its parse rule and default, so rule code never looks up
//! raw map entries.
//!
//! Parse rules shared by all accessors:
//! - booleans accept `true`/`1` and `false`/`0` (case-insensitive); anything
//!   else yields the default
//! - timeouts parse as signed seconds and are only inspected for negative
//!   values; an absent or unparsable value is skipped

use std::collections::BTreeMap;

/// Server version in `vMAJOR.MINOR.PATCH[-HOTFIX]` form, written by the reconciler
pub const VERSION: &str = "tessera.dev/version";
/// K-safety mode: `"0"` or `"1"` (default `"1"`)
pub const K_SAFETY: &str = "tessera.dev/k-safety";
/// Count only non-sandbox primaries toward k-safety (default false)
pub const STRICT_K_SAFETY_CHECK: &str = "tessera.dev/strict-k-safety-check";
/// Seconds between reconcile requeues (default 0, meaning exponential backoff)
pub const REQUEUE_TIME: &str = "tessera.dev/requeue-time";
/// Seconds between requeues while an upgrade runs (default 30)
pub const UPGRADE_REQUEUE_TIME: &str = "tessera.dev/upgrade-requeue-time";
/// Seconds to wait for a node restart (default 0, meaning the server default)
pub const RESTART_TIMEOUT: &str = "tessera.dev/restart-timeout";
/// Seconds to wait for database creation (default 0, meaning the server default)
pub const CREATEDB_TIMEOUT: &str = "tessera.dev/createdb-timeout";
/// Deploy a client proxy in front of each subcluster (default false)
pub const USE_PROXY: &str = "tessera.dev/use-proxy";
/// Mutual TLS authentication has been enabled (default false)
pub const ENABLE_TLS_AUTH: &str = "tessera.dev/enable-tls-auth";
/// Name of the sandbox created for the in-flight online upgrade
pub const ONLINE_UPGRADE_SANDBOX: &str = "tessera.dev/online-upgrade-sandbox";

/// Subcluster annotation marking the replica group a new subcluster joins during an upgrade
pub const REPLICA_GROUP: &str = "tessera.dev/replica-group";
/// Subcluster annotation overriding the name of its underlying StatefulSet
pub const STATEFULSET_NAME_OVERRIDE: &str = "tessera.dev/statefulset-name-override";

/// Annotations holding a number of seconds; each must be non-negative
pub const TIMEOUT_KEYS: [&str; 4] = [
    REQUEUE_TIME,
    UPGRADE_REQUEUE_TIME,
    RESTART_TIMEOUT,
    CREATEDB_TIMEOUT,
];

/// Read-only typed view over a resource's annotations
#[derive(Clone, Copy, Debug, Default)]
pub struct DbAnnotations<'a> {
    bag: Option<&'a BTreeMap<String, String>>,
}

impl<'a> DbAnnotations<'a> {
    /// Wrap an annotation map (as found in `metadata.annotations`)
    pub fn new(bag: Option<&'a BTreeMap<String, String>>) -> Self {
        Self { bag }
    }

    /// Raw value of a key, if present
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.bag.and_then(|b| b.get(key)).map(String::as_str)
    }

    /// Server version string. `None` when absent.
    pub fn version(&self) -> Option<&'a str> {
        self.get(VERSION).filter(|v| !v.is_empty())
    }

    /// Raw k-safety value. Absent means `"1"`.
    pub fn k_safety(&self) -> &'a str {
        self.get(K_SAFETY).unwrap_or("1")
    }

    /// True when k-safety is explicitly disabled (`"0"`)
    pub fn is_k_safety_0(&self) -> bool {
        self.k_safety() == "0"
    }

    /// Strict k-safety counting. Default false.
    pub fn strict_k_safety_check(&self) -> bool {
        self.bool_or(STRICT_K_SAFETY_CHECK, false)
    }

    /// Client proxy enabled. Default false.
    pub fn use_proxy(&self) -> bool {
        self.bool_or(USE_PROXY, false)
    }

    /// Mutual TLS authentication enabled. Default false.
    pub fn enable_tls_auth(&self) -> bool {
        self.bool_or(ENABLE_TLS_AUTH, false)
    }

    /// Sandbox reserved for the in-flight online upgrade, if any
    pub fn online_upgrade_sandbox(&self) -> Option<&'a str> {
        self.get(ONLINE_UPGRADE_SANDBOX).filter(|v| !v.is_empty())
    }

    /// Timeout annotations whose value is present but negative
    pub fn negative_timeouts(&self) -> Vec<(&'static str, i64)> {
        TIMEOUT_KEYS
            .iter()
            .filter_map(|key| {
                let value = self.get(key)?.trim().parse::<i64>().ok()?;
                (value < 0).then_some((*key, value))
            })
            .collect()
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            _ => default,
        }
    }
}
