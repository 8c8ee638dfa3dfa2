//! Server version parsing and feature gating
//!
//! The reconciler records the running server version in the
//! `tessera.dev/version` annotation. A missing or unparsable version never
//! fails admission on its own: every gate treats it as "feature unavailable"
//! and upgrade resolution falls back to offline. Only the dedicated format
//! rule in the static validator reports a malformed string.

use std::fmt;
use std::str::FromStr;

use tessera_common::crd::UpgradePolicy;
use tessera_common::DbAnnotations;

/// Comparable `vMAJOR.MINOR.PATCH[-HOTFIX]` version
///
/// A missing hotfix compares equal to hotfix 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
    /// Hotfix component
    pub hotfix: u32,
}

/// First version deploying the node agent as a sidecar instead of co-located
pub const SIDECAR_AGENT_MIN_VERSION: Version = Version::new(24, 2, 0, 0);
/// First version supporting per-domain TLS configuration
pub const TLS_CONFIG_MIN_VERSION: Version = Version::new(24, 4, 0, 0);
/// First version exposing HTTP health endpoints usable by probes
pub const HTTP_PROBE_MIN_VERSION: Version = Version::new(12, 0, 3, 0);
/// First version supporting online upgrades
pub const ONLINE_UPGRADE_MIN_VERSION: Version = Version::new(11, 1, 0, 0);
/// First version supporting replicated upgrades
pub const REPLICATED_UPGRADE_MIN_VERSION: Version = Version::new(24, 3, 0, 2);

impl Version {
    /// Build a version from its components
    pub const fn new(major: u32, minor: u32, patch: u32, hotfix: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            hotfix,
        }
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expected = || format!("version '{s}' is not in the form vMAJOR.MINOR.PATCH[-HOTFIX]");

        let rest = s.strip_prefix('v').ok_or_else(expected)?;
        let (core, hotfix) = match rest.split_once('-') {
            Some((core, hotfix)) => (core, Some(hotfix)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(expected());
        };

        let component = |p: &str| -> Result<u32, String> {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(expected());
            }
            p.parse::<u32>().map_err(|_| expected())
        };

        Ok(Self {
            major: component(*major)?,
            minor: component(*minor)?,
            patch: component(*patch)?,
            hotfix: hotfix.map(component).transpose()?.unwrap_or(0),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.hotfix > 0 {
            write!(f, "-{}", self.hotfix)?;
        }
        Ok(())
    }
}

/// Answers feature questions for one resource's recorded version
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionGate {
    version: Option<Version>,
}

impl VersionGate {
    /// Gate for a known (or unknown) version
    pub fn new(version: Option<Version>) -> Self {
        Self { version }
    }

    /// Gate from the version annotation; unparsable values count as unknown
    pub fn from_annotations(annotations: &DbAnnotations<'_>) -> Self {
        Self::new(annotations.version().and_then(|v| v.parse().ok()))
    }

    /// Parsed version, if known
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Returns true if the version is known and at least `min`
    pub fn is_at_least(&self, min: Version) -> bool {
        self.version.is_some_and(|v| v >= min)
    }

    /// Node agent runs as a sidecar container
    pub fn supports_sidecar_agent(&self) -> bool {
        self.is_at_least(SIDECAR_AGENT_MIN_VERSION)
    }

    /// Per-domain TLS blocks are honoured
    pub fn supports_tls_config(&self) -> bool {
        self.is_at_least(TLS_CONFIG_MIN_VERSION)
    }

    /// Probes may target the HTTP health endpoints
    pub fn supports_http_probes(&self) -> bool {
        self.is_at_least(HTTP_PROBE_MIN_VERSION)
    }

    /// Online upgrades are possible
    pub fn supports_online_upgrade(&self) -> bool {
        self.is_at_least(ONLINE_UPGRADE_MIN_VERSION)
    }

    /// Replicated upgrades are possible
    pub fn supports_replicated_upgrade(&self) -> bool {
        self.is_at_least(REPLICATED_UPGRADE_MIN_VERSION)
    }

    /// Upgrade policy that will actually be used for a request
    ///
    /// Precedence, first match wins:
    /// 1. an explicit `Offline` request
    /// 2. k-safety 0 forces `Offline`
    /// 3. `Replicated` when secondaries exist and the version allows it,
    ///    otherwise `Online` if supported
    /// 4. `Online` or `Auto` at or above the online minimum
    /// 5. `Offline`
    pub fn resolve_upgrade_policy(
        &self,
        requested: &UpgradePolicy,
        k_safety_0: bool,
        has_secondaries: bool,
    ) -> UpgradePolicy {
        if matches!(requested, UpgradePolicy::Offline) || k_safety_0 {
            return UpgradePolicy::Offline;
        }
        match requested {
            UpgradePolicy::Replicated if has_secondaries && self.supports_replicated_upgrade() => {
                UpgradePolicy::Replicated
            }
            UpgradePolicy::Replicated | UpgradePolicy::Online | UpgradePolicy::Auto
                if self.supports_online_upgrade() =>
            {
                UpgradePolicy::Online
            }
            _ => UpgradePolicy::Offline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn gate(s: &str) -> VersionGate {
        VersionGate::new(Some(v(s)))
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(v("v24.3.0-2"), Version::new(24, 3, 0, 2));
        assert_eq!(v("v12.0.3"), Version::new(12, 0, 3, 0));
        assert_eq!(v("v24.3.0-2").to_string(), "v24.3.0-2");
        assert_eq!(v("v11.1.0").to_string(), "v11.1.0");
    }

    #[test]
    fn test_parse_rejects_malformed_strings() {
        let malformed = [
            "", "24.1.0", "v24.1", "v24.1.0.1", "v24.x.0", "v24.1.0-", "v-1.0.0", "v24.1.0-hf",
        ];
        for bad in malformed {
            assert!(bad.parse::<Version>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_comparison_is_numeric_per_component() {
        assert!(v("v24.10.0") > v("v24.9.9"));
        assert!(v("v24.3.0-2") > v("v24.3.0"));
        assert!(v("v24.3.0-10") > v("v24.3.0-2"));
        assert_eq!(v("v24.3.0-0"), v("v24.3.0"));
    }

    #[test]
    fn test_unknown_version_disables_every_feature() {
        let unknown = VersionGate::default();
        assert!(!unknown.supports_sidecar_agent());
        assert!(!unknown.supports_tls_config());
        assert!(!unknown.supports_http_probes());
        assert!(!unknown.supports_online_upgrade());
    }

    #[test]
    fn test_feature_gates_compare_against_minimums() {
        assert!(gate("v24.2.0").supports_sidecar_agent());
        assert!(!gate("v24.1.9").supports_sidecar_agent());
        assert!(gate("v24.4.0").supports_tls_config());
        assert!(!gate("v24.3.0-2").supports_tls_config());
        assert!(gate("v12.0.3").supports_http_probes());
        assert!(!gate("v12.0.2").supports_http_probes());
    }

    // ==========================================================================
    // Story Tests: Upgrade Policy Resolution
    // ==========================================================================

    #[test]
    fn story_offline_request_always_wins() {
        let g = gate("v24.4.0");
        assert_eq!(
            g.resolve_upgrade_policy(&UpgradePolicy::Offline, false, true),
            UpgradePolicy::Offline
        );
    }

    #[test]
    fn story_k_safety_0_forces_offline() {
        let g = gate("v24.4.0");
        for requested in [UpgradePolicy::Online, UpgradePolicy::Replicated, UpgradePolicy::Auto] {
            assert_eq!(g.resolve_upgrade_policy(&requested, true, true), UpgradePolicy::Offline);
        }
    }

    #[test]
    fn story_replicated_degrades_to_online_then_offline() {
        let replicated = UpgradePolicy::Replicated;
        assert_eq!(
            gate("v24.3.0-2").resolve_upgrade_policy(&replicated, false, true),
            UpgradePolicy::Replicated
        );
        assert_eq!(
            gate("v24.3.0-2").resolve_upgrade_policy(&replicated, false, false),
            UpgradePolicy::Online,
            "no secondaries"
        );
        assert_eq!(
            gate("v24.3.0").resolve_upgrade_policy(&replicated, false, true),
            UpgradePolicy::Online,
            "below replicated minimum"
        );
        assert_eq!(
            gate("v11.0.0").resolve_upgrade_policy(&replicated, false, true),
            UpgradePolicy::Offline
        );
    }

    #[test]
    fn story_online_and_auto_need_online_minimum() {
        for requested in [UpgradePolicy::Online, UpgradePolicy::Auto] {
            assert_eq!(
                gate("v11.1.0").resolve_upgrade_policy(&requested, false, false),
                UpgradePolicy::Online
            );
            assert_eq!(
                gate("v11.0.2").resolve_upgrade_policy(&requested, false, false),
                UpgradePolicy::Offline
            );
            assert_eq!(
                VersionGate::default().resolve_upgrade_policy(&requested, false, false),
                UpgradePolicy::Offline
            );
        }
    }

    #[test]
    fn story_unknown_policy_literal_resolves_offline() {
        let g = gate("v24.4.0");
        assert_eq!(
            g.resolve_upgrade_policy(&UpgradePolicy::Other("Rolling".to_string()), false, true),
            UpgradePolicy::Offline
        );
    }
}
