//! Mutual TLS configuration for the two trust domains
//!
//! Modes are kept as the literal the user wrote. Comparisons go through
//! [`TlsMode::kind`] (case-insensitive) while the raw literal stays available
//! for rules that must notice a change in letter case alone.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mode used when a TLS block is created without one
pub const DEFAULT_TLS_MODE: &str = "try_verify";

/// Recognised TLS modes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TlsModeKind {
    /// No TLS
    Disable,
    /// TLS without certificate verification
    Enable,
    /// Verify the peer certificate when one is presented
    TryVerify,
    /// Verify the peer certificate chain
    VerifyCa,
    /// Verify the chain and the peer host name
    VerifyFull,
}

impl TlsModeKind {
    /// Every recognised literal in canonical (lower) case
    pub const KNOWN: [&'static str; 5] =
        ["disable", "enable", "try_verify", "verify_ca", "verify_full"];
}

/// TLS mode literal as written in the spec
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct TlsMode(pub String);

impl Default for TlsMode {
    fn default() -> Self {
        Self(DEFAULT_TLS_MODE.to_string())
    }
}

impl TlsMode {
    /// Wrap a literal
    pub fn new(mode: impl Into<String>) -> Self {
        Self(mode.into())
    }

    /// Raw literal
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recognised mode, compared case-insensitively; `None` for unknown literals
    pub fn kind(&self) -> Option<TlsModeKind> {
        match self.0.to_ascii_lowercase().as_str() {
            "disable" => Some(TlsModeKind::Disable),
            "enable" => Some(TlsModeKind::Enable),
            "try_verify" => Some(TlsModeKind::TryVerify),
            "verify_ca" => Some(TlsModeKind::VerifyCa),
            "verify_full" => Some(TlsModeKind::VerifyFull),
            _ => None,
        }
    }

    /// Returns true if both literals name the same mode ignoring case
    pub fn same_mode(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    /// Returns true if the literals differ only by letter case
    pub fn differs_only_by_case(&self, other: &str) -> bool {
        self.0 != other && self.same_mode(other)
    }
}

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Automatic rotation through a list of candidate secrets
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoRotate {
    /// Secrets rotated through, in order
    #[serde(default)]
    pub secrets: Vec<String>,

    /// Hours between rotations
    #[serde(default)]
    pub interval_hours: i32,
}

/// TLS settings of one trust domain
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfigSpec {
    /// Secret holding the certificate; empty until one is generated
    #[serde(default)]
    pub secret: String,

    /// TLS mode literal
    #[serde(default)]
    pub mode: TlsMode,

    /// Automatic rotation policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_rotate: Option<AutoRotate>,
}

impl TlsConfigSpec {
    /// Placeholder written by defaulting: no secret, default mode
    pub fn placeholder() -> Self {
        Self::default()
    }
}

/// The two independent TLS trust domains
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TlsDomain {
    /// Internal HTTPS control traffic
    Https,
    /// Client to server query traffic
    ClientServer,
}

impl TlsDomain {
    /// Both domains, in field order
    pub const ALL: [TlsDomain; 2] = [TlsDomain::Https, TlsDomain::ClientServer];

    /// Spec field name of the domain's block
    pub fn spec_field(&self) -> &'static str {
        match self {
            Self::Https => "httpsTls",
            Self::ClientServer => "clientServerTls",
        }
    }

    /// Name of the domain's entry in `status.tlsConfigs`
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Https => "httpsTLS",
            Self::ClientServer => "clientServerTLS",
        }
    }
}

impl std::fmt::Display for TlsDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_kind_is_case_insensitive() {
        assert_eq!(TlsMode::new("VERIFY_CA").kind(), Some(TlsModeKind::VerifyCa));
        assert_eq!(TlsMode::new("Disable").kind(), Some(TlsModeKind::Disable));
        assert_eq!(TlsMode::new("verify-ca").kind(), None);
    }

    #[test]
    fn test_case_only_difference_detection() {
        let mode = TlsMode::new("try_verify");
        assert!(mode.differs_only_by_case("TRY_VERIFY"));
        assert!(!mode.differs_only_by_case("try_verify"));
        assert!(!mode.differs_only_by_case("verify_ca"));
    }

    #[test]
    fn test_mode_serializes_as_raw_literal() {
        let spec: TlsConfigSpec =
            serde_json::from_str(r#"{"secret":"s","mode":"Enable"}"#).unwrap();
        assert_eq!(spec.mode.as_str(), "Enable");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["mode"], "Enable");
    }

    #[test]
    fn test_placeholder_uses_default_mode() {
        let placeholder = TlsConfigSpec::placeholder();
        assert!(placeholder.secret.is_empty());
        assert_eq!(placeholder.mode.as_str(), DEFAULT_TLS_MODE);
        assert_eq!(TlsDomain::Https.status_name(), "httpsTLS");
    }
}
