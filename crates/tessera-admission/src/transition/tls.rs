//! TLS rotation state machine
//!
//! The reconciler reports rotation progress through status conditions:
//!
//! ```text
//! Stable ──▶ Rotating ──▶ Stable
//!               │
//!               ▼
//!         RollbackNeeded ──▶ RollbackInProgress ──▶ Stable
//! ```
//!
//! Outside `Stable` only the two TLS blocks may change.

use tessera_common::annotations;
use tessera_common::crd::{
    TesseraDBSpec, TesseraDBStatus, TlsDomain, TlsMode, CONDITION_TLS_CERT_ROLLBACK_IN_PROGRESS,
    CONDITION_TLS_CERT_ROLLBACK_NEEDED, CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS,
};

use super::TransitionView;
use crate::violation::{FieldPath, Violations};

/// Where the reconciler is in a certificate rotation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsState {
    /// No rotation running
    Stable,
    /// A new secret or mode is being applied
    Rotating,
    /// Applying failed and the previous secret must be restored
    RollbackNeeded,
    /// The previous secret is being restored
    RollbackInProgress,
}

impl TlsState {
    /// Derive the state from status conditions; later stages take precedence
    pub fn from_status(status: &TesseraDBStatus) -> Self {
        if status.is_condition_true(CONDITION_TLS_CERT_ROLLBACK_IN_PROGRESS) {
            Self::RollbackInProgress
        } else if status.is_condition_true(CONDITION_TLS_CERT_ROLLBACK_NEEDED) {
            Self::RollbackNeeded
        } else if status.is_condition_true(CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS) {
            Self::Rotating
        } else {
            Self::Stable
        }
    }

    /// Condition that put the database in this state
    pub fn condition(&self) -> Option<&'static str> {
        match self {
            Self::Stable => None,
            Self::Rotating => Some(CONDITION_TLS_CONFIG_UPDATE_IN_PROGRESS),
            Self::RollbackNeeded => Some(CONDITION_TLS_CERT_ROLLBACK_NEEDED),
            Self::RollbackInProgress => Some(CONDITION_TLS_CERT_ROLLBACK_IN_PROGRESS),
        }
    }

    /// Returns true while a failed rotation is being undone
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::RollbackNeeded | Self::RollbackInProgress)
    }
}

fn secret(spec: &TesseraDBSpec, domain: TlsDomain) -> &str {
    spec.tls(domain).map(|t| t.secret.as_str()).unwrap_or_default()
}

fn secret_path(domain: TlsDomain) -> FieldPath {
    FieldPath::spec().child(domain.spec_field()).child("secret")
}

/// Copy of `spec` with the secret and mode of both trust domains blanked
fn without_secrets_and_modes(spec: &TesseraDBSpec) -> TesseraDBSpec {
    let mut spec = spec.clone();
    for domain in TlsDomain::ALL {
        if let Some(tls) = spec.tls_mut(domain).as_mut() {
            tls.secret.clear();
            tls.mode = TlsMode::new("");
        }
    }
    spec
}

impl TransitionView<'_> {
    /// A certificate is already in use for at least one trust domain
    fn mutual_tls_enabled(&self) -> bool {
        TlsDomain::ALL
            .into_iter()
            .any(|d| self.status.tls_secret_in_use(d).is_some())
    }

    /// Domain replaces one existing secret with another not yet in use
    fn rotates_secret(&self, domain: TlsDomain) -> bool {
        let (before, after) = (secret(self.old, domain), secret(self.new, domain));
        !before.is_empty()
            && !after.is_empty()
            && before != after
            && self.status.tls_secret_in_use(domain) != Some(after)
    }
}

pub(super) fn only_tls_changes_while_unstable(view: &TransitionView<'_>, out: &mut Violations) {
    let Some(condition) = view.tls_state().condition() else {
        return;
    };
    if without_secrets_and_modes(view.old) != without_secrets_and_modes(view.new) {
        out.forbidden(
            FieldPath::spec(),
            format!(
                "only the secret and mode of {} and {} may change while {condition} is true",
                TlsDomain::Https,
                TlsDomain::ClientServer
            ),
        );
    }
}

pub(super) fn one_rotation_at_a_time(view: &TransitionView<'_>, out: &mut Violations) {
    if TlsDomain::ALL.into_iter().all(|d| view.rotates_secret(d)) {
        out.forbidden(
            secret_path(TlsDomain::ClientServer),
            format!(
                "{} and {} secrets cannot both change before the first change is applied",
                TlsDomain::Https,
                TlsDomain::ClientServer
            ),
        );
    }
}

pub(super) fn secrets_never_cleared(view: &TransitionView<'_>, out: &mut Violations) {
    for domain in TlsDomain::ALL {
        if !secret(view.old, domain).is_empty() && secret(view.new, domain).is_empty() {
            out.invalid(
                secret_path(domain),
                "",
                format!("{domain} secret cannot be cleared once set"),
            );
        }
    }
}

pub(super) fn no_case_only_mode_change(view: &TransitionView<'_>, out: &mut Violations) {
    for domain in TlsDomain::ALL {
        let (Some(before), Some(after)) = (view.old.tls(domain), view.new.tls(domain)) else {
            continue;
        };
        if before.mode == after.mode {
            continue;
        }
        let effective = view
            .status
            .tls_config(domain)
            .map(|s| s.mode.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or(before.mode.as_str());
        if after.mode.differs_only_by_case(effective) {
            out.invalid(
                FieldPath::spec().child(domain.spec_field()).child("mode"),
                &after.mode,
                format!("{domain} mode differs from the current mode '{effective}' only by case"),
            );
        }
    }
}

pub(super) fn mutual_tls_never_disabled(view: &TransitionView<'_>, out: &mut Violations) {
    for domain in TlsDomain::ALL {
        let removed = view.old.tls(domain).is_some() && view.new.tls(domain).is_none();
        if removed && view.status.tls_secret_in_use(domain).is_some() {
            out.forbidden(
                FieldPath::spec().child(domain.spec_field()),
                format!("{domain} cannot be removed once a certificate is in use"),
            );
        }
    }
    if view.mutual_tls_enabled()
        && view.old_annotations.enable_tls_auth()
        && !view.new_annotations.enable_tls_auth()
    {
        out.forbidden(
            FieldPath::annotation(annotations::ENABLE_TLS_AUTH),
            "mutual TLS cannot be disabled once it has been enabled",
        );
    }
}

pub(super) fn base_tls_secret_frozen(view: &TransitionView<'_>, out: &mut Violations) {
    if view.mutual_tls_enabled() && view.old.tls_secret != view.new.tls_secret {
        out.invalid(
            FieldPath::spec().child("tlsSecret"),
            &view.new.tls_secret,
            "tlsSecret cannot change once mutual TLS is enabled",
        );
    }
}

pub(super) fn rollback_restores_secret_in_use(view: &TransitionView<'_>, out: &mut Violations) {
    let state = view.tls_state();
    if !state.is_rollback() {
        return;
    }
    for domain in TlsDomain::ALL {
        let after = secret(view.new, domain);
        if secret(view.old, domain) == after {
            continue;
        }
        let in_use = view.status.tls_secret_in_use(domain);
        if in_use != Some(after) {
            out.forbidden(
                secret_path(domain),
                format!(
                    "while {} is true the {domain} secret may only change back \
                     to the secret in use ({})",
                    state.condition().unwrap_or_default(),
                    in_use.unwrap_or("none")
                ),
            );
        }
    }
}
