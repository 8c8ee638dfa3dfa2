//! Transition validation: is a proposed change safe given the observed state?
//!
//! Each rule compares the previously accepted object with the proposed one
//! and may consult the status the reconciler last reported. Status is read
//! only; like the static rules, every transition rule runs and reports
//! independently.

mod immutable;
mod sandbox;
mod shutdown;
mod tls;
mod upgrade;
mod workload;

pub use tls::TlsState;

use tessera_common::crd::{
    TesseraDB, TesseraDBSpec, TesseraDBStatus, UpgradePolicy, CONDITION_DB_INITIALIZED,
    CONDITION_ONLINE_UPGRADE_IN_PROGRESS, CONDITION_UPGRADE_IN_PROGRESS,
};
use tessera_common::DbAnnotations;

use crate::index::{SpecIndex, StatusIndex};
use crate::version::VersionGate;
use crate::violation::{FieldPath, Violations};

/// Everything a transition rule reads, built once per call
pub(crate) struct TransitionView<'a> {
    pub old: &'a TesseraDBSpec,
    pub new: &'a TesseraDBSpec,
    pub old_annotations: DbAnnotations<'a>,
    pub new_annotations: DbAnnotations<'a>,
    pub status: &'a TesseraDBStatus,
    pub old_index: SpecIndex<'a>,
    pub new_index: SpecIndex<'a>,
    pub status_index: StatusIndex<'a>,
    pub gate: VersionGate,
}

impl<'a> TransitionView<'a> {
    pub fn new(old: &'a TesseraDB, status: &'a TesseraDBStatus, new: &'a TesseraDB) -> Self {
        let old_annotations = old.db_annotations();
        Self {
            old: &old.spec,
            new: &new.spec,
            old_annotations,
            new_annotations: new.db_annotations(),
            status,
            old_index: SpecIndex::build(&old.spec),
            new_index: SpecIndex::build(&new.spec),
            status_index: StatusIndex::build(status),
            gate: VersionGate::from_annotations(&old_annotations),
        }
    }

    /// The database exists in communal storage
    pub fn db_initialized(&self) -> bool {
        self.status.is_condition_true(CONDITION_DB_INITIALIZED)
    }

    /// An image change is being rolled out
    pub fn upgrade_in_progress(&self) -> bool {
        self.status.is_condition_true(CONDITION_UPGRADE_IN_PROGRESS)
    }

    /// An online upgrade is being rolled out
    pub fn online_upgrade_in_progress(&self) -> bool {
        self.status.is_condition_true(CONDITION_ONLINE_UPGRADE_IN_PROGRESS)
    }

    /// Upgrade policy the in-flight (or next) upgrade runs with
    pub fn resolved_upgrade_policy(&self) -> UpgradePolicy {
        self.gate.resolve_upgrade_policy(
            &self.old.upgrade_policy,
            self.old_annotations.is_k_safety_0(),
            self.old.has_secondary_subclusters(),
        )
    }

    /// Upgrade that keeps the database up and renames subclusters as it goes
    pub fn online_style_upgrade_in_progress(&self) -> bool {
        self.online_upgrade_in_progress()
            || (self.upgrade_in_progress()
                && self.resolved_upgrade_policy() != UpgradePolicy::Offline)
    }

    /// Current TLS rotation state
    pub fn tls_state(&self) -> TlsState {
        TlsState::from_status(self.status)
    }

    /// `spec.subclusters[i]` in the new object
    pub fn subcluster_path(&self, i: usize) -> FieldPath {
        FieldPath::spec().child("subclusters").index(i)
    }

    /// `spec.sandboxes[i]` in the new object
    pub fn sandbox_path(&self, i: usize) -> FieldPath {
        FieldPath::spec().child("sandboxes").index(i)
    }
}

type Rule = fn(&TransitionView<'_>, &mut Violations);

const RULES: &[Rule] = &[
    immutable::immutable_after_creation,
    immutable::immutable_after_init,
    immutable::stable_security_context,
    immutable::subcluster_type_transitions,
    upgrade::frozen_during_upgrade,
    upgrade::sandbox_count_during_upgrade,
    upgrade::subclusters_during_upgrade,
    upgrade::rename_continuity,
    sandbox::sandboxed_size_frozen,
    sandbox::sandboxed_removal,
    sandbox::sandbox_primary_kept,
    sandbox::sandbox_primary_not_moved,
    shutdown::new_objects_start_running,
    shutdown::no_scaling_while_shut_down,
    shutdown::sandbox_driven_shutdown,
    shutdown::no_removal_while_shut_down,
    shutdown::no_sandbox_image_change_while_shut_down,
    shutdown::no_sandboxing_into_shut_down,
    tls::only_tls_changes_while_unstable,
    tls::one_rotation_at_a_time,
    tls::secrets_never_cleared,
    tls::no_case_only_mode_change,
    tls::mutual_tls_never_disabled,
    tls::base_tls_secret_frozen,
    tls::rollback_restores_secret_in_use,
    workload::statefulset_override_immutable,
];

/// Run every transition rule for `old` → `new` given the observed `status`
///
/// Both objects are expected to be defaulted.
pub fn validate_transition(
    old: &TesseraDB,
    status: &TesseraDBStatus,
    new: &TesseraDB,
) -> Violations {
    let view = TransitionView::new(old, status, new);
    let mut violations = Violations::new();
    for rule in RULES {
        rule(&view, &mut violations);
    }
    violations
}
