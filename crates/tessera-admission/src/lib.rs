//! Defaulting and admission validation for TesseraDB resources
//!
//! Two pure operations make up the decision protocol:
//!
//! - **Default**: [`defaulted`] fills every computable default and never fails
//! - **Validate**: [`validate`] returns every [`Violation`] of a proposed create
//!   or update; an empty list accepts the change
//!
//! Validation is split into static rules over one spec ([`validate_static`])
//! and transition rules over an old/new pair plus the reconciler's last
//! reported status ([`validate_transition`]). All lookups are built fresh on
//! each call, so identical inputs always produce identical verdicts.

#![deny(missing_docs)]

pub mod defaults;
pub mod index;
pub mod transition;
pub mod validate;
pub mod version;
pub mod violation;

pub use defaults::{apply_defaults, defaulted};
pub use transition::{validate_transition, TlsState};
pub use validate::validate_static;
pub use version::{Version, VersionGate};
pub use violation::{FieldPath, Violation, ViolationKind, Violations};

use tessera_common::crd::TesseraDB;
use tracing::{debug, info};

/// Validate a resource being created
pub fn validate_create(new: &TesseraDB) -> Violations {
    let new = defaulted(new);
    let violations = validate_static(&new);
    log_decision("create", &new, &violations);
    violations
}

/// Validate an update of `old` to `new`
///
/// The observed status is taken from `old`; a missing status is treated as
/// empty (nothing initialized, nothing in flight).
pub fn validate_update(old: &TesseraDB, new: &TesseraDB) -> Violations {
    let status = old.status.clone().unwrap_or_default();
    let old = defaulted(old);
    let new = defaulted(new);

    let mut violations = validate_static(&new);
    violations.extend(validate_transition(&old, &status, &new));
    log_decision("update", &new, &violations);
    violations
}

/// Validate a create (`old` is `None`) or an update
pub fn validate(old: Option<&TesseraDB>, new: &TesseraDB) -> Violations {
    match old {
        Some(old) => validate_update(old, new),
        None => validate_create(new),
    }
}

fn log_decision(operation: &str, db: &TesseraDB, violations: &Violations) {
    if violations.is_empty() {
        debug!(operation, name = %db.name(), "admitted TesseraDB");
    } else {
        info!(
            operation,
            name = %db.name(),
            violations = violations.len(),
            reasons = %violations,
            "rejected TesseraDB"
        );
    }
}
