//! Fields fixed at creation or once the database is initialized

use tessera_common::annotations;
use tessera_common::crd::{PodSecurityContext, SubclusterType};

use super::TransitionView;
use crate::violation::{FieldPath, Violations};

fn changed<T: PartialEq + std::fmt::Display>(
    out: &mut Violations,
    path: FieldPath,
    old: T,
    new: T,
    message: &str,
) {
    if old != new {
        out.invalid(path, new, message);
    }
}

pub(super) fn immutable_after_creation(view: &TransitionView<'_>, out: &mut Violations) {
    let (old, new) = (view.old, view.new);
    let spec = FieldPath::spec();

    changed(
        out,
        spec.child("initPolicy"),
        &old.init_policy,
        &new.init_policy,
        "initPolicy cannot change after creation",
    );
    changed(
        out,
        spec.child("dbName"),
        &old.db_name,
        &new.db_name,
        "dbName cannot change after creation",
    );
    changed(
        out,
        spec.child("communal").child("path"),
        &old.communal.path,
        &new.communal.path,
        "communal.path cannot change after creation",
    );
    changed(
        out,
        spec.child("communal").child("endpoint"),
        &old.communal.endpoint,
        &new.communal.endpoint,
        "communal.endpoint cannot change after creation",
    );
    changed(
        out,
        spec.child("local").child("storageClass"),
        &old.local.storage_class,
        &new.local.storage_class,
        "local.storageClass cannot change after creation",
    );
    changed(
        out,
        spec.child("encryptSpreadComm"),
        old.encrypt_spread_comm.as_deref().unwrap_or_default(),
        new.encrypt_spread_comm.as_deref().unwrap_or_default(),
        "encryptSpreadComm cannot change after creation",
    );
    changed(
        out,
        FieldPath::annotation(annotations::K_SAFETY),
        view.old_annotations.k_safety(),
        view.new_annotations.k_safety(),
        "k-safety cannot change after creation",
    );

    let sse = |s: &tessera_common::crd::TesseraDBSpec| {
        s.communal
            .server_side_encryption
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    changed(
        out,
        spec.child("communal").child("serverSideEncryption"),
        sse(old),
        sse(new),
        "communal.serverSideEncryption cannot change after creation",
    );
}

pub(super) fn immutable_after_init(view: &TransitionView<'_>, out: &mut Violations) {
    if !view.db_initialized() {
        return;
    }
    let (old, new) = (view.old, view.new);
    let local = FieldPath::spec().child("local");

    changed(
        out,
        local.child("dataPath"),
        &old.local.data_path,
        &new.local.data_path,
        "dataPath cannot change after the database has been initialized",
    );
    changed(
        out,
        local.child("depotPath"),
        &old.local.depot_path,
        &new.local.depot_path,
        "depotPath cannot change after the database has been initialized",
    );
    changed(
        out,
        local.child("catalogPath"),
        old.local.effective_catalog_path(),
        new.local.effective_catalog_path(),
        "catalogPath cannot change after the database has been initialized",
    );
    changed(
        out,
        local.child("depotVolume"),
        &old.local.depot_volume,
        &new.local.depot_volume,
        "depotVolume cannot change after the database has been initialized",
    );
    changed(
        out,
        FieldPath::spec().child("shardCount"),
        old.shard_count,
        new.shard_count,
        "shardCount cannot change after the database has been initialized",
    );
}

fn run_as_user(ctx: Option<&PodSecurityContext>) -> Option<i64> {
    ctx.and_then(|c| c.run_as_user)
}

fn fs_group(ctx: Option<&PodSecurityContext>) -> Option<i64> {
    ctx.and_then(|c| c.fs_group)
}

/// Once set, `runAsUser` and `fsGroup` keep their value; unset ones may be filled in
pub(super) fn stable_security_context(view: &TransitionView<'_>, out: &mut Violations) {
    if !view.db_initialized() {
        return;
    }
    let (old, new) = (
        view.old.pod_security_context.as_ref(),
        view.new.pod_security_context.as_ref(),
    );
    let path = FieldPath::spec().child("podSecurityContext");
    let fields: [(&str, fn(Option<&PodSecurityContext>) -> Option<i64>); 2] =
        [("runAsUser", run_as_user), ("fsGroup", fs_group)];

    for (field, read) in fields {
        let Some(before) = read(old) else {
            continue;
        };
        match read(new) {
            Some(after) if after == before => {}
            Some(after) => out.invalid(
                path.child(field),
                after,
                format!("{field} cannot change after the database has been initialized"),
            ),
            None => out.invalid(
                path.child(field),
                "",
                format!(
                    "{field} was {before} and cannot be cleared once the database is initialized"
                ),
            ),
        }
    }
}

/// Whether `old` → `new` is an allowed type change for one subcluster
fn type_change_allowed(
    old: &SubclusterType,
    new: &SubclusterType,
    entering_sandbox: bool,
    leaving_sandbox: bool,
) -> bool {
    match (old, new) {
        (SubclusterType::Secondary, SubclusterType::SandboxPrimary) => entering_sandbox,
        (SubclusterType::SandboxPrimary, SubclusterType::Secondary) => leaving_sandbox,
        _ => false,
    }
}

pub(super) fn subcluster_type_transitions(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let Some(before) = view.old_index.subcluster(&sc.name) else {
            continue;
        };
        // unknown literals are reported by the static rules
        if before.type_ == sc.type_ || !before.type_.is_known() || !sc.type_.is_known() {
            continue;
        }
        let in_old = view.old_index.sandbox_of(&sc.name).is_some();
        let in_new = view.new_index.sandbox_of(&sc.name).is_some();
        if !type_change_allowed(&before.type_, &sc.type_, !in_old && in_new, in_old && !in_new) {
            out.invalid(
                view.subcluster_path(i).child("type"),
                &sc.type_,
                format!(
                    "subcluster {} cannot change its type from {} to {}",
                    sc.name, before.type_, sc.type_
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::validate_transition;
    use super::*;
    use tessera_common::crd::{
        InitPolicy, Sandbox, SandboxMemberType, SandboxSubcluster, TesseraDB, TesseraDBStatus,
        CONDITION_DB_INITIALIZED,
    };

    #[test]
    fn test_fields_fixed_at_creation() {
        let old = valid_db();
        let mut new = old.clone();
        new.spec.init_policy = InitPolicy::Revive;
        new.spec.db_name = "other".to_string();
        new.spec.communal.path = "/elsewhere".to_string();
        new.spec.local.storage_class = "fast".to_string();
        new.spec.encrypt_spread_comm = Some("vertica".to_string());
        annotate(&mut new, annotations::K_SAFETY, "0");

        let violations = validate_transition(&old, &TesseraDBStatus::default(), &new);
        for path in [
            "spec.initPolicy",
            "spec.dbName",
            "spec.communal.path",
            "spec.local.storageClass",
            "spec.encryptSpreadComm",
            "metadata.annotations[tessera.dev/k-safety]",
        ] {
            assert!(violations.has_path(path), "{path} missing from {violations}");
        }
    }

    #[test]
    fn test_explicit_default_k_safety_is_not_a_change() {
        let old = valid_db();
        let mut new = old.clone();
        annotate(&mut new, annotations::K_SAFETY, "1");
        assert!(validate_transition(&old, &TesseraDBStatus::default(), &new).is_empty());
    }

    #[test]
    fn test_local_paths_fixed_only_after_init() {
        let old = valid_db();
        let mut new = old.clone();
        new.spec.local.data_path = "/newdata".to_string();
        new.spec.shard_count = 12;

        let before_init = validate_transition(&old, &TesseraDBStatus::default(), &new);
        assert!(before_init.is_empty(), "{before_init}");

        let initialized = status_with(&[CONDITION_DB_INITIALIZED]);
        let violations = validate_transition(&old, &initialized, &new);
        assert!(violations.has_path("spec.local.dataPath"));
        assert!(violations.has_path("spec.local.catalogPath"), "catalog follows data");
        assert!(violations.has_path("spec.shardCount"));
    }

    fn with_identity(run_as_user: Option<i64>, fs_group: Option<i64>) -> TesseraDB {
        let mut db = valid_db();
        db.spec.pod_security_context = Some(PodSecurityContext {
            run_as_user,
            fs_group,
        });
        db
    }

    #[test]
    fn test_unset_security_context_may_be_filled_in() {
        let initialized = status_with(&[CONDITION_DB_INITIALIZED]);
        let old = valid_db();
        let new = with_identity(Some(1000), Some(1000));
        assert!(validate_transition(&old, &initialized, &new).is_empty());
    }

    #[test]
    fn test_security_context_value_is_fixed_after_init() {
        let initialized = status_with(&[CONDITION_DB_INITIALIZED]);
        let old = with_identity(Some(1002), Some(1000));

        let violations =
            validate_transition(&old, &initialized, &with_identity(Some(1003), Some(1001)));
        assert!(violations.has_path("spec.podSecurityContext.runAsUser"));
        assert!(violations.has_path("spec.podSecurityContext.fsGroup"));

        let new = with_identity(Some(1003), None);
        let before_init = validate_transition(&old, &TesseraDBStatus::default(), &new);
        assert!(before_init.is_empty(), "{before_init}");
    }

    #[test]
    fn test_security_context_cannot_be_cleared_after_init() {
        let initialized = status_with(&[CONDITION_DB_INITIALIZED]);
        let old = with_identity(Some(5000), Some(5000));

        let violations = validate_transition(&old, &initialized, &valid_db());
        assert!(violations.has_path("spec.podSecurityContext.runAsUser"));
        assert!(violations.has_path("spec.podSecurityContext.fsGroup"));

        let violations = validate_transition(&old, &initialized, &with_identity(Some(5000), None));
        assert!(violations.has_path("spec.podSecurityContext.fsGroup"));
        assert!(!violations.has_path("spec.podSecurityContext.runAsUser"));
    }

    #[test]
    fn test_type_changes() {
        let mut old = valid_db();
        old.spec
            .subclusters
            .push(subcluster("sc2", 1, SubclusterType::Secondary));
        old.spec
            .subclusters
            .push(subcluster("sc3", 1, SubclusterType::Secondary));
        let status = TesseraDBStatus::default();

        let mut new = old.clone();
        new.spec.subclusters[1].type_ = SubclusterType::Primary;
        assert!(validate_transition(&old, &status, &new).has_path("spec.subclusters[1].type"));

        let mut new = old.clone();
        new.spec.subclusters[0].type_ = SubclusterType::Secondary;
        assert!(validate_transition(&old, &status, &new).has_path("spec.subclusters[0].type"));

        let mut new = old.clone();
        new.spec.subclusters[1].type_ = SubclusterType::SandboxPrimary;
        assert!(
            validate_transition(&old, &status, &new).has_path("spec.subclusters[1].type"),
            "not entering a sandbox"
        );

        new.spec.sandboxes = vec![Sandbox {
            name: "sand1".to_string(),
            subclusters: vec![SandboxSubcluster {
                name: "sc2".to_string(),
                type_: Some(SandboxMemberType::Primary),
            }],
            ..Default::default()
        }];
        let violations = validate_transition(&old, &status, &new);
        assert!(violations.is_empty(), "{violations}");

        let back = validate_transition(&new, &status, &old);
        assert!(back.is_empty(), "leaving the sandbox restores secondary: {back}");
    }
}
