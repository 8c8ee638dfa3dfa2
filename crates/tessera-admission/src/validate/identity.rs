//! Names, enum literals and annotation formats

use std::collections::HashMap;

use tessera_common::annotations;
use tessera_common::crd::{
    validate_dns1035_label, validate_dns1123_subdomain, InitPolicy, SubclusterType,
    UpgradePolicy, ENCRYPT_SPREAD_COMM_DISABLED, ENCRYPT_SPREAD_COMM_VERTICA,
};

use super::SpecView;
use crate::version::Version;
use crate::violation::{FieldPath, Violations};

/// Longest database name the server accepts
pub const DB_NAME_MAX_LEN: usize = 30;

/// Characters the server rejects in a database name
pub const DB_NAME_FORBIDDEN_CHARS: &str = "$=<>`'^\".@*?#&/-:;{}()[] \\~!%+|,";

/// Labels the operator sets on generated objects; users may not override them
pub const PROTECTED_LABELS: [&str; 6] = [
    "app.kubernetes.io/name",
    "app.kubernetes.io/instance",
    "app.kubernetes.io/managed-by",
    "tessera.dev/database",
    "tessera.dev/subcluster-name",
    "tessera.dev/subcluster-type",
];

/// Container name of the database server
pub const SERVER_CONTAINER: &str = "server";
/// Container name of the node agent when it runs as a sidecar
pub const AGENT_CONTAINER: &str = "agent";

pub(super) fn has_subclusters(view: &SpecView<'_>, out: &mut Violations) {
    if view.spec.subclusters.is_empty() {
        out.required(
            FieldPath::spec().child("subclusters"),
            "there should be at least one subcluster defined",
        );
    }
}

pub(super) fn valid_enums(view: &SpecView<'_>, out: &mut Violations) {
    let spec = view.spec;
    if !spec.init_policy.is_known() {
        out.not_supported(
            FieldPath::spec().child("initPolicy"),
            &spec.init_policy,
            format!("initPolicy must be one of: {}", InitPolicy::known_values()),
        );
    }
    if !spec.upgrade_policy.is_known() {
        out.not_supported(
            FieldPath::spec().child("upgradePolicy"),
            &spec.upgrade_policy,
            format!("upgradePolicy must be one of: {}", UpgradePolicy::known_values()),
        );
    }
    for (i, sc) in spec.subclusters.iter().enumerate() {
        if !sc.type_.is_known() {
            out.not_supported(
                view.subcluster_path(i).child("type"),
                &sc.type_,
                format!(
                    "subcluster type must be one of: {} (case-sensitive)",
                    SubclusterType::known_values()
                ),
            );
        }
    }
}

pub(super) fn valid_db_name(view: &SpecView<'_>, out: &mut Violations) {
    let name = &view.spec.db_name;
    let path = FieldPath::spec().child("dbName");
    if name.chars().count() > DB_NAME_MAX_LEN {
        out.invalid(
            path.clone(),
            name,
            format!("dbName cannot exceed {DB_NAME_MAX_LEN} characters"),
        );
    }
    for c in DB_NAME_FORBIDDEN_CHARS.chars() {
        if name.contains(c) {
            out.invalid(
                path.clone(),
                name,
                format!("dbName cannot have the '{c}' character"),
            );
        }
    }
}

pub(super) fn valid_subcluster_names(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if let Err(reason) = validate_dns1123_subdomain(&sc.canonical_name()) {
            out.invalid(
                view.subcluster_path(i).child("name"),
                &sc.name,
                format!("is not a valid domain name: {reason}"),
            );
        }
    }
}

pub(super) fn unique_subcluster_names(view: &SpecView<'_>, out: &mut Violations) {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for (j, sc) in view.spec.subclusters.iter().enumerate() {
        match first_seen.get(&sc.canonical_name()) {
            Some(&i) => out.duplicate(
                view.subcluster_path(j).child("name"),
                &sc.name,
                format!("duplicates the name of subcluster[{i}]"),
            ),
            None => {
                first_seen.insert(sc.canonical_name(), j);
            }
        }
    }
}

pub(super) fn valid_service_names(view: &SpecView<'_>, out: &mut Violations) {
    let cluster = view.db.name();
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        let service = sc.effective_service_name();
        let path = view.subcluster_path(i).child("serviceName");
        if let Err(reason) = validate_dns1035_label(&service) {
            out.invalid(path, &service, format!("is not a valid service name: {reason}"));
            continue;
        }
        if cluster.is_empty() {
            continue;
        }
        let full = format!("{cluster}-{service}");
        if let Err(reason) = validate_dns1035_label(&full) {
            out.invalid(
                path,
                &service,
                format!("the service object name '{full}' is not valid: {reason}"),
            );
        }
    }
}

pub(super) fn valid_subcluster_sizes(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if sc.size < 0 {
            out.invalid(
                view.subcluster_path(i).child("size"),
                sc.size,
                "size cannot be negative",
            );
        }
    }
}

pub(super) fn unprotected_labels(view: &SpecView<'_>, out: &mut Violations) {
    for label in PROTECTED_LABELS {
        if view.spec.labels.contains_key(label) {
            out.forbidden(
                FieldPath::spec().child("labels").key(label),
                format!("'{label}' is a restricted label"),
            );
        }
    }
}

pub(super) fn valid_annotations(view: &SpecView<'_>, out: &mut Violations) {
    let anns = &view.annotations;

    if let Some(raw) = anns.version() {
        if let Err(reason) = raw.parse::<Version>() {
            out.invalid(FieldPath::annotation(annotations::VERSION), raw, reason);
        }
    }

    let k_safety = anns.k_safety();
    if k_safety != "0" && k_safety != "1" {
        out.invalid(
            FieldPath::annotation(annotations::K_SAFETY),
            k_safety,
            "k-safety can only be 0 or 1",
        );
    }

    for (key, value) in anns.negative_timeouts() {
        out.invalid(FieldPath::annotation(key), value, format!("{key} cannot be negative"));
    }
}

pub(super) fn valid_statefulset_overrides(view: &SpecView<'_>, out: &mut Violations) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (j, sc) in view.spec.subclusters.iter().enumerate() {
        let Some(name) = sc.statefulset_name_override() else {
            continue;
        };
        let path = view
            .subcluster_path(j)
            .child("annotations")
            .key(annotations::STATEFULSET_NAME_OVERRIDE);
        if let Err(reason) = validate_dns1123_subdomain(name) {
            out.invalid(path.clone(), name, format!("is not a valid StatefulSet name: {reason}"));
        }
        match first_seen.get(name) {
            Some(&i) => out.duplicate(
                path,
                name,
                format!("resolves to the same StatefulSet as subcluster[{i}]"),
            ),
            None => {
                first_seen.insert(name, j);
            }
        }
    }
}

pub(super) fn valid_sidecar_names(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sidecar) in view.spec.sidecars.iter().enumerate() {
        let reserved = sidecar.name == SERVER_CONTAINER
            || (sidecar.name == AGENT_CONTAINER && view.gate.supports_sidecar_agent());
        if reserved {
            out.invalid(
                FieldPath::spec().child("sidecars").index(i).child("name"),
                &sidecar.name,
                "name is reserved for a generated container",
            );
        }
    }
}

pub(super) fn valid_encrypt_spread_comm(view: &SpecView<'_>, out: &mut Violations) {
    let Some(value) = view.spec.encrypt_spread_comm.as_deref() else {
        return;
    };
    if !value.is_empty()
        && value != ENCRYPT_SPREAD_COMM_VERTICA
        && value != ENCRYPT_SPREAD_COMM_DISABLED
    {
        out.not_supported(
            FieldPath::spec().child("encryptSpreadComm"),
            value,
            format!(
                "encryptSpreadComm can be empty, {ENCRYPT_SPREAD_COMM_VERTICA} \
                 or {ENCRYPT_SPREAD_COMM_DISABLED}"
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::validate_static;
    use super::*;
    use tessera_common::crd::Sidecar;

    #[test]
    fn test_no_subclusters_rejected() {
        let mut db = valid_db();
        db.spec.subclusters.clear();
        assert!(validate_static(&db).mentions("at least one subcluster"));
    }

    #[test]
    fn test_db_name_rules() {
        let mut db = valid_db();
        db.spec.db_name = "a".repeat(31);
        assert!(validate_static(&db).mentions("cannot exceed 30"));

        db.spec.db_name = "my-db.x".to_string();
        let violations = validate_static(&db);
        assert!(violations.mentions("'-' character"));
        assert!(violations.mentions("'.' character"));

        db.spec.db_name = "my_db".to_string();
        assert!(validate_static(&db).is_empty());
    }

    #[test]
    fn test_canonical_name_collision_is_duplicate() {
        let mut db = valid_db();
        db.spec.subclusters = vec![
            subcluster("default_subcluster", 3, SubclusterType::Primary),
            subcluster("default-subcluster", 3, SubclusterType::Secondary),
        ];
        let violations = validate_static(&db);
        assert!(violations.has_path("spec.subclusters[1].name"));
        assert!(violations.mentions("duplicates the name of subcluster[0]"));
    }

    #[test]
    fn test_invalid_subcluster_and_service_names() {
        let mut db = valid_db();
        db.spec.subclusters[0].name = "Main".to_string();
        assert!(validate_static(&db).has_path("spec.subclusters[0].name"));

        let mut db = valid_db();
        db.spec.subclusters[0].service_name = Some("1svc".to_string());
        assert!(validate_static(&db).has_path("spec.subclusters[0].serviceName"));

        let mut db = valid_db();
        db.spec.subclusters[0].service_name = Some("s".repeat(60));
        assert!(validate_static(&db).mentions("service object name"));
    }

    #[test]
    fn test_unknown_subcluster_type_rejected() {
        let mut db = valid_db();
        db.spec.subclusters.push(subcluster("extra", 1, SubclusterType::from("Secondary")));
        assert!(validate_static(&db).has_path("spec.subclusters[1].type"));
    }

    #[test]
    fn test_annotation_formats() {
        let mut db = valid_db();
        annotate(&mut db, annotations::VERSION, "24.1.0");
        annotate(&mut db, annotations::K_SAFETY, "2");
        annotate(&mut db, annotations::REQUEUE_TIME, "-1");
        let violations = validate_static(&db);
        assert!(violations.has_path("metadata.annotations[tessera.dev/version]"));
        assert!(violations.has_path("metadata.annotations[tessera.dev/k-safety]"));
        assert!(violations.has_path("metadata.annotations[tessera.dev/requeue-time]"));
    }

    #[test]
    fn test_duplicate_statefulset_override() {
        let mut db = valid_db();
        let mut other = subcluster("other", 1, SubclusterType::Secondary);
        for sc in [&mut db.spec.subclusters[0], &mut other] {
            sc.annotations.insert(
                annotations::STATEFULSET_NAME_OVERRIDE.to_string(),
                "sts".to_string(),
            );
        }
        db.spec.subclusters.push(other);
        assert!(validate_static(&db).mentions("same StatefulSet as subcluster[0]"));
    }

    #[test]
    fn test_reserved_sidecar_names() {
        let mut db = valid_db();
        db.spec.sidecars = vec![Sidecar {
            name: AGENT_CONTAINER.to_string(),
            image: "agent".to_string(),
        }];
        assert!(validate_static(&db).is_empty(), "agent is free before sidecar support");

        annotate(&mut db, annotations::VERSION, "v24.2.0");
        assert!(validate_static(&db).has_path("spec.sidecars[0].name"));

        db.spec.sidecars[0].name = SERVER_CONTAINER.to_string();
        annotate(&mut db, annotations::VERSION, "v23.1.0");
        assert!(validate_static(&db).has_path("spec.sidecars[0].name"));
    }

    #[test]
    fn test_protected_labels_and_spread_literal() {
        let mut db = valid_db();
        db.spec
            .labels
            .insert("app.kubernetes.io/name".to_string(), "x".to_string());
        db.spec.encrypt_spread_comm = Some("yes".to_string());
        let violations = validate_static(&db);
        assert!(violations.mentions("restricted label"));
        assert!(violations.has_path("spec.encryptSpreadComm"));
    }
}
