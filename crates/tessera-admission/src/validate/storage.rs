//! Communal storage, local paths and Kerberos

use std::collections::HashMap;

use tessera_common::crd::{DepotVolume, SseMode, SSE_KMS_KEY_ID};

use super::SpecView;
use crate::violation::{FieldPath, Violations};

/// Paths the server image populates; mounting a volume over them breaks it
pub const RESERVED_LOCAL_PATHS: [&str; 14] = [
    "/home",
    "/home/dbadmin",
    "/opt",
    "/opt/vertica",
    "/opt/vertica/bin",
    "/opt/vertica/sbin",
    "/opt/vertica/include",
    "/opt/vertica/java",
    "/opt/vertica/lib",
    "/opt/vertica/oss",
    "/opt/vertica/packages",
    "/opt/vertica/share",
    "/opt/vertica/scripts",
    "/opt/vertica/spread",
];

fn communal_path() -> FieldPath {
    FieldPath::spec().child("communal")
}

pub(super) fn valid_communal_path(view: &SpecView<'_>, out: &mut Violations) {
    if view.spec.init_policy.is_schedule_only() {
        return;
    }
    if view.spec.communal.path.is_empty() {
        out.required(
            communal_path().child("path"),
            "communal.path cannot be empty unless initPolicy is ScheduleOnly",
        );
    }
}

pub(super) fn valid_endpoint(view: &SpecView<'_>, out: &mut Violations) {
    let communal = &view.spec.communal;
    if view.spec.init_policy.is_schedule_only() || !(communal.is_s3() || communal.is_gcloud()) {
        return;
    }
    let endpoint = communal.endpoint.as_str();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        out.invalid(
            communal_path().child("endpoint"),
            endpoint,
            "communal.endpoint must be prefixed with http:// or https://",
        );
    }
}

pub(super) fn valid_server_side_encryption(view: &SpecView<'_>, out: &mut Violations) {
    let communal = &view.spec.communal;
    let Some(mode) = communal.server_side_encryption.as_ref() else {
        return;
    };
    let path = communal_path();

    if !communal.is_s3() {
        out.forbidden(
            path.child("serverSideEncryption"),
            "server-side encryption is only supported for S3 communal storage",
        );
        return;
    }

    match mode {
        SseMode::SseS3 => {}
        SseMode::SseKms => {
            let has_key = communal
                .additional_config
                .get(SSE_KMS_KEY_ID)
                .is_some_and(|v| !v.is_empty());
            if !has_key {
                out.required(
                    path.child("additionalConfig").key(SSE_KMS_KEY_ID),
                    format!("{SSE_KMS_KEY_ID} must be set in additionalConfig when using SSE-KMS"),
                );
            }
        }
        SseMode::SseC => {
            if communal.sse_customer_key_secret.is_empty() {
                out.required(
                    path.child("sseCustomerKeySecret"),
                    "sseCustomerKeySecret must be set when using SSE-C",
                );
            }
        }
        SseMode::Other(_) => out.not_supported(
            path.child("serverSideEncryption"),
            mode,
            format!(
                "serverSideEncryption must be one of: {}",
                SseMode::known_values()
            ),
        ),
    }
}

pub(super) fn unique_additional_config(view: &SpecView<'_>, out: &mut Violations) {
    let mut first_seen: HashMap<String, &str> = HashMap::new();
    for key in view.spec.communal.additional_config.keys() {
        let folded = key.to_lowercase();
        match first_seen.get(&folded) {
            Some(first) => out.duplicate(
                communal_path().child("additionalConfig").key(key),
                key,
                format!("duplicates additionalConfig key '{first}' ignoring case"),
            ),
            None => {
                first_seen.insert(folded, key);
            }
        }
    }
}

pub(super) fn valid_local_paths(view: &SpecView<'_>, out: &mut Violations) {
    let local = &view.spec.local;
    let path = FieldPath::spec().child("local");

    let mut checked = vec![
        ("dataPath", local.data_path.as_str()),
        ("depotPath", local.depot_path.as_str()),
    ];
    if let Some(catalog) = local.catalog_path.as_deref() {
        checked.push(("catalogPath", catalog));
    }
    for (field, value) in checked {
        let trimmed = value.trim_end_matches('/');
        if RESERVED_LOCAL_PATHS.contains(&trimmed) {
            out.invalid(
                path.child(field),
                value,
                "path is reserved by the server image and cannot be used",
            );
        }
    }

    if !local.depot_volume.is_known() {
        out.not_supported(
            path.child("depotVolume"),
            &local.depot_volume,
            format!("depotVolume must be one of: {}", DepotVolume::known_values()),
        );
    }

    if local.depot_volume.is_ephemeral() && !local.is_depot_path_unique() {
        out.invalid(
            path.child("depotPath"),
            &local.depot_path,
            "depotPath must differ from dataPath and catalogPath when depotVolume is EmptyDir",
        );
    }
}

pub(super) fn valid_kerberos(view: &SpecView<'_>, out: &mut Violations) {
    let communal = &view.spec.communal;
    let parts = [
        ("communal.kerberosRealm", !communal.kerberos_realm.is_empty()),
        ("communal.kerberosServiceName", !communal.kerberos_service_name.is_empty()),
        ("kerberosSecret", !view.spec.kerberos_secret.is_empty()),
    ];
    let set = parts.iter().filter(|(_, set)| *set).count();
    if set == 0 || set == parts.len() {
        return;
    }
    let missing: Vec<&str> = parts
        .iter()
        .filter(|(_, set)| !*set)
        .map(|(name, _)| *name)
        .collect();
    out.invalid(
        FieldPath::spec().child("kerberosSecret"),
        &view.spec.kerberos_secret,
        format!(
            "kerberos configuration is partial; also set {}",
            missing.join(", ")
        ),
    );
}
