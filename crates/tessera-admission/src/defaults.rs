//! Defaulting stage
//!
//! Fills every optional field that has a computable default. Never fails and
//! never reports anything; validation runs on the result. Applying it twice
//! is the same as applying it once.

use tessera_common::crd::{
    ProxyResources, ProxySpec, SubclusterType, TesseraDB, TlsConfigSpec, TlsDomain,
    DEFAULT_GCLOUD_ENDPOINT, DEFAULT_GCLOUD_REGION, DEFAULT_PROXY_REPLICAS, DEFAULT_S3_REGION,
};
use tracing::debug;

use crate::version::VersionGate;

/// Return a defaulted copy of `db`
pub fn defaulted(db: &TesseraDB) -> TesseraDB {
    let mut out = db.clone();
    apply_defaults(&mut out);
    out
}

/// Default `db` in place
pub fn apply_defaults(db: &mut TesseraDB) {
    let annotations = db.db_annotations();
    let use_proxy = annotations.use_proxy();
    let tls_enabled = VersionGate::from_annotations(&annotations).supports_tls_config()
        || annotations.enable_tls_auth();

    default_service_names(db);
    default_sandbox_images(db);
    default_proxies(db, use_proxy);
    if tls_enabled {
        default_tls_placeholders(db);
    }
    default_communal(db);
    default_routing_template(db);

    debug!(
        name = %db.name(),
        use_proxy,
        tls_enabled,
        "applied defaults"
    );
}

fn default_service_names(db: &mut TesseraDB) {
    for sc in &mut db.spec.subclusters {
        if sc.service_name.as_deref().is_none_or(str::is_empty) {
            sc.service_name = Some(sc.canonical_name());
        }
    }
}

fn default_sandbox_images(db: &mut TesseraDB) {
    if db.spec.image.is_empty() {
        return;
    }
    let image = db.spec.image.clone();
    for sandbox in &mut db.spec.sandboxes {
        if sandbox.image.as_deref().is_none_or(str::is_empty) {
            sandbox.image = Some(image.clone());
        }
    }
}

fn default_proxies(db: &mut TesseraDB, use_proxy: bool) {
    for sc in &mut db.spec.subclusters {
        if use_proxy {
            let proxy = sc.proxy.get_or_insert_with(ProxySpec::default);
            proxy.replicas.get_or_insert(DEFAULT_PROXY_REPLICAS);
            proxy.resources.get_or_insert_with(ProxyResources::default);
        } else if sc.proxy.as_ref().is_some_and(ProxySpec::holds_only_defaults) {
            sc.proxy = None;
        }
    }
}

fn default_tls_placeholders(db: &mut TesseraDB) {
    for domain in TlsDomain::ALL {
        db.spec
            .tls_mut(domain)
            .get_or_insert_with(TlsConfigSpec::placeholder);
    }
}

fn default_communal(db: &mut TesseraDB) {
    let communal = &mut db.spec.communal;
    if communal.region.is_empty() {
        if communal.is_s3() {
            communal.region = DEFAULT_S3_REGION.to_string();
        } else if communal.is_gcloud() {
            communal.region = DEFAULT_GCLOUD_REGION.to_string();
        }
    }
    if communal.endpoint.is_empty() && communal.is_gcloud() {
        communal.endpoint = DEFAULT_GCLOUD_ENDPOINT.to_string();
    }
}

fn default_routing_template(db: &mut TesseraDB) {
    let template = db
        .spec
        .temporary_subcluster_routing
        .as_mut()
        .and_then(|r| r.template.as_mut());
    if let Some(template) = template {
        template.type_.get_or_insert(SubclusterType::Secondary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tessera_common::annotations;
    use tessera_common::crd::{
        Sandbox, Subcluster, SubclusterTemplate, TemporarySubclusterRouting, TesseraDBSpec,
    };

    fn db(annotations: &[(&str, &str)]) -> TesseraDB {
        let mut db = TesseraDB::new(
            "analytics",
            TesseraDBSpec {
                image: "tessera/server:24.4.0".to_string(),
                db_name: "analytics".to_string(),
                shard_count: 6,
                subclusters: vec![
                    Subcluster {
                        name: "default_subcluster".to_string(),
                        size: 3,
                        ..Default::default()
                    },
                    Subcluster {
                        name: "reporting".to_string(),
                        size: 2,
                        type_: SubclusterType::Secondary,
                        service_name: Some("shared".to_string()),
                        ..Default::default()
                    },
                ],
                sandboxes: vec![Sandbox {
                    name: "sand1".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        let bag: BTreeMap<String, String> = annotations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        db.metadata.annotations = Some(bag);
        db
    }

    #[test]
    fn test_service_names_default_to_canonical_name() {
        let out = defaulted(&db(&[]));
        assert_eq!(
            out.spec.subclusters[0].service_name.as_deref(),
            Some("default-subcluster")
        );
        assert_eq!(out.spec.subclusters[1].service_name.as_deref(), Some("shared"));
    }

    #[test]
    fn test_sandbox_image_defaults_to_cluster_image() {
        let out = defaulted(&db(&[]));
        assert_eq!(
            out.spec.sandboxes[0].image.as_deref(),
            Some("tessera/server:24.4.0")
        );
    }

    #[test]
    fn test_proxy_created_when_enabled() {
        let out = defaulted(&db(&[(annotations::USE_PROXY, "true")]));
        let proxy = out.spec.subclusters[0].proxy.as_ref().unwrap();
        assert_eq!(proxy.replicas, Some(1));
        assert_eq!(proxy.resources, Some(ProxyResources::default()));
    }

    #[test]
    fn test_default_only_proxy_cleared_when_disabled() {
        let mut input = db(&[]);
        input.spec.subclusters[0].proxy = Some(ProxySpec {
            replicas: Some(1),
            resources: Some(ProxyResources::default()),
        });
        input.spec.subclusters[1].proxy = Some(ProxySpec {
            replicas: Some(3),
            resources: None,
        });
        let out = defaulted(&input);
        assert!(out.spec.subclusters[0].proxy.is_none());
        assert_eq!(
            out.spec.subclusters[1].proxy.as_ref().and_then(|p| p.replicas),
            Some(3),
            "user-supplied values are kept"
        );
    }

    #[test]
    fn test_subcluster_type_is_not_case_folded() {
        let mut input = db(&[]);
        input.spec.subclusters[0].type_ = SubclusterType::from("Primary");
        let out = defaulted(&input);
        assert_eq!(
            out.spec.subclusters[0].type_,
            SubclusterType::Other("Primary".to_string())
        );
    }

    #[test]
    fn test_tls_placeholders_follow_version_or_annotation() {
        let out = defaulted(&db(&[(annotations::VERSION, "v24.3.0")]));
        assert!(out.spec.https_tls.is_none());

        let out = defaulted(&db(&[(annotations::VERSION, "v24.4.0")]));
        assert_eq!(out.spec.https_tls, Some(TlsConfigSpec::placeholder()));
        assert_eq!(out.spec.client_server_tls, Some(TlsConfigSpec::placeholder()));

        let out = defaulted(&db(&[(annotations::ENABLE_TLS_AUTH, "true")]));
        assert!(out.spec.https_tls.is_some());
    }

    #[test]
    fn test_communal_region_and_endpoint_defaults() {
        let mut input = db(&[]);
        input.spec.communal.path = "s3://bucket/db".to_string();
        assert_eq!(defaulted(&input).spec.communal.region, DEFAULT_S3_REGION);

        input.spec.communal.path = "gs://bucket/db".to_string();
        let out = defaulted(&input);
        assert_eq!(out.spec.communal.region, DEFAULT_GCLOUD_REGION);
        assert_eq!(out.spec.communal.endpoint, DEFAULT_GCLOUD_ENDPOINT);
    }

    #[test]
    fn test_routing_template_type_defaults_to_secondary() {
        let mut input = db(&[]);
        input.spec.temporary_subcluster_routing = Some(TemporarySubclusterRouting {
            names: vec![],
            template: Some(SubclusterTemplate {
                name: "transient".to_string(),
                size: 1,
                type_: None,
            }),
        });
        let out = defaulted(&input);
        let template = out
            .spec
            .temporary_subcluster_routing
            .and_then(|r| r.template)
            .unwrap();
        assert_eq!(template.type_, Some(SubclusterType::Secondary));
    }

    #[test]
    fn test_defaulting_is_idempotent() {
        for anns in [
            vec![],
            vec![(annotations::USE_PROXY, "true"), (annotations::VERSION, "v24.4.0")],
        ] {
            let once = defaulted(&db(&anns));
            assert_eq!(defaulted(&once), once);
        }
    }
}
