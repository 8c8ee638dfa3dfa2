//! Static validation of a single (already defaulted) TesseraDB
//!
//! Every rule is an independent predicate over one spec. Rules never consult
//! history or status, and all of them run: a caller sees every problem at
//! once.

mod identity;
mod network;
mod safety;
mod sandbox;
mod storage;
mod structure;
mod tls;

use tessera_common::crd::{TesseraDB, TesseraDBSpec};
use tessera_common::DbAnnotations;

use crate::index::SpecIndex;
use crate::version::VersionGate;
use crate::violation::{FieldPath, Violations};

/// Everything a static rule reads, built once per call
pub(crate) struct SpecView<'a> {
    pub db: &'a TesseraDB,
    pub spec: &'a TesseraDBSpec,
    pub annotations: DbAnnotations<'a>,
    pub index: SpecIndex<'a>,
    pub gate: VersionGate,
}

impl<'a> SpecView<'a> {
    pub fn new(db: &'a TesseraDB) -> Self {
        let annotations = db.db_annotations();
        Self {
            db,
            spec: &db.spec,
            annotations,
            index: SpecIndex::build(&db.spec),
            gate: VersionGate::from_annotations(&annotations),
        }
    }

    /// `spec.subclusters[i]`
    pub fn subcluster_path(&self, i: usize) -> FieldPath {
        FieldPath::spec().child("subclusters").index(i)
    }

    /// `spec.sandboxes[i]`
    pub fn sandbox_path(&self, i: usize) -> FieldPath {
        FieldPath::spec().child("sandboxes").index(i)
    }
}

type Rule = fn(&SpecView<'_>, &mut Violations);

const RULES: &[Rule] = &[
    identity::has_subclusters,
    identity::valid_enums,
    identity::valid_db_name,
    identity::valid_subcluster_names,
    identity::unique_subcluster_names,
    identity::valid_service_names,
    identity::valid_subcluster_sizes,
    identity::unprotected_labels,
    identity::valid_annotations,
    identity::valid_statefulset_overrides,
    identity::valid_sidecar_names,
    identity::valid_encrypt_spread_comm,
    safety::has_primary_subcluster,
    safety::valid_k_safety,
    storage::valid_communal_path,
    storage::valid_endpoint,
    storage::valid_server_side_encryption,
    storage::unique_additional_config,
    storage::valid_local_paths,
    storage::valid_kerberos,
    network::valid_node_ports,
    network::node_ports_only_where_supported,
    network::valid_service_types,
    network::consistent_shared_services,
    network::valid_proxy_replicas,
    structure::valid_temporary_routing,
    structure::transient_matches_template,
    structure::valid_probe_overrides,
    structure::valid_shard_count,
    sandbox::valid_sandbox_names,
    sandbox::valid_sandbox_members,
    sandbox::sandboxes_have_primary,
    tls::valid_tls_modes,
    tls::valid_auto_rotate,
];

/// Run every static rule against `db`
pub fn validate_static(db: &TesseraDB) -> Violations {
    let view = SpecView::new(db);
    let mut violations = Violations::new();
    for rule in RULES {
        rule(&view, &mut violations);
    }
    violations
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use tessera_common::crd::{Subcluster, SubclusterType, TesseraDB, TesseraDBSpec};

    /// A valid database: one primary of size 3 on POSIX communal storage
    pub fn valid_db() -> TesseraDB {
        TesseraDB::new(
            "analytics",
            TesseraDBSpec {
                image: "tessera/server:24.4.0".to_string(),
                db_name: "analytics".to_string(),
                shard_count: 6,
                communal: tessera_common::crd::CommunalStorage {
                    path: "/communal".to_string(),
                    ..Default::default()
                },
                subclusters: vec![subcluster("main", 3, SubclusterType::Primary)],
                ..Default::default()
            },
        )
    }

    pub fn subcluster(name: &str, size: i32, type_: SubclusterType) -> Subcluster {
        Subcluster {
            name: name.to_string(),
            size,
            type_,
            ..Default::default()
        }
    }

    pub fn annotate(db: &mut TesseraDB, key: &str, value: &str) {
        db.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
    }
}
