//! Client services: node ports, service types and shared services

use std::collections::HashMap;

use tessera_common::crd::{ServiceType, Subcluster};

use super::SpecView;
use crate::violation::Violations;

/// Lowest port Kubernetes assigns to NodePort services by default
pub const NODE_PORT_MIN: i32 = 30000;
/// Highest port Kubernetes assigns to NodePort services by default
pub const NODE_PORT_MAX: i32 = 32767;

fn node_ports(sc: &Subcluster) -> [(&'static str, i32); 2] {
    [
        ("clientNodePort", sc.client_node_port),
        ("httpNodePort", sc.http_node_port),
    ]
}

pub(super) fn valid_node_ports(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if !sc.service_type.allows_node_port() {
            continue;
        }
        for (field, port) in node_ports(sc) {
            if port != 0 && !(NODE_PORT_MIN..=NODE_PORT_MAX).contains(&port) {
                out.invalid(
                    view.subcluster_path(i).child(field),
                    port,
                    format!("{field} must be 0 or in the range {NODE_PORT_MIN}-{NODE_PORT_MAX}"),
                );
            }
        }
    }
}

pub(super) fn node_ports_only_where_supported(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if sc.service_type.allows_node_port() {
            continue;
        }
        for (field, port) in node_ports(sc) {
            if port != 0 {
                out.forbidden(
                    view.subcluster_path(i).child(field),
                    format!(
                        "{field} can only be set when serviceType is {} or {}",
                        ServiceType::NodePort,
                        ServiceType::LoadBalancer
                    ),
                );
            }
        }
    }
}

pub(super) fn valid_service_types(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if !sc.service_type.is_known() {
            out.not_supported(
                view.subcluster_path(i).child("serviceType"),
                &sc.service_type,
                format!("serviceType must be one of: {}", ServiceType::known_values()),
            );
        }
    }
}

/// Fields of a subcluster that shape its client service
fn service_fields(sc: &Subcluster) -> [(&'static str, String); 6] {
    [
        ("serviceType", sc.service_type.to_string()),
        ("clientNodePort", sc.client_node_port.to_string()),
        ("httpNodePort", sc.http_node_port.to_string()),
        ("externalIPs", sc.external_ips.join(",")),
        ("loadBalancerIP", sc.load_balancer_ip.clone()),
        ("serviceAnnotations", format!("{:?}", sc.service_annotations)),
    ]
}

pub(super) fn consistent_shared_services(view: &SpecView<'_>, out: &mut Violations) {
    let services: Vec<String> = view
        .spec
        .subclusters
        .iter()
        .map(Subcluster::effective_service_name)
        .collect();

    if view.annotations.strict_k_safety_check() {
        let mut sharers: HashMap<&str, usize> = HashMap::new();
        for service in &services {
            *sharers.entry(service.as_str()).or_default() += 1;
        }
        for (i, sc) in view.spec.subclusters.iter().enumerate() {
            let service = services[i].as_str();
            if sharers[service] > 1 && sc.size < 1 {
                out.invalid(
                    view.subcluster_path(i).child("size"),
                    sc.size,
                    format!(
                        "subclusters sharing service '{service}' must have a size of at least 1"
                    ),
                );
            }
        }
        return;
    }

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (j, sc) in view.spec.subclusters.iter().enumerate() {
        let service = services[j].as_str();
        let Some(&i) = first_seen.get(service) else {
            first_seen.insert(service, j);
            continue;
        };

        let first = service_fields(&view.spec.subclusters[i]);
        for ((field, mine), (_, theirs)) in service_fields(sc).into_iter().zip(first) {
            if mine != theirs {
                out.invalid(
                    view.subcluster_path(j).child(field),
                    mine,
                    format!("{field} must match subcluster[{i}] which shares service '{service}'"),
                );
            }
        }
    }
}

pub(super) fn valid_proxy_replicas(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        let replicas = sc.proxy.as_ref().and_then(|p| p.replicas);
        if let Some(replicas) = replicas.filter(|r| *r < 1) {
            out.invalid(
                view.subcluster_path(i).child("proxy").child("replicas"),
                replicas,
                "proxy replicas must be at least 1",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::validate_static;
    use super::*;
    use tessera_common::annotations;
    use tessera_common::crd::{ProxySpec, SubclusterType};

    fn shared(db: &mut tessera_common::crd::TesseraDB) {
        let mut other = subcluster("read", 2, SubclusterType::Secondary);
        other.service_name = Some("main".to_string());
        db.spec.subclusters.push(other);
    }

    #[test]
    fn test_node_port_range() {
        let mut db = valid_db();
        db.spec.subclusters[0].service_type = ServiceType::NodePort;
        db.spec.subclusters[0].client_node_port = 30001;
        assert!(validate_static(&db).is_empty());

        db.spec.subclusters[0].http_node_port = 80;
        assert!(validate_static(&db).has_path("spec.subclusters[0].httpNodePort"));
    }

    #[test]
    fn test_node_port_needs_supporting_type() {
        let mut db = valid_db();
        db.spec.subclusters[0].client_node_port = 30001;
        assert!(validate_static(&db).mentions("can only be set when serviceType"));
    }

    #[test]
    fn test_unknown_service_type() {
        let mut db = valid_db();
        db.spec.subclusters[0].service_type = ServiceType::from("Ingress");
        assert!(validate_static(&db).has_path("spec.subclusters[0].serviceType"));
    }

    #[test]
    fn test_shared_service_must_agree() {
        let mut db = valid_db();
        shared(&mut db);
        assert!(validate_static(&db).is_empty());

        db.spec.subclusters[1].load_balancer_ip = "10.0.0.1".to_string();
        assert!(validate_static(&db).has_path("spec.subclusters[1].loadBalancerIP"));
    }

    #[test]
    fn test_strict_mode_requires_size_instead_of_agreement() {
        let mut db = valid_db();
        shared(&mut db);
        db.spec.subclusters[1].load_balancer_ip = "10.0.0.1".to_string();
        annotate(&mut db, annotations::STRICT_K_SAFETY_CHECK, "true");
        assert!(validate_static(&db).is_empty());

        db.spec.subclusters[1].size = 0;
        assert!(validate_static(&db).has_path("spec.subclusters[1].size"));
    }

    #[test]
    fn test_proxy_replicas_positive() {
        let mut db = valid_db();
        db.spec.subclusters[0].proxy = Some(ProxySpec {
            replicas: Some(0),
            resources: None,
        });
        assert!(validate_static(&db).has_path("spec.subclusters[0].proxy.replicas"));
    }
}
