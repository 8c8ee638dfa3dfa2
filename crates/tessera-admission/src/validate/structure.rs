//! Mutually exclusive settings: temporary routing, probe handlers, shards

use super::SpecView;
use crate::violation::{FieldPath, Violations};

fn routing_path() -> FieldPath {
    FieldPath::spec().child("temporarySubclusterRouting")
}

pub(super) fn valid_temporary_routing(view: &SpecView<'_>, out: &mut Violations) {
    let Some(routing) = view.spec.temporary_subcluster_routing.as_ref() else {
        return;
    };
    let path = routing_path();

    if !routing.names.is_empty() && routing.template.is_some() {
        out.forbidden(
            path.clone(),
            "names and template cannot be used together; pick one",
        );
    }

    for (i, name) in routing.names.iter().enumerate() {
        if !view.index.has_subcluster(name) {
            out.not_supported(
                path.child("names").index(i),
                name,
                "names must refer to existing subclusters",
            );
        }
    }

    let Some(template) = routing.template.as_ref() else {
        return;
    };
    let template_path = path.child("template");

    if template.type_.as_ref().is_some_and(|t| !t.is_secondary()) {
        out.invalid(
            template_path.child("type"),
            template.type_.as_ref().map(ToString::to_string).unwrap_or_default(),
            "the template subcluster must be secondary",
        );
    }
    if template.name.is_empty() {
        return;
    }
    if template.size <= 0 {
        out.invalid(
            template_path.child("size"),
            template.size,
            "the template subcluster must have a positive size",
        );
    }
    let reused = view
        .index
        .subcluster(&template.name)
        .is_some_and(|sc| !sc.type_.is_transient());
    if reused {
        out.duplicate(
            template_path.child("name"),
            &template.name,
            "the template name is already used by a subcluster",
        );
    }
}

pub(super) fn transient_matches_template(view: &SpecView<'_>, out: &mut Violations) {
    let template_name = view
        .spec
        .temporary_subcluster_routing
        .as_ref()
        .and_then(|r| r.template.as_ref())
        .map(|t| t.name.as_str());

    for (i, sc) in view.spec.subclusters.iter().enumerate() {
        if sc.type_.is_transient() && template_name != Some(sc.name.as_str()) {
            out.invalid(
                view.subcluster_path(i).child("type"),
                &sc.type_,
                "a transient subcluster must match the temporarySubclusterRouting template",
            );
        }
    }
}

pub(super) fn valid_probe_overrides(view: &SpecView<'_>, out: &mut Violations) {
    for (field, probe) in view.spec.probe_overrides() {
        let Some(probe) = probe else {
            continue;
        };
        let path = FieldPath::spec().child(field);
        if probe.handler_count() > 1 {
            out.invalid(
                path.clone(),
                probe.handler_count(),
                "only one of exec, httpGet, tcpSocket or grpc may be set",
            );
        }
        if probe.http_get.is_some() && !view.gate.supports_http_probes() {
            out.forbidden(
                path.child("httpGet"),
                "httpGet probes need a server version with HTTP health endpoints",
            );
        }
    }
}

pub(super) fn valid_shard_count(view: &SpecView<'_>, out: &mut Violations) {
    if view.spec.shard_count <= 0 {
        out.invalid(
            FieldPath::spec().child("shardCount"),
            view.spec.shard_count,
            "shardCount must be greater than 0",
        );
    }
}
