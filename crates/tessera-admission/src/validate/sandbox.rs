//! Sandbox names, membership and designated primaries

use std::collections::HashMap;

use tessera_common::crd::{canonical_name, validate_dns1123_subdomain, SandboxMemberType};

use super::SpecView;
use crate::violation::Violations;

pub(super) fn valid_sandbox_names(view: &SpecView<'_>, out: &mut Violations) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (j, sandbox) in view.spec.sandboxes.iter().enumerate() {
        let path = view.sandbox_path(j).child("name");
        if sandbox.name.is_empty() {
            out.required(path, "sandbox name cannot be empty");
            continue;
        }
        if let Err(reason) = validate_dns1123_subdomain(&canonical_name(&sandbox.name)) {
            out.invalid(
                path.clone(),
                &sandbox.name,
                format!("is not a valid sandbox name: {reason}"),
            );
        }
        match first_seen.get(sandbox.name.as_str()) {
            Some(&i) => out.duplicate(
                path,
                &sandbox.name,
                format!("duplicates the name of sandbox[{i}]"),
            ),
            None => {
                first_seen.insert(&sandbox.name, j);
            }
        }
    }
}

pub(super) fn valid_sandbox_members(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sandbox) in view.spec.sandboxes.iter().enumerate() {
        for (k, member) in sandbox.subclusters.iter().enumerate() {
            let path = view.sandbox_path(i).child("subclusters").index(k);

            if let Some(type_) = member.type_.as_ref().filter(|t| !t.is_known()) {
                out.not_supported(
                    path.child("type"),
                    type_,
                    format!(
                        "sandbox subcluster type must be one of: {}",
                        SandboxMemberType::known_values()
                    ),
                );
            }

            let Some(sc) = view.index.subcluster(&member.name) else {
                out.not_supported(
                    path.child("name"),
                    &member.name,
                    "sandbox subclusters must refer to existing subclusters",
                );
                continue;
            };

            if sc.type_.is_primary() {
                out.forbidden(
                    path.child("name"),
                    format!(
                        "subcluster '{}' is a primary of the main cluster and cannot be sandboxed",
                        member.name
                    ),
                );
            }

            let owner = view.index.sandbox_of(&member.name);
            let listed_twice = sandbox.subclusters[..k].iter().any(|m| m.name == member.name);
            if owner != Some(sandbox.name.as_str()) || listed_twice {
                out.duplicate(
                    path.child("name"),
                    &member.name,
                    format!(
                        "subcluster '{}' already belongs to sandbox '{}'",
                        member.name,
                        owner.unwrap_or_default()
                    ),
                );
            }
        }
    }
}

pub(super) fn sandboxes_have_primary(view: &SpecView<'_>, out: &mut Violations) {
    for (i, sandbox) in view.spec.sandboxes.iter().enumerate() {
        if view.index.sandbox_primaries(sandbox).is_empty() {
            out.invalid(
                view.sandbox_path(i).child("subclusters"),
                sandbox.subclusters.len(),
                format!("sandbox '{}' must have at least one primary subcluster", sandbox.name),
            );
        }
    }
}
