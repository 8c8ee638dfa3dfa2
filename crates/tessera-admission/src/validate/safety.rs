//! Replica safety: primary presence and k-safety node counts

use tessera_common::annotations;

use super::SpecView;
use crate::violation::{FieldPath, Violations};

/// Fewest primary nodes allowed with k-safety 0
pub const K_SAFETY_0_MIN_NODES: i64 = 1;
/// Most primary nodes allowed with k-safety 0
pub const K_SAFETY_0_MAX_NODES: i64 = 3;
/// Fewest primary nodes allowed with k-safety 1
pub const K_SAFETY_1_MIN_NODES: i64 = 3;

pub(super) fn has_primary_subcluster(view: &SpecView<'_>, out: &mut Violations) {
    if view.spec.subclusters.is_empty() {
        return;
    }
    let has_primary = view
        .spec
        .subclusters
        .iter()
        .any(|sc| sc.type_.is_primary() && view.index.sandbox_of(&sc.name).is_none());
    if !has_primary {
        out.invalid(
            FieldPath::spec().child("subclusters"),
            view.spec.subclusters.len(),
            "there must be at least one primary subcluster outside of any sandbox",
        );
    }
}

/// Nodes counted toward k-safety
///
/// Normally every primary and sandbox-primary node counts. In strict mode
/// only primaries of the main cluster count.
pub(crate) fn counted_primary_nodes(view: &SpecView<'_>, strict: bool) -> i64 {
    view.spec
        .subclusters
        .iter()
        .filter(|sc| {
            if strict {
                sc.type_.is_primary() && !view.index.is_sandbox_primary(&sc.name)
            } else {
                sc.type_.is_primary() || sc.type_.is_sandbox_primary()
            }
        })
        .map(|sc| i64::from(sc.size.max(0)))
        .sum()
}

pub(super) fn valid_k_safety(view: &SpecView<'_>, out: &mut Violations) {
    if view.spec.init_policy.is_schedule_only() {
        return;
    }
    let strict = view.annotations.strict_k_safety_check();
    let count = counted_primary_nodes(view, strict);
    let path = FieldPath::annotation(annotations::K_SAFETY);

    if view.annotations.is_k_safety_0() {
        if !(K_SAFETY_0_MIN_NODES..=K_SAFETY_0_MAX_NODES).contains(&count) {
            out.invalid(
                path,
                count,
                format!(
                    "with k-safety 0, the primary subclusters must have between \
                     {K_SAFETY_0_MIN_NODES} and {K_SAFETY_0_MAX_NODES} nodes in total"
                ),
            );
        }
    } else if count < K_SAFETY_1_MIN_NODES {
        out.invalid(
            path,
            count,
            format!(
                "with k-safety 1, the primary subclusters must have at least \
                 {K_SAFETY_1_MIN_NODES} nodes in total"
            ),
        );
    }
}
