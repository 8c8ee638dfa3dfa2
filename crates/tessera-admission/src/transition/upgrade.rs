//! Changes restricted while an upgrade is in flight, and rename continuity

use std::collections::BTreeSet;

use tessera_common::annotations;

use super::TransitionView;
use crate::violation::{FieldPath, Violations};

pub(super) fn frozen_during_upgrade(view: &TransitionView<'_>, out: &mut Violations) {
    if !view.upgrade_in_progress() {
        return;
    }
    let (old, new) = (view.old, view.new);

    if old.upgrade_policy != new.upgrade_policy {
        out.invalid(
            FieldPath::spec().child("upgradePolicy"),
            &new.upgrade_policy,
            "upgradePolicy cannot change because an upgrade is in progress",
        );
    }

    let routing = FieldPath::spec().child("temporarySubclusterRouting");
    let old_routing = old.temporary_subcluster_routing.as_ref();
    let new_routing = new.temporary_subcluster_routing.as_ref();
    if old_routing.map(|r| &r.names) != new_routing.map(|r| &r.names) {
        out.forbidden(
            routing.child("names"),
            "temporarySubclusterRouting names cannot change while an upgrade is in progress",
        );
    }
    let old_template = old_routing.and_then(|r| r.template.as_ref());
    let new_template = new_routing.and_then(|r| r.template.as_ref());
    if old_template != new_template {
        out.forbidden(
            routing.child("template"),
            "temporarySubclusterRouting template cannot change while an upgrade is in progress",
        );
    }
}

pub(super) fn sandbox_count_during_upgrade(view: &TransitionView<'_>, out: &mut Violations) {
    if !view.upgrade_in_progress() || view.old.sandboxes.len() == view.new.sandboxes.len() {
        return;
    }
    let old: BTreeSet<&str> = view.old.sandboxes.iter().map(|s| s.name.as_str()).collect();
    let new: BTreeSet<&str> = view.new.sandboxes.iter().map(|s| s.name.as_str()).collect();
    let upgrade_sandbox = view
        .new_annotations
        .online_upgrade_sandbox()
        .or(view.old_annotations.online_upgrade_sandbox());

    let unexpected: Vec<&str> = old
        .symmetric_difference(&new)
        .copied()
        .filter(|name| Some(*name) != upgrade_sandbox)
        .collect();
    if !unexpected.is_empty() {
        out.forbidden(
            FieldPath::spec().child("sandboxes"),
            format!(
                "cannot add or remove sandboxes ({}) while an upgrade is in progress; \
                 only the sandbox named by {} may change",
                unexpected.join(", "),
                annotations::ONLINE_UPGRADE_SANDBOX
            ),
        );
    }
}

pub(super) fn subclusters_during_upgrade(view: &TransitionView<'_>, out: &mut Violations) {
    if !view.upgrade_in_progress() {
        return;
    }
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let path = view.subcluster_path(i);
        match view.old_index.subcluster(&sc.name) {
            Some(before) if before.size != sc.size => out.invalid(
                path.child("size"),
                sc.size,
                "subcluster size cannot change while an upgrade is in progress",
            ),
            Some(_) => {}
            None => {
                if !sc.type_.is_secondary() {
                    out.invalid(
                        path.child("type"),
                        &sc.type_,
                        "subclusters added during an upgrade must be secondary",
                    );
                }
                if sc.replica_group().is_none() {
                    out.required(
                        path.child("annotations").key(annotations::REPLICA_GROUP),
                        "subclusters added during an upgrade must carry a replica group",
                    );
                }
            }
        }
    }
}

pub(super) fn rename_continuity(view: &TransitionView<'_>, out: &mut Violations) {
    if view.online_style_upgrade_in_progress() {
        return;
    }
    let mut in_db = view
        .old
        .subclusters
        .iter()
        .filter(|sc| view.status_index.is_added_to_db(&sc.name))
        .peekable();
    if in_db.peek().is_none() {
        return;
    }
    if !in_db.any(|sc| view.new_index.has_subcluster(&sc.name)) {
        out.invalid(
            FieldPath::spec().child("subclusters"),
            view.new.subclusters.len(),
            "at least one subcluster already in the database must keep its name",
        );
    }
}
