//! Sandbox membership discipline across an update

use super::TransitionView;
use crate::violation::{FieldPath, Violations};

pub(super) fn sandboxed_size_frozen(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let Some(before) = view.old_index.subcluster(&sc.name) else {
            continue;
        };
        let Some(sandbox) = view.old_index.sandbox_of(&sc.name) else {
            continue;
        };
        if before.size != sc.size && view.new_index.sandbox_of(&sc.name) == Some(sandbox) {
            out.invalid(
                view.subcluster_path(i).child("size"),
                sc.size,
                format!(
                    "cannot change the size of subcluster {} while it is in sandbox {sandbox}",
                    sc.name
                ),
            );
        }
    }
}

pub(super) fn sandboxed_removal(view: &TransitionView<'_>, out: &mut Violations) {
    for sc in &view.old.subclusters {
        if view.new_index.has_subcluster(&sc.name)
            || view.old_index.sandbox_of(&sc.name).is_none()
        {
            continue;
        }
        if let Some(sandbox) = view.new_index.sandbox_of(&sc.name) {
            let i = view.new_index.sandbox_position(sandbox).unwrap_or_default();
            out.forbidden(
                view.sandbox_path(i).child("subclusters"),
                format!(
                    "subcluster {} is removed from the cluster \
                     but still listed in sandbox {sandbox}",
                    sc.name
                ),
            );
        }
    }
}

pub(super) fn sandbox_primary_kept(view: &TransitionView<'_>, out: &mut Violations) {
    for sandbox in &view.old.sandboxes {
        let Some(i) = view.new_index.sandbox_position(&sandbox.name) else {
            continue;
        };
        for primary in view.old_index.sandbox_primaries(sandbox) {
            let owner = view.new_index.sandbox_of(primary);
            let demoted = match owner {
                None => true,
                Some(name) if name == sandbox.name => !view.new_index.is_sandbox_primary(primary),
                // moving elsewhere is reported by sandbox_primary_not_moved
                Some(_) => false,
            };
            if demoted {
                out.forbidden(
                    view.sandbox_path(i).child("subclusters"),
                    format!(
                        "cannot remove or demote primary subcluster {primary} of sandbox {} \
                         unless the sandbox is removed",
                        sandbox.name
                    ),
                );
            }
        }
    }
}

pub(super) fn sandbox_primary_not_moved(view: &TransitionView<'_>, out: &mut Violations) {
    for sandbox in &view.old.sandboxes {
        if view.new_index.sandbox(&sandbox.name).is_none() {
            continue;
        }
        for primary in view.old_index.sandbox_primaries(sandbox) {
            let Some(target) = view.new_index.sandbox_of(primary) else {
                continue;
            };
            if target != sandbox.name {
                let i = view.new_index.sandbox_position(target).unwrap_or_default();
                out.forbidden(
                    FieldPath::spec().child("sandboxes").index(i).child("subclusters"),
                    format!(
                        "cannot move primary subcluster {primary} from sandbox {} to {target} \
                         unless {} is removed",
                        sandbox.name, sandbox.name
                    ),
                );
            }
        }
    }
}
