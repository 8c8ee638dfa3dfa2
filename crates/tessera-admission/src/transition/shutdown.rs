//! Shutdown propagation between sandboxes and their subclusters

use tessera_common::crd::Sandbox;

use super::TransitionView;
use crate::violation::{FieldPath, Violations};

impl TransitionView<'_> {
    /// Subcluster is stopped according to the old spec or the reconciler
    fn subcluster_shut_down(&self, name: &str) -> bool {
        self.old_index.subcluster(name).is_some_and(|sc| sc.shutdown)
            || self.status_index.is_shut_down(name)
    }

    /// Sandbox is stopped in the old spec or has a stopped member
    fn sandbox_has_shutdown(&self, sandbox: &Sandbox) -> bool {
        sandbox.shutdown
            || sandbox
                .subclusters
                .iter()
                .any(|m| self.subcluster_shut_down(&m.name))
    }
}

pub(super) fn new_objects_start_running(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        if sc.shutdown && !view.old_index.has_subcluster(&sc.name) {
            out.invalid(
                view.subcluster_path(i).child("shutdown"),
                sc.shutdown,
                "a new subcluster must start with shutdown set to false",
            );
        }
    }
    for (i, sandbox) in view.new.sandboxes.iter().enumerate() {
        if sandbox.shutdown && view.old_index.sandbox(&sandbox.name).is_none() {
            out.invalid(
                view.sandbox_path(i).child("shutdown"),
                sandbox.shutdown,
                "a new sandbox must start with shutdown set to false",
            );
        }
    }
}

pub(super) fn no_scaling_while_shut_down(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let Some(before) = view.old_index.subcluster(&sc.name) else {
            continue;
        };
        if before.size == sc.size {
            continue;
        }
        let sandbox_stopped = view
            .old_index
            .sandbox_of(&sc.name)
            .and_then(|name| view.old_index.sandbox(name))
            .is_some_and(|sb| sb.shutdown);
        if sc.shutdown || view.subcluster_shut_down(&sc.name) || sandbox_stopped {
            out.invalid(
                view.subcluster_path(i).child("size"),
                sc.size,
                format!("cannot scale subcluster {} while it is shut down", sc.name),
            );
        }
    }
}

pub(super) fn sandbox_driven_shutdown(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let Some(before) = view.old_index.subcluster(&sc.name) else {
            continue;
        };
        if before.shutdown == sc.shutdown {
            continue;
        }
        let Some(name) = view.new_index.sandbox_of(&sc.name) else {
            continue;
        };
        let still_stopped = view.old_index.sandbox(name).is_some_and(|sb| sb.shutdown)
            && view.new_index.sandbox(name).is_some_and(|sb| sb.shutdown);
        if still_stopped {
            out.forbidden(
                view.subcluster_path(i).child("shutdown"),
                format!(
                    "shutdown of subcluster {} is controlled by sandbox {name} \
                     while the sandbox is shut down",
                    sc.name
                ),
            );
        }
    }
}

pub(super) fn no_removal_while_shut_down(view: &TransitionView<'_>, out: &mut Violations) {
    let removed_subclusters = view
        .old
        .subclusters
        .iter()
        .filter(|sc| !view.new_index.has_subcluster(&sc.name))
        .filter(|sc| view.subcluster_shut_down(&sc.name));
    for sc in removed_subclusters {
        out.forbidden(
            FieldPath::spec().child("subclusters"),
            format!("cannot remove subcluster {} while it is shut down", sc.name),
        );
    }

    let removed_sandboxes = view
        .old
        .sandboxes
        .iter()
        .filter(|sb| sb.shutdown && view.new_index.sandbox(&sb.name).is_none());
    for sandbox in removed_sandboxes {
        out.forbidden(
            FieldPath::spec().child("sandboxes"),
            format!("cannot remove sandbox {} while it is shut down", sandbox.name),
        );
    }
}

pub(super) fn no_sandbox_image_change_while_shut_down(
    view: &TransitionView<'_>,
    out: &mut Violations,
) {
    for (i, sandbox) in view.new.sandboxes.iter().enumerate() {
        let Some(before) = view.old_index.sandbox(&sandbox.name) else {
            continue;
        };
        if before.image == sandbox.image {
            continue;
        }
        if sandbox.shutdown || view.sandbox_has_shutdown(before) {
            out.forbidden(
                view.sandbox_path(i).child("image"),
                format!(
                    "cannot change the image of sandbox {} \
                     while it or one of its subclusters is shut down",
                    sandbox.name
                ),
            );
        }
    }
}

pub(super) fn no_sandboxing_into_shut_down(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sandbox) in view.new.sandboxes.iter().enumerate() {
        let before = view.old_index.sandbox(&sandbox.name);
        let target_stopped =
            sandbox.shutdown || before.is_some_and(|sb| view.sandbox_has_shutdown(sb));
        if !target_stopped {
            continue;
        }
        let entering = sandbox
            .subclusters
            .iter()
            .filter(|m| view.old_index.sandbox_of(&m.name) != Some(sandbox.name.as_str()));
        for member in entering {
            out.forbidden(
                view.sandbox_path(i).child("subclusters"),
                format!(
                    "cannot add subcluster {} to sandbox {} \
                     while the sandbox or one of its subclusters is shut down",
                    member.name, sandbox.name
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::validate_transition;
    use tessera_common::crd::{
        Sandbox, SandboxMemberType, SandboxSubcluster, SubclusterStatus, SubclusterType,
        TesseraDB, TesseraDBStatus,
    };

    fn with_sandbox(shutdown: bool) -> TesseraDB {
        let mut db = valid_db();
        for name in ["sc2", "sc3"] {
            db.spec
                .subclusters
                .push(subcluster(name, 1, SubclusterType::Secondary));
        }
        db.spec.sandboxes = vec![Sandbox {
            name: "sand1".to_string(),
            image: Some("tessera/server:24.4.0".to_string()),
            subclusters: vec![SandboxSubcluster {
                name: "sc2".to_string(),
                type_: Some(SandboxMemberType::Primary),
            }],
            shutdown,
        }];
        db
    }

    fn none() -> TesseraDBStatus {
        TesseraDBStatus::default()
    }

    #[test]
    fn test_new_objects_start_running() {
        let old = valid_db();
        let mut new = old.clone();
        let mut sc = subcluster("fresh", 1, SubclusterType::Secondary);
        sc.shutdown = true;
        new.spec.subclusters.push(sc);
        assert!(validate_transition(&old, &none(), &new).has_path("spec.subclusters[1].shutdown"));
    }

    #[test]
    fn test_scale_guard_reads_spec_and_status() {
        let mut old = valid_db();
        old.spec.subclusters[0].shutdown = true;
        let mut new = old.clone();
        new.spec.subclusters[0].size = 4;
        assert!(validate_transition(&old, &none(), &new).mentions("cannot scale subcluster main"));

        old.spec.subclusters[0].shutdown = false;
        new.spec.subclusters[0].shutdown = false;
        assert!(validate_transition(&old, &none(), &new).is_empty());

        let status = TesseraDBStatus {
            subclusters: vec![SubclusterStatus {
                name: "main".to_string(),
                shutdown: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_transition(&old, &status, &new).mentions("cannot scale subcluster main"));
    }

    #[test]
    fn test_sandbox_controls_member_shutdown() {
        let mut old = with_sandbox(true);
        old.spec.subclusters[1].shutdown = true;
        let mut new = old.clone();
        new.spec.subclusters[1].shutdown = false;
        assert!(validate_transition(&old, &none(), &new).mentions("controlled by sandbox sand1"));

        new.spec.sandboxes[0].shutdown = false;
        assert!(!validate_transition(&old, &none(), &new).mentions("controlled by sandbox"));
    }

    #[test]
    fn test_no_removal_while_shut_down() {
        let mut old = with_sandbox(true);
        old.spec.subclusters[2].shutdown = true;
        let mut new = old.clone();
        new.spec.subclusters.remove(2);
        new.spec.sandboxes.clear();
        let violations = validate_transition(&old, &none(), &new);
        assert!(violations.mentions("cannot remove subcluster sc3"));
        assert!(violations.mentions("cannot remove sandbox sand1"));
    }

    #[test]
    fn test_no_image_change_while_member_shut_down() {
        let mut old = with_sandbox(false);
        old.spec.subclusters[1].shutdown = true;
        let mut new = old.clone();
        new.spec.sandboxes[0].image = Some("tessera/server:25.1.0".to_string());
        assert!(validate_transition(&old, &none(), &new).has_path("spec.sandboxes[0].image"));

        old.spec.subclusters[1].shutdown = false;
        new.spec.subclusters[1].shutdown = false;
        assert!(validate_transition(&old, &none(), &new).is_empty());
    }

    #[test]
    fn test_no_sandboxing_into_shut_down_sandbox() {
        let old = with_sandbox(true);
        let mut new = old.clone();
        new.spec.sandboxes[0].subclusters.push(SandboxSubcluster {
            name: "sc3".to_string(),
            type_: None,
        });
        assert!(validate_transition(&old, &none(), &new).mentions("cannot add subcluster sc3"));

        let old = with_sandbox(false);
        let mut new = old.clone();
        new.spec.sandboxes[0].subclusters.push(SandboxSubcluster {
            name: "sc3".to_string(),
            type_: None,
        });
        assert!(validate_transition(&old, &none(), &new).is_empty());
    }
}
