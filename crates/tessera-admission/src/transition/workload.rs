//! StatefulSet naming of existing subclusters

use tessera_common::annotations;

use super::TransitionView;
use crate::violation::Violations;

pub(super) fn statefulset_override_immutable(view: &TransitionView<'_>, out: &mut Violations) {
    for (i, sc) in view.new.subclusters.iter().enumerate() {
        let Some(before) = view.old_index.subcluster_by_canonical(&sc.canonical_name()) else {
            continue;
        };
        let old_name = before.statefulset_name_override();
        let new_name = sc.statefulset_name_override();
        if old_name != new_name {
            out.invalid(
                view.subcluster_path(i)
                    .child("annotations")
                    .key(annotations::STATEFULSET_NAME_OVERRIDE),
                new_name.unwrap_or_default(),
                format!(
                    "the StatefulSet name of existing subcluster {} cannot change (was '{}')",
                    sc.name,
                    old_name.unwrap_or_default()
                ),
            );
        }
    }
}
