//! Lookup tables built once per admission call
//!
//! Every rule needs "which sandbox owns this subcluster" or "where was this
//! subcluster in the old list" style lookups. The tables are built here from
//! one spec or status snapshot and passed down by reference; nothing is
//! cached between calls.

use std::collections::HashMap;
use std::hash::Hash;

use tessera_common::crd::{
    Sandbox, SandboxMemberType, SandboxStatus, SandboxSubcluster, Subcluster, SubclusterStatus,
    TesseraDBSpec, TesseraDBStatus,
};

/// Map each item by `key`. The first item wins on duplicate keys.
pub fn index_by<'a, T, K, F>(items: &'a [T], key: F) -> HashMap<K, &'a T>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        map.entry(key(item)).or_insert(item);
    }
    map
}

/// Map each item's key to its position. The first item wins on duplicate keys.
pub fn position_by<'a, T, K, F>(items: &'a [T], key: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut map = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        map.entry(key(item)).or_insert(i);
    }
    map
}

/// Lookups over a spec
#[derive(Debug, Default)]
pub struct SpecIndex<'a> {
    subclusters: HashMap<&'a str, &'a Subcluster>,
    subcluster_positions: HashMap<&'a str, usize>,
    subclusters_by_canonical: HashMap<String, &'a Subcluster>,
    sandboxes: HashMap<&'a str, &'a Sandbox>,
    sandbox_positions: HashMap<&'a str, usize>,
    sandbox_of: HashMap<&'a str, &'a str>,
    members: HashMap<&'a str, &'a SandboxSubcluster>,
}

impl<'a> SpecIndex<'a> {
    /// Build every lookup from one spec
    pub fn build(spec: &'a TesseraDBSpec) -> Self {
        let mut sandbox_of = HashMap::new();
        let mut members = HashMap::new();
        for sandbox in &spec.sandboxes {
            for member in &sandbox.subclusters {
                sandbox_of.entry(member.name.as_str()).or_insert(sandbox.name.as_str());
                members.entry(member.name.as_str()).or_insert(member);
            }
        }

        Self {
            subclusters: index_by(&spec.subclusters, |sc| sc.name.as_str()),
            subcluster_positions: position_by(&spec.subclusters, |sc| sc.name.as_str()),
            subclusters_by_canonical: index_by(&spec.subclusters, Subcluster::canonical_name),
            sandboxes: index_by(&spec.sandboxes, |sb| sb.name.as_str()),
            sandbox_positions: position_by(&spec.sandboxes, |sb| sb.name.as_str()),
            sandbox_of,
            members,
        }
    }

    /// Subcluster by literal name
    pub fn subcluster(&self, name: &str) -> Option<&'a Subcluster> {
        self.subclusters.get(name).copied()
    }

    /// Subcluster whose canonical name matches `name`'s canonical form
    pub fn subcluster_by_canonical(&self, canonical: &str) -> Option<&'a Subcluster> {
        self.subclusters_by_canonical.get(canonical).copied()
    }

    /// Position of a subcluster in `spec.subclusters`
    pub fn subcluster_position(&self, name: &str) -> Option<usize> {
        self.subcluster_positions.get(name).copied()
    }

    /// Returns true if a subcluster of that name exists
    pub fn has_subcluster(&self, name: &str) -> bool {
        self.subclusters.contains_key(name)
    }

    /// Sandbox by name
    pub fn sandbox(&self, name: &str) -> Option<&'a Sandbox> {
        self.sandboxes.get(name).copied()
    }

    /// Position of a sandbox in `spec.sandboxes`
    pub fn sandbox_position(&self, name: &str) -> Option<usize> {
        self.sandbox_positions.get(name).copied()
    }

    /// Sandbox a subcluster is a member of
    pub fn sandbox_of(&self, subcluster: &str) -> Option<&'a str> {
        self.sandbox_of.get(subcluster).copied()
    }

    /// Declared member type of a sandboxed subcluster
    pub fn member_type(&self, subcluster: &str) -> Option<&'a SandboxMemberType> {
        self.members.get(subcluster).and_then(|m| m.type_.as_ref())
    }

    /// Returns true if the subcluster is its sandbox's designated primary
    ///
    /// A member is the designated primary when it is declared `primary` in
    /// the sandbox or its own type is `sandboxprimary`.
    pub fn is_sandbox_primary(&self, subcluster: &str) -> bool {
        if self.sandbox_of(subcluster).is_none() {
            return false;
        }
        matches!(self.member_type(subcluster), Some(SandboxMemberType::Primary))
            || self
                .subcluster(subcluster)
                .is_some_and(|sc| sc.type_.is_sandbox_primary())
    }

    /// Designated primaries of one sandbox
    pub fn sandbox_primaries(&self, sandbox: &'a Sandbox) -> Vec<&'a str> {
        sandbox
            .subclusters
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| self.sandbox_of(name) == Some(sandbox.name.as_str()))
            .filter(|name| self.is_sandbox_primary(name))
            .collect()
    }
}

/// Lookups over an observed status
#[derive(Debug, Default)]
pub struct StatusIndex<'a> {
    subclusters: HashMap<&'a str, &'a SubclusterStatus>,
    subcluster_positions: HashMap<&'a str, usize>,
    sandboxes: HashMap<&'a str, &'a SandboxStatus>,
    sandbox_of: HashMap<&'a str, &'a str>,
}

impl<'a> StatusIndex<'a> {
    /// Build every lookup from one status
    pub fn build(status: &'a TesseraDBStatus) -> Self {
        let mut sandbox_of = HashMap::new();
        for sandbox in &status.sandboxes {
            for member in &sandbox.subclusters {
                sandbox_of.entry(member.as_str()).or_insert(sandbox.name.as_str());
            }
        }

        Self {
            subclusters: index_by(&status.subclusters, |sc| sc.name.as_str()),
            subcluster_positions: position_by(&status.subclusters, |sc| sc.name.as_str()),
            sandboxes: index_by(&status.sandboxes, |sb| sb.name.as_str()),
            sandbox_of,
        }
    }

    /// Observed state of a subcluster
    pub fn subcluster(&self, name: &str) -> Option<&'a SubclusterStatus> {
        self.subclusters.get(name).copied()
    }

    /// Position of a subcluster in `status.subclusters`
    pub fn subcluster_position(&self, name: &str) -> Option<usize> {
        self.subcluster_positions.get(name).copied()
    }

    /// Observed state of a sandbox
    pub fn sandbox(&self, name: &str) -> Option<&'a SandboxStatus> {
        self.sandboxes.get(name).copied()
    }

    /// Sandbox the reconciler reports a subcluster in
    pub fn sandbox_of(&self, subcluster: &str) -> Option<&'a str> {
        self.sandbox_of.get(subcluster).copied()
    }

    /// Returns true if the reconciler reports the subcluster as shut down
    pub fn is_shut_down(&self, subcluster: &str) -> bool {
        self.subcluster(subcluster).is_some_and(|s| s.shutdown)
    }

    /// Returns true if the subcluster has nodes in the database
    pub fn is_added_to_db(&self, subcluster: &str) -> bool {
        self.subcluster(subcluster)
            .is_some_and(|s| s.added_to_db_count > 0)
    }
}
