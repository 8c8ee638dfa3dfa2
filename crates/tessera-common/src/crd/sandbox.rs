//! Sandboxes: isolated groups of subclusters carved out of the main cluster

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::canonical_name;

string_enum! {
    /// Intended role of a subcluster inside its sandbox
    pub enum SandboxMemberType {
        /// Sandbox primary
        Primary => "primary",
        /// Sandbox secondary
        Secondary => "secondary",
    }
    default = Primary;
}

/// Reference from a sandbox to one of the cluster's subclusters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SandboxSubcluster {
    /// Name of the subcluster in `spec.subclusters`
    pub name: String,

    /// Intended role inside the sandbox
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<SandboxMemberType>,
}

/// An isolated group of subclusters with its own primary
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Sandbox {
    /// Sandbox name
    pub name: String,

    /// Image run by the sandbox; defaults to the cluster image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Member subclusters
    #[serde(default)]
    pub subclusters: Vec<SandboxSubcluster>,

    /// Stop every member of the sandbox
    #[serde(default)]
    pub shutdown: bool,
}

impl Sandbox {
    /// Name with `_` replaced by `-`
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }

    /// Returns true if `subcluster` is a member
    pub fn contains(&self, subcluster: &str) -> bool {
        self.subclusters.iter().any(|m| m.name == subcluster)
    }
}
