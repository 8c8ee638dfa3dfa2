//! Structured validation failures
//!
//! A [`Violation`] points at a field of the TesseraDB (`spec.subclusters[2].size`)
//! and says what is wrong with it. Rules push into a shared [`Violations`]
//! list and never stop at the first problem.

use std::fmt;

use tessera_common::Error;

/// One step of a field path
#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Path to a field of the resource, rendered like `spec.subclusters[2].size`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Start a path at a top-level field
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![Segment::Field(root.to_string())],
        }
    }

    /// Path rooted at `spec`
    pub fn spec() -> Self {
        Self::new("spec")
    }

    /// Path rooted at `metadata.annotations[key]`
    pub fn annotation(key: &str) -> Self {
        Self::new("metadata").child("annotations").key(key)
    }

    /// Descend into a named field
    pub fn child(&self, name: &str) -> Self {
        self.push(Segment::Field(name.to_string()))
    }

    /// Descend into a list element
    pub fn index(&self, i: usize) -> Self {
        self.push(Segment::Index(i))
    }

    /// Descend into a map entry
    pub fn key(&self, k: &str) -> Self {
        self.push(Segment::Key(k.to_string()))
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Category of a violation, mirroring Kubernetes field error types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Value is malformed or not allowed here
    Invalid,
    /// Value must be set
    Required,
    /// Change is not allowed in the current state
    Forbidden,
    /// Value collides with another entry
    Duplicate,
    /// Value is not one of the supported literals
    NotSupported,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invalid => "Invalid value",
            Self::Required => "Required value",
            Self::Forbidden => "Forbidden",
            Self::Duplicate => "Duplicate value",
            Self::NotSupported => "Unsupported value",
        };
        f.write_str(s)
    }
}

/// A single rejected field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Field the violation is reported against
    pub path: FieldPath,
    /// Category
    pub kind: ViolationKind,
    /// Offending value, rendered for the message
    pub value: Option<String>,
    /// Human-readable explanation
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "{}: {}: {:?}: {}",
                self.path, self.kind, value, self.message
            ),
            None => write!(f, "{}: {}: {}", self.path, self.kind, self.message),
        }
    }
}

/// Accumulated violations of one admission decision
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violations {
    items: Vec<Violation>,
}

impl Violations {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn push(
        &mut self,
        path: FieldPath,
        kind: ViolationKind,
        value: Option<String>,
        message: impl Into<String>,
    ) {
        self.items.push(Violation {
            path,
            kind,
            value,
            message: message.into(),
        });
    }

    /// Record an invalid value
    pub fn invalid(
        &mut self,
        path: FieldPath,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.push(path, ViolationKind::Invalid, Some(value.to_string()), message);
    }

    /// Record a missing value
    pub fn required(&mut self, path: FieldPath, message: impl Into<String>) {
        self.push(path, ViolationKind::Required, None, message);
    }

    /// Record a change that is not allowed in the current state
    pub fn forbidden(&mut self, path: FieldPath, message: impl Into<String>) {
        self.push(path, ViolationKind::Forbidden, None, message);
    }

    /// Record a value colliding with another entry
    pub fn duplicate(
        &mut self,
        path: FieldPath,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.push(path, ViolationKind::Duplicate, Some(value.to_string()), message);
    }

    /// Record a literal outside the supported set
    pub fn not_supported(
        &mut self,
        path: FieldPath,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.push(path, ViolationKind::NotSupported, Some(value.to_string()), message);
    }

    /// Append every violation of another list
    pub fn extend(&mut self, other: Violations) {
        self.items.extend(other.items);
    }

    /// Returns true if nothing was rejected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate in the order rules reported them
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.items.iter()
    }

    /// Returns true if any violation is reported against exactly `path`
    pub fn has_path(&self, path: &str) -> bool {
        self.items.iter().any(|v| v.path.to_string() == path)
    }

    /// Returns true if any message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.items.iter().any(|v| v.message.contains(needle))
    }

    /// `Ok` when empty, otherwise a validation error carrying every message
    pub fn into_result(self, resource: &str) -> tessera_common::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let field = self.items.first().map(|v| v.path.to_string());
        let message = self.to_string();
        Err(match field {
            Some(field) if self.len() == 1 => Error::validation_for_field(resource, field, message),
            _ => Error::validation_for(resource, message),
        })
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        if rendered.len() == 1 {
            write!(f, "{}", rendered[0])
        } else {
            write!(f, "[{}]", rendered.join(", "))
        }
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_rendering() {
        let path = FieldPath::spec().child("subclusters").index(2).child("size");
        assert_eq!(path.to_string(), "spec.subclusters[2].size");

        let path = FieldPath::annotation("tessera.dev/k-safety");
        assert_eq!(path.to_string(), "metadata.annotations[tessera.dev/k-safety]");
    }

    #[test]
    fn test_violations_accumulate_in_order() {
        let mut violations = Violations::new();
        violations.invalid(
            FieldPath::spec().child("dbName"),
            "a-b",
            "dbName cannot have the '-' character",
        );
        violations.required(
            FieldPath::spec().child("communal").child("path"),
            "communal.path cannot be empty",
        );

        assert_eq!(violations.len(), 2);
        assert!(violations.has_path("spec.dbName"));
        assert!(violations.mentions("communal.path"));
        let rendered = violations.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.contains("spec.dbName: Invalid value: \"a-b\""));
    }

    #[test]
    fn test_into_result() {
        assert!(Violations::new().into_result("db").is_ok());

        let mut violations = Violations::new();
        violations.forbidden(FieldPath::spec().child("image"), "image cannot change");
        let err = violations.into_result("db").unwrap_err();
        assert_eq!(err.resource(), Some("db"));
        assert_eq!(err.field(), Some("spec.image"));
        assert!(err.to_string().contains("image cannot change"));
    }
}
