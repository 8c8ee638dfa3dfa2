//! Declarative helper for string-backed enums
//!
//! CRD fields such as the subcluster type are free-form strings on the wire.
//! `string_enum!` turns a list of `Variant => "literal"` pairs into a closed
//! enum with an `Other(String)` escape that keeps unknown literals verbatim,
//! so validation can report them instead of deserialization failing.
//! Matching is exact (case-sensitive).

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $lit:literal
            ),+ $(,)?
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// Unrecognised literal, kept verbatim for validation to report
            Other(String),
        }

        impl $name {
            /// Every recognised literal, in declaration order
            pub const KNOWN: &'static [&'static str] = &[$($lit),+];

            /// Wire representation of this value
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $lit,)+
                    Self::Other(s) => s.as_str(),
                }
            }

            /// Returns false for literals outside [`Self::KNOWN`]
            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }

            /// Recognised literals joined for error messages
            pub fn known_values() -> String {
                Self::KNOWN.join(", ")
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($lit => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from(s.as_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from(s))
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(_gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
                // Unknown literals must reach the webhook, so no enum constraint here
                schemars::schema::Schema::Object(schemars::schema::SchemaObject {
                    instance_type: Some(schemars::schema::InstanceType::String.into()),
                    metadata: Some(Box::new(schemars::schema::Metadata {
                        description: Some(format!("One of: {}", Self::known_values())),
                        ..Default::default()
                    })),
                    ..Default::default()
                })
            }
        }
    };
}
