//! Macros for defining validated name types.

/// Macro to define a validated name with a human-readable kind.
///
/// This generates a newtype wrapper around `String` with:
/// - A `KIND` constant used in error messages
/// - `parse()` to validate from a string slice
/// - `Display`, `FromStr`, `AsRef<str>` and `TryFrom<String>` implementations
/// - `Serialize` and `Deserialize` implementations that re-validate on input
/// - `Ord`, `Hash`, and other standard traits
///
/// A valid name is non-empty and does not contain [`crate::SEPARATOR`].
///
/// # Example
///
/// ```ignore
/// define_name!(ServiceName, "service name");
///
/// let service: ServiceName = "tf-abc".parse()?;
/// assert_eq!(service.as_str(), "tf-abc");
/// ```
#[macro_export]
macro_rules! define_name {
    ($name:ident, $kind:literal) => {
        /// A validated name for this component of a composite ID.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// The human-readable kind used in error messages.
            pub const KIND: &'static str = $kind;

            /// Parses and validates a name.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty { kind: Self::KIND });
                }

                if s.contains($crate::SEPARATOR) {
                    return Err($crate::IdError::ContainsSeparator {
                        kind: Self::KIND,
                        value: s.to_string(),
                    });
                }

                Ok(Self(s.to_string()))
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the name and returns the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
