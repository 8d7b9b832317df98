//! Name and composite ID definitions for service metadata.

use crate::{define_name, IdError, SEPARATOR};

// =============================================================================
// Names
// =============================================================================

define_name!(ServiceName, "service name");
define_name!(Namespace, "namespace");

// =============================================================================
// Composite ID
// =============================================================================

/// Identifier of a service metadata document: `{service}/{namespace}`.
///
/// The pair uniquely addresses at most one document on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceMetadataId {
    service: ServiceName,
    namespace: Namespace,
}

impl ServiceMetadataId {
    /// Creates an ID from its validated components.
    #[must_use]
    pub const fn new(service: ServiceName, namespace: Namespace) -> Self {
        Self { service, namespace }
    }

    /// Parses an import identifier of the form `{service}/{namespace}`.
    ///
    /// The input must contain exactly one separator with a non-empty
    /// component on each side. Every shape error maps to
    /// [`IdError::InvalidFormat`], including the empty string.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let invalid = || IdError::InvalidFormat { raw: s.to_string() };

        let Some((service, namespace)) = s.split_once(SEPARATOR) else {
            return Err(invalid());
        };

        let service = ServiceName::parse(service).map_err(|_| invalid())?;
        let namespace = Namespace::parse(namespace).map_err(|_| invalid())?;

        Ok(Self { service, namespace })
    }

    /// Returns the service component.
    #[must_use]
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// Returns the namespace component.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Splits the ID into its components.
    #[must_use]
    pub fn into_parts(self) -> (ServiceName, Namespace) {
        (self.service, self.namespace)
    }
}

impl std::fmt::Display for ServiceMetadataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.service, SEPARATOR, self.namespace)
    }
}

impl std::str::FromStr for ServiceMetadataId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ServiceMetadataId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ServiceMetadataId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_service_name_valid() {
        let name = ServiceName::parse("tf-abc").unwrap();
        assert_eq!(name.as_str(), "tf-abc");
        assert_eq!(name.to_string(), "tf-abc");
    }

    #[test]
    fn test_service_name_empty() {
        let err = ServiceName::parse("").unwrap_err();
        assert!(err.is_empty());
        assert_eq!(err.to_string(), "service name cannot be empty");
    }

    #[test]
    fn test_namespace_rejects_separator() {
        let err = Namespace::parse("a/b").unwrap_err();
        assert!(matches!(err, IdError::ContainsSeparator { kind: "namespace", .. }));
    }

    #[test]
    fn test_metadata_id_parse() {
        let id = ServiceMetadataId::parse("tf-abc/tf-namespace-abc").unwrap();
        assert_eq!(id.service().as_str(), "tf-abc");
        assert_eq!(id.namespace().as_str(), "tf-namespace-abc");
        assert_eq!(id.to_string(), "tf-abc/tf-namespace-abc");
    }

    #[rstest]
    #[case("")]
    #[case("invalid_format")]
    #[case("/")]
    #[case("tf-abc/")]
    #[case("/tf-namespace-abc")]
    #[case("a/b/c")]
    #[case("a//b")]
    fn test_metadata_id_invalid_format(#[case] raw: &str) {
        let err = ServiceMetadataId::parse(raw).unwrap_err();
        assert!(err.is_invalid_format(), "{raw:?} should be rejected");
        assert_eq!(
            err.to_string(),
            "the ID must be in the form '<service name>/<namespace>'"
        );
    }

    #[test]
    fn test_metadata_id_json_roundtrip() {
        let id = ServiceMetadataId::parse("svc/ns").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"svc/ns\"");
        let parsed: ServiceMetadataId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_name_deserialize_validates() {
        let result: Result<ServiceName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_metadata_id_roundtrip(
            service in "[^/]{1,32}",
            namespace in "[^/]{1,32}",
        ) {
            let raw = format!("{service}/{namespace}");
            let id = ServiceMetadataId::parse(&raw).unwrap();
            prop_assert_eq!(id.service().as_str(), service.as_str());
            prop_assert_eq!(id.namespace().as_str(), namespace.as_str());
            prop_assert_eq!(id.to_string(), raw);
        }
    }
}
