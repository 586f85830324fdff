//! Error types for ext-catalog

/// Result type for ext-catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding catalog entities and content.
///
/// Decode errors are memoized on the entity that produced them, so every
/// variant is `Clone` and carries decoder messages as strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A property marked as required is absent from the entity.
    #[error("required property '{property_type}' not found on entity '{entity}'")]
    MissingProperty {
        entity: String,
        property_type: String,
    },

    /// A property is present but its JSON value does not decode.
    #[error("property '{property_type}' ('{value}') on entity '{entity}' could not be parsed: {reason}")]
    PropertyParse {
        entity: String,
        property_type: String,
        value: String,
        reason: String,
    },

    /// The bundle's version string is not valid semver.
    #[error("could not parse semver ({version}) for entity '{entity}': {reason}")]
    InvalidVersion {
        entity: String,
        version: String,
        reason: String,
    },

    /// A required-package range declared by a bundle does not parse.
    #[error(
        "invalid version range '{range}' for required package '{package}' on entity '{entity}': {reason}"
    )]
    InvalidRequiredPackageRange {
        entity: String,
        package: String,
        range: String,
        reason: String,
    },

    /// A version range expression does not parse.
    #[error("invalid version range '{range}': {reason}")]
    InvalidVersionRange { range: String, reason: String },

    /// A catalog content document could not be read.
    #[error("invalid catalog content: {reason}")]
    ContentParse { reason: String },
}
