//! Error types for structure-type resolution and loading

/// Why a structure type could not be loaded.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StructureTypeError {
    /// A dependency token did not have the `name(min;max)` shape
    #[error("invalid dependency `{token}`: {reason}")]
    InvalidDependency { token: String, reason: String },

    /// Declaration list could not be parsed
    #[error("invalid structure-type declarations: {reason}")]
    InvalidDeclaration { reason: String },

    /// A second type declared the same name
    #[error("structure type `{name}` is declared more than once")]
    DuplicateType { name: String },

    #[error("`{name}` depends on `{dependency}`, which is not available")]
    MissingDependency { name: String, dependency: String },

    #[error("`{name}` needs `{dependency}` version {min}..={max}, found {found}")]
    VersionOutOfRange {
        name: String,
        dependency: String,
        found: u32,
        min: u32,
        max: u32,
    },

    #[error("`{name}` is part of a dependency cycle")]
    DependencyCycle { name: String },

    /// A (transitive) dependency failed, so this type is never attempted
    #[error("`{name}` skipped: dependency `{dependency}` failed")]
    DependencyFailed { name: String, dependency: String },

    /// The host's loader refused the type
    #[error("failed to load `{name}`")]
    LoadFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StructureTypeError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidDependency { .. } | Self::InvalidDeclaration { .. } => "parse",
            Self::DuplicateType { .. }
            | Self::MissingDependency { .. }
            | Self::VersionOutOfRange { .. }
            | Self::DependencyCycle { .. } => "resolution",
            Self::DependencyFailed { .. } => "cascade",
            Self::LoadFailed { .. } => "load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failure_keeps_its_source() {
        let err = StructureTypeError::LoadFailed {
            name: "flag".into(),
            source: anyhow::anyhow!("jar is corrupt"),
        };
        assert_eq!(err.category(), "load");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "jar is corrupt");
    }

    #[test]
    fn range_message() {
        let err = StructureTypeError::VersionOutOfRange {
            name: "clock".into(),
            dependency: "windmill".into(),
            found: 4,
            min: 1,
            max: 3,
        };
        assert_eq!(
            err.to_string(),
            "`clock` needs `windmill` version 1..=3, found 4"
        );
    }
}
