//! Loader errors.

use crate::injector::InjectError;
use std::time::Duration;

/// Failure of a load, acquire or registry operation.
///
/// Cloneable so a single in-flight load can hand the same outcome to every
/// waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// No descriptor is registered under this name.
    #[error("resource '{0}' is not registered")]
    NotRegistered(String),

    /// The injector reported a failure.
    #[error("failed to load resource '{name}': {cause}")]
    LoadFailed {
        /// Resource name.
        name: String,
        /// What the injector reported.
        #[source]
        cause: InjectError,
    },

    /// The injector did not settle within the configured load timeout.
    #[error("loading resource '{name}' timed out after {after:?}")]
    TimedOut {
        /// Resource name.
        name: String,
        /// The configured timeout.
        after: Duration,
    },

    /// A prerequisite failed to load, so this resource was never injected.
    #[error("resource '{name}' needs '{prerequisite}': {cause}")]
    PrerequisiteFailed {
        /// Resource name.
        name: String,
        /// The prerequisite that failed.
        prerequisite: String,
        /// Why the prerequisite failed.
        #[source]
        cause: Box<ResourceError>,
    },

    /// The resource requires itself through its prerequisites.
    #[error("resource '{name}' has a prerequisite cycle")]
    PrerequisiteCycle {
        /// Resource name.
        name: String,
    },

    /// The load task ended without producing a result.
    #[error("loading resource '{name}' was aborted")]
    Aborted {
        /// Resource name.
        name: String,
    },
}

impl ResourceError {
    /// The resource the error refers to.
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::NotRegistered(name)
            | Self::LoadFailed { name, .. }
            | Self::TimedOut { name, .. }
            | Self::PrerequisiteFailed { name, .. }
            | Self::PrerequisiteCycle { name }
            | Self::Aborted { name } => name,
        }
    }

    /// Whether retrying the same load could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotRegistered(_) | Self::PrerequisiteCycle { .. } => false,
            Self::PrerequisiteFailed { cause, .. } => cause.is_retryable(),
            Self::LoadFailed { .. } | Self::TimedOut { .. } | Self::Aborted { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_resource() {
        let err = ResourceError::LoadFailed {
            name: "lodash".into(),
            cause: InjectError::Fetch("404".into()),
        };
        assert_eq!(err.resource(), "lodash");
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "failed to load resource 'lodash': fetch failed: 404"
        );
    }

    #[test]
    fn unregistered_is_not_retryable() {
        let err = ResourceError::NotRegistered("ghost".into());
        assert!(!err.is_retryable());
        assert_eq!(err.resource(), "ghost");
    }

    #[test]
    fn prerequisite_failures_inherit_retryability() {
        let missing = ResourceError::PrerequisiteFailed {
            name: "react-dom".into(),
            prerequisite: "react".into(),
            cause: Box::new(ResourceError::NotRegistered("react".into())),
        };
        assert_eq!(missing.resource(), "react-dom");
        assert!(!missing.is_retryable());

        let offline = ResourceError::PrerequisiteFailed {
            name: "react-dom".into(),
            prerequisite: "react".into(),
            cause: Box::new(ResourceError::Aborted {
                name: "react".into(),
            }),
        };
        assert!(offline.is_retryable());
    }
}
