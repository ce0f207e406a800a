use thiserror::Error;

/// Errors raised at the string-keyed edges of the coordination layer.
///
/// These indicate a programming defect at the call site (a key that is not
/// part of the configured enumeration), never a runtime condition. The typed
/// APIs cannot produce them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// A category, overlay or workflow key outside its enumeration.
    #[error("unknown {kind} key '{key}'")]
    UnknownKey { kind: &'static str, key: String },

    /// A loading scope string that names no configured scope.
    #[error("unknown loading scope '{0}'")]
    UnknownScope(String),
}

impl CoordinatorError {
    pub fn unknown_key(kind: &'static str, key: impl Into<String>) -> Self {
        CoordinatorError::UnknownKey {
            kind,
            key: key.into(),
        }
    }
}
