use thiserror::Error;

/// Load-time and registration errors.
///
/// Runtime matching failures (wrong step, premature end, late calls) are not
/// errors at the API surface: they fail and flush the affected instance and
/// are reported on its error channel instead.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A branch step without a nested body. Fatal for this one flow
    /// definition; other flows keep loading.
    #[error("incomplete branch step {step} in flow `{flow}`")]
    MalformedFlow { flow: String, step: usize },

    /// `init` was called with a name/version not present in the registry.
    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    /// A bare flow name matched more than one loaded version.
    #[error("flow `{0}` is loaded in multiple versions, a version is required")]
    AmbiguousVersion(String),

    /// `only_for` and `not_for` are mutually exclusive on one appender.
    #[error("appender config: {0}")]
    InvalidConfig(String),

    #[error("flow source: {0}")]
    Io(#[from] std::io::Error),

    #[error("flow source: {0}")]
    Parse(#[from] serde_yaml::Error),
}
