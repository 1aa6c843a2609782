use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The record a request starts from does not exist
    #[error("Can not find identity object: {0}")]
    NotFound(String),

    /// A secondary record met during traversal could not be fetched
    #[error("Failed to retrieve identity object({id}): {reason}")]
    LookupFailed { id: String, reason: String },

    /// A configured external rule does not exist
    #[error("Can not retrieve Connection Rule object: {0}")]
    ConfigurationMissing(String),

    /// The directory rejected a search, count or lookup
    #[error("Directory failure: {0}")]
    UpstreamFailure(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamFailure(msg.into())
    }

    pub fn lookup_failed(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::LookupFailed {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable code used in error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::LookupFailed { .. } => "lookup_failed",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::UpstreamFailure(_) => "upstream_failure",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::Serialization(_) => "serialization",
        }
    }
}
