use thiserror::Error;

/// Reasons the engine refuses to produce a result table.
///
/// Every variant is raised before any row is emitted, so callers never see a
/// partial table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CvpError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no sliding fee schedule for service '{service}'")]
    MissingSchedule { service: String },

    #[error("malformed tier '{tier}' for service '{service}': {reason}")]
    MalformedTier {
        service: String,
        tier: String,
        reason: String,
    },

    #[error("tier fractions for service '{service}' sum to {sum:.6}, expected 1.0")]
    UnbalancedFractions { service: String, sum: f64 },
}

impl CvpError {
    pub(crate) fn malformed(service: &str, tier: &str, reason: impl Into<String>) -> Self {
        CvpError::MalformedTier {
            service: service.to_string(),
            tier: tier.to_string(),
            reason: reason.into(),
        }
    }
}
