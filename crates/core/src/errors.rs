use thiserror::Error;

use crate::domain::rules::RuleId;
use crate::domain::template::TemplateId;
use crate::repository::RepositoryError;

/// Terminal outcomes of one evaluation. None of these are retried by the
/// engine itself; retry policy belongs to the caller.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PricingError {
    /// A `block` threshold fired. Expected business rejection, not a fault.
    #[error("size threshold {threshold_id:?} exceeded: {message}")]
    ThresholdExceeded { threshold_id: RuleId, message: String },
    /// The rule backend could not be reached. Evaluation fails closed rather
    /// than pricing against an empty rule set.
    #[error("pricing rule repository unavailable: {reason}")]
    RepositoryUnavailable { reason: String },
    /// Stored rule data cannot be interpreted. Permanent until an
    /// administrator fixes the offending rule.
    #[error("invalid pricing configuration: {reason}")]
    InvalidConfiguration { rule_id: Option<RuleId>, reason: String },
    #[error("unknown product template {template_id:?}")]
    UnknownTemplate { template_id: TemplateId },
}

impl From<RepositoryError> for PricingError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Unavailable { reason } => Self::RepositoryUnavailable { reason },
            RepositoryError::Decode { reason } => {
                Self::InvalidConfiguration { rule_id: None, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::rules::RuleId;
    use crate::repository::RepositoryError;

    use super::PricingError;

    #[test]
    fn repository_unavailable_maps_to_fail_closed_error() {
        let error: PricingError =
            RepositoryError::Unavailable { reason: "connection refused".to_string() }.into();
        assert!(matches!(error, PricingError::RepositoryUnavailable { .. }));
    }

    #[test]
    fn decode_failure_maps_to_invalid_configuration() {
        let error: PricingError =
            RepositoryError::Decode { reason: "bad threshold value".to_string() }.into();
        assert!(matches!(
            error,
            PricingError::InvalidConfiguration { rule_id: None, .. }
        ));
    }

    #[test]
    fn threshold_error_carries_id_and_message() {
        let error = PricingError::ThresholdExceeded {
            threshold_id: RuleId("thr-1".to_string()),
            message: "width exceeds production limit".to_string(),
        };
        assert!(error.to_string().contains("thr-1"));
        assert!(error.to_string().contains("production limit"));
    }
}
