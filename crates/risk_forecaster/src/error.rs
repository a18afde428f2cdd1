//! Request-level error classification.

use config::ArtifactError;
use feature_extractor::FeatureError;
use ml_model::ModelError;
use recommender::RecommendError;

/// Message returned for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

/// Whether a failure is the caller's fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusClass {
    /// HTTP status code the class is reported with.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::ClientError => 400,
            Self::ServerError => 500,
        }
    }
}

/// Every failure the service can report.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request is malformed or incomplete.
    #[error("{0}")]
    Validation(String),

    /// A fitted scaler does not match the assembled feature layout.
    #[error("feature contract violated: {0}")]
    FeatureContract(String),

    /// A required artifact is absent.
    #[error("required artifact is missing: {path}")]
    ArtifactMissing { path: String },

    /// An artifact exists but cannot be loaded.
    #[error("failed to load artifact: {0}")]
    Artifact(String),

    /// The hosted text generator failed.
    #[error("text generation failed: {0}")]
    UpstreamGeneration(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    #[must_use]
    pub const fn status_class(&self) -> StatusClass {
        match self {
            Self::Validation(_) => StatusClass::ClientError,
            _ => StatusClass::ServerError,
        }
    }

    /// Message safe to return to the caller. Only validation failures carry
    /// detail.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            _ => INTERNAL_ERROR_MESSAGE.to_owned(),
        }
    }
}

impl From<FeatureError> for ServiceError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::InvalidInputShape { .. }
            | FeatureError::Malformed { .. }
            | FeatureError::MissingFeature { .. }
            | FeatureError::NonFiniteFeature { .. } => Self::Validation(err.to_string()),
            FeatureError::FeatureContract { .. } => Self::FeatureContract(err.to_string()),
            FeatureError::ScalerShape { .. } | FeatureError::ScalerFormat(_) => {
                Self::Artifact(err.to_string())
            }
        }
    }
}

impl From<ArtifactError> for ServiceError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Missing { path } => Self::ArtifactMissing { path },
            ArtifactError::Store { .. } => Self::Artifact(err.to_string()),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Config(_) | ModelError::Record(_) => Self::Artifact(err.to_string()),
            ModelError::Output(_) | ModelError::Poisoned => Self::Internal(err.to_string()),
        }
    }
}

impl From<RecommendError> for ServiceError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::EmptyMealName => Self::Validation(err.to_string()),
            RecommendError::Database(_) => Self::Artifact(err.to_string()),
            RecommendError::Generation { .. }
            | RecommendError::MissingApiKey
            | RecommendError::Transport(_) => Self::UpstreamGeneration(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_client_error_with_detail() {
        let err = ServiceError::from(FeatureError::MissingFeature {
            record: "user_data".to_owned(),
            field: "bmi",
        });

        assert_eq!(err.status_class(), StatusClass::ClientError);
        assert_eq!(err.status_class().status_code(), 400);
        assert!(err.public_message().contains("bmi"));
    }

    #[test]
    fn test_server_errors_do_not_leak_detail() {
        let err = ServiceError::from(RecommendError::Generation {
            status: Some(503),
            message: "backend exploded at /srv/secret".to_owned(),
        });

        assert!(matches!(err, ServiceError::UpstreamGeneration(_)));
        assert_eq!(err.status_class(), StatusClass::ServerError);
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_contract_violation_is_fatal_class() {
        let err = ServiceError::from(FeatureError::FeatureContract {
            artifact: "feature scaler",
            expected: vec!["age".to_owned()],
            found: vec!["bmi".to_owned()],
        });

        assert!(matches!(err, ServiceError::FeatureContract(_)));
        assert_eq!(err.status_class(), StatusClass::ServerError);
    }

    #[test]
    fn test_missing_artifact_keeps_path() {
        let err = ServiceError::from(ArtifactError::Missing {
            path: "feature_scaler.json".to_owned(),
        });
        assert!(matches!(
            err,
            ServiceError::ArtifactMissing { ref path } if path == "feature_scaler.json"
        ));
    }
}
