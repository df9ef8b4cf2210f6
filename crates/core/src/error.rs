use crate::validation::FieldErrors;
use thiserror::Error;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Refused locally because the session lacks the permission.
    #[error("Missing permission: {0}")]
    Forbidden(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Push channel error: {0}")]
    Push(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CrmError {
    /// Message suitable for a toast. Server-provided messages are passed
    /// through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            CrmError::Api { message, .. } => message.clone(),
            CrmError::Validation(errors) => errors.to_string(),
            CrmError::Transport(_) => "Could not reach the server".to_string(),
            CrmError::Forbidden(_) => "You do not have permission to do that".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::Api { status: 404, .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CrmError::Api { status: 401 | 403, .. } | CrmError::Forbidden(_)
        )
    }
}

impl From<config::ConfigError> for CrmError {
    fn from(err: config::ConfigError) -> Self {
        CrmError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_passthrough() {
        let err = CrmError::Api {
            status: 409,
            message: "Email already registered".into(),
        };
        assert_eq!(err.user_message(), "Email already registered");
        assert_eq!(err.to_string(), "API error (409): Email already registered");
    }

    #[test]
    fn test_status_helpers() {
        let missing = CrmError::Api {
            status: 404,
            message: "Lead not found".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_unauthorized());

        let forbidden = CrmError::Api {
            status: 403,
            message: "Forbidden".into(),
        };
        assert!(forbidden.is_unauthorized());
        assert!(CrmError::Forbidden("leads:delete".into()).is_unauthorized());
    }

    #[test]
    fn test_transport_message_is_generic() {
        let err = CrmError::Transport("connection refused (os error 111)".into());
        assert_eq!(err.user_message(), "Could not reach the server");
    }
}
