//! Error types for crosspost

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrosspostError>;

#[derive(Error, Debug)]
pub enum CrosspostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrosspostError {
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrosspostError::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Returns the process exit code for a failure that stops the run
    /// before any platform is attempted
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosspostError::FileRead { .. } => 3,
            CrosspostError::Config(_) | CrosspostError::Platform(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Failed to load dotenv file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Converts an `envy` failure into a variable-level error, restoring the
    /// full variable name from the prefix and the field name
    pub fn from_envy(prefix: &str, error: envy::Error) -> Self {
        match error {
            envy::Error::MissingValue(field) => {
                ConfigError::MissingVar(format!("{}{}", prefix, field.to_uppercase()))
            }
            envy::Error::Custom(reason) => ConfigError::Invalid {
                var: format!("{}*", prefix),
                reason,
            },
        }
    }
}

/// Failures raised by a platform client while publishing.
///
/// The set is closed: every outbound call is classified either as a
/// credential problem or by the stage (upload or submission) it failed in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Submission failed: {0}")]
    Submission(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_file_read() {
        let error = CrosspostError::file_read(
            "message.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
        );
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let config = CrosspostError::Config(ConfigError::Dotenv(dotenvy::Error::EnvVar(
            std::env::VarError::NotPresent,
        )));

        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_file_read() {
        let error = CrosspostError::file_read(
            "images/a.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied"),
        );
        assert_eq!(error.to_string(), "Failed to read images/a.jpg: Permission denied");
    }

    #[test]
    fn test_error_message_formatting_platform() {
        let error: CrosspostError = PlatformError::Upload("HTTP 500".to_string()).into();
        assert_eq!(error.to_string(), "Platform error: Image upload failed: HTTP 500");

        let error: CrosspostError = PlatformError::Submission("HTTP 400".to_string()).into();
        assert_eq!(error.to_string(), "Platform error: Submission failed: HTTP 400");
    }

    #[test]
    fn test_error_message_formatting_config() {
        let error: CrosspostError = ConfigError::Invalid {
            var: "VK_GROUP_ID".to_string(),
            reason: "expected an integer".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid value for VK_GROUP_ID: expected an integer"
        );
    }

    #[test]
    fn test_from_envy_missing_value_restores_variable_name() {
        let error = envy::prefixed("VK_")
            .from_iter::<_, MissingField>(Vec::<(String, String)>::new())
            .unwrap_err();

        match ConfigError::from_envy("VK_", error) {
            ConfigError::MissingVar(var) => assert_eq!(var, "VK_ACCESS_TOKEN"),
            other => panic!("Expected MissingVar, got {:?}", other),
        }
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct MissingField {
        access_token: String,
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Authentication("Invalid token".to_string());
        let cloned = original.clone();

        assert_eq!(original, cloned);
    }
}
