//! Centralized error types for Parchment.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the workspace
//! - Provides user-friendly messages suitable for the calendar surface
//! - Preserves full error context for logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for display.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::InvalidArgument(_) => "That calendar month cannot be shown.",
        }
    }
}

/// Authentication errors (OAuth consent, tokens, revocation).
///
/// None of these are fatal: the calendar keeps its connect control visible.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("OAuth flow cancelled by user")]
    OAuthCancelled,

    #[error("Secure storage error: {0}")]
    StorageError(String),

    #[error("Port {0} already in use for OAuth callback")]
    PortInUse(u16),

    #[error("Google OAuth client is not configured")]
    NotConfigured,

    #[error("Token revocation failed: {0}")]
    RevokeFailed(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::OAuthFailed(_) => "Sign-in failed. Please try again.",
            AuthError::OAuthCancelled => "Sign-in was cancelled.",
            AuthError::StorageError(_) => "Failed to save credentials. Please try again.",
            AuthError::PortInUse(_) => "Sign-in port is busy. Close other apps and try again.",
            AuthError::NotConfigured => "Google Calendar is not set up for this site yet.",
            AuthError::RevokeFailed(_) => "Disconnecting from Google did not complete.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let auth_err = AuthError::OAuthCancelled;
        let app_err: AppError = auth_err.into();
        assert!(matches!(app_err, AppError::Auth(AuthError::OAuthCancelled)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Auth(AuthError::NotConfigured);
        assert_eq!(
            app_err.user_message(),
            "Google Calendar is not set up for this site yet."
        );
    }

    #[test]
    fn test_config_error_wraps_into_app_error() {
        let app_err: AppError = ConfigError::Invalid("calendar.time_zone".into()).into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
        assert!(app_err.user_message().contains("settings"));
    }

    #[test]
    fn test_auth_messages_are_non_empty() {
        let errors = [
            AuthError::OAuthFailed("denied".into()),
            AuthError::OAuthCancelled,
            AuthError::StorageError("disk".into()),
            AuthError::PortInUse(8080),
            AuthError::NotConfigured,
            AuthError::RevokeFailed("400".into()),
        ];

        for err in &errors {
            assert!(!err.user_message().is_empty(), "{:?}", err);
        }
    }
}
