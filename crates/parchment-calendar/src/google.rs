//! [`EventSource`] backed by Google sign-in and the Calendar API.

use std::time::Duration;

use anyhow::Context;
use parchment_auth::{GoogleSignIn, SecureStorage};
use parchment_core::{AuthError, Config};

use crate::client::CalendarClient;
use crate::context::Readiness;
use crate::error::FetchError;
use crate::source::{Credential, EventQuery, EventSource};
use crate::types::CalendarEvent;

pub struct GoogleEventSource {
    /// Absent until an OAuth client is configured
    sign_in: Option<GoogleSignIn>,
    api: CalendarClient,
}

impl GoogleEventSource {
    pub fn new(sign_in: Option<GoogleSignIn>, api: CalendarClient) -> Self {
        Self { sign_in, api }
    }

    /// Build the API client and, when credentials are configured, the sign-in flow.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.calendar.request_timeout_secs);
        let api = CalendarClient::with_base_url(&config.calendar.api_base_url, timeout)
            .context("Failed to build Calendar API client")?;

        let storage = SecureStorage::new(config.config_dir.join("tokens"));
        let sign_in = match GoogleSignIn::from_config(&config.google, storage) {
            Ok(sign_in) => Some(sign_in),
            Err(AuthError::NotConfigured) => {
                tracing::warn!("Google OAuth client not configured; calendar sign-in disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(sign_in, api))
    }

    /// Credential already on disk, if any. Never starts an interactive sign-in.
    pub fn stored_credential(&self) -> Option<Credential> {
        self.sign_in.as_ref().and_then(GoogleSignIn::stored_token)
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            api_ready: true,
            identity_ready: self.sign_in.is_some(),
        }
    }
}

impl EventSource for GoogleEventSource {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        match &self.sign_in {
            Some(sign_in) => sign_in.request_access_token().await,
            None => Err(AuthError::NotConfigured),
        }
    }

    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        self.api.list_events(credential, query).await
    }

    async fn revoke(&self, credential: &Credential) -> Result<(), AuthError> {
        match &self.sign_in {
            Some(sign_in) => sign_in.revoke(credential).await,
            None => Err(AuthError::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use parchment_core::GoogleConfig;

    fn config(google: GoogleConfig) -> Config {
        let dir = std::env::temp_dir().join("parchment-google-source-test");
        Config {
            config_dir: dir,
            google,
            ..Config::default()
        }
    }

    fn configured() -> GoogleConfig {
        GoogleConfig {
            client_id: "1234.apps.googleusercontent.com".into(),
            client_secret: "secret".into(),
            ..GoogleConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unconfigured_source_cannot_connect() {
        let source = GoogleEventSource::from_config(&config(GoogleConfig::default())).unwrap();
        assert!(!source.readiness().can_connect());
        assert!(matches!(
            source.authenticate().await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn test_configured_source_is_ready() {
        let source = GoogleEventSource::from_config(&config(configured())).unwrap();
        assert!(source.readiness().can_connect());
    }

    #[test]
    fn test_stored_credential_reads_token_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            config_dir: dir.path().to_path_buf(),
            google: configured(),
            ..Config::default()
        };
        let source = GoogleEventSource::from_config(&config).unwrap();
        assert!(source.stored_credential().is_none());

        let expired = Credential {
            access_token: "old".into(),
            refresh_token: Some("refresh".into()),
            expires_at: 0,
            scopes: vec![],
        };
        SecureStorage::new(dir.path().join("tokens"))
            .store_token("google", &expired)
            .unwrap();

        assert_eq!(source.stored_credential(), Some(expired));
    }

    #[test]
    fn test_unconfigured_source_has_no_stored_credential() {
        let source = GoogleEventSource::from_config(&config(GoogleConfig::default())).unwrap();
        assert!(source.stored_credential().is_none());
    }
}
