//! Interactive Google sign-in with a local redirect listener.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parchment_core::{AuthError, GoogleConfig};
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

use crate::google::{GoogleOAuth2Provider, Prompt};
use crate::storage::{SecureStorage, TokenSet};

const SERVICE_ID: &str = "google";

/// How long to wait for the browser to come back to the callback URL
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PAGE: &str = "<html><body><h1>Calendar connected</h1>\
<p>You can close this window and return to the lodge calendar.</p></body></html>";

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// Obtains and revokes the Calendar credential.
pub struct GoogleSignIn {
    provider: GoogleOAuth2Provider,
    storage: SecureStorage,
    port: u16,
}

impl GoogleSignIn {
    pub fn new(provider: GoogleOAuth2Provider, storage: SecureStorage, port: u16) -> Self {
        Self {
            provider,
            storage,
            port,
        }
    }

    /// Build from config; fails when the OAuth client is still a placeholder.
    pub fn from_config(config: &GoogleConfig, storage: SecureStorage) -> Result<Self, AuthError> {
        if !config.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        let provider =
            GoogleOAuth2Provider::new(config.client_id.clone(), config.client_secret.clone());
        Ok(Self::new(provider, storage, config.callback_port))
    }

    /// Whatever token is on disk, expired or not. Never starts a sign-in.
    pub fn stored_token(&self) -> Option<TokenSet> {
        self.storage.retrieve_token(SERVICE_ID).ok()
    }

    /// Return a usable credential: stored, refreshed, or freshly consented.
    pub async fn request_access_token(&self) -> Result<TokenSet, AuthError> {
        let stored = self.storage.retrieve_token(SERVICE_ID).ok();

        if let Some(tokens) = &stored {
            if !tokens.needs_refresh() {
                return Ok(tokens.clone());
            }
            if let Some(refresh) = &tokens.refresh_token {
                match self.refresh(refresh).await {
                    Ok(renewed) => return Ok(renewed),
                    Err(e) => tracing::warn!("Token refresh failed, falling back to consent: {}", e),
                }
            }
        }

        // A returning user skips the account chooser
        let prompt = if stored.is_some() {
            Prompt::None
        } else {
            Prompt::Consent
        };
        self.interactive(prompt).await
    }

    /// Revoke at Google and forget the stored token.
    ///
    /// The local token is deleted even when Google rejects the revocation.
    pub async fn revoke(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        // The refresh token outlives the access token and revokes the whole grant
        let token = tokens.refresh_token.as_deref().unwrap_or(&tokens.access_token);
        let remote = self.provider.revoke(token).await;

        self.storage
            .delete_token(SERVICE_ID)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;

        remote.map_err(|e| AuthError::RevokeFailed(e.to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .provider
            .refresh_token(refresh_token)
            .await
            .map_err(|e| AuthError::OAuthFailed(e.to_string()))?;
        let tokens = response.into_token_set(Some(refresh_token.to_string()));
        self.persist(&tokens)?;
        Ok(tokens)
    }

    async fn interactive(&self, prompt: Prompt) -> Result<TokenSet, AuthError> {
        let (auth_url, state) = self.provider.authorization_url(self.port, prompt);

        let params = self.await_callback(&auth_url).await?;
        let code = parse_callback(&params, &state)?;

        let response = self
            .provider
            .exchange_code(&code, self.port)
            .await
            .map_err(|e| AuthError::OAuthFailed(e.to_string()))?;
        let tokens = response.into_token_set(None);
        self.persist(&tokens)?;

        tracing::info!("Google sign-in completed");
        Ok(tokens)
    }

    fn persist(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        self.storage
            .store_token(SERVICE_ID, tokens)
            .map_err(|e| AuthError::StorageError(e.to_string()))
    }

    /// Serve `/callback` until Google redirects back, then shut the listener down.
    async fn await_callback(&self, auth_url: &str) -> Result<HashMap<String, String>, AuthError> {
        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(
                |params: HashMap<String, String>, tx: CallbackSender| async move {
                    if let Some(sender) = tx.lock().await.take() {
                        let _ = sender.send(params);
                    }
                    Ok::<_, warp::Rejection>(warp::reply::html(CALLBACK_PAGE))
                },
            );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], self.port), async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|_| AuthError::PortInUse(self.port))?;
        tokio::spawn(server);
        tracing::info!("Waiting for OAuth callback on {}", addr);

        if let Err(e) = webbrowser::open(auth_url) {
            tracing::warn!("Could not open browser ({}); visit {} to sign in", e, auth_url);
        }

        let outcome = tokio::time::timeout(CALLBACK_TIMEOUT, rx).await;
        let _ = shutdown_tx.send(());

        match outcome {
            Ok(Ok(params)) => Ok(params),
            Ok(Err(_)) => Err(AuthError::OAuthFailed("callback listener closed".into())),
            Err(_) => Err(AuthError::OAuthFailed("timed out waiting for consent".into())),
        }
    }
}

/// Extract the authorization code, checking the CSRF state.
fn parse_callback(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<String, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(if error == "access_denied" {
            AuthError::OAuthCancelled
        } else {
            AuthError::OAuthFailed(error.clone())
        });
    }

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(AuthError::OAuthFailed("CSRF state mismatch".into()));
    }

    params
        .get("code")
        .filter(|c| !c.is_empty())
        .cloned()
        .ok_or_else(|| AuthError::OAuthFailed("callback carried no code".into()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::google::GoogleEndpoints;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sign_in(server_uri: &str, dir: &std::path::Path) -> GoogleSignIn {
        let provider = GoogleOAuth2Provider::with_endpoints(
            "id".into(),
            "secret".into(),
            GoogleEndpoints {
                auth_url: format!("{}/auth", server_uri),
                token_url: format!("{}/token", server_uri),
                revoke_url: format!("{}/revoke", server_uri),
            },
        );
        GoogleSignIn::new(provider, SecureStorage::new(dir), 0)
    }

    fn tokens(expires_in: i64, refresh: Option<&str>) -> TokenSet {
        TokenSet {
            access_token: "stored".into(),
            refresh_token: refresh.map(str::to_string),
            expires_at: chrono::Utc::now().timestamp() + expires_in,
            scopes: vec![],
        }
    }

    #[test]
    fn test_parse_callback_ok() {
        let code = parse_callback(&params(&[("code", "c0de"), ("state", "s")]), "s").unwrap();
        assert_eq!(code, "c0de");
    }

    #[test]
    fn test_parse_callback_state_mismatch() {
        let err = parse_callback(&params(&[("code", "c0de"), ("state", "other")]), "s");
        assert!(matches!(err, Err(AuthError::OAuthFailed(msg)) if msg.contains("CSRF")));
    }

    #[test]
    fn test_parse_callback_denied() {
        let err = parse_callback(&params(&[("error", "access_denied"), ("state", "s")]), "s");
        assert!(matches!(err, Err(AuthError::OAuthCancelled)));
    }

    #[test]
    fn test_from_config_requires_real_client() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            GoogleSignIn::from_config(&GoogleConfig::default(), SecureStorage::new(dir.path()));
        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_valid_stored_token_is_reused() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let signin = sign_in(&server.uri(), dir.path());
        let stored = tokens(3600, None);
        signin.storage.store_token(SERVICE_ID, &stored).unwrap();

        let got = signin.request_access_token().await.unwrap();

        assert_eq!(got, stored);
    }

    #[test]
    fn test_stored_token_includes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let signin = sign_in("http://127.0.0.1:9", dir.path());
        assert_eq!(signin.stored_token(), None);

        let expired = tokens(-10, Some("keep-me"));
        signin.storage.store_token(SERVICE_ID, &expired).unwrap();
        assert_eq!(signin.stored_token(), Some(expired));
    }

    #[tokio::test]
    async fn test_revoke_prefers_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token=keep-me"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let signin = sign_in(&server.uri(), dir.path());
        let stored = tokens(-10, Some("keep-me"));
        signin.storage.store_token(SERVICE_ID, &stored).unwrap();

        signin.revoke(&stored).await.unwrap();
        assert!(!signin.storage.has_token(SERVICE_ID));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600,
                "token_type": "Bearer",
                "scope": "calendar.readonly"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let signin = sign_in(&server.uri(), dir.path());
        signin
            .storage
            .store_token(SERVICE_ID, &tokens(-10, Some("keep-me")))
            .unwrap();

        let got = signin.request_access_token().await.unwrap();

        assert_eq!(got.access_token, "fresh");
        assert_eq!(got.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(signin.storage.retrieve_token(SERVICE_ID).unwrap(), got);
    }

    #[tokio::test]
    async fn test_revoke_deletes_local_token_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let signin = sign_in(&server.uri(), dir.path());
        let stored = tokens(3600, None);
        signin.storage.store_token(SERVICE_ID, &stored).unwrap();

        let result = signin.revoke(&stored).await;

        assert!(matches!(result, Err(AuthError::RevokeFailed(_))));
        assert!(!signin.storage.has_token(SERVICE_ID));
    }
}
