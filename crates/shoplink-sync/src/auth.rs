//! # Auth Gateway
//!
//! Owns the marketplace credentials: app key and secret, the access and
//! refresh tokens, and the bound shop. Every authenticated call goes
//! through [`AuthGateway::authorized`].
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Credential States                                │
//! │                                                                         │
//! │   ┌──────────────┐  exchange code  ┌──────────────┐                     │
//! │   │ Unconfigured │────────────────►│  Authorized  │◄──────┐             │
//! │   │ (no app key, │                 └──────┬───────┘       │ refresh     │
//! │   │  no refresh  │                        │ expiry /      │             │
//! │   │  token, or   │                        │ auth error    │             │
//! │   │  refresh     │                        ▼               │             │
//! │   │  expired)    │◄─────────────── ┌──────────────┐       │             │
//! │   └──────────────┘ refresh expired │   Expired    │───────┘             │
//! │                                    └──────────────┘                     │
//! │                                                                         │
//! │  authorized(op):                                                        │
//! │    Expired at start      → refresh first                                │
//! │    op fails AuthRejected → persist expiry = now, refresh once, retry    │
//! │    retry fails again     → AuthRetryExhausted (fatal)                   │
//! │    refresh refused       → drop tokens, back to Unconfigured            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage
//! Credentials live as one JSON document under [`CREDENTIALS_KEY`] in the
//! settings store. The app secret and both tokens are encrypted with the
//! [`SecretCipher`]; expiries are absolute unix seconds.
//!
//! Decrypted credentials are cached for a short TTL. Every write
//! invalidates the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crypto::SecretCipher;
use crate::error::{SyncError, SyncResult};
use crate::provider::{AccessContext, AppCredentials, RemoteCatalogProvider, TokenGrant};
use crate::shops::ShopBinding;
use crate::store::SettingsStore;

/// Settings key holding the credentials document.
pub const CREDENTIALS_KEY: &str = "marketplace.credentials";

/// Expiry values at or above this are already absolute unix seconds.
const ABSOLUTE_EXPIRY_THRESHOLD: i64 = 1_000_000_000;

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Converts a provider expiry into absolute unix seconds.
///
/// Zero or negative means the provider did not say.
pub fn absolute_expiry(value: i64, now: i64) -> Option<i64> {
    if value <= 0 {
        None
    } else if value >= ABSOLUTE_EXPIRY_THRESHOLD {
        Some(value)
    } else {
        Some(now.saturating_add(value))
    }
}

// =============================================================================
// Credential Documents
// =============================================================================

/// Credentials as stored: secrets encrypted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default)]
    app_key: Option<String>,
    #[serde(default)]
    app_secret: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    access_expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_expires_at: Option<i64>,
    #[serde(default)]
    shop_cipher: Option<String>,
    #[serde(default)]
    shop_id: Option<String>,
    #[serde(default)]
    shop_name: Option<String>,
    #[serde(default)]
    seller_name: Option<String>,
}

impl StoredCredentials {
    fn clear_tokens(&mut self) {
        self.access_token = None;
        self.access_expires_at = None;
        self.refresh_token = None;
        self.refresh_expires_at = None;
        self.seller_name = None;
    }

    fn clear_shop(&mut self) {
        self.shop_cipher = None;
        self.shop_id = None;
        self.shop_name = None;
    }
}

/// Decrypted credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_expires_at: Option<i64>,
    pub refresh_token: Option<String>,
    pub refresh_expires_at: Option<i64>,
    pub shop_cipher: Option<String>,
    pub shop_id: Option<String>,
    pub shop_name: Option<String>,
    pub seller_name: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("has_app_secret", &self.app_secret.is_some())
            .field("has_access_token", &self.access_token.is_some())
            .field("access_expires_at", &self.access_expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("shop_cipher", &self.shop_cipher)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// State at the given instant (unix seconds).
    pub fn state_at(&self, now: i64) -> AuthState {
        if self.app_key.is_none() || self.app_secret.is_none() {
            return AuthState::Unconfigured;
        }
        if self.refresh_token.is_none() || self.refresh_expires_at.is_some_and(|at| at <= now) {
            return AuthState::Unconfigured;
        }
        match (&self.access_token, self.access_expires_at) {
            (None, _) => AuthState::Expired,
            (Some(_), Some(at)) if at <= now => AuthState::Expired,
            _ => AuthState::Authorized,
        }
    }

    /// The bound shop, if one was selected.
    pub fn shop_binding(&self) -> Option<ShopBinding> {
        self.shop_cipher.as_ref().map(|cipher| ShopBinding {
            cipher: cipher.clone(),
            id: self.shop_id.clone(),
            name: self.shop_name.clone(),
        })
    }

    fn app(&self) -> SyncResult<AppCredentials> {
        match (&self.app_key, &self.app_secret) {
            (Some(app_key), Some(app_secret)) => Ok(AppCredentials {
                app_key: app_key.clone(),
                app_secret: app_secret.clone(),
            }),
            _ => Err(SyncError::config(
                "app key and secret are not configured; run `shoplink configure`",
            )),
        }
    }
}

/// Where the credentials are in their lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unconfigured,
    Authorized,
    Expired,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unconfigured => write!(f, "unconfigured"),
            AuthState::Authorized => write!(f, "authorized"),
            AuthState::Expired => write!(f, "expired"),
        }
    }
}

/// Operator-facing summary of the credentials. Contains no secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub state: AuthState,
    pub app_key: Option<String>,
    pub seller_name: Option<String>,
    pub shop: Option<ShopBinding>,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

struct CachedCredentials {
    credentials: Credentials,
    fetched_at: Instant,
}

// =============================================================================
// Gateway
// =============================================================================

/// Token lifecycle manager.
pub struct AuthGateway {
    provider: Arc<dyn RemoteCatalogProvider>,
    settings: Arc<dyn SettingsStore>,
    cipher: SecretCipher,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedCredentials>>,
}

impl AuthGateway {
    pub fn new(
        provider: Arc<dyn RemoteCatalogProvider>,
        settings: Arc<dyn SettingsStore>,
        cipher: SecretCipher,
        cache_ttl: Duration,
    ) -> Self {
        AuthGateway {
            provider,
            settings,
            cipher,
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Decrypted credentials, served from the cache while it is fresh.
    pub async fn credentials(&self) -> SyncResult<Credentials> {
        {
            let guard = self.cache.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(cached.credentials.clone());
                }
            }
        }

        let mut guard = self.cache.write().await;

        // Double-check after acquiring write lock
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(cached.credentials.clone());
            }
        }

        let stored = self.load_stored().await?;
        let credentials = self.decrypt(&stored)?;
        debug!(?credentials, "Loaded credentials from settings");

        *guard = Some(CachedCredentials {
            credentials: credentials.clone(),
            fetched_at: Instant::now(),
        });
        Ok(credentials)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SyncResult<AuthState> {
        Ok(self.credentials().await?.state_at(now_secs()))
    }

    /// Secret-free summary for display.
    pub async fn status(&self) -> SyncResult<AuthStatus> {
        let creds = self.credentials().await?;
        Ok(AuthStatus {
            state: creds.state_at(now_secs()),
            app_key: creds.app_key.clone(),
            seller_name: creds.seller_name.clone(),
            shop: creds.shop_binding(),
            access_expires_at: creds
                .access_expires_at
                .and_then(|at| DateTime::from_timestamp(at, 0)),
            refresh_expires_at: creds
                .refresh_expires_at
                .and_then(|at| DateTime::from_timestamp(at, 0)),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stores the app key and encrypted secret.
    ///
    /// Tokens and the shop binding belong to the app they were issued for,
    /// so they are cleared when the key changes.
    pub async fn configure_app(&self, app_key: &str, app_secret: &str) -> SyncResult<()> {
        let app_key = app_key.trim();
        let app_secret = app_secret.trim();
        if app_key.is_empty() {
            return Err(SyncError::config("app key must not be empty"));
        }
        if app_secret.is_empty() {
            return Err(SyncError::config("app secret must not be empty"));
        }

        let encrypted = self.cipher.encrypt(app_secret)?;
        self.update_stored(|stored| {
            if stored.app_key.as_deref() != Some(app_key) {
                if stored.app_key.is_some() {
                    info!("App key changed, clearing tokens and shop binding");
                }
                stored.clear_tokens();
                stored.clear_shop();
            }
            stored.app_key = Some(app_key.to_string());
            stored.app_secret = Some(encrypted);
        })
        .await?;

        info!(app_key = %app_key, "App credentials configured");
        Ok(())
    }

    /// Exchanges a one-time authorization code and persists the tokens.
    pub async fn exchange_authorization_code(&self, auth_code: &str) -> SyncResult<()> {
        let auth_code = auth_code.trim();
        if auth_code.is_empty() {
            return Err(SyncError::config("authorization code must not be empty"));
        }

        let app = self.credentials().await?.app()?;
        let grant = self.provider.exchange_code(&app, auth_code).await?;
        self.persist_tokens(&grant).await?;

        info!(seller = ?grant.seller_name, "Authorization code exchanged");
        Ok(())
    }

    /// Runs the refresh grant with the stored refresh token.
    ///
    /// When the marketplace refuses the grant the stored tokens are dropped,
    /// which leaves the gateway `Unconfigured` until a new code is exchanged.
    /// Transport failures keep the tokens so a later call can try again.
    pub async fn refresh(&self) -> SyncResult<()> {
        let creds = self.credentials().await?;
        let app = creds.app()?;

        let refresh_token = creds.refresh_token.as_deref().ok_or_else(|| {
            SyncError::config("not authorized; run `shoplink authorize` with a new code")
        })?;
        if creds.refresh_expires_at.is_some_and(|at| at <= now_secs()) {
            return Err(SyncError::config(
                "refresh token expired; run `shoplink authorize` with a new code",
            ));
        }

        let grant = match self.provider.refresh_token(&app, refresh_token).await {
            Ok(grant) => grant,
            Err(err) if refresh_was_refused(&err) => {
                warn!(error = %err, "Refresh token rejected, clearing tokens");
                self.update_stored(StoredCredentials::clear_tokens).await?;
                return Err(SyncError::config(format!(
                    "refresh token rejected ({}); run `shoplink authorize` with a new code",
                    err
                )));
            }
            Err(err) => return Err(err),
        };
        self.persist_tokens(&grant).await?;

        info!("Access token refreshed");
        Ok(())
    }

    /// Encrypts and stores a token grant.
    pub async fn persist_tokens(&self, grant: &TokenGrant) -> SyncResult<()> {
        let access = self.cipher.encrypt(&grant.access_token)?;
        let refresh = self.cipher.encrypt(&grant.refresh_token)?;
        let now = now_secs();

        self.update_stored(|stored| {
            stored.access_token = Some(access);
            stored.access_expires_at = absolute_expiry(grant.access_token_expire_in, now);
            stored.refresh_token = Some(refresh);
            stored.refresh_expires_at = absolute_expiry(grant.refresh_token_expire_in, now);
            if grant.seller_name.is_some() {
                stored.seller_name = grant.seller_name.clone();
            }
        })
        .await
    }

    /// Forgets tokens and the shop binding; the app configuration stays.
    pub async fn disconnect(&self) -> SyncResult<()> {
        self.update_stored(|stored| {
            stored.clear_tokens();
            stored.clear_shop();
        })
        .await?;
        info!("Disconnected from marketplace");
        Ok(())
    }

    /// Persists the selected shop.
    pub async fn bind_shop(&self, binding: &ShopBinding) -> SyncResult<()> {
        self.update_stored(|stored| {
            stored.shop_cipher = Some(binding.cipher.clone());
            stored.shop_id = binding.id.clone();
            stored.shop_name = binding.name.clone();
        })
        .await
    }

    /// Records that the access token was rejected.
    async fn mark_expired(&self) -> SyncResult<()> {
        let now = now_secs();
        self.update_stored(|stored| stored.access_expires_at = Some(now))
            .await
    }

    // =========================================================================
    // Authenticated Calls
    // =========================================================================

    /// Credentials for one signed call, refreshing first when expired.
    pub async fn access_context(&self) -> SyncResult<AccessContext> {
        let mut creds = self.credentials().await?;

        match creds.state_at(now_secs()) {
            AuthState::Unconfigured => {
                creds.app()?;
                return Err(SyncError::config(
                    "not authorized; run `shoplink authorize` with an authorization code",
                ));
            }
            AuthState::Expired => {
                debug!("Access token expired, refreshing before call");
                self.refresh().await?;
                creds = self.credentials().await?;
            }
            AuthState::Authorized => {}
        }

        let app = creds.app()?;
        let access_token = creds
            .access_token
            .ok_or_else(|| SyncError::config("no access token after refresh"))?;

        Ok(AccessContext {
            app_key: app.app_key,
            app_secret: app.app_secret,
            access_token,
        })
    }

    /// Runs `op` with valid credentials.
    ///
    /// An auth rejection marks the token expired, refreshes once and retries
    /// once. A second rejection is returned as `AuthRetryExhausted`.
    pub async fn authorized<T, F, Fut>(&self, op: F) -> SyncResult<T>
    where
        F: Fn(AccessContext) -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let ctx = self.access_context().await?;
        match op(ctx).await {
            Err(err) if err.is_auth_rejected() => {
                warn!(error = %err, "Access token rejected, refreshing once");
                self.mark_expired().await?;
                self.refresh().await?;

                let ctx = self.access_context().await?;
                match op(ctx).await {
                    Err(err) if err.is_auth_rejected() => {
                        warn!(error = %err, "Access token rejected again after refresh");
                        Err(SyncError::AuthRetryExhausted(err.to_string()))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    // =========================================================================
    // Storage
    // =========================================================================

    async fn load_stored(&self) -> SyncResult<StoredCredentials> {
        match self.settings.get(CREDENTIALS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| SyncError::config(format!("stored credentials are corrupt: {}", e))),
            None => Ok(StoredCredentials::default()),
        }
    }

    /// Read-modify-write of the credentials document.
    async fn update_stored(&self, mutate: impl FnOnce(&mut StoredCredentials)) -> SyncResult<()> {
        let mut guard = self.cache.write().await;

        let mut stored = self.load_stored().await?;
        mutate(&mut stored);
        let raw = serde_json::to_string(&stored)?;
        self.settings.put(CREDENTIALS_KEY, &raw).await?;

        *guard = None;
        Ok(())
    }

    fn decrypt(&self, stored: &StoredCredentials) -> SyncResult<Credentials> {
        let open = |field: &Option<String>| -> SyncResult<Option<String>> {
            field.as_deref().map(|v| self.cipher.decrypt(v)).transpose()
        };

        Ok(Credentials {
            app_key: stored.app_key.clone(),
            app_secret: open(&stored.app_secret)?,
            access_token: open(&stored.access_token)?,
            access_expires_at: stored.access_expires_at,
            refresh_token: open(&stored.refresh_token)?,
            refresh_expires_at: stored.refresh_expires_at,
            shop_cipher: stored.shop_cipher.clone(),
            shop_id: stored.shop_id.clone(),
            shop_name: stored.shop_name.clone(),
            seller_name: stored.seller_name.clone(),
        })
    }
}

/// True when the marketplace answered the refresh grant with a refusal.
fn refresh_was_refused(err: &SyncError) -> bool {
    err.is_auth_error() || matches!(err, SyncError::Provider { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{authorized_gateway, configured_gateway, ScriptedProvider};

    fn grant(access_expire_in: i64, refresh_expire_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: "acc-x".into(),
            access_token_expire_in: access_expire_in,
            refresh_token: "ref-x".into(),
            refresh_token_expire_in: refresh_expire_in,
            seller_name: None,
        }
    }

    #[test]
    fn test_absolute_expiry() {
        assert_eq!(absolute_expiry(3600, 1_700_000_000), Some(1_700_003_600));
        assert_eq!(absolute_expiry(1_800_000_000, 1_700_000_000), Some(1_800_000_000));
        assert_eq!(absolute_expiry(0, 1_700_000_000), None);
    }

    #[test]
    fn test_state_machine() {
        let now = 1_700_000_000;
        let mut creds = Credentials::default();
        assert_eq!(creds.state_at(now), AuthState::Unconfigured);

        creds.app_key = Some("k".into());
        creds.app_secret = Some("s".into());
        assert_eq!(creds.state_at(now), AuthState::Unconfigured);

        creds.refresh_token = Some("r".into());
        creds.refresh_expires_at = Some(now + 100);
        assert_eq!(creds.state_at(now), AuthState::Expired);

        creds.access_token = Some("a".into());
        creds.access_expires_at = Some(now + 10);
        assert_eq!(creds.state_at(now), AuthState::Authorized);

        creds.access_expires_at = Some(now);
        assert_eq!(creds.state_at(now), AuthState::Expired);

        creds.refresh_expires_at = Some(now - 1);
        assert_eq!(creds.state_at(now), AuthState::Unconfigured);
    }

    #[tokio::test]
    async fn test_credentials_at_rest_are_encrypted() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, settings) = authorized_gateway(provider).await;

        let raw = settings.get(CREDENTIALS_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("app-secret"));
        assert!(!raw.contains("access-1"));
        assert!(!raw.contains("refresh-1"));
        assert!(raw.contains("\"v1:"));

        let creds = gateway.credentials().await.unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("access-1"));
        assert_eq!(gateway.state().await.unwrap(), AuthState::Authorized);
    }

    #[tokio::test]
    async fn test_configure_app_rejects_blank_and_clears_on_key_change() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider).await;

        assert!(gateway.configure_app(" ", "s").await.is_err());
        assert!(gateway.configure_app("k", "").await.is_err());

        // Same key keeps tokens.
        gateway.configure_app("app-key", "rotated").await.unwrap();
        assert_eq!(gateway.state().await.unwrap(), AuthState::Authorized);

        gateway.configure_app("other-key", "s").await.unwrap();
        assert_eq!(gateway.state().await.unwrap(), AuthState::Unconfigured);
    }

    #[tokio::test]
    async fn test_authorized_call_refreshes_once_and_retries() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider.clone()).await;
        provider.reject_next(1);

        let p = provider.clone();
        let shops = gateway
            .authorized(|ctx| {
                let p = p.clone();
                async move { p.list_shops(&ctx).await }
            })
            .await
            .unwrap();

        assert!(shops.is_empty());
        assert_eq!(provider.refreshes(), 1);
        assert_eq!(provider.seen_tokens(), vec!["access-1", "access-2"]);
        assert_eq!(gateway.state().await.unwrap(), AuthState::Authorized);
    }

    #[tokio::test]
    async fn test_second_rejection_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider.clone()).await;
        provider.reject_next(2);

        let p = provider.clone();
        let err = gateway
            .authorized(|ctx| {
                let p = p.clone();
                async move { p.list_shops(&ctx).await }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::AuthRetryExhausted(_)));
        assert_eq!(provider.refreshes(), 1);
        assert_eq!(provider.seen_tokens().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_before_call() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider.clone()).await;

        // Absolute expiry in 2001.
        gateway
            .persist_tokens(&grant(1_000_000_001, 86_400))
            .await
            .unwrap();
        assert_eq!(gateway.state().await.unwrap(), AuthState::Expired);

        let ctx = gateway.access_context().await.unwrap();
        assert_eq!(provider.refreshes(), 1);
        assert_eq!(ctx.access_token, "access-2");
    }

    #[tokio::test]
    async fn test_unconfigured_and_expired_refresh_are_config_errors() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = configured_gateway(provider.clone()).await;
        assert!(gateway.access_context().await.unwrap_err().is_config_error());

        gateway
            .persist_tokens(&grant(1_000_000_001, 1_000_000_001))
            .await
            .unwrap();
        assert_eq!(gateway.state().await.unwrap(), AuthState::Unconfigured);
        assert!(gateway.refresh().await.unwrap_err().is_config_error());
        assert_eq!(provider.refreshes(), 0);
    }

    #[tokio::test]
    async fn test_refused_refresh_drops_tokens() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider.clone()).await;
        gateway
            .bind_shop(&ShopBinding {
                cipher: "c1".into(),
                id: None,
                name: None,
            })
            .await
            .unwrap();
        provider.fail_refreshes(|| SyncError::Provider {
            code: 36004005,
            message: "refresh token invalid".into(),
            request_id: None,
        });
        provider.reject_next(1);

        let p = provider.clone();
        let err = gateway
            .authorized(|ctx| {
                let p = p.clone();
                async move { p.list_shops(&ctx).await }
            })
            .await
            .unwrap_err();

        assert!(err.is_config_error(), "{err}");
        assert!(err.to_string().contains("authorize"));
        assert_eq!(provider.refreshes(), 1);
        assert_eq!(gateway.state().await.unwrap(), AuthState::Unconfigured);

        let creds = gateway.credentials().await.unwrap();
        assert!(creds.refresh_token.is_none());
        assert_eq!(creds.app_key.as_deref(), Some("app-key"));
        assert_eq!(creds.shop_cipher.as_deref(), Some("c1"));

        // No further refresh is attempted with the dead token.
        assert!(gateway.access_context().await.unwrap_err().is_config_error());
        assert_eq!(provider.refreshes(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_refresh_keeps_tokens() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider.clone()).await;
        provider.fail_refreshes(|| SyncError::transport("connection reset"));

        let err = gateway.refresh().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(gateway.state().await.unwrap(), AuthState::Authorized);
        assert!(gateway.credentials().await.unwrap().refresh_token.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_keeps_app_config() {
        let provider = Arc::new(ScriptedProvider::new());
        let (gateway, _) = authorized_gateway(provider).await;
        gateway
            .bind_shop(&ShopBinding {
                cipher: "c1".into(),
                id: Some("s1".into()),
                name: None,
            })
            .await
            .unwrap();

        gateway.disconnect().await.unwrap();

        let status = gateway.status().await.unwrap();
        assert_eq!(status.state, AuthState::Unconfigured);
        assert_eq!(status.app_key.as_deref(), Some("app-key"));
        assert!(status.shop.is_none());
        assert!(status.access_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_wrong_key_cannot_read_credentials() {
        let provider = Arc::new(ScriptedProvider::new());
        let (_, settings) = authorized_gateway(provider.clone()).await;

        let other = AuthGateway::new(
            provider,
            settings,
            SecretCipher::from_key([0xAB; 32]),
            Duration::from_secs(30),
        );
        assert!(other.credentials().await.unwrap_err().is_config_error());
    }
}
