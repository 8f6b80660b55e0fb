//! # Sync Service
//!
//! Composition root of the engine and the surface operators call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            SyncService                                  │
//! │                                                                         │
//! │  configure_app ─┐                                                       │
//! │  authorize     ─┼──► AuthGateway ──► SettingsStore (encrypted)          │
//! │  auth_status   ─┤                                                       │
//! │  disconnect    ─┘                                                       │
//! │                                                                         │
//! │  list_shops    ─┬──► ShopDirectory                                      │
//! │  select_shop   ─┘                                                       │
//! │                                                                         │
//! │  preview_page  ─┬──► SyncOrchestrator ──► CatalogPager + Reconciler     │
//! │  bulk_import   ─┘            │                                          │
//! │                              └──────────► RunLedger (every attempt)     │
//! │  run_history   ──────────────────────────► RunLedger                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Imports always return a result object; failures land in its `error`
//! field and are recorded in the ledger like any other run.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AuthGateway, AuthStatus};
use crate::config::SyncConfig;
use crate::crypto::SecretCipher;
use crate::error::{SyncError, SyncResult};
use crate::ledger::RunLedger;
use crate::orchestrator::SyncOrchestrator;
use crate::pager::CatalogPager;
use crate::provider::{self, RemoteCatalogProvider};
use crate::reconciler::ProductReconciler;
use crate::shops::{ShopBinding, ShopDirectory};
use crate::store::Stores;
use shoplink_core::{
    AuthorizedShop, BulkImportRequest, BulkImportResult, ImportResult, PageRequest,
    RunLedgerEntry, SyncBudget,
};
use shoplink_db::{Database, DbConfig};

pub struct SyncService {
    config: SyncConfig,
    provider: Arc<dyn RemoteCatalogProvider>,
    auth: Arc<AuthGateway>,
    shops: ShopDirectory,
    orchestrator: SyncOrchestrator,
    ledger: RunLedger,
}

impl SyncService {
    /// Wires the engine from explicit parts.
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn RemoteCatalogProvider>,
        stores: Stores,
        cipher: SecretCipher,
    ) -> Self {
        let failure_cap = config.sync.failure_cap;

        let auth = Arc::new(AuthGateway::new(
            provider.clone(),
            stores.settings.clone(),
            cipher,
            config.secrets.cache_ttl(),
        ));
        let shops = ShopDirectory::new(provider.clone(), auth.clone());
        let pager = Arc::new(CatalogPager::new(provider.clone(), auth.clone()));
        let reconciler = Arc::new(ProductReconciler::new(stores.catalog.clone(), failure_cap));
        let orchestrator = SyncOrchestrator::new(pager, reconciler, failure_cap);
        let ledger = RunLedger::new(stores.ledger.clone(), config.ledger.max_entries, failure_cap);

        SyncService {
            config,
            provider,
            auth,
            shops,
            orchestrator,
            ledger,
        }
    }

    /// Opens the SQLite database, reads the secret key from the environment
    /// and builds the configured provider.
    pub async fn open(config: SyncConfig) -> SyncResult<Self> {
        let cipher = SecretCipher::from_env(&config.secrets.key_env)?;
        let provider = provider::from_settings(&config.provider)?;

        let path = config.database_path()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SyncError::Database(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let db = Database::new(DbConfig::new(&path)).await?;

        info!(
            provider = provider.name(),
            database = %path.display(),
            "Sync service ready"
        );
        Ok(Self::new(config, provider, Stores::from_database(&db), cipher))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Stores app credentials. The key falls back to `[provider].app_key`.
    pub async fn configure_app(&self, app_key: Option<&str>, app_secret: &str) -> SyncResult<()> {
        let app_key = app_key
            .or(self.config.provider.app_key.as_deref())
            .ok_or_else(|| SyncError::config("no app key given and none configured"))?;
        self.auth.configure_app(app_key, app_secret).await
    }

    /// Exchanges an authorization code for tokens.
    pub async fn authorize(&self, auth_code: &str) -> SyncResult<AuthStatus> {
        self.auth.exchange_authorization_code(auth_code).await?;
        self.auth.status().await
    }

    pub async fn auth_status(&self) -> SyncResult<AuthStatus> {
        self.auth.status().await
    }

    pub async fn disconnect(&self) -> SyncResult<()> {
        self.auth.disconnect().await
    }

    // =========================================================================
    // Shops
    // =========================================================================

    pub async fn list_shops(&self) -> SyncResult<Vec<AuthorizedShop>> {
        self.shops.list_shops().await
    }

    pub async fn select_shop(&self, preferred: Option<&str>) -> SyncResult<ShopBinding> {
        self.shops.select_shop(preferred).await
    }

    // =========================================================================
    // Imports
    // =========================================================================

    /// Fetches one page and reconciles it (or reports what would change).
    pub async fn preview_page(&self, request: PageRequest) -> ImportResult {
        let started_at = Utc::now();

        let result = match self.shops.resolve_shop(!request.dry_run).await {
            Ok(shop) => self.orchestrator.run_page(&shop, &request).await,
            Err(err) => {
                warn!(error = %err, "Cannot preview page");
                let mut result = ImportResult::failed(request.dry_run, err.to_string());
                result.page_token = request.page_token.clone();
                result
            }
        };

        self.ledger.record_page(&result, started_at).await;
        result
    }

    /// Walks the remote catalog under the request's budgets.
    pub async fn bulk_import(&self, request: BulkImportRequest) -> BulkImportResult {
        let started_at = Utc::now();
        let budget = SyncBudget::from_request(&request, self.config.sync.budget());

        let result = match self.shops.resolve_shop(!request.dry_run).await {
            Ok(shop) => {
                self.orchestrator
                    .run_bulk(&shop, budget, request.page_token.as_deref(), request.dry_run)
                    .await
            }
            Err(err) => {
                warn!(error = %err, "Cannot start bulk import");
                let mut result = BulkImportResult::new(request.dry_run);
                result.error = Some(err.to_string());
                result.next_page_token = request.page_token.clone();
                result
            }
        };

        self.ledger
            .record_bulk(&result, request.page_token.clone(), started_at)
            .await;
        result
    }

    /// Most recent runs, newest first.
    pub async fn run_history(&self, limit: u32) -> SyncResult<Vec<RunLedgerEntry>> {
        self.ledger.history(limit).await
    }
}
