//! # Shop Directory
//!
//! Lists the shops the credentials are authorized for and decides which one
//! catalog calls are made against.
//!
//! ## Selection Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0. explicit choice (cipher, id or code)   → must match, else error     │
//! │  1. persisted cipher, still authorized                                  │
//! │  2. persisted shop id, matched against id or code                       │
//! │  3. first authorized shop                                               │
//! │                                                                         │
//! │  no authorized shops → configuration error                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dry runs resolve a shop without persisting it, so they leave the stored
//! credentials untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::AuthGateway;
use crate::error::{SyncError, SyncResult};
use crate::provider::RemoteCatalogProvider;
use shoplink_core::AuthorizedShop;

/// The shop catalog calls are bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopBinding {
    pub cipher: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

impl ShopBinding {
    pub fn from_shop(shop: &AuthorizedShop) -> Self {
        ShopBinding {
            cipher: shop.cipher.clone(),
            id: Some(shop.id.clone()).filter(|id| !id.is_empty()),
            name: Some(shop.name.clone()).filter(|name| !name.is_empty()),
        }
    }

    /// Identifier used in `shop:` provenance tags.
    ///
    /// Falls back to the cipher when the shop id is unknown.
    pub fn tag_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.cipher)
    }
}

/// Remote shop listing and local shop selection.
pub struct ShopDirectory {
    provider: Arc<dyn RemoteCatalogProvider>,
    auth: Arc<AuthGateway>,
}

impl ShopDirectory {
    pub fn new(provider: Arc<dyn RemoteCatalogProvider>, auth: Arc<AuthGateway>) -> Self {
        ShopDirectory { provider, auth }
    }

    /// Shops authorized under the current credentials.
    pub async fn list_shops(&self) -> SyncResult<Vec<AuthorizedShop>> {
        let provider = &self.provider;
        let shops = self
            .auth
            .authorized(|ctx| async move { provider.list_shops(&ctx).await })
            .await?;
        debug!(count = shops.len(), "Listed authorized shops");
        Ok(shops)
    }

    /// Picks a shop and persists the choice.
    pub async fn select_shop(&self, preferred: Option<&str>) -> SyncResult<ShopBinding> {
        self.choose_shop(preferred, true).await
    }

    async fn choose_shop(&self, preferred: Option<&str>, persist: bool) -> SyncResult<ShopBinding> {
        let shops = self.list_shops().await?;
        if shops.is_empty() {
            return Err(SyncError::config(
                "no shops are authorized for these credentials",
            ));
        }

        let creds = self.auth.credentials().await?;
        let chosen = match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(wanted) => shops
                .iter()
                .find(|s| s.cipher == wanted || s.id == wanted || s.code.as_deref() == Some(wanted))
                .ok_or_else(|| {
                    SyncError::config(format!("shop '{}' is not authorized", wanted))
                })?,
            None => pick_shop(&shops, creds.shop_cipher.as_deref(), creds.shop_id.as_deref()),
        };

        let binding = ShopBinding::from_shop(chosen);
        if !persist {
            debug!(shop_cipher = %binding.cipher, "Shop chosen for this run only");
            return Ok(binding);
        }
        if creds.shop_binding().as_ref() != Some(&binding) {
            self.auth.bind_shop(&binding).await?;
        }

        info!(shop_id = %binding.tag_id(), shop_cipher = %binding.cipher, "Shop selected");
        Ok(binding)
    }

    /// The persisted binding, without a remote call.
    pub async fn bound_shop(&self) -> SyncResult<Option<ShopBinding>> {
        Ok(self.auth.credentials().await?.shop_binding())
    }

    /// The persisted binding, selecting one when there is none.
    ///
    /// With `persist == false` a freshly selected shop is used for this
    /// call only and nothing is written.
    pub async fn resolve_shop(&self, persist: bool) -> SyncResult<ShopBinding> {
        match self.bound_shop().await? {
            Some(binding) => Ok(binding),
            None => self.choose_shop(None, persist).await,
        }
    }
}

/// Applies the fallback order to a non-empty shop list.
fn pick_shop<'a>(
    shops: &'a [AuthorizedShop],
    cipher: Option<&str>,
    shop_id: Option<&str>,
) -> &'a AuthorizedShop {
    cipher
        .and_then(|c| shops.iter().find(|s| s.cipher == c))
        .or_else(|| {
            shop_id.and_then(|id| {
                shops
                    .iter()
                    .find(|s| s.id == id || s.code.as_deref() == Some(id))
            })
        })
        .unwrap_or(&shops[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{authorized_gateway, shop, ScriptedProvider};

    async fn directory(shops: Vec<AuthorizedShop>) -> (ShopDirectory, Arc<AuthGateway>) {
        let provider = Arc::new(ScriptedProvider::with_shops(shops));
        let (gateway, _) = authorized_gateway(provider.clone()).await;
        let gateway = Arc::new(gateway);
        (ShopDirectory::new(provider, gateway.clone()), gateway)
    }

    #[test]
    fn test_pick_shop_order() {
        let mut coded = shop("s2", "c2");
        coded.code = Some("CODE2".into());
        let shops = vec![shop("s1", "c1"), coded, shop("s3", "c3")];

        assert_eq!(pick_shop(&shops, Some("c3"), Some("s2")).id, "s3");
        assert_eq!(pick_shop(&shops, Some("gone"), Some("s2")).id, "s2");
        assert_eq!(pick_shop(&shops, None, Some("CODE2")).id, "s2");
        assert_eq!(pick_shop(&shops, Some("gone"), Some("gone")).id, "s1");
        assert_eq!(pick_shop(&shops, None, None).id, "s1");
    }

    #[tokio::test]
    async fn test_select_persists_and_prefers_binding() {
        let (dir, _) = directory(vec![shop("s1", "c1"), shop("s2", "c2")]).await;

        assert_eq!(dir.bound_shop().await.unwrap(), None);
        let first = dir.select_shop(None).await.unwrap();
        assert_eq!(first.cipher, "c1");

        let chosen = dir.select_shop(Some("s2")).await.unwrap();
        assert_eq!(chosen.cipher, "c2");

        // The persisted cipher wins over the list order from now on.
        assert_eq!(dir.select_shop(None).await.unwrap().cipher, "c2");
        assert_eq!(dir.resolve_shop(true).await.unwrap().cipher, "c2");
        assert_eq!(dir.bound_shop().await.unwrap().unwrap().tag_id(), "s2");
    }

    #[tokio::test]
    async fn test_unknown_preference_and_no_shops() {
        let (dir, _) = directory(vec![shop("s1", "c1")]).await;
        assert!(dir.select_shop(Some("nope")).await.unwrap_err().is_config_error());

        let (empty, _) = directory(vec![]).await;
        assert!(empty.select_shop(None).await.unwrap_err().is_config_error());
        assert!(empty.resolve_shop(true).await.unwrap_err().is_config_error());
    }

    #[tokio::test]
    async fn test_resolve_uses_binding_without_remote_call() {
        let (dir, gateway) = directory(vec![shop("s1", "c1")]).await;
        gateway
            .bind_shop(&ShopBinding {
                cipher: "pinned".into(),
                id: None,
                name: None,
            })
            .await
            .unwrap();

        let binding = dir.resolve_shop(false).await.unwrap();
        assert_eq!(binding.cipher, "pinned");
        assert_eq!(binding.tag_id(), "pinned");
    }

    #[tokio::test]
    async fn test_resolve_without_persist_leaves_binding_empty() {
        let (dir, _) = directory(vec![shop("s1", "c1"), shop("s2", "c2")]).await;

        let binding = dir.resolve_shop(false).await.unwrap();
        assert_eq!(binding.cipher, "c1");
        assert_eq!(dir.bound_shop().await.unwrap(), None);

        assert_eq!(dir.resolve_shop(true).await.unwrap().cipher, "c1");
        assert_eq!(dir.bound_shop().await.unwrap().unwrap().cipher, "c1");
    }
}
