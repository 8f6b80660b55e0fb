//! # Live Provider
//!
//! Signed HTTP client for the marketplace's token and open APIs.
//!
//! ## Request Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Token API (unsigned)                                                   │
//! │    GET {auth}/api/v2/token/get?app_key&app_secret&auth_code&grant_type  │
//! │    GET {auth}/api/v2/token/refresh?app_key&app_secret&refresh_token&... │
//! │                                                                         │
//! │  Open API (signed)                                                      │
//! │    GET  {api}/authorization/{v}/shops?app_key&timestamp&sign            │
//! │    POST {api}/product/{v}/products/search                               │
//! │         ?app_key&timestamp&shop_cipher&sign                             │
//! │         body {"page_size":N[,"page_token":"..."]}                       │
//! │    header x-tts-access-token: <access token>                            │
//! │                                                                         │
//! │  Response                                                               │
//! │    401/403                      → AuthRejected                          │
//! │    other non-2xx, envelope      → Provider / AuthRejected by code       │
//! │    other non-2xx, no envelope   → Transport                             │
//! │    2xx                          → Envelope::into_data                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The timestamp is taken when the request is built, so a retried call is
//! signed afresh. The body is serialized once and the same string is both
//! signed and sent.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{AccessContext, AppCredentials, CatalogPage, PageQuery, RemoteCatalogProvider, TokenGrant};
use crate::config::ProviderSettings;
use crate::envelope::Envelope;
use crate::error::{SyncError, SyncResult};
use crate::signing;
use shoplink_core::{AuthorizedShop, PriceUnit, RemoteProductPreview};

/// Header carrying the access token on open API calls.
pub const ACCESS_TOKEN_HEADER: &str = "x-tts-access-token";

/// Maximum number of body bytes echoed into an error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// HTTP implementation of [`RemoteCatalogProvider`].
pub struct LiveProvider {
    client: reqwest::Client,
    auth_base_url: String,
    api_base_url: String,
    api_version: String,
    auth_error_codes: Vec<i64>,
    price_unit: PriceUnit,
}

impl LiveProvider {
    pub fn new(settings: &ProviderSettings) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| SyncError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(LiveProvider {
            client,
            auth_base_url: settings.auth_base_url.trim_end_matches('/').to_string(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            auth_error_codes: settings.auth_error_codes.clone(),
            price_unit: settings.price_unit,
        })
    }

    fn shops_path(&self) -> String {
        format!("/authorization/{}/shops", self.api_version)
    }

    fn search_path(&self) -> String {
        format!("/product/{}/products/search", self.api_version)
    }

    /// Calls one of the token endpoints.
    async fn token_call(&self, path: &str, params: &[(&str, &str)]) -> SyncResult<TokenGrant> {
        let url = format!("{}{}", self.auth_base_url, path);
        debug!(%url, "Calling token API");

        let response = self.client.get(&url).query(params).send().await?;
        self.read_envelope(response).await
    }

    /// Sends a signed open API request.
    ///
    /// `params` are the call-specific query parameters; `app_key`,
    /// `timestamp` and `sign` are added here.
    async fn signed_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        body: Option<&str>,
        ctx: &AccessContext,
    ) -> SyncResult<T> {
        let mut query = params;
        query.insert("app_key".to_string(), ctx.app_key.clone());
        query.insert(
            "timestamp".to_string(),
            chrono::Utc::now().timestamp().to_string(),
        );

        let signature = signing::sign(path, &query, body.unwrap_or(""), &ctx.app_secret)?;
        query.insert("sign".to_string(), signature);

        let url = format!("{}{}", self.api_base_url, path);
        debug!(%method, %url, "Calling open API");

        let mut request = self
            .client
            .request(method, &url)
            .query(&query)
            .header(ACCESS_TOKEN_HEADER, &ctx.access_token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        self.read_envelope(response).await
    }

    async fn read_envelope<T: DeserializeOwned>(&self, response: reqwest::Response) -> SyncResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let code = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .map(|env| env.code)
                .filter(|code| *code != 0);
            warn!(status = status.as_u16(), ?code, "Access token rejected");
            return Err(SyncError::AuthRejected {
                code,
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        if !status.is_success() {
            return match serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                Ok(env) if !env.is_success() => Err(env.to_error(&self.auth_error_codes)),
                Ok(env) => Err(SyncError::Provider {
                    code: i64::from(status.as_u16()),
                    message: env.message,
                    request_id: env.request_id,
                }),
                Err(_) => Err(SyncError::transport(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    preview(&body)
                ))),
            };
        }

        Envelope::<T>::decode(&body)?.into_data(&self.auth_error_codes)
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl RemoteCatalogProvider for LiveProvider {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn exchange_code(&self, app: &AppCredentials, auth_code: &str) -> SyncResult<TokenGrant> {
        self.token_call(
            "/api/v2/token/get",
            &[
                ("app_key", app.app_key.as_str()),
                ("app_secret", app.app_secret.as_str()),
                ("auth_code", auth_code),
                ("grant_type", "authorized_code"),
            ],
        )
        .await
    }

    async fn refresh_token(
        &self,
        app: &AppCredentials,
        refresh_token: &str,
    ) -> SyncResult<TokenGrant> {
        self.token_call(
            "/api/v2/token/refresh",
            &[
                ("app_key", app.app_key.as_str()),
                ("app_secret", app.app_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }

    async fn list_shops(&self, ctx: &AccessContext) -> SyncResult<Vec<AuthorizedShop>> {
        let data: RawShopsData = self
            .signed_call(Method::GET, &self.shops_path(), BTreeMap::new(), None, ctx)
            .await?;

        Ok(data
            .shops
            .into_iter()
            .filter_map(|raw| {
                let shop = raw.into_shop();
                if shop.is_none() {
                    warn!("Skipping authorized shop without a cipher");
                }
                shop
            })
            .collect())
    }

    async fn search_products(
        &self,
        ctx: &AccessContext,
        query: &PageQuery,
    ) -> SyncResult<CatalogPage> {
        let mut params = BTreeMap::new();
        params.insert("shop_cipher".to_string(), query.shop_cipher.clone());

        let body = serde_json::to_string(&SearchBody {
            page_size: query.page_size,
            page_token: query.page_token.as_deref(),
        })?;

        let data: RawSearchData = self
            .signed_call(Method::POST, &self.search_path(), params, Some(&body), ctx)
            .await?;

        let unit = self.price_unit;
        Ok(CatalogPage {
            products: data
                .products
                .into_iter()
                .map(|raw| raw.normalize(unit))
                .collect(),
            total_count: data.total_count,
            next_page_token: data.next_page_token,
        })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RawShopsData {
    #[serde(default)]
    shops: Vec<RawShop>,
}

#[derive(Debug, Deserialize)]
struct RawShop {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    cipher: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl RawShop {
    fn into_shop(self) -> Option<AuthorizedShop> {
        let cipher = self.cipher.filter(|c| !c.trim().is_empty())?;
        Some(AuthorizedShop {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            region: self.region.unwrap_or_default(),
            cipher,
            code: self.code.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSearchData {
    #[serde(default)]
    products: Vec<RawProduct>,
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    skus: Vec<RawSku>,
}

#[derive(Debug, Deserialize)]
struct RawSku {
    #[serde(default)]
    seller_sku: Option<String>,
    #[serde(default)]
    price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    tax_exclusive_price: Option<RawAmount>,
    #[serde(default)]
    sale_price: Option<RawAmount>,
}

/// Prices arrive as strings, but some regions send bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl RawAmount {
    fn into_string(self) -> String {
        match self {
            RawAmount::Text(s) => s,
            RawAmount::Number(n) => n.to_string(),
        }
    }
}

impl RawProduct {
    /// Flattens a listing to its first SKU. Nothing is rejected here.
    fn normalize(self, price_unit: PriceUnit) -> RemoteProductPreview {
        let first = self.skus.into_iter().next();
        let (seller_sku, price) = match first {
            Some(sku) => (sku.seller_sku, sku.price),
            None => (None, None),
        };
        let (currency, amount) = match price {
            Some(p) => (p.currency, p.tax_exclusive_price.or(p.sale_price)),
            None => (None, None),
        };

        RemoteProductPreview {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            seller_sku: seller_sku
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            price: amount.map(RawAmount::into_string).unwrap_or_default(),
            currency: currency.filter(|c| !c.trim().is_empty()),
            price_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> LiveProvider {
        let settings = ProviderSettings {
            auth_base_url: server.uri(),
            api_base_url: format!("{}/", server.uri()),
            ..ProviderSettings::default()
        };
        LiveProvider::new(&settings).unwrap()
    }

    fn ctx() -> AccessContext {
        AccessContext {
            app_key: "app-key".into(),
            app_secret: "app-secret".into(),
            access_token: "tok-1".into(),
        }
    }

    fn app() -> AppCredentials {
        AppCredentials {
            app_key: "app-key".into(),
            app_secret: "app-secret".into(),
        }
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/token/get"))
            .and(query_param("auth_code", "code-1"))
            .and(query_param("grant_type", "authorized_code"))
            .and(query_param("app_key", "app-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "message": "success",
                "data": {
                    "access_token": "acc",
                    "access_token_expire_in": 604800,
                    "refresh_token": "ref",
                    "refresh_token_expire_in": 2592000,
                    "seller_name": "Demo Seller"
                }
            })))
            .mount(&server)
            .await;

        let grant = provider(&server).exchange_code(&app(), "code-1").await.unwrap();
        assert_eq!(grant.access_token, "acc");
        assert_eq!(grant.refresh_token, "ref");
        assert_eq!(grant.access_token_expire_in, 604800);
        assert_eq!(grant.seller_name.as_deref(), Some("Demo Seller"));
    }

    #[tokio::test]
    async fn test_refresh_error_code_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/token/refresh"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 36004005,
                "message": "refresh token invalid",
                "request_id": "rq-9"
            })))
            .mount(&server)
            .await;

        let err = provider(&server).refresh_token(&app(), "old").await.unwrap_err();
        assert!(matches!(err, SyncError::Provider { code: 36004005, .. }));
    }

    #[tokio::test]
    async fn test_search_products_is_signed_and_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/product/202309/products/search"))
            .and(query_param("shop_cipher", "c1"))
            .and(header(ACCESS_TOKEN_HEADER, "tok-1"))
            .and(body_json(json!({ "page_size": 5, "page_token": "t1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "message": "Success",
                "request_id": "rq-1",
                "data": {
                    "total_count": 2,
                    "next_page_token": "t2",
                    "products": [
                        {
                            "id": "p1",
                            "title": "Mug",
                            "status": "ACTIVATE",
                            "skus": [
                                { "seller_sku": " A-1 ", "price": { "currency": "USD", "tax_exclusive_price": "12.50" } },
                                { "seller_sku": "A-2", "price": { "currency": "USD", "tax_exclusive_price": "99.00" } }
                            ]
                        },
                        {
                            "id": "p2",
                            "title": "Cap",
                            "status": "DRAFT",
                            "skus": [ { "seller_sku": "", "price": { "sale_price": 7 } } ]
                        },
                        { "id": "p3" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let query = PageQuery {
            shop_cipher: "c1".into(),
            page_size: 5,
            page_token: Some("t1".into()),
        };
        let page = provider(&server).search_products(&ctx(), &query).await.unwrap();

        assert_eq!(page.total_count, Some(2));
        assert_eq!(page.next_page_token.as_deref(), Some("t2"));
        assert_eq!(page.products.len(), 3);

        let mug = &page.products[0];
        assert_eq!(mug.seller_sku.as_deref(), Some("A-1"));
        assert_eq!(mug.price, "12.50");
        assert_eq!(mug.currency.as_deref(), Some("USD"));

        let cap = &page.products[1];
        assert_eq!(cap.seller_sku, None);
        assert_eq!(cap.price, "7");

        let bare = &page.products[2];
        assert_eq!(bare.title, "");
        assert_eq!(bare.price, "");

        // The signature must verify against the request as received.
        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let mut received: BTreeMap<String, String> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let sent_sign = received.remove("sign").unwrap();
        assert!(received.contains_key("timestamp"));
        assert_eq!(received.get("app_key").map(String::as_str), Some("app-key"));
        assert!(!received.contains_key("page_size"));
        assert!(!received.contains_key("page_token"));

        let body = String::from_utf8(request.body.clone()).unwrap();
        assert_eq!(body, r#"{"page_size":5,"page_token":"t1"}"#);
        let expected =
            signing::sign(request.url.path(), &received, &body, "app-secret").unwrap();
        assert_eq!(sent_sign, expected);
    }

    #[tokio::test]
    async fn test_first_page_body_omits_token_and_carries_price_unit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/product/202309/products/search"))
            .and(query_param("shop_cipher", "c1"))
            .and(body_json(json!({ "page_size": 20 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {
                    "products": [
                        { "id": "p1", "title": "Mug", "status": "ACTIVATE",
                          "skus": [ { "seller_sku": "A", "price": { "sale_price": "1999" } } ] }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let settings = ProviderSettings {
            api_base_url: server.uri(),
            price_unit: PriceUnit::Minor,
            ..ProviderSettings::default()
        };
        let query = PageQuery {
            shop_cipher: "c1".into(),
            page_size: 20,
            page_token: None,
        };
        let page = LiveProvider::new(&settings)
            .unwrap()
            .search_products(&ctx(), &query)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            String::from_utf8(requests[0].body.clone()).unwrap(),
            r#"{"page_size":20}"#
        );
        assert_eq!(page.products[0].price_unit, PriceUnit::Minor);
        assert_eq!(page.products[0].price_money().map(|m| m.cents()), Some(1999));
    }

    #[tokio::test]
    async fn test_list_shops_skips_shops_without_cipher() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorization/202309/shops"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "message": "Success",
                "data": {
                    "shops": [
                        { "id": "s1", "name": "One", "region": "US", "cipher": "c1", "code": "USONE" },
                        { "id": "s2", "name": "Broken", "region": "GB" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let shops = provider(&server).list_shops(&ctx()).await.unwrap();
        assert_eq!(shops.len(), 1);
        assert_eq!(shops[0].cipher, "c1");
        assert_eq!(shops[0].code.as_deref(), Some("USONE"));
    }

    #[tokio::test]
    async fn test_http_401_is_auth_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorization/202309/shops"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = provider(&server).list_shops(&ctx()).await.unwrap_err();
        assert!(err.is_auth_rejected());
    }

    #[tokio::test]
    async fn test_auth_code_in_envelope_is_auth_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorization/202309/shops"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 105002,
                "message": "Expired credentials"
            })))
            .mount(&server)
            .await;

        let err = provider(&server).list_shops(&ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::AuthRejected {
                code: Some(105002),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_2xx_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/product/202309/products/search"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "code": 12019001,
                "message": "internal error",
                "request_id": "rq-5"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/authorization/202309/shops"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let p = provider(&server);
        let query = PageQuery {
            shop_cipher: "c1".into(),
            page_size: 20,
            page_token: None,
        };

        let err = p.search_products(&ctx(), &query).await.unwrap_err();
        assert!(matches!(err, SyncError::Provider { code: 12019001, .. }));

        let err = p.list_shops(&ctx()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorization/202309/shops"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server).list_shops(&ctx()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
