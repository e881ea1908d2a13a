use crate::client::traits::{DealsApi, WishlistApi};
use crate::model::{AppIdsRequest, Deal, FetchError, WishlistItem};

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the wishlist and deal endpoints of the companion server.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("WishlistSniper/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::HttpError(format!("invalid base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::HttpError(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn wishlist_url(&self, steam_id: &str) -> Result<Url, FetchError> {
        self.endpoint(&["api", "steam", "user", "wishlist", steam_id.trim()])
    }

    fn deals_url(&self) -> Result<Url, FetchError> {
        self.endpoint(&["api", "dealsgg", "games"])
    }
}

#[async_trait::async_trait]
impl WishlistApi for ApiClient {
    async fn fetch_wishlist(&self, steam_id: &str) -> Result<Vec<WishlistItem>, FetchError> {
        let url = self.wishlist_url(steam_id)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

#[async_trait::async_trait]
impl DealsApi for ApiClient {
    async fn fetch_deals(&self, appids: &[u32]) -> Result<Vec<Deal>, FetchError> {
        let url = self.deals_url()?;
        debug!("POST {} ({} appids)", url, appids.len());

        let response = self
            .client
            .post(url)
            .json(&AppIdsRequest { appids })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, FetchError> {
    if !status.is_success() {
        warn!("Upstream responded [{}]: {}", status, body);
        return Err(FetchError::InvalidResponse {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let client = client();
        assert_eq!(
            client.wishlist_url(" 76561198041511379 ").unwrap().as_str(),
            "http://localhost:5000/api/steam/user/wishlist/76561198041511379"
        );
        assert_eq!(
            client.deals_url().unwrap().as_str(),
            "http://localhost:5000/api/dealsgg/games"
        );
    }

    #[test]
    fn steam_id_cannot_change_the_route() {
        let url = client().wishlist_url("7656/games?key=x").unwrap();
        assert!(url.query().is_none());
        assert_eq!(url.path_segments().unwrap().count(), 5);
        assert!(url.path().starts_with("/api/steam/user/wishlist/7656%2F"));
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = ApiClient::new("http://proxy.local/wishlist", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.deals_url().unwrap().as_str(),
            "http://proxy.local/wishlist/api/dealsgg/games"
        );
    }

    #[test]
    fn missing_deals_fail_the_batch() {
        let err = decode_body::<Vec<Deal>>(StatusCode::NOT_FOUND, r#"{"detail":"No deals found."}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse { status: 404, .. }));
    }

    #[test]
    fn server_errors_are_surfaced() {
        let err = decode_body::<Vec<Deal>>(StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap_err();
        assert_eq!(
            err,
            FetchError::InvalidResponse { status: 500, body: "boom".into() }
        );
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = decode_body::<Vec<Deal>>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn missing_wishlist_stays_an_error() {
        let err = decode_body::<Vec<WishlistItem>>(StatusCode::NOT_FOUND, "Wishlist not found.")
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse { status: 404, .. }));
    }
}
