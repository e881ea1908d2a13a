use crate::model::{Deal, FetchError, WishlistItem};

#[async_trait::async_trait]
pub trait DealsApi: Send + Sync {
    async fn fetch_deals(&self, appids: &[u32]) -> Result<Vec<Deal>, FetchError>;
}

#[async_trait::async_trait]
pub trait WishlistApi: Send + Sync {
    async fn fetch_wishlist(&self, steam_id: &str) -> Result<Vec<WishlistItem>, FetchError>;
}
