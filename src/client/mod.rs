// HTTP access to the companion API server.

pub mod fetcher;
pub mod traits;

pub use fetcher::ApiClient;
pub use traits::{DealsApi, WishlistApi};
