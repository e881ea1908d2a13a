use crate::model::WishlistItem;

/// App ids of the wishlist, most wanted first. Items sharing a priority keep
/// the order the server returned them in.
pub fn app_ids_by_priority(items: &[WishlistItem], limit: Option<usize>) -> Vec<u32> {
    let mut sorted: Vec<&WishlistItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.priority);
    sorted
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|item| item.appid)
        .collect()
}
