use crate::feed::RawFeedItem;
use crate::storage::NewArticle;

/// Attach decoded feed items to their owning source.
pub fn map_items(source_id: i64, items: Vec<RawFeedItem>) -> Vec<NewArticle> {
    items
        .into_iter()
        .map(|item| NewArticle {
            source_id,
            title: item.title,
            url: item.link,
            image: item.image,
            published_date: item.published,
        })
        .collect()
}
