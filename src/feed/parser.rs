use feed_rs::model::Entry;
use feed_rs::parser;

/// One decoded feed entry, before it is attached to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,
    pub image: Option<String>,
    /// RFC 3339, or empty when the feed gives no date
    pub published: String,
}

/// Outcome of decoding one feed document
#[derive(Debug)]
pub struct ParseResult {
    pub items: Vec<RawFeedItem>,
    /// Entries dropped because they carried no link
    pub skipped: usize,
}

/// Decode an RSS, Atom or JSON Feed document.
///
/// Entries without a link are skipped (the link is the article's identity).
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let total = feed.entries.len();
    let items: Vec<RawFeedItem> = feed.entries.into_iter().filter_map(to_raw_item).collect();

    Ok(ParseResult {
        skipped: total - items.len(),
        items,
    })
}

fn to_raw_item(entry: Entry) -> Option<RawFeedItem> {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() != Some("enclosure"))
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())?;

    let image = extract_image(&entry);
    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();
    let title = entry.title.map(|t| t.content).unwrap_or_default();

    Some(RawFeedItem {
        title,
        link,
        image,
        published,
    })
}

/// First image attached to an entry: media thumbnail, then image-typed
/// media content (RSS enclosures land here too), then an Atom image enclosure.
fn extract_image(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .find(|uri| !uri.is_empty());
    if thumbnail.is_some() {
        return thumbnail;
    }

    let content = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|c| {
            c.content_type
                .as_ref()
                .is_some_and(|mime| mime.ty().as_str() == "image")
        })
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()));
    if content.is_some() {
        return content;
    }

    entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .find(|l| {
            l.media_type
                .as_deref()
                .is_some_and(|t| t.starts_with("image/"))
        })
        .map(|l| l.href.clone())
}
