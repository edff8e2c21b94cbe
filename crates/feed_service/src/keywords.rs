use domain::LiveStreamRecord;

/// How many channel names, and how many tag lists, seed the recommendations
pub const KEYWORD_SOURCES: usize = 3;

/// Build search keywords from the top of a feed page.
///
/// Channel names come from the first three records and tags from the three
/// records after those, so up to six distinct records contribute. Names come
/// first, followed by every tag in order.
pub fn derive_keywords(items: &[LiveStreamRecord]) -> Vec<String> {
    let mut remaining = items.iter();

    let names = remaining
        .by_ref()
        .take(KEYWORD_SOURCES)
        .map(|record| record.channel_name.clone())
        .collect::<Vec<_>>();
    let tags = remaining
        .take(KEYWORD_SOURCES)
        .flat_map(|record| record.tags.iter().cloned());

    names.into_iter().chain(tags).collect()
}
