//! Turn one feed item's subtree into a [`VideoItem`].
//!
//! Every lookup is scoped to the item (or to a sub-container found inside it)
//! and goes through the locator table. Author, caption and music are required;
//! media goes through the two-stage resolver, and when it reports
//! [`MediaError::Unavailable`] the item is still returned, marked
//! [`ItemStatus::MediaUnavailable`], with media and metrics left out.

use crate::error::{ExtractError, MediaError};
use crate::gateway::{ElementHandle, PageGateway, Scope};
use crate::locators::{LocatorTable, names};
use crate::models::{Author, Caption, ItemStatus, Metrics, Music, Tag, VideoItem};
use crate::utils::truncate_for_log;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::media::resolve_media;

/// Reads feed items through a locator table.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    table: &'a LocatorTable,
    media_wait: Duration,
    capture_markup: bool,
}

impl<'a> Extractor<'a> {
    /// # Arguments
    ///
    /// * `table` - Locators for the feed variant being crawled
    /// * `media_wait` - Bound for each of the two media waits
    /// * `capture_markup` - Keep the item container's inner HTML on the record
    pub fn new(table: &'a LocatorTable, media_wait: Duration, capture_markup: bool) -> Self {
        Self {
            table,
            media_wait,
            capture_markup,
        }
    }

    /// Extract one item.
    ///
    /// Author, caption and music are read first, then media through
    /// [`resolve_media`], then metrics. Tags keep their page order.
    ///
    /// # Returns
    ///
    /// A [`VideoItem`] with trimmed fields. If media never attaches, the item
    /// is still returned with status [`ItemStatus::MediaUnavailable`] and no
    /// media or metrics.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Missing`] / [`ExtractError::MissingAttribute`] when a
    ///   required field is absent
    /// - [`ExtractError::Page`] when the page fails; check
    ///   [`ExtractError::is_stale`] for a replaced node
    #[instrument(level = "info", skip_all, fields(item = %item))]
    pub async fn extract<G: PageGateway>(
        &self,
        page: &mut G,
        item: &ElementHandle,
    ) -> Result<VideoItem, ExtractError> {
        debug!("Extracting");
        let author = self.author(page, item).await?;
        let caption = self.caption(page, item).await?;
        let music = self.music(page, item).await?;

        let media_container = self.require(page, item, names::MEDIA_CONTAINER).await?;
        let (media, metrics, status) =
            match resolve_media(page, self.table, &media_container, self.media_wait).await {
                Ok(media) => {
                    let metrics = self.metrics(page, item).await?;
                    (Some(media), Some(metrics), None)
                }
                Err(MediaError::Unavailable { attempts }) => {
                    warn!(attempts, unique_id = %author.unique_id, "Unable to find media");
                    (None, None, Some(ItemStatus::MediaUnavailable))
                }
                Err(MediaError::Page(source)) => {
                    return Err(ExtractError::Page {
                        name: names::MEDIA_CONTAINER,
                        source,
                    });
                }
                Err(MediaError::Locator(e)) => return Err(e.into()),
            };

        let markup = if self.capture_markup {
            page.inner_html(item)
                .await
                .map_err(|source| ExtractError::Page {
                    name: names::CONTAINERS,
                    source,
                })?
        } else {
            None
        };

        debug!(
            unique_id = %author.unique_id,
            caption = %truncate_for_log(&caption.text, 80),
            tags = caption.tags.len(),
            "Done extracting element"
        );
        Ok(VideoItem {
            id: item.id().to_string(),
            author,
            caption,
            music,
            media,
            metrics,
            status,
            markup,
            element: item.clone(),
        })
    }

    async fn author<G: PageGateway>(
        &self,
        page: &mut G,
        item: &ElementHandle,
    ) -> Result<Author, ExtractError> {
        let unique_id = self.text_of(page, item, names::AUTHOR_UNIQUE_ID).await?;
        let avatar = self.attr_of(page, item, names::AUTHOR_AVATAR, "src").await?;
        let link = self.attr_of(page, item, names::AUTHOR_LINK, "href").await?;
        let nickname = self.text_of(page, item, names::AUTHOR_NICKNAME).await?;
        Ok(Author::new(
            &unique_id,
            &avatar,
            &link,
            &nickname,
            item.clone(),
        ))
    }

    async fn caption<G: PageGateway>(
        &self,
        page: &mut G,
        item: &ElementHandle,
    ) -> Result<Caption, ExtractError> {
        let container = self.require(page, item, names::CAPTION_CONTAINER).await?;
        let text = self.text_of(page, &container, names::CAPTION_TEXT).await?;

        let anchors = page
            .find_all(Scope::Within(&container), self.table.get(names::CAPTION_TAGS)?)
            .await
            .map_err(page_error(names::CAPTION_TAGS))?;
        let mut tags = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let link = self.read_attr(page, &anchor, names::CAPTION_TAGS, "href").await?;
            let text = self.text_of(page, &anchor, names::TAG_TEXT).await?;
            tags.push(Tag::new(&link, &text, anchor));
        }

        Ok(Caption::new(&text, tags, container))
    }

    async fn music<G: PageGateway>(
        &self,
        page: &mut G,
        item: &ElementHandle,
    ) -> Result<Music, ExtractError> {
        let container = self.require(page, item, names::MUSIC_CONTAINER).await?;
        let title = self.text_of(page, &container, names::MUSIC_TITLE).await?;
        let link = self
            .attr_of(page, &container, names::MUSIC_LINK, "href")
            .await?;
        Ok(Music::new(&title, &link, container))
    }

    async fn metrics<G: PageGateway>(
        &self,
        page: &mut G,
        item: &ElementHandle,
    ) -> Result<Metrics, ExtractError> {
        let container = self.require(page, item, names::METRICS_CONTAINER).await?;
        let likes = self.text_of(page, &container, names::METRICS_LIKES).await?;
        let comments = self
            .text_of(page, &container, names::METRICS_COMMENTS)
            .await?;
        let shares = self.text_of(page, &container, names::METRICS_SHARES).await?;
        Ok(Metrics::new(&likes, &comments, &shares, container))
    }

    /// The first element matching `name` inside `scope`, or [`ExtractError::Missing`].
    async fn require<G: PageGateway>(
        &self,
        page: &mut G,
        scope: &ElementHandle,
        name: &'static str,
    ) -> Result<ElementHandle, ExtractError> {
        page.find(Scope::Within(scope), self.table.get(name)?)
            .await
            .map_err(page_error(name))?
            .ok_or(ExtractError::Missing { name })
    }

    async fn text_of<G: PageGateway>(
        &self,
        page: &mut G,
        scope: &ElementHandle,
        name: &'static str,
    ) -> Result<String, ExtractError> {
        let element = self.require(page, scope, name).await?;
        page.text(&element).await.map_err(page_error(name))
    }

    async fn attr_of<G: PageGateway>(
        &self,
        page: &mut G,
        scope: &ElementHandle,
        name: &'static str,
        attribute: &'static str,
    ) -> Result<String, ExtractError> {
        let element = self.require(page, scope, name).await?;
        self.read_attr(page, &element, name, attribute).await
    }

    async fn read_attr<G: PageGateway>(
        &self,
        page: &mut G,
        element: &ElementHandle,
        name: &'static str,
        attribute: &'static str,
    ) -> Result<String, ExtractError> {
        page.attribute(element, attribute)
            .await
            .map_err(page_error(name))?
            .ok_or(ExtractError::MissingAttribute { name, attribute })
    }
}

fn page_error(name: &'static str) -> impl Fn(crate::error::GatewayError) -> ExtractError {
    move |source| ExtractError::Page { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryPage;
    use crate::locators::identity_table;

    const WAIT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_extracts_full_record_trimmed() {
        let mut page = MemoryPage::with_videos(1);
        let table = identity_table();
        let item = page.id_of(0);

        let video = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap();

        assert_eq!(video.id, item.id());
        assert!(video.is_complete());
        assert_eq!(video.author.unique_id, "user0");
        assert_eq!(video.author.nickname, "User 0");
        assert_eq!(video.author.link, "https://example.com/@user0");
        assert_eq!(video.author.avatar, "https://cdn.example/avatar/0.jpg");
        assert_eq!(video.caption.text, "caption 0");
        assert_eq!(video.music.title, "original sound 0");
        assert_eq!(video.music.link, "https://example.com/music/0");
        assert_eq!(video.media.unwrap().link, "https://cdn.example/video/0.mp4");
        let metrics = video.metrics.unwrap();
        assert_eq!(metrics.likes, "1.2M");
        assert_eq!(metrics.shares, "42");
        assert!(video.markup.is_none());
    }

    #[tokio::test]
    async fn test_tags_keep_page_order() {
        let mut page = MemoryPage::with_videos(1);
        let table = identity_table();
        let item = page.id_of(0);

        let video = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap();

        let texts: Vec<&str> = video.caption.tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["#fyp", "#dance"]);
        assert_eq!(video.caption.tags[1].link, "https://example.com/tag/dance");
    }

    #[tokio::test]
    async fn test_media_unavailable_is_partial_success() {
        let mut page = MemoryPage::with_videos(1);
        page.delay_media(0, None);
        let table = identity_table();
        let item = page.id_of(0);

        let video = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap();

        assert_eq!(video.status, Some(ItemStatus::MediaUnavailable));
        assert!(video.media.is_none());
        assert!(video.metrics.is_none());
        assert_eq!(video.author.unique_id, "user0");
        assert_eq!(video.caption.tags.len(), 2);
        assert_eq!(video.music.title, "original sound 0");
        assert_eq!(page.waits, 2);
    }

    #[tokio::test]
    async fn test_reextracting_same_handle_is_equal() {
        let mut page = MemoryPage::with_videos(2);
        let table = identity_table();
        let extractor = Extractor::new(&table, WAIT, false);
        let item = page.id_of(0);

        let first = extractor.extract(&mut page, &item).await.unwrap();
        let second = extractor.extract(&mut page, &item).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.author, second.author);
        assert_eq!(first.caption, second.caption);
    }

    #[tokio::test]
    async fn test_missing_author_is_an_error() {
        let mut page = MemoryPage::with_videos(1);
        page.remove_children(0, names::AUTHOR_NICKNAME);
        let table = identity_table();
        let item = page.id_of(0);

        let err = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExtractError::Missing {
                name: names::AUTHOR_NICKNAME
            }
        );
    }

    #[tokio::test]
    async fn test_tag_without_href_is_an_error() {
        let mut page = MemoryPage::with_videos(1);
        let caption = page.child(0, names::CAPTION_CONTAINER);
        page.add_child(caption, names::CAPTION_TAGS, "", &[]);
        let table = identity_table();
        let item = page.id_of(0);

        let err = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingAttribute { attribute: "href", .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_item_is_reported_as_stale() {
        let mut page = MemoryPage::with_videos(1);
        page.mark_stale(0);
        let table = identity_table();
        let item = page.id_of(0);

        let err = Extractor::new(&table, WAIT, false)
            .extract(&mut page, &item)
            .await
            .unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn test_markup_capture() {
        let mut page = MemoryPage::with_videos(1);
        let table = identity_table();
        let item = page.id_of(0);

        let video = Extractor::new(&table, WAIT, true)
            .extract(&mut page, &item)
            .await
            .unwrap();
        assert_eq!(video.markup.as_deref(), Some("<div>item 0</div>"));
    }
}
