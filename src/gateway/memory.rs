//! Scripted in-memory page for tests.
//!
//! Nodes are keyed by the raw locator text they answer to, so tests pair this
//! page with [`identity_table`](crate::locators::identity_table), where every
//! logical name maps to itself. Time is virtual: pauses and waits advance
//! `now` instead of sleeping, so timing behavior is deterministic.

use super::{ElementHandle, PageGateway, Scope};
use crate::error::GatewayError;
use crate::locators::{Locator, names};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
struct Node {
    id: String,
    text: String,
    attrs: HashMap<String, String>,
    children: HashMap<String, Vec<usize>>,
    appears_at: Duration,
    vanishes_at: Option<Duration>,
    stale: bool,
}

impl Node {
    fn visible_at(&self, t: Duration) -> bool {
        self.appears_at <= t && self.vanishes_at.is_none_or(|v| t < v)
    }
}

#[derive(Debug)]
pub(crate) struct MemoryPage {
    nodes: Vec<Node>,
    by_id: HashMap<String, usize>,
    page_children: HashMap<String, Vec<usize>>,
    feed: Vec<usize>,
    realized: usize,
    per_scroll: usize,
    now: Duration,

    pub visited: Vec<String>,
    pub submitted: Vec<String>,
    pub clicks: Vec<String>,
    pub scrolled_into_view: Vec<String>,
    pub scrolls: usize,
    pub waits: usize,
}

impl MemoryPage {
    /// Empty page whose feed grows by `per_scroll` items on each scroll.
    pub fn new(per_scroll: usize) -> Self {
        Self {
            nodes: Vec::new(),
            by_id: HashMap::new(),
            page_children: HashMap::new(),
            feed: Vec::new(),
            realized: 0,
            per_scroll,
            now: Duration::ZERO,
            visited: Vec::new(),
            submitted: Vec::new(),
            clicks: Vec::new(),
            scrolled_into_view: Vec::new(),
            scrolls: 0,
            waits: 0,
        }
    }

    /// Page with `n` standard items, all realized up front.
    pub fn with_videos(n: usize) -> Self {
        let mut page = Self::new(0);
        for i in 0..n {
            page.push_video(i);
        }
        page.realize(n);
        page
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Make the first `n` feed items visible without scrolling.
    pub fn realize(&mut self, n: usize) {
        self.realized = n.min(self.feed.len());
    }

    /// Node of the `n`th feed item.
    pub fn item(&self, n: usize) -> usize {
        self.feed[n]
    }

    pub fn id_of(&self, node: usize) -> ElementHandle {
        ElementHandle::new(self.nodes[node].id.clone())
    }

    fn alloc(&mut self, text: &str, attrs: &[(&str, &str)]) -> usize {
        let idx = self.nodes.len();
        let id = format!("node-{idx}");
        self.by_id.insert(id.clone(), idx);
        self.nodes.push(Node {
            id,
            text: text.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Node::default()
        });
        idx
    }

    /// Add a node under `parent`, answering to `locator`.
    pub fn add_child(
        &mut self,
        parent: usize,
        locator: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> usize {
        let idx = self.alloc(text, attrs);
        self.nodes[parent]
            .children
            .entry(locator.to_string())
            .or_default()
            .push(idx);
        idx
    }

    /// Add a document-level node answering to `locator`.
    pub fn add_page_element(&mut self, locator: &str) -> usize {
        let idx = self.alloc("", &[]);
        self.page_children
            .entry(locator.to_string())
            .or_default()
            .push(idx);
        idx
    }

    /// Pose a challenge that clears at `clears_at`, or never.
    pub fn add_challenge(&mut self, clears_at: Option<Duration>) -> usize {
        let idx = self.add_page_element(names::CHALLENGE_MARKER);
        self.nodes[idx].vanishes_at = clears_at;
        idx
    }

    /// Append a fully populated item to the feed; returns its node.
    pub fn push_video(&mut self, n: usize) -> usize {
        use names::*;
        let item = self.alloc(&format!("item {n}"), &[]);
        self.feed.push(item);

        self.add_child(item, AUTHOR_UNIQUE_ID, &format!(" user{n} "), &[]);
        let avatar = format!("https://cdn.example/avatar/{n}.jpg");
        self.add_child(item, AUTHOR_AVATAR, "", &[("src", avatar.as_str())]);
        let profile = format!(" https://example.com/@user{n} ");
        self.add_child(item, AUTHOR_LINK, "", &[("href", profile.as_str())]);
        self.add_child(item, AUTHOR_NICKNAME, &format!("User {n}\n"), &[]);

        let caption = self.add_child(item, CAPTION_CONTAINER, "", &[]);
        self.add_child(caption, CAPTION_TEXT, &format!("  caption {n} "), &[]);
        for tag in ["fyp", "dance"] {
            let link = format!("https://example.com/tag/{tag}");
            let anchor = self.add_child(caption, CAPTION_TAGS, "", &[("href", link.as_str())]);
            self.add_child(anchor, TAG_TEXT, &format!(" #{tag} "), &[]);
        }

        let media = self.add_child(item, MEDIA_CONTAINER, "", &[]);
        let src = format!(" https://cdn.example/video/{n}.mp4 ");
        self.add_child(media, MEDIA_SOURCE, "", &[("src", src.as_str())]);

        let metrics = self.add_child(item, METRICS_CONTAINER, "", &[]);
        self.add_child(metrics, METRICS_LIKES, " 1.2M ", &[]);
        self.add_child(metrics, METRICS_COMMENTS, &format!("{n}"), &[]);
        self.add_child(metrics, METRICS_SHARES, "42", &[]);

        let music = self.add_child(item, MUSIC_CONTAINER, "", &[]);
        self.add_child(music, MUSIC_TITLE, &format!(" original sound {n} "), &[]);
        let song = format!("https://example.com/music/{n}");
        self.add_child(music, MUSIC_LINK, "", &[("href", song.as_str())]);

        item
    }

    /// Only child of `parent` answering to `locator`.
    pub fn child(&self, parent: usize, locator: &str) -> usize {
        self.nodes[parent].children[locator][0]
    }

    /// Drop every child of `parent` answering to `locator`.
    pub fn remove_children(&mut self, parent: usize, locator: &str) {
        self.nodes[parent].children.remove(locator);
    }

    /// Make the item's media elements attach at `at`, or never.
    pub fn delay_media(&mut self, item: usize, at: Option<Duration>) {
        let media = self.child(item, names::MEDIA_CONTAINER);
        match at {
            Some(at) => {
                let source = self.child(media, names::MEDIA_SOURCE);
                self.nodes[source].appears_at = at;
            }
            None => self.remove_children(media, names::MEDIA_SOURCE),
        }
    }

    /// Swap the item's `<source>` for a bare `<video src>` attaching at `at`.
    pub fn use_video_element(&mut self, item: usize, at: Duration) {
        let media = self.child(item, names::MEDIA_CONTAINER);
        self.remove_children(media, names::MEDIA_SOURCE);
        let video = self.add_child(
            media,
            names::MEDIA_VIDEO,
            "",
            &[("src", "https://cdn.example/alt.mp4")],
        );
        self.nodes[video].appears_at = at;
    }

    /// Mark a node as detached from the document.
    pub fn mark_stale(&mut self, node: usize) {
        self.nodes[node].stale = true;
    }

    fn resolve(&self, handle: &ElementHandle) -> Result<usize, GatewayError> {
        let stale = || GatewayError::StaleElement {
            id: handle.id().to_string(),
        };
        let idx = *self.by_id.get(handle.id()).ok_or_else(stale)?;
        if self.nodes[idx].stale {
            return Err(stale());
        }
        Ok(idx)
    }

    /// All nodes answering to `locator` in `scope`, regardless of timing.
    fn candidates(&self, scope: Scope<'_>, locator: &Locator) -> Result<Vec<usize>, GatewayError> {
        match scope {
            Scope::Page if locator.as_str() == names::CONTAINERS => {
                Ok(self.feed[..self.realized].to_vec())
            }
            Scope::Page => Ok(self
                .page_children
                .get(locator.as_str())
                .cloned()
                .unwrap_or_default()),
            Scope::Within(handle) => {
                let idx = self.resolve(handle)?;
                Ok(self.nodes[idx]
                    .children
                    .get(locator.as_str())
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    fn visible(&self, scope: Scope<'_>, locator: &Locator) -> Result<Vec<usize>, GatewayError> {
        Ok(self
            .candidates(scope, locator)?
            .into_iter()
            .filter(|&i| self.nodes[i].visible_at(self.now))
            .collect())
    }
}

impl PageGateway for MemoryPage {
    async fn navigate(&mut self, url: &str) -> Result<(), GatewayError> {
        self.visited.push(url.to_string());
        Ok(())
    }

    async fn find(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, GatewayError> {
        Ok(self
            .visible(scope, locator)?
            .first()
            .map(|&i| self.id_of(i)))
    }

    async fn find_all(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, GatewayError> {
        Ok(self
            .visible(scope, locator)?
            .into_iter()
            .map(|i| self.id_of(i))
            .collect())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, GatewayError> {
        let idx = self.resolve(element)?;
        Ok(self.nodes[idx].attrs.get(name).cloned())
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String, GatewayError> {
        let idx = self.resolve(element)?;
        Ok(self.nodes[idx].text.clone())
    }

    async fn inner_html(
        &mut self,
        element: &ElementHandle,
    ) -> Result<Option<String>, GatewayError> {
        let idx = self.resolve(element)?;
        Ok(Some(format!("<div>{}</div>", self.nodes[idx].text)))
    }

    async fn wait_present(
        &mut self,
        scope: Scope<'_>,
        alternatives: &[&Locator],
        timeout: Duration,
    ) -> Result<ElementHandle, GatewayError> {
        self.waits += 1;
        let deadline = self.now + timeout;
        let mut best: Option<(Duration, usize)> = None;
        for locator in alternatives {
            for i in self.candidates(scope, locator)? {
                let node = &self.nodes[i];
                let at = node.appears_at.max(self.now);
                if at <= deadline && node.visible_at(at) && best.is_none_or(|(t, _)| at < t) {
                    best = Some((at, i));
                }
            }
        }
        match best {
            Some((at, i)) => {
                self.now = at;
                Ok(self.id_of(i))
            }
            None => {
                self.now = deadline;
                Err(GatewayError::Timeout { waited: timeout })
            }
        }
    }

    async fn wait_absent(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), GatewayError> {
        self.waits += 1;
        let deadline = self.now + timeout;
        let mut clears_at = self.now;
        for i in self.visible(scope, locator)? {
            match self.nodes[i].vanishes_at {
                Some(v) => clears_at = clears_at.max(v),
                None => clears_at = Duration::MAX,
            }
        }
        if clears_at <= deadline {
            self.now = clears_at;
            Ok(())
        } else {
            self.now = deadline;
            Err(GatewayError::Timeout { waited: timeout })
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), GatewayError> {
        self.resolve(element)?;
        self.clicks.push(element.id().to_string());
        Ok(())
    }

    async fn submit_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.resolve(element)?;
        self.submitted.push(text.to_string());
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), GatewayError> {
        self.scrolls += 1;
        self.realized = (self.realized + self.per_scroll).min(self.feed.len());
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<(), GatewayError> {
        self.resolve(element)?;
        self.scrolled_into_view.push(element.id().to_string());
        Ok(())
    }

    async fn pause(&mut self, duration: Duration) {
        self.now += duration;
    }
}
