//! The driven page as the crawler sees it.
//!
//! [`PageGateway`] is the only way the crawler touches the browser: element
//! lookups by [`Locator`], attribute and text reads, bounded waits, scrolling,
//! and settle pauses. Implementations:
//!
//! | Gateway | Module | Notes |
//! |---------|--------|-------|
//! | Chromium over CDP | [`chromium`] | `browser` feature; locators are CSS selectors |
//! | Scripted in-memory page | `memory` | tests only; virtual clock |
//!
//! A gateway is owned by exactly one [`Crawler`](crate::crawler::Crawler) for
//! its whole life, which is why every method takes `&mut self`.

#[cfg(feature = "browser")]
pub mod chromium;
#[cfg(test)]
pub(crate) mod memory;

use crate::error::GatewayError;
use crate::locators::Locator;
use std::fmt;
use std::time::Duration;

/// Opaque reference to one node on the page.
///
/// Wraps the node's session-scoped identity: two handles to the same live node
/// compare equal. A handle is valid only while the page state that produced it
/// persists; after that, gateway calls using it fail with
/// [`GatewayError::StaleElement`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a lookup is resolved.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// The whole document.
    Page,
    /// Descendants of one element.
    Within(&'a ElementHandle),
}

/// Operations the crawler needs from a browser session.
///
/// Futures are not required to be `Send`: a crawl runs on a single task.
#[allow(async_fn_in_trait)]
pub trait PageGateway {
    /// Load `url` in the session's page.
    ///
    /// Handles obtained before navigating are stale afterwards.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Browser`] if the page could not be loaded.
    async fn navigate(&mut self, url: &str) -> Result<(), GatewayError>;

    /// First element matching `locator`, if any is present right now.
    ///
    /// Does not wait; use [`wait_present`](Self::wait_present) for elements
    /// that attach late.
    ///
    /// # Errors
    ///
    /// [`GatewayError::StaleElement`] if `scope` is an element that has been
    /// detached.
    async fn find(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, GatewayError>;

    /// Every element matching `locator`, in presentation order.
    async fn find_all(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, GatewayError>;

    /// Read one attribute of an element.
    ///
    /// # Arguments
    ///
    /// * `element` - A handle from an earlier lookup
    /// * `name` - The attribute name, e.g. `"src"` or `"href"`
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the element exists but has no such attribute.
    ///
    /// # Errors
    ///
    /// [`GatewayError::StaleElement`] if the node is gone.
    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, GatewayError>;

    /// Rendered text of an element; empty when it has none.
    async fn text(&mut self, element: &ElementHandle) -> Result<String, GatewayError>;

    /// Markup inside an element, for raw re-inspection of an item.
    ///
    /// # Errors
    ///
    /// [`GatewayError::StaleElement`] if the node is gone.
    async fn inner_html(&mut self, element: &ElementHandle)
    -> Result<Option<String>, GatewayError>;

    /// Wait up to `timeout` for any of `alternatives` to be present; the first
    /// alternative found wins.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Timeout`] when nothing matched in time. Callers treat
    /// this as an expected outcome, not a page failure.
    async fn wait_present(
        &mut self,
        scope: Scope<'_>,
        alternatives: &[&Locator],
        timeout: Duration,
    ) -> Result<ElementHandle, GatewayError>;

    /// Wait up to `timeout` for nothing to match `locator`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Timeout`] if a match is still present at the deadline.
    async fn wait_absent(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), GatewayError>;

    /// Click an element (the search feed's load-more control).
    async fn click(&mut self, element: &ElementHandle) -> Result<(), GatewayError>;

    /// Type `text` into an input and submit it with Enter.
    async fn submit_text(&mut self, element: &ElementHandle, text: &str)
    -> Result<(), GatewayError>;

    /// Scroll the document to its end, prompting the feed to realize more
    /// items.
    async fn scroll_to_bottom(&mut self) -> Result<(), GatewayError>;

    /// Bring an element into the viewport so lazily rendered parts attach.
    ///
    /// # Errors
    ///
    /// [`GatewayError::StaleElement`] if the node was replaced since it was
    /// collected.
    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<(), GatewayError>;

    /// Block the crawl for `duration`.
    ///
    /// Every settle pause goes through here so tests can run on a virtual
    /// clock.
    async fn pause(&mut self, duration: Duration);
}
