//! [`PageGateway`] over the Chrome DevTools Protocol via chromiumoxide.
//!
//! Locators are CSS selectors. Handles are keyed by the CDP backend node id,
//! which is stable for a node's lifetime, so repeated lookups of the same node
//! yield equal handles. Bounded waits poll on `tokio::time`.

use super::{ElementHandle, PageGateway, Scope};
use crate::config::BrowserSettings;
use crate::error::GatewayError;
use crate::locators::Locator;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Switches applied to every launch, before any configured ones.
const DEFAULT_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--mute-audio",
];

/// CDP messages that mean a node is gone from the document.
const DETACHED_MARKERS: &[&str] = &[
    "Could not find node",
    "No node with given id",
    "does not belong to the document",
    "Node is detached",
    "Cannot find context with specified id",
];

/// One Chromium browser with one page, driven by one crawler.
pub struct ChromiumPage {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    elements: HashMap<String, Element>,
    poll_interval: Duration,
}

impl ChromiumPage {
    /// Launch Chromium and open a blank page.
    #[instrument(level = "info", skip_all, fields(headless = settings.headless))]
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, GatewayError> {
        let mut builder = BrowserConfig::builder();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in DEFAULT_ARGS
            .iter()
            .copied()
            .chain(settings.chrome_args.iter().map(String::as_str))
        {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(GatewayError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| GatewayError::Launch(e.to_string()))?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| GatewayError::Launch(e.to_string()))?;
        info!("Browser launched");

        Ok(Self {
            browser,
            handler,
            page,
            elements: HashMap::new(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(10)),
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn close(mut self) -> Result<(), GatewayError> {
        self.elements.clear();
        self.browser.close().await.map_err(browser_error)?;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }

    fn element(&self, handle: &ElementHandle) -> Result<&Element, GatewayError> {
        self.elements
            .get(handle.id())
            .ok_or_else(|| GatewayError::StaleElement {
                id: handle.id().to_string(),
            })
    }

    /// Query `scope` and register every match; returns handles in page order.
    async fn query(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, GatewayError> {
        let found = match scope {
            Scope::Page => self
                .page
                .find_elements(locator.as_str())
                .await
                .map_err(browser_error)?,
            Scope::Within(handle) => match self.element(handle)?.find_elements(locator.as_str()).await
            {
                Ok(found) => found,
                Err(e) => return Err(element_error(handle, e)),
            },
        };

        let mut handles = Vec::with_capacity(found.len());
        for element in found {
            let id = element.backend_node_id.inner().to_string();
            handles.push(ElementHandle::new(id.clone()));
            self.elements.insert(id, element);
        }
        Ok(handles)
    }
}

fn browser_error(e: CdpError) -> GatewayError {
    GatewayError::Browser(e.to_string())
}

fn element_error(handle: &ElementHandle, e: CdpError) -> GatewayError {
    let msg = e.to_string();
    if DETACHED_MARKERS.iter().any(|m| msg.contains(m)) {
        GatewayError::StaleElement {
            id: handle.id().to_string(),
        }
    } else {
        GatewayError::Browser(msg)
    }
}

impl PageGateway for ChromiumPage {
    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), GatewayError> {
        self.elements.clear();
        self.page.goto(url).await.map_err(browser_error)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn find(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, GatewayError> {
        Ok(self.query(scope, locator).await?.into_iter().next())
    }

    async fn find_all(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, GatewayError> {
        self.query(scope, locator).await
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, GatewayError> {
        self.element(element)?
            .attribute(name)
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String, GatewayError> {
        let text = self
            .element(element)?
            .inner_text()
            .await
            .map_err(|e| element_error(element, e))?;
        Ok(text.unwrap_or_default())
    }

    async fn inner_html(
        &mut self,
        element: &ElementHandle,
    ) -> Result<Option<String>, GatewayError> {
        self.element(element)?
            .inner_html()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn wait_present(
        &mut self,
        scope: Scope<'_>,
        alternatives: &[&Locator],
        timeout: Duration,
    ) -> Result<ElementHandle, GatewayError> {
        let deadline = Instant::now() + timeout;
        loop {
            for locator in alternatives {
                if let Some(found) = self.query(scope, locator).await?.into_iter().next() {
                    return Ok(found);
                }
            }
            if Instant::now() >= deadline {
                return Err(GatewayError::Timeout { waited: timeout });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_absent(
        &mut self,
        scope: Scope<'_>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), GatewayError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.query(scope, locator).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(GatewayError::Timeout { waited: timeout });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), GatewayError> {
        self.element(element)?
            .click()
            .await
            .map_err(|e| element_error(element, e))?;
        Ok(())
    }

    async fn submit_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), GatewayError> {
        let input = self.element(element)?;
        input
            .click()
            .await
            .map_err(|e| element_error(element, e))?;
        input
            .type_str(text)
            .await
            .map_err(|e| element_error(element, e))?;
        input
            .press_key("Enter")
            .await
            .map_err(|e| element_error(element, e))?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), GatewayError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight);")
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<(), GatewayError> {
        self.element(element)?
            .scroll_into_view()
            .await
            .map_err(|e| element_error(element, e))?;
        Ok(())
    }

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
