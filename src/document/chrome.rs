use std::{ffi::OsStr, sync::Arc, time::Duration};

use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use url::Url;

use crate::locators::{Lookup, SelectorKind, SelectorSpec};

use super::{DocumentSource, PageElement, SourceError};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "es-PE,es;q=0.9,en;q=0.8";
const PLATFORM: &str = "MacIntel";
const LAUNCH_ARGS: [&str; 8] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--disable-browser-side-navigation",
    "--disable-gpu",
    "--ignore-certificate-errors",
    "--ignore-ssl-errors"
];
const WINDOW_SIZE: (u32, u32) = (1920, 1080);
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);


/// A single Chrome tab driven through the DevTools protocol
pub(crate) struct ChromeSource {
    // Dropping the browser kills the Chrome process, so it lives as long as the tab
    _browser: Browser,
    tab: Arc<Tab>,
    default_timeout: Duration
}


fn launch_error(error: anyhow::Error) -> SourceError {
    SourceError::Launch(format!("{error:#}"))
}


impl ChromeSource {
    /// Starts Chrome and opens the tab that every page of the session is loaded into.
    ///
    /// `default_timeout` bounds navigations, element waits use their own timeout.
    pub(crate) fn launch(headless: bool, default_timeout: Duration) -> Result<Self, SourceError> {
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some(WINDOW_SIZE))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(LAUNCH_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(|e| SourceError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(launch_error)?;
        let tab = browser.new_tab().map_err(launch_error)?;
        tab.set_user_agent(USER_AGENT, Some(ACCEPT_LANGUAGE), Some(PLATFORM)).map_err(launch_error)?;
        tab.enable_stealth_mode().map_err(launch_error)?;
        tab.set_default_timeout(default_timeout);

        tracing::info!(headless, "Chrome started");
        Ok(Self { _browser: browser, tab, default_timeout })
    }
}


impl DocumentSource for ChromeSource {
    type Element<'a> = ChromeElement<'a>;

    fn navigate(&mut self, url: &Url) -> Result<(), SourceError> {
        self.tab
            .navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| SourceError::NavigationTimeout { url: url.to_string(), reason: format!("{e:#}") })
    }

    fn wait_for(&self, spec: &SelectorSpec, timeout: Duration) -> Result<Vec<Self::Element<'_>>, SourceError> {
        self.tab.set_default_timeout(timeout);
        let found = match spec.kind {
            SelectorKind::Css => self.tab.wait_for_elements(&spec.pattern),
            SelectorKind::XPath => self.tab.wait_for_elements_by_xpath(&spec.pattern)
        };
        self.tab.set_default_timeout(self.default_timeout);

        match found {
            Ok(elements) if !elements.is_empty() => Ok(elements.into_iter().map(ChromeElement).collect()),
            _ => Err(SourceError::NotFound { spec: spec.to_string() })
        }
    }

    fn run_script(&self, script: &str) -> Result<(), SourceError> {
        self.tab
            .evaluate(script, false)
            .map(|_| ())
            .map_err(|e| SourceError::Script(format!("{e:#}")))
    }

    fn snapshot(&self) -> Result<String, SourceError> {
        self.tab
            .get_content()
            .map_err(|e| SourceError::Snapshot(format!("{e:#}")))
    }

    fn uses_automation(&self) -> bool {
        true
    }
}


pub(crate) struct ChromeElement<'a>(Element<'a>);


impl<'a> ChromeElement<'a> {
    fn child(&self, spec: &SelectorSpec) -> Option<Element<'_>> {
        let found = match spec.kind {
            SelectorKind::Css => self.0.find_element(&spec.pattern),
            SelectorKind::XPath => self.0.find_element_by_xpath(&spec.pattern)
        };
        found.ok()
    }
}


impl PageElement for ChromeElement<'_> {
    fn text(&self) -> Lookup {
        self.0.get_inner_text().ok().into()
    }

    fn find_text(&self, spec: &SelectorSpec) -> Lookup {
        self.child(spec)
            .and_then(|child| child.get_inner_text().ok())
            .into()
    }

    fn find_attribute(&self, spec: &SelectorSpec, attribute: &str) -> Lookup {
        self.child(spec)
            .and_then(|child| child.get_attribute_value(attribute).ok().flatten())
            .into()
    }

    fn scroll_into_view(&self) {
        if let Err(e) = self.0.scroll_into_view() {
            tracing::debug!("Could not scroll card into view: {e:#}");
        }
    }
}
