use std::time::Duration;

use url::Url;

use crate::locators::{Lookup, SelectorSpec};

mod chrome;
mod html;

pub(crate) use chrome::ChromeSource;
pub(crate) use html::HtmlDocument;
#[cfg(test)]
pub(crate) use html::HtmlElement;


#[derive(Debug, thiserror::Error)]
pub(crate) enum SourceError {
    /// The page did not load or settle in time. Scoped to a single page.
    #[error("navigation to {url} did not settle: {reason}")]
    NavigationTimeout {
        url: String,
        reason: String
    },

    #[error("no element matched {spec}")]
    NotFound {
        spec: String
    },

    #[error("script failed: {0}")]
    Script(String),

    #[error("could not snapshot the page: {0}")]
    Snapshot(String),

    /// The browser could not be started. Nothing can be extracted without it.
    #[error("could not start the browser: {0}")]
    Launch(String)
}


/// An element of a rendered page, usually a listing card.
///
/// Lookups never fail loudly, a miss is reported as [`Lookup::NotFound`].
pub(crate) trait PageElement {
    /// Visible text of this element
    fn text(&self) -> Lookup;

    /// Visible text of the first descendant matching `spec`
    fn find_text(&self, spec: &SelectorSpec) -> Lookup;

    /// Value of `attribute` on the first descendant matching `spec`
    fn find_attribute(&self, spec: &SelectorSpec, attribute: &str) -> Lookup;

    /// Best effort, failures are ignored
    fn scroll_into_view(&self);
}


/// A rendered page that can be driven by an extraction session.
///
/// Every operation blocks and none of them retry internally.
pub(crate) trait DocumentSource {
    type Element<'a>: PageElement where Self: 'a;

    /// Loads `url` and blocks until the page settles or the navigation times out
    fn navigate(&mut self, url: &Url) -> Result<(), SourceError>;

    /// Blocks until at least one element matches `spec`, or fails with
    /// [`SourceError::NotFound`] once `timeout` elapses
    fn wait_for(&self, spec: &SelectorSpec, timeout: Duration) -> Result<Vec<Self::Element<'_>>, SourceError>;

    /// Runs a side effecting script such as a scroll
    fn run_script(&self, script: &str) -> Result<(), SourceError>;

    /// Raw markup of the current page
    fn snapshot(&self) -> Result<String, SourceError>;

    /// Whether pages are rendered by an automated browser
    fn uses_automation(&self) -> bool;
}
