use std::time::Duration;

use url::Url;

use crate::document::{DocumentSource, PageElement};
use crate::locators::{resolve_first, SelectorCascade};

const PAGE_PARAM: &str = "page";


/// Where the session is within the results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaginationState {
    pub(crate) current_page: u32,
    pub(crate) total_pages: u32
}


/// Parses the label of the last pagination link. Anything that is not a positive
/// integer, including an empty list, means there is a single page.
pub(crate) fn total_pages_from(labels: &[String]) -> u32 {
    labels
        .last()
        .and_then(|label| label.trim().parse::<u32>().ok())
        .filter(|total| *total > 0)
        .unwrap_or(1)
}


/// Decides how many results pages exist and which one comes next.
///
/// The total is resolved once from the first page and never revisited, even if later
/// pages render different pagination controls.
pub(crate) struct PaginationController {
    base_url: Url,
    cascade: SelectorCascade,
    timeout: Duration,
    max_pages: Option<u32>,
    state: PaginationState,
    resolved: bool
}


impl PaginationController {
    pub(crate) fn new(base_url: Url, cascade: SelectorCascade, timeout: Duration) -> Self {
        Self {
            base_url,
            cascade,
            timeout,
            max_pages: None,
            state: PaginationState { current_page: 1, total_pages: 1 },
            resolved: false
        }
    }

    pub(crate) fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub(crate) fn state(&self) -> PaginationState {
        self.state
    }

    /// Reads the pagination controls of the loaded first page. Only the first call
    /// inspects the document.
    pub(crate) fn resolve<S: DocumentSource>(&mut self, source: &S) -> u32 {
        if self.resolved {
            return self.state.total_pages;
        }
        let labels = resolve_first(self.cascade.specs(), |_, spec| {
            source
                .wait_for(spec, self.timeout)
                .ok()
                .filter(|links| !links.is_empty())
                .map(|links| {
                    links
                        .iter()
                        .map(|link| link.text().found().unwrap_or_default())
                        .collect::<Vec<_>>()
                })
        });

        let total = match labels {
            Some((spec_index, labels)) => {
                tracing::debug!(spec_index, ?labels, "Found pagination links");
                total_pages_from(&labels)
            }
            None => {
                tracing::debug!("No pagination links, assuming a single page");
                1
            }
        };
        self.settle_total(total)
    }

    /// Fixes the total at one page when the first page could not be loaded at all
    pub(crate) fn resolve_unavailable(&mut self) -> u32 {
        if self.resolved {
            return self.state.total_pages;
        }
        self.settle_total(1)
    }

    fn settle_total(&mut self, total: u32) -> u32 {
        let total = match self.max_pages {
            Some(max) if total > max => {
                tracing::info!(total, max, "Capping the number of pages");
                max
            }
            _ => total
        };
        self.state.total_pages = total;
        self.resolved = true;
        tracing::info!(total_pages = total, "Resolved pagination");
        total
    }

    /// Moves to the next page and returns its number and URL, or `None` once every page was visited
    pub(crate) fn advance(&mut self) -> Option<(u32, Url)> {
        if self.state.current_page >= self.state.total_pages {
            return None;
        }
        self.state.current_page += 1;
        let page = self.state.current_page;
        Some((page, self.page_url(page)))
    }

    /// Page 1 is the base URL itself. Later pages carry a `page` query parameter,
    /// replacing one the base URL may already have.
    pub(crate) fn page_url(&self, page: u32) -> Url {
        if page <= 1 {
            return self.base_url.clone();
        }
        let retained: Vec<(String, String)> = self.base_url
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(PAGE_PARAM, &page.to_string());
        url
    }
}
