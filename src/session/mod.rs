use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use url::Url;

use crate::document::{DocumentSource, PageElement};
use crate::locators::{CardLocator, FieldExtractor, SelectorCascade};
use crate::sinks::{persist_all, PersistenceSink, SinkOutcome};

mod diagnostics;
mod listing;
mod pacing;
mod pagination;

pub(crate) use diagnostics::{CaptureReason, DiagnosticCapture, Diagnostics};
pub(crate) use listing::{ExtractionRun, Listing, LISTING_COLUMNS};
pub(crate) use pacing::{Pacing, MAX_DELAY_SECS};
pub(crate) use pagination::PaginationController;

const SCROLL_STEPS: u32 = 3;
const SCROLL_STEP_PX: u32 = 500;


/// Everything needed to read one listing site
#[derive(Debug, Clone)]
pub(crate) struct ExtractionPlan {
    pub(crate) cards: SelectorCascade,
    pub(crate) pagination: SelectorCascade,
    pub(crate) fields: FieldExtractor
}


#[derive(Debug, Clone)]
pub(crate) struct SessionOptions {
    /// Bound on the wait for each card selector
    pub(crate) wait_timeout: Duration,
    /// Bound on the wait for each pagination selector. Many result sets have a single page,
    /// so this is kept much shorter than `wait_timeout`.
    pub(crate) pagination_timeout: Duration,
    pub(crate) max_pages: Option<u32>,
    pub(crate) pacing: Pacing,
    pub(crate) diagnostics_dir: Option<PathBuf>
}


impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(20),
            pagination_timeout: Duration::from_secs(3),
            max_pages: None,
            pacing: Pacing::default(),
            diagnostics_dir: Some(PathBuf::from("debug"))
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Idle,
    Navigating,
    Settling,
    Scanning,
    NoCardsFound,
    CardsFound,
    ExtractingCards,
    PageComplete,
    Done,
    Persisting,
    Terminal
}


struct StateTracker {
    history: Vec<SessionState>
}


impl StateTracker {
    fn new() -> Self {
        Self { history: vec![SessionState::Idle] }
    }

    fn current(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Idle)
    }

    fn enter(&mut self, next: SessionState) {
        tracing::trace!(from = ?self.current(), to = ?next, "Session state change");
        self.history.push(next);
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageStatus {
    Extracted {
        cards: usize,
        /// Which card selector matched
        spec_index: usize
    },
    NoCardsFound,
    NavigationFailed(String)
}


#[derive(Debug, Clone)]
pub(crate) struct PageOutcome {
    pub(crate) page: u32,
    pub(crate) url: Url,
    pub(crate) status: PageStatus
}


/// Results of the extraction phase, before anything is persisted
#[derive(Debug)]
pub(crate) struct Extraction {
    pub(crate) run: ExtractionRun,
    pub(crate) listings: Vec<Listing>,
    pub(crate) pages: Vec<PageOutcome>
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStatus {
    /// Every page yielded cards and every sink succeeded
    Complete,
    /// Something was lost along the way, whatever was gathered is still valid
    Partial
}


#[derive(Debug)]
pub(crate) struct SessionReport {
    pub(crate) run: ExtractionRun,
    pub(crate) listings: Vec<Listing>,
    pub(crate) pages: Vec<PageOutcome>,
    pub(crate) sinks: Vec<SinkOutcome>,
    pub(crate) diagnostics: Vec<DiagnosticCapture>,
    pub(crate) status: RunStatus
}


impl SessionReport {
    fn new(extraction: Extraction, sinks: Vec<SinkOutcome>, diagnostics: Vec<DiagnosticCapture>) -> Self {
        let Extraction { run, listings, pages } = extraction;
        let pages_ok = pages.iter().all(|p| matches!(p.status, PageStatus::Extracted { .. }));
        let sinks_ok = sinks.iter().all(SinkOutcome::succeeded);
        let status = if pages_ok && sinks_ok { RunStatus::Complete } else { RunStatus::Partial };
        Self { run, listings, pages, sinks, diagnostics, status }
    }

    pub(crate) fn log_summary(&self) {
        let failed_pages: Vec<_> = self.pages
            .iter()
            .filter(|p| !matches!(p.status, PageStatus::Extracted { .. }))
            .collect();
        for outcome in &failed_pages {
            tracing::warn!(page = outcome.page, url = %outcome.url, status = ?outcome.status, "Page yielded no listings");
        }
        for capture in &self.diagnostics {
            tracing::info!(
                page = capture.page,
                reason = ?capture.reason,
                bytes = capture.markup_len,
                path = ?capture.path,
                "Diagnostic capture"
            );
        }
        let failed_sinks: Vec<_> = self.sinks
            .iter()
            .filter(|s| !s.succeeded())
            .map(|s| s.sink)
            .collect();

        tracing::info!(
            run_id = %self.run.id,
            status = ?self.status,
            listings = self.listings.len(),
            pages = self.run.total_pages,
            failed_pages = failed_pages.len(),
            ?failed_sinks,
            diagnostics = self.diagnostics.len(),
            "Run finished"
        );
    }
}


/// Drives one listing site from its first results page to persistence.
///
/// The session owns its document source exclusively. Pages and cards are processed one at
/// a time and failures stay inside the page or field they happened in.
pub(crate) struct ExtractionSession<S> {
    source: S,
    source_label: String,
    cards: CardLocator,
    fields: FieldExtractor,
    pagination: PaginationController,
    pacing: Pacing,
    diagnostics: Diagnostics,
    states: StateTracker
}


impl<S: DocumentSource> ExtractionSession<S> {
    pub(crate) fn new(source: S, source_label: impl Into<String>, base_url: Url, plan: ExtractionPlan, options: SessionOptions) -> Self {
        let ExtractionPlan { cards, pagination, fields } = plan;
        Self {
            source,
            source_label: source_label.into(),
            cards: CardLocator::new(cards, options.wait_timeout),
            fields,
            pagination: PaginationController::new(base_url, pagination, options.pagination_timeout)
                .with_max_pages(options.max_pages),
            pacing: options.pacing,
            diagnostics: Diagnostics::new(options.diagnostics_dir),
            states: StateTracker::new()
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        self.states.current()
    }

    /// Visits every results page and collects its listings
    pub(crate) fn extract(&mut self) -> Extraction {
        let mut listings = vec![];
        let mut pages = vec![];

        let mut next = Some((1, self.pagination.page_url(1)));
        while let Some((page, url)) = next {
            let status = self.extract_page(page, &url, &mut listings);
            tracing::info!(page, ?status, total_listings = listings.len(), "Page complete");
            pages.push(PageOutcome { page, url, status });
            self.states.enter(SessionState::PageComplete);

            next = self.pagination.advance();
            if next.is_some() {
                self.pacing.page.pause();
            }
        }
        self.states.enter(SessionState::Done);

        let run = ExtractionRun::new(
            self.source_label.clone(),
            self.pagination.state().total_pages,
            listings.len(),
            self.source.uses_automation()
        );
        Extraction { run, listings, pages }
    }

    fn extract_page(&mut self, page: u32, url: &Url, listings: &mut Vec<Listing>) -> PageStatus {
        self.states.enter(SessionState::Navigating);
        tracing::info!(page, %url, "Loading page");
        if let Err(e) = self.source.navigate(url) {
            tracing::warn!(page, "Navigation failed: {e}");
            self.diagnostics.capture(&self.source, page, CaptureReason::NavigationFailed);
            if page == 1 {
                self.pagination.resolve_unavailable();
            }
            return PageStatus::NavigationFailed(e.to_string());
        }

        self.states.enter(SessionState::Settling);
        settle(&self.source, &self.pacing);
        if page == 1 {
            self.pagination.resolve(&self.source);
        }

        self.states.enter(SessionState::Scanning);
        let Some(located) = self.cards.locate(&self.source) else {
            self.states.enter(SessionState::NoCardsFound);
            tracing::warn!(page, "No listing cards matched any selector");
            self.diagnostics.capture(&self.source, page, CaptureReason::NoCardsFound);
            return PageStatus::NoCardsFound;
        };
        self.states.enter(SessionState::CardsFound);

        self.states.enter(SessionState::ExtractingCards);
        for card in &located.cards {
            card.scroll_into_view();
            let values = self.fields.extract_all(card, url);
            tracing::debug!(page, title = %values.title, company = %values.company, "Listing added");
            listings.push(Listing::new(values, page, Utc::now()));
            self.pacing.card.pause();
        }
        PageStatus::Extracted { cards: located.cards.len(), spec_index: located.spec_index }
    }

    /// Hands the extraction to every sink. Sink failures only downgrade the report.
    pub(crate) async fn persist(&mut self, extraction: Extraction, sinks: &[&dyn PersistenceSink]) -> SessionReport {
        self.states.enter(SessionState::Persisting);
        let outcomes = persist_all(&extraction.run, &extraction.listings, sinks).await;
        self.states.enter(SessionState::Terminal);
        SessionReport::new(extraction, outcomes, self.diagnostics.captures().to_vec())
    }
}


/// Gives lazily rendered content a chance to appear before cards are looked up
fn settle(source: &impl DocumentSource, pacing: &Pacing) {
    pacing.initial.pause();
    for step in 1..=SCROLL_STEPS {
        let script = format!("window.scrollTo(0, {});", step * SCROLL_STEP_PX);
        if let Err(e) = source.run_script(&script) {
            tracing::debug!(step, "Scroll step failed: {e}");
        }
        pacing.scroll.pause();
    }
}
