use std::path::PathBuf;

use crate::document::DocumentSource;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureReason {
    NoCardsFound,
    NavigationFailed
}


impl CaptureReason {
    fn slug(self) -> &'static str {
        match self {
            Self::NoCardsFound => "no-cards",
            Self::NavigationFailed => "navigation-failed"
        }
    }
}


/// A markup dump taken when a page produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiagnosticCapture {
    pub(crate) page: u32,
    pub(crate) reason: CaptureReason,
    pub(crate) markup_len: usize,
    /// `None` when no directory is configured or the dump could not be written
    pub(crate) path: Option<PathBuf>
}


/// Keeps raw markup of failed pages around for offline selector maintenance.
///
/// Dumps are not part of any stable output, they only exist so that broken cascades can be
/// fixed against the markup that broke them.
pub(crate) struct Diagnostics {
    dir: Option<PathBuf>,
    captures: Vec<DiagnosticCapture>
}


impl Diagnostics {
    pub(crate) fn new(dir: Option<PathBuf>) -> Self {
        Self { dir, captures: vec![] }
    }

    pub(crate) fn capture(&mut self, source: &impl DocumentSource, page: u32, reason: CaptureReason) {
        let markup = source.snapshot().unwrap_or_else(|e| {
            tracing::warn!(page, "Could not snapshot page for diagnostics: {e}");
            String::new()
        });

        let path = self.dir.as_ref().and_then(|dir| {
            let path = dir.join(format!("page-{page}-{}.html", reason.slug()));
            let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, &markup));
            match written {
                Ok(()) => {
                    tracing::info!(page, path = %path.display(), "Saved page markup for analysis");
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!(page, "Failed to save page markup to {}: {e}", path.display());
                    None
                }
            }
        });

        self.captures.push(DiagnosticCapture { page, reason, markup_len: markup.len(), path });
    }

    pub(crate) fn captures(&self) -> &[DiagnosticCapture] {
        &self.captures
    }
}


#[cfg(test)]
mod tests {
    use url::Url;

    use crate::document::HtmlDocument;

    use super::*;

    #[test]
    fn dumps_current_markup_to_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let html = "<html><body><p>vacío</p></body></html>";
        let mut document = HtmlDocument::new().with_page("https://example.com/", html);
        document.navigate(&Url::parse("https://example.com/").unwrap()).unwrap();

        let mut diagnostics = Diagnostics::new(Some(dir.path().join("debug")));
        diagnostics.capture(&document, 2, CaptureReason::NoCardsFound);

        let capture = &diagnostics.captures()[0];
        assert_eq!(capture.page, 2);
        assert_eq!(capture.markup_len, html.len());
        let path = capture.path.as_ref().unwrap();
        assert!(path.ends_with("page-2-no-cards.html"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), html);
    }

    #[test]
    fn capture_is_recorded_without_a_directory() {
        let document = HtmlDocument::new();
        let mut diagnostics = Diagnostics::new(None);
        diagnostics.capture(&document, 1, CaptureReason::NavigationFailed);

        assert_eq!(
            diagnostics.captures(),
            &[DiagnosticCapture { page: 1, reason: CaptureReason::NavigationFailed, markup_len: 0, path: None }]
        );
    }
}
