use std::time::Duration;

use crate::document::DocumentSource;

use super::{resolve_first, SelectorCascade};


/// Cards found by the winning spec of a [`CardLocator`]
pub(crate) struct LocatedCards<E> {
    pub(crate) cards: Vec<E>,
    /// Position of the winning spec within the cascade
    pub(crate) spec_index: usize
}


/// Finds the repeating listing cards of a results page.
///
/// Class names on listing sites change with every redesign, so cards are located through an
/// ordered list of alternatives rather than by retrying a single selector.
#[derive(Debug, Clone)]
pub(crate) struct CardLocator {
    cascade: SelectorCascade,
    timeout: Duration
}


impl CardLocator {
    /// `timeout` bounds the wait spent on each spec of the cascade
    pub(crate) fn new(cascade: SelectorCascade, timeout: Duration) -> Self {
        Self { cascade, timeout }
    }

    /// Returns the elements of the first spec that matches anything.
    ///
    /// Results are never merged across specs. `None` means the whole cascade was exhausted.
    pub(crate) fn locate<'s, S: DocumentSource>(&self, source: &'s S) -> Option<LocatedCards<S::Element<'s>>> {
        let resolved = resolve_first(self.cascade.specs(), move |index, spec| {
            match source.wait_for(spec, self.timeout) {
                Ok(cards) if !cards.is_empty() => Some(cards),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(spec_index = index, "Card selector {spec} did not match: {e}");
                    None
                }
            }
        });

        let (spec_index, cards) = resolved?;
        tracing::info!(
            spec_index,
            spec = %self.cascade.specs()[spec_index],
            count = cards.len(),
            "Found listing cards"
        );
        Some(LocatedCards { cards, spec_index })
    }
}


#[cfg(test)]
mod tests {
    use url::Url;

    use crate::document::HtmlDocument;
    use crate::locators::SelectorSpec;

    use super::*;

    fn page(body: &str) -> HtmlDocument {
        let mut document = HtmlDocument::new().with_page("https://example.com/", format!("<html><body>{body}</body></html>"));
        document.navigate(&Url::parse("https://example.com/").unwrap()).unwrap();
        document
    }

    fn cascade() -> SelectorCascade {
        SelectorCascade::new(vec![
            SelectorSpec::css("div.missing"),
            SelectorSpec::css("div.card"),
            SelectorSpec::css("div.item")
        ])
    }

    #[test]
    fn first_non_empty_spec_wins_and_later_specs_are_skipped() {
        let document = page(
            r#"<div class="card">a</div><div class="card">b</div><div class="card">c</div>
               <div class="item">1</div><div class="item">2</div><div class="item">3</div>
               <div class="item">4</div><div class="item">5</div>"#
        );

        let located = CardLocator::new(cascade(), Duration::ZERO).locate(&document).unwrap();

        assert_eq!(located.cards.len(), 3);
        assert_eq!(located.spec_index, 1);
        assert_eq!(document.consulted(), cascade().specs()[..2].to_vec());
    }

    #[test]
    fn exhausted_cascade_reports_no_cards() {
        let document = page("<p>Sin resultados</p>");

        assert!(CardLocator::new(cascade(), Duration::ZERO).locate(&document).is_none());
        assert_eq!(document.consulted().len(), 3);
    }
}
