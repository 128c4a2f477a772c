use fxhash::FxHashMap;
use url::Url;

use crate::document::PageElement;

use super::{resolve_first, Lookup, SelectorSpec};

/// Stored in place of any field that no rule could locate
pub(crate) const NOT_AVAILABLE: &str = "No disponible";


/// The logical fields read from every listing card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Field {
    Title,
    Company,
    Location,
    Published,
    Url
}


impl Field {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::Published => "published",
            Self::Url => "url"
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Read {
    Text,
    Attribute(String)
}


/// Locates one descendant of a card and reads either its text or one of its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldRule {
    spec: SelectorSpec,
    read: Read
}


impl FieldRule {
    pub(crate) fn text(spec: SelectorSpec) -> Self {
        Self { spec, read: Read::Text }
    }

    pub(crate) fn attribute(spec: SelectorSpec, attribute: impl Into<String>) -> Self {
        Self { spec, read: Read::Attribute(attribute.into()) }
    }

    fn apply(&self, card: &impl PageElement) -> Lookup {
        match &self.read {
            Read::Text => card.find_text(&self.spec),
            Read::Attribute(attribute) => card.find_attribute(&self.spec, attribute)
        }
    }
}


/// Values of every [`Field`] for one card. Fields that were not found hold [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldValues {
    pub(crate) title: String,
    pub(crate) company: String,
    pub(crate) location: String,
    pub(crate) published: String,
    pub(crate) url: String
}


/// Holds an ordered rule cascade per field.
///
/// Extraction is infallible. A field whose rules all miss yields [`NOT_AVAILABLE`], so
/// one bad field never costs the rest of the listing.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldExtractor {
    rules: FxHashMap<Field, Vec<FieldRule>>
}


impl FieldExtractor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the cascade of `field`. Rules are tried in the given order.
    pub(crate) fn with_rules(mut self, field: Field, rules: Vec<FieldRule>) -> Self {
        self.rules.insert(field, rules);
        self
    }

    fn rules(&self, field: Field) -> &[FieldRule] {
        self.rules.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn extract(&self, card: &impl PageElement, field: Field) -> String {
        match resolve_first(self.rules(field), |_, rule| rule.apply(card).found()) {
            Some((rule_index, text)) => {
                tracing::trace!(field = field.name(), rule_index, "Field extracted");
                text
            }
            None => {
                tracing::debug!(field = field.name(), "No rule matched, storing sentinel");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    /// Extracts every field of a card. Relative links are resolved against `page_url`.
    pub(crate) fn extract_all(&self, card: &impl PageElement, page_url: &Url) -> FieldValues {
        FieldValues {
            title: self.extract(card, Field::Title),
            company: self.extract(card, Field::Company),
            location: self.extract(card, Field::Location),
            published: self.extract(card, Field::Published),
            url: resolve_link(page_url, self.extract(card, Field::Url))
        }
    }
}


fn resolve_link(page_url: &Url, href: String) -> String {
    if href == NOT_AVAILABLE {
        return href;
    }
    page_url.join(&href).map_or(href, String::from)
}
