use std::fmt;

use serde::Deserialize;

mod cards;
mod fields;

pub(crate) use cards::CardLocator;
pub(crate) use fields::{Field, FieldExtractor, FieldRule, FieldValues};
#[cfg(test)]
pub(crate) use fields::NOT_AVAILABLE;


/// How the pattern of a [`SelectorSpec`] is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SelectorKind {
    Css,
    XPath
}


/// One locating strategy.
///
/// In configuration files a spec is written as `{ css = "div.card" }` or
/// `{ xpath = "//div[h2]" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "SpecRepr")]
pub(crate) struct SelectorSpec {
    pub(crate) kind: SelectorKind,
    pub(crate) pattern: String
}


#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum SpecRepr {
    Css(String),
    Xpath(String)
}


impl From<SpecRepr> for SelectorSpec {
    fn from(value: SpecRepr) -> Self {
        match value {
            SpecRepr::Css(pattern) => Self::css(pattern),
            SpecRepr::Xpath(pattern) => Self::xpath(pattern)
        }
    }
}


impl SelectorSpec {
    pub(crate) fn css(pattern: impl Into<String>) -> Self {
        Self { kind: SelectorKind::Css, pattern: pattern.into() }
    }

    pub(crate) fn xpath(pattern: impl Into<String>) -> Self {
        Self { kind: SelectorKind::XPath, pattern: pattern.into() }
    }
}


impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SelectorKind::Css => write!(f, "css:{}", self.pattern),
            SelectorKind::XPath => write!(f, "xpath:{}", self.pattern)
        }
    }
}


/// Ordered alternatives for locating the same thing. Earlier specs always take priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub(crate) struct SelectorCascade(Vec<SelectorSpec>);


impl SelectorCascade {
    pub(crate) fn new(specs: Vec<SelectorSpec>) -> Self {
        Self(specs)
    }

    pub(crate) fn specs(&self) -> &[SelectorSpec] {
        &self.0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}


/// Outcome of a single locating attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    Found(String),
    NotFound
}


impl Lookup {
    /// Trims the given text. Text that is blank after trimming counts as a miss.
    pub(crate) fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::NotFound
        } else {
            Self::Found(trimmed.to_string())
        }
    }

    pub(crate) fn found(self) -> Option<String> {
        match self {
            Self::Found(text) => Some(text),
            Self::NotFound => None
        }
    }
}


impl From<Option<String>> for Lookup {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::NotFound, |text| Self::from_text(&text))
    }
}


/// Tries each candidate in order and returns the first success together with its index.
///
/// Candidates after the winning one are never attempted. This is the single cascade
/// resolution routine behind card location, field extraction and pagination lookup.
pub(crate) fn resolve_first<T, R>(
    candidates: &[T],
    mut attempt: impl FnMut(usize, &T) -> Option<R>
) -> Option<(usize, R)> {
    candidates
        .iter()
        .enumerate()
        .find_map(|(index, candidate)| attempt(index, candidate).map(|result| (index, result)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_first_stops_at_first_success() {
        let mut attempted = vec![];
        let resolved = resolve_first(&[0, 3, 5], |index, len| {
            attempted.push(index);
            (*len > 0).then_some(*len)
        });

        assert_eq!(resolved, Some((1, 3)));
        assert_eq!(attempted, vec![0, 1]);
    }

    #[test]
    fn resolve_first_exhausts_to_none() {
        let resolved: Option<(usize, ())> = resolve_first(&["a", "b"], |_, _| None);
        assert!(resolved.is_none());
    }

    #[test]
    fn blank_text_is_a_miss() {
        assert_eq!(Lookup::from_text("  \n "), Lookup::NotFound);
        assert_eq!(Lookup::from_text("  Analista  "), Lookup::Found("Analista".into()));
        assert_eq!(Lookup::from(None), Lookup::NotFound);
    }

    #[test]
    fn cascade_deserializes_from_tagged_specs() {
        #[derive(Deserialize)]
        struct Wrapper {
            cards: SelectorCascade
        }

        let wrapper: Wrapper = toml::from_str(
            r#"cards = [{ css = "div[class*='aviso']" }, { xpath = "//div[.//h2]" }]"#
        ).unwrap();

        assert_eq!(
            wrapper.cards.specs(),
            &[SelectorSpec::css("div[class*='aviso']"), SelectorSpec::xpath("//div[.//h2]")]
        );
        assert_eq!(wrapper.cards.specs()[1].to_string(), "xpath://div[.//h2]");
    }
}
