use std::{cell::RefCell, path::PathBuf, rc::Rc, time::Duration};

use anyhow::Context;
use ego_tree::NodeId;
use fxhash::FxHashMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::locators::{Lookup, SelectorKind, SelectorSpec};

use super::{DocumentSource, PageElement, SourceError};


fn whitespace_regex() -> Regex {
    Regex::new(r"\s+").expect("Whitespace pattern should have been valid")
}


fn page_key(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), String::from)
}


/// Serves pages that were rendered ahead of time, such as saved diagnostic dumps.
///
/// Only CSS specs are understood. XPath specs never match, so cascades that fall back to
/// XPath will simply fall through. Text is normalised the way a browser's `innerText` would be.
pub(crate) struct HtmlDocument {
    pages: FxHashMap<String, String>,
    current: Option<String>,
    whitespace: Regex,
    consulted: RefCell<Vec<SelectorSpec>>
}


impl HtmlDocument {
    pub(crate) fn new() -> Self {
        Self {
            pages: Default::default(),
            current: None,
            whitespace: whitespace_regex(),
            consulted: Default::default()
        }
    }

    pub(crate) fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(page_key(url), html.into());
        self
    }

    /// Reads every page from disk, keyed by the URL it was rendered from
    pub(crate) fn from_files(pages: &FxHashMap<String, PathBuf>) -> anyhow::Result<Self> {
        let mut document = Self::new();
        for (url, path) in pages {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read replay page {}", path.display()))?;
            document = document.with_page(url, html);
        }
        Ok(document)
    }

    /// Every spec that was waited on, in order
    #[cfg(test)]
    pub(crate) fn consulted(&self) -> Vec<SelectorSpec> {
        self.consulted.borrow().clone()
    }
}


impl DocumentSource for HtmlDocument {
    type Element<'a> = HtmlElement;

    fn navigate(&mut self, url: &Url) -> Result<(), SourceError> {
        match self.pages.get(url.as_str()) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(SourceError::NavigationTimeout {
                    url: url.to_string(),
                    reason: "no page was recorded for this URL".into()
                })
            }
        }
    }

    fn wait_for(&self, spec: &SelectorSpec, _timeout: Duration) -> Result<Vec<Self::Element<'_>>, SourceError> {
        self.consulted.borrow_mut().push(spec.clone());
        let not_found = || SourceError::NotFound { spec: spec.to_string() };

        let (Some(current), SelectorKind::Css) = (&self.current, spec.kind) else {
            return Err(not_found());
        };
        let selector = Selector::parse(&spec.pattern).map_err(|_| not_found())?;
        let document = Rc::new(Html::parse_document(current));
        let nodes: Vec<NodeId> = document.select(&selector).map(|element| element.id()).collect();
        let elements: Vec<_> = nodes
            .into_iter()
            .map(|node| HtmlElement { document: Rc::clone(&document), node, whitespace: self.whitespace.clone() })
            .collect();

        if elements.is_empty() {
            Err(not_found())
        } else {
            Ok(elements)
        }
    }

    fn run_script(&self, script: &str) -> Result<(), SourceError> {
        tracing::trace!(script, "Ignoring script on a pre-rendered page");
        Ok(())
    }

    fn snapshot(&self) -> Result<String, SourceError> {
        self.current
            .clone()
            .ok_or_else(|| SourceError::Snapshot("no page is loaded".into()))
    }

    fn uses_automation(&self) -> bool {
        false
    }
}


/// An element of a parsed page. Cards share the page they were found on, so descendants
/// are looked up in their original context, table rows included.
pub(crate) struct HtmlElement {
    document: Rc<Html>,
    node: NodeId,
    whitespace: Regex
}


impl HtmlElement {
    /// Wraps the first element of a markup fragment
    #[cfg(test)]
    pub(crate) fn new(outer_html: &str) -> Self {
        let document = Html::parse_fragment(outer_html);
        let node = document
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .map_or_else(|| document.root_element().id(), |element| element.id());
        Self { document: Rc::new(document), node, whitespace: whitespace_regex() }
    }

    fn element(&self) -> Option<ElementRef<'_>> {
        self.document.tree.get(self.node).and_then(ElementRef::wrap)
    }

    fn normalise(&self, element: ElementRef<'_>) -> Lookup {
        let text: String = element.text().map(|x| x.replace('\u{a0}', " ")).collect();
        Lookup::from_text(&self.whitespace.replace_all(&text, " "))
    }

    /// Runs `f` against the first descendant of this element matching `spec`
    fn with_child(&self, spec: &SelectorSpec, f: impl FnOnce(ElementRef<'_>) -> Lookup) -> Lookup {
        if spec.kind != SelectorKind::Css {
            return Lookup::NotFound;
        }
        let Ok(selector) = Selector::parse(&spec.pattern) else {
            return Lookup::NotFound;
        };
        self.element()
            .and_then(|element| element.select(&selector).next())
            .map_or(Lookup::NotFound, f)
    }
}


impl PageElement for HtmlElement {
    fn text(&self) -> Lookup {
        self.element().map_or(Lookup::NotFound, |element| self.normalise(element))
    }

    fn find_text(&self, spec: &SelectorSpec) -> Lookup {
        self.with_child(spec, |child| self.normalise(child))
    }

    fn find_attribute(&self, spec: &SelectorSpec, attribute: &str) -> Lookup {
        self.with_child(spec, |child| child.value().attr(attribute).map(String::from).into())
    }

    fn scroll_into_view(&self) {}
}
